mod negamax;
mod transposition;

pub use negamax::{
    MoveScore, SearchStatus, Solution, Solver, DEFAULT_CACHE_SLOTS, MAX_SCORE, MIN_SCORE,
    MOVE_ORDER,
};
pub use transposition::{CacheStats, TranspositionCache, KEY_BITS};
