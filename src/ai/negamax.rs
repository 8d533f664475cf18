use std::cmp::Ordering;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::transposition::{CacheStats, TranspositionCache};
use crate::config::SolverConfig;
use crate::game::{GameOutcome, Position, CELLS, WIDTH};

/// Column ordering: center-first for better alpha-beta pruning.
pub const MOVE_ORDER: [usize; WIDTH] = center_first();

const fn center_first() -> [usize; WIDTH] {
    let mut order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        order[i] = if i % 2 == 1 {
            WIDTH / 2 - (i + 1) / 2
        } else {
            WIDTH / 2 + i / 2
        };
        i += 1;
    }
    order
}

/// Lowest score a proven result can take: losing to the last possible stone.
pub const MIN_SCORE: i32 = -(CELLS as i32) / 2;
/// Highest score a proven result can take: winning with the first stone.
pub const MAX_SCORE: i32 = (CELLS as i32 + 1) / 2;

/// Default number of transposition cache slots (8 MiB).
pub const DEFAULT_CACHE_SLOTS: usize = 1 << 20;

const INFINITY: i32 = i32::MAX;

/// Score for the player to move when they can win with their next stone.
fn win_score(position: &Position) -> i32 {
    (CELLS as i32 + 1 - position.nb_moves() as i32) / 2
}

/// Score for the player to move when every move lets the opponent win.
fn loss_score(position: &Position) -> i32 {
    -(CELLS as i32 - position.nb_moves() as i32) / 2
}

fn encode_bound(upper: i32) -> Option<u8> {
    (MIN_SCORE..=MAX_SCORE)
        .contains(&upper)
        .then(|| (upper - MIN_SCORE + 1) as u8)
}

fn decode_bound(value: u8) -> i32 {
    i32::from(value) + MIN_SCORE - 1
}

/// True if playing `col` gives the opponent an immediate win.
fn hands_opponent_win(position: &Position, col: usize) -> bool {
    let mut next = *position;
    next.play(col);
    (0..WIDTH).any(|reply| next.can_play(reply) && next.is_winning_move(reply))
}

/// Raised when the deadline passes mid-search. The partial subtree result is
/// discarded by every frame on the way up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interrupted;

/// Result of one search node.
///
/// `proven` is false when the value depends on a depth-exhausted leaf.
/// Proven results obey the usual alpha-beta contract against the true game
/// value, at any depth budget, so only they may be cached.
#[derive(Debug, Clone, Copy)]
struct Eval {
    score: i32,
    proven: bool,
}

impl Eval {
    fn proven(score: i32) -> Self {
        Eval {
            score,
            proven: true,
        }
    }

    fn heuristic(score: i32) -> Self {
        Eval {
            score,
            proven: false,
        }
    }
}

/// How far a solve got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// The score is the game-theoretic value of the position.
    Exact,
    /// The depth budget ran out before the position was proven; the score
    /// comes from depth-exhausted leaves and is only an estimate.
    DepthLimited,
    /// The time budget ran out. The score is from the deepest completed
    /// iteration, or 0 if none completed.
    TimedOut,
}

/// Outcome of [`Solver::solve`].
///
/// Scores are from the point of view of the player to move: positive if
/// they can force a win, negative if they lose, 0 for a draw. Faster wins
/// score higher: winning with the stone played at move `n` (1-based) is
/// worth `(CELLS + 2 - n) / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Solution {
    pub score: i32,
    /// Deepest iterative-deepening depth that completed.
    pub depth: usize,
    pub status: SearchStatus,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl Solution {
    pub fn is_exact(&self) -> bool {
        self.status == SearchStatus::Exact
    }

    /// Who wins `position` under perfect play, if the score is exact.
    pub fn outcome(&self, position: &Position) -> Option<GameOutcome> {
        if !self.is_exact() {
            return None;
        }
        let mover = position.current_player();
        Some(match self.score.cmp(&0) {
            Ordering::Greater => GameOutcome::Winner(mover),
            Ordering::Less => GameOutcome::Winner(mover.other()),
            Ordering::Equal => GameOutcome::Draw,
        })
    }
}

/// Score of one candidate move, from the point of view of the player making it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoveScore {
    pub column: usize,
    pub score: i32,
    pub status: SearchStatus,
}

/// Negamax solver with alpha-beta pruning, iterative deepening and a
/// transposition cache.
pub struct Solver {
    time_limit: Option<Duration>,
    depth_limit: Option<usize>,
    prune_losing_moves: bool,
    cache: Option<TranspositionCache>,
    explored_nodes: u64,
}

impl Solver {
    /// Solver with no time or depth limit.
    pub fn new() -> Self {
        Solver::with_limits(None, None)
    }

    pub fn with_limits(time_limit: Option<Duration>, depth_limit: Option<usize>) -> Self {
        Solver {
            time_limit,
            depth_limit,
            prune_losing_moves: true,
            cache: Some(TranspositionCache::new(DEFAULT_CACHE_SLOTS)),
            explored_nodes: 0,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        let solver = Solver::with_limits(
            config.time_limit_ms.map(Duration::from_millis),
            config.depth_limit,
        )
        .with_losing_move_pruning(config.prune_losing_moves);
        if config.use_cache {
            solver.with_cache_slots(config.cache_slots)
        } else {
            solver.without_cache()
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_depth_limit(mut self, limit: usize) -> Self {
        self.depth_limit = Some(limit);
        self
    }

    pub fn with_cache_slots(mut self, slots: usize) -> Self {
        self.cache = Some(TranspositionCache::new(slots));
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn with_losing_move_pruning(mut self, enabled: bool) -> Self {
        self.prune_losing_moves = enabled;
        self
    }

    /// Nodes visited by the last call to [`Solver::solve`] or [`Solver::analyze`].
    pub fn explored_node_count(&self) -> u64 {
        self.explored_nodes
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(TranspositionCache::stats)
    }

    /// Solve `position` by iterative deepening.
    ///
    /// Depths run from 1 up to the depth budget (capped just past the number
    /// of empty cells, where no leaf can be depth-exhausted). The loop stops as
    /// soon as one iteration proves the position. A budget of 0 evaluates the
    /// root as a depth-exhausted leaf, whose score is the move count even on
    /// a full board.
    pub fn solve(&mut self, position: &Position) -> Solution {
        self.explored_nodes = 0;
        if let Some(cache) = self.cache.as_mut() {
            cache.reset();
        }
        let start = Instant::now();
        let deadline = self.time_limit.and_then(|limit| start.checked_add(limit));

        // One ply more than the empty cells, so full boards are always reached
        // with depth to spare and score as proven draws.
        let exhaustive = CELLS - position.nb_moves() + 1;
        let max_depth = self
            .depth_limit
            .map_or(exhaustive, |limit| limit.min(exhaustive));

        let mut completed: Option<(usize, Eval)> = None;
        let mut timed_out = false;
        for depth in max_depth.min(1)..=max_depth {
            match self.negamax(position, depth, -INFINITY, INFINITY, deadline) {
                Ok(eval) => {
                    log::debug!(
                        "depth {depth} completed: score {}{}, {} nodes explored",
                        eval.score,
                        if eval.proven { "" } else { " (estimate)" },
                        self.explored_nodes
                    );
                    completed = Some((depth, eval));
                    if eval.proven {
                        break;
                    }
                }
                Err(Interrupted) => {
                    log::info!("time limit reached during depth {depth}");
                    timed_out = true;
                    break;
                }
            }
        }

        // Without a timeout the loop always completes at least one depth.
        let (depth, score, status) = match completed {
            Some((depth, eval)) if timed_out => (depth, eval.score, SearchStatus::TimedOut),
            Some((depth, eval)) if eval.proven => (depth, eval.score, SearchStatus::Exact),
            Some((depth, eval)) => (depth, eval.score, SearchStatus::DepthLimited),
            None => (0, 0, SearchStatus::TimedOut),
        };

        if let Some(stats) = self.cache_stats() {
            log::debug!(
                "cache: {}/{} slots used, collision rate {:.3}",
                stats.occupied,
                stats.capacity,
                stats.collision_rate()
            );
        }

        let solution = Solution {
            score,
            depth,
            status,
            nodes: self.explored_nodes,
            elapsed: start.elapsed(),
        };
        log::info!(
            "solved position after {} moves: score {} ({:?}, depth {}), {} nodes in {:?}",
            position.nb_moves(),
            solution.score,
            solution.status,
            solution.depth,
            solution.nodes,
            solution.elapsed
        );
        solution
    }

    /// Score every playable column of `position` for the player to move.
    ///
    /// Each column other than an immediate win is solved as its own position,
    /// with the time budget applying to each one separately.
    pub fn analyze(&mut self, position: &Position) -> Vec<MoveScore> {
        let mut nodes = 0;
        let mut scores = Vec::with_capacity(WIDTH);
        for column in (0..WIDTH).filter(|&col| position.can_play(col)) {
            if position.is_winning_move(column) {
                scores.push(MoveScore {
                    column,
                    score: win_score(position),
                    status: SearchStatus::Exact,
                });
                continue;
            }
            let mut next = *position;
            next.play(column);
            let solution = self.solve(&next);
            nodes += solution.nodes;
            scores.push(MoveScore {
                column,
                score: -solution.score,
                status: solution.status,
            });
        }
        self.explored_nodes = nodes;
        scores
    }

    /// Highest-scoring move, preferring central columns on ties.
    pub fn best_move(&mut self, position: &Position) -> Option<MoveScore> {
        let scores = self.analyze(position);
        MOVE_ORDER
            .iter()
            .filter_map(|&col| scores.iter().find(|s| s.column == col))
            .fold(None, |best: Option<MoveScore>, candidate| match best {
                Some(best) if best.score >= candidate.score => Some(best),
                _ => Some(*candidate),
            })
    }

    fn negamax(
        &mut self,
        position: &Position,
        depth: usize,
        mut alpha: i32,
        mut beta: i32,
        deadline: Option<Instant>,
    ) -> Result<Eval, Interrupted> {
        self.explored_nodes += 1;

        if depth == 0 {
            return Ok(Eval::heuristic(position.nb_moves() as i32));
        }
        if position.is_full() {
            return Ok(Eval::proven(0));
        }

        // Cached values are proven upper bounds.
        let key = position.key();
        if let Some(upper) = self.cache.as_ref().and_then(|c| c.get(key)) {
            let upper = decode_bound(upper);
            if beta > upper {
                beta = upper;
                if alpha >= beta {
                    return Ok(Eval::proven(beta));
                }
            }
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(Interrupted);
        }

        if (0..WIDTH).any(|col| position.can_play(col) && position.is_winning_move(col)) {
            return Ok(Eval::proven(win_score(position)));
        }

        let mut proven = true;
        let mut searched_any = false;
        for &col in &MOVE_ORDER {
            if !position.can_play(col)
                || (self.prune_losing_moves && hands_opponent_win(position, col))
            {
                continue;
            }
            searched_any = true;

            let mut next = *position;
            next.play(col);
            let child = self.negamax(&next, depth - 1, -beta, -alpha, deadline)?;
            proven &= child.proven;
            let score = -child.score;
            if score >= beta {
                return Ok(Eval { score, proven });
            }
            if score > alpha {
                alpha = score;
            }
        }

        if !searched_any {
            return Ok(Eval::proven(loss_score(position)));
        }

        if proven {
            if let (Some(cache), Some(value)) = (self.cache.as_mut(), encode_bound(alpha)) {
                cache.put(key, value);
            }
        }
        Ok(Eval {
            score: alpha,
            proven,
        })
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}
