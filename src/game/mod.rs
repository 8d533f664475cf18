//! Core Connect Four game logic: the bitboard position, move-sequence
//! parsing, and player types.

mod player;
mod position;

pub use player::{GameOutcome, Player};
pub use position::{Position, CELLS, HEIGHT, WIDTH};
