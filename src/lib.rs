//! # Connect Four Solver
//!
//! A strong solver for 7x6 Connect Four. Positions are stored as a pair of
//! bitboards and searched with negamax, alpha-beta pruning and iterative
//! deepening under optional time and depth budgets, backed by a fixed-size
//! transposition cache.
//!
//! ## Modules
//!
//! - [`game`]: Bitboard position, move-sequence parsing, players
//! - [`ai`]: Solver, move analysis, transposition cache
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types

pub mod ai;
pub mod config;
pub mod error;
pub mod game;
