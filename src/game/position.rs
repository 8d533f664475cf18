use super::Player;
use crate::error::{MoveError, SequenceError};

/// Number of columns on the board.
pub const WIDTH: usize = 7;
/// Number of playable rows per column.
pub const HEIGHT: usize = 6;
/// Number of playable cells.
pub const CELLS: usize = WIDTH * HEIGHT;

// Sequences encode a column as a single digit, and each column needs one
// spare sentinel bit above its playable cells.
const _: () = assert!(WIDTH < 10, "board width must be less than 10");
const _: () = assert!(WIDTH * (HEIGHT + 1) <= 64, "board does not fit in a u64");

/// Bits used by one column: `HEIGHT` cells plus the sentinel.
const COLUMN_BITS: usize = HEIGHT + 1;

const fn bottom_row() -> u64 {
    let mut mask = 0;
    let mut col = 0;
    while col < WIDTH {
        mask |= 1 << (col * COLUMN_BITS);
        col += 1;
    }
    mask
}

/// One bit at the bottom cell of every column.
const BOTTOM_ROW: u64 = bottom_row();

#[inline]
const fn bottom_mask(col: usize) -> u64 {
    1 << (col * COLUMN_BITS)
}

#[inline]
const fn top_mask(col: usize) -> u64 {
    1 << (HEIGHT - 1 + col * COLUMN_BITS)
}

#[inline]
const fn column_mask(col: usize) -> u64 {
    ((1 << HEIGHT) - 1) << (col * COLUMN_BITS)
}

/// True if `stones` contains four in a row in any direction.
///
/// `shift` walks one cell along a direction: 1 is vertical, `HEIGHT` and
/// `HEIGHT + 2` are the two diagonals, `HEIGHT + 1` is horizontal. The
/// always-empty sentinel row stops runs from wrapping into the next column.
fn has_alignment(stones: u64) -> bool {
    [1, HEIGHT, HEIGHT + 1, HEIGHT + 2].into_iter().any(|shift| {
        let pairs = stones & (stones >> shift);
        pairs & (pairs >> (2 * shift)) != 0
    })
}

/// A Connect Four position encoded as two bitboards.
///
/// Column `c` occupies bits `c * (HEIGHT + 1) ..= c * (HEIGHT + 1) + HEIGHT`,
/// bottom cell first; the last bit of each column is a sentinel that is never
/// set. Everything is relative to the player about to move: `current` holds
/// their stones and `mask` holds the stones of both players.
///
/// A position never contains a completed alignment. Winning moves are
/// detected with [`Position::is_winning_move`] before they are played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    current: u64,
    mask: u64,
    moves: usize,
}

impl Position {
    pub const WIDTH: usize = WIDTH;
    pub const HEIGHT: usize = HEIGHT;
    pub const CELLS: usize = CELLS;

    /// Create an empty position.
    pub fn new() -> Self {
        Position::default()
    }

    /// Build a position from a sequence of 1-based column digits.
    ///
    /// Unlike [`Position::play_sequence`] this rejects the whole sequence and
    /// reports why the first invalid move failed.
    pub fn from_sequence(seq: &str) -> Result<Self, SequenceError> {
        let mut position = Position::new();
        position.apply_sequence(seq)?;
        Ok(position)
    }

    /// True if a stone can be dropped into `col` (0-based).
    pub fn can_play(&self, col: usize) -> bool {
        col < WIDTH && self.mask & top_mask(col) == 0
    }

    /// Play a stone for the current player in `col` (0-based).
    ///
    /// The column must be playable and the move must not complete an
    /// alignment; check with [`Position::can_play`] and
    /// [`Position::is_winning_move`] first.
    ///
    /// # Panics
    ///
    /// Panics if `col` is out of range or full.
    pub fn play(&mut self, col: usize) {
        assert!(self.can_play(col), "column {col} is not playable");
        self.current ^= self.mask;
        self.mask |= self.mask + bottom_mask(col);
        self.moves += 1;
    }

    /// Checked variant of [`Position::play`] that also refuses winning moves.
    pub fn try_play(&mut self, col: usize) -> Result<(), MoveError> {
        if col >= WIDTH {
            return Err(MoveError::InvalidColumn(col));
        }
        if !self.can_play(col) {
            return Err(MoveError::ColumnFull(col));
        }
        if self.is_winning_move(col) {
            return Err(MoveError::WinningMove(col));
        }
        self.play(col);
        Ok(())
    }

    /// Play a sequence of 1-based column digits.
    ///
    /// Processing stops at the first invalid move: a character that is not a
    /// column digit, a full column, or a move completing an alignment. Returns
    /// the number of moves played; the sequence was valid iff this equals its
    /// length.
    pub fn play_sequence(&mut self, seq: &str) -> usize {
        match self.apply_sequence(seq) {
            Ok(()) => seq.chars().count(),
            Err(err) => err.index() - 1,
        }
    }

    fn apply_sequence(&mut self, seq: &str) -> Result<(), SequenceError> {
        for (i, ch) in seq.chars().enumerate() {
            let index = i + 1;
            let digit = ch
                .to_digit(10)
                .ok_or(SequenceError::InvalidCharacter { index, found: ch })?;
            if digit == 0 || digit as usize > WIDTH {
                return Err(SequenceError::ColumnOutOfRange {
                    index,
                    column: digit,
                });
            }
            let col = digit as usize - 1;
            match self.try_play(col) {
                Ok(()) => {}
                Err(MoveError::WinningMove(_)) => {
                    return Err(SequenceError::WinningMove {
                        index,
                        column: digit as usize,
                    })
                }
                Err(_) => {
                    return Err(SequenceError::ColumnFull {
                        index,
                        column: digit as usize,
                    })
                }
            }
        }
        Ok(())
    }

    /// True if the current player completes an alignment by playing `col`.
    ///
    /// # Panics
    ///
    /// Panics if `col` is out of range or full.
    pub fn is_winning_move(&self, col: usize) -> bool {
        assert!(self.can_play(col), "column {col} is not playable");
        let stones = self.current | ((self.mask + bottom_mask(col)) & column_mask(col));
        has_alignment(stones)
    }

    /// Number of stones played since the beginning of the game.
    pub fn nb_moves(&self) -> usize {
        self.moves
    }

    /// True once every cell is occupied.
    pub fn is_full(&self) -> bool {
        self.moves == CELLS
    }

    /// The player about to move. Red always starts.
    pub fn current_player(&self) -> Player {
        if self.moves % 2 == 0 {
            Player::Red
        } else {
            Player::Yellow
        }
    }

    /// Number of stones in `col`.
    pub fn column_height(&self, col: usize) -> usize {
        (self.mask & column_mask(col)).count_ones() as usize
    }

    /// Compact fingerprint of the position, unique among reachable positions.
    ///
    /// Adding `mask` and the bottom row sets a marker bit just above each
    /// column's top stone; the current player's stones below it are kept
    /// as-is. The result is never 0 and fits in `WIDTH * (HEIGHT + 1)` bits.
    pub fn key(&self) -> u64 {
        self.current + self.mask + BOTTOM_ROW
    }
}
