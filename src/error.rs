use std::path::PathBuf;

/// Errors returned by the checked move API on [`Position`](crate::game::Position).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("column {0} is outside the board")]
    InvalidColumn(usize),

    #[error("column {0} is full")]
    ColumnFull(usize),

    #[error("playing column {0} completes an alignment")]
    WinningMove(usize),
}

/// Errors produced while parsing a move sequence. Every variant carries the
/// 1-based index of the first move that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    #[error("invalid move {index}: {found:?} is not a column digit")]
    InvalidCharacter { index: usize, found: char },

    #[error("invalid move {index}: column {column} is outside the board")]
    ColumnOutOfRange { index: usize, column: u32 },

    #[error("invalid move {index}: column {column} is full")]
    ColumnFull { index: usize, column: usize },

    #[error("invalid move {index}: column {column} completes an alignment")]
    WinningMove { index: usize, column: usize },
}

impl SequenceError {
    /// 1-based index of the offending move.
    pub fn index(&self) -> usize {
        match *self {
            SequenceError::InvalidCharacter { index, .. }
            | SequenceError::ColumnOutOfRange { index, .. }
            | SequenceError::ColumnFull { index, .. }
            | SequenceError::WinningMove { index, .. } => index,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_error_display() {
        assert_eq!(MoveError::ColumnFull(3).to_string(), "column 3 is full");
        assert_eq!(
            MoveError::WinningMove(0).to_string(),
            "playing column 0 completes an alignment"
        );
    }

    #[test]
    fn test_sequence_error_display() {
        let err = SequenceError::InvalidCharacter {
            index: 4,
            found: 'x',
        };
        assert_eq!(err.to_string(), "invalid move 4: 'x' is not a column digit");
        assert_eq!(err.index(), 4);
    }

    #[test]
    fn test_sequence_error_index() {
        let err = SequenceError::WinningMove {
            index: 7,
            column: 4,
        };
        assert_eq!(err.index(), 7);
        let err = SequenceError::ColumnOutOfRange {
            index: 1,
            column: 8,
        };
        assert_eq!(err.index(), 1);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("solver.cache_slots must be >= 2".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: solver.cache_slots must be >= 2"
        );
    }
}
