//! Error types for the maze and learning core

use crate::{Action, Position, Timestep};

/// Errors raised by maze construction, simulation, and learning.
///
/// None of these are retryable: they describe a malformed maze, a bad
/// configuration, or a broken internal invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    #[error("unknown maze symbol '{symbol}' at row {row}, column {column}")]
    UnknownCell {
        symbol: char,
        row: usize,
        column: usize,
    },

    #[error("unknown action '{value}' (expected up, down, left or right)")]
    InvalidAction { value: String },

    #[error("cannot sample from an environment model with no observations")]
    EmptyModel,

    #[error("state-action pair {position} / {action} was never registered")]
    UnregisteredPair { position: Position, action: Action },

    #[error("position {position} is out of bounds for a {rows}x{columns} maze")]
    OutOfBounds {
        position: Position,
        rows: usize,
        columns: usize,
    },

    #[error("timestep {timestep} does not fit the recency table")]
    TimestepOverflow { timestep: Timestep },
}

impl Error {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
