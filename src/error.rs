//! Error types shared by the data models, the operation controller and the session.

use thiserror::Error;

/// Message shown for any channel that closed before delivering a terminal event.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error. Please try again.";

/// Local, synchronous failures. Nothing remote is contacted when one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one deck must have non-zero frequency")]
    EmptyField,
    #[error("matchup matrix must be square: {decks} decks but row {row} has {len} values")]
    NotSquare { decks: usize, row: usize, len: usize },
    #[error("matchup matrix has {decks} decks but {rows} rows")]
    RowCount { decks: usize, rows: usize },
    #[error("duplicate deck name: {0}")]
    DuplicateDeck(String),
    #[error("need at least 4 different classes, found {0}; deck names must include the class name (e.g. 'Control Warrior')")]
    InsufficientClasses(usize),
    #[error("min_games must be between {min} and {max}, got {value}")]
    MinGamesOutOfRange { value: u32, min: u32, max: u32 },
    #[error("{0} data has not been confirmed yet")]
    Missing(&'static str),
    #[error("action requires stage {0}")]
    WrongStage(&'static str),
}

/// Failures of a long-running remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("an operation is already in progress")]
    Busy,
    #[error("{}", CONNECTION_ERROR_MESSAGE)]
    Connection(String),
    #[error("{0}")]
    Remote(String),
    #[error("unexpected message from server: {0}")]
    Protocol(String),
}

impl OperationError {
    /// Text suitable for showing to the user.
    ///
    /// Remote errors are shown verbatim. Connection failures, and a start refused because a
    /// channel is already open, use the generic connection message.
    pub fn user_message(&self) -> String {
        match self {
            OperationError::Remote(msg) => msg.clone(),
            OperationError::Busy | OperationError::Connection(_) => {
                CONNECTION_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Failures of the plain request/response collaborators (options, uploads).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}: {detail}")]
    Status {
        url: String,
        status: u16,
        detail: String,
    },
    #[error("upload rejected: {0}")]
    Rejected(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages() {
        assert_eq!(OperationError::Remote("timeout".into()).user_message(), "timeout");
        assert_eq!(
            OperationError::Connection("reset by peer".into()).user_message(),
            CONNECTION_ERROR_MESSAGE
        );
        assert_eq!(OperationError::Busy.user_message(), CONNECTION_ERROR_MESSAGE);
        assert!(OperationError::Protocol("bad json".into())
            .user_message()
            .contains("bad json"));
    }
}
