//! Error type shared by the host use cases.

use optree_core::{TreeError, ValueError};
use thiserror::Error;

use super::sessions::SessionId;

/// Errors surfaced by the host application layer.
#[derive(Debug, Error)]
pub enum HostError {
    /// The option tree rejected the operation.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A textual value could not be parsed for the option at `path`.
    #[error("invalid value for {path}: {source}")]
    InvalidValue {
        path: String,
        #[source]
        source: ValueError,
    },

    /// A session id that is not a UUID.
    #[error("malformed session id {0:?}")]
    MalformedSessionId(String),

    /// No open session has this id.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// Some builtin option definitions failed to register.
    #[error("{0} builtin option(s) failed to register")]
    Registration(usize),
}
