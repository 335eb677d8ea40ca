use thiserror::Error;

/// Failure modes of a peer-store backend.
///
/// `NotFound` is expected during idempotent deletes and is suppressed at
/// the hook boundary; `Unavailable` is a real backend failure and surfaces
/// to the client as an internal error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("resource does not exist")]
    NotFound,

    #[error("storage backend unavailable: {message}")]
    Unavailable { message: String },
}
