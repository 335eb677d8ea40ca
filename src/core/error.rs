//! Error taxonomy for the tracker core.
//!
//! Errors addressed to the client render verbatim; everything else is an
//! internal error and is prefixed before it reaches the wire, so that a
//! client never sees backend details.
use std::panic::Location;

use thiserror::Error;

/// Errors caused by the client's own request. The message is sent back
/// as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("malformed packet")]
    MalformedPacket,

    #[error("bad connection id")]
    BadConnectionId,

    #[error("unknown action")]
    UnknownAction,

    #[error("unapproved torrent")]
    UnapprovedTorrent,

    #[error("invalid numwant")]
    InvalidNumwant,

    #[error("{0}")]
    BadRequest(String),
}

/// Errors surfaced by the announce/scrape pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// The client is at fault; the message is addressed to it verbatim.
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Something on our side failed. The prefix is part of the
    /// client-visible contract.
    #[error("internal error occurred: {message}")]
    Internal {
        message: String,
        location: &'static Location<'static>,
    },

    /// The request context was cancelled mid-flight; no response is
    /// written.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// True when the error message is safe to address to the client
    /// verbatim (it already is the full message).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Client(_))
    }

    #[track_caller]
    #[must_use]
    pub fn internal(message: String) -> Self {
        Error::Internal {
            message,
            location: Location::caller(),
        }
    }
}

impl From<swarm_tracker_peer_store::Error> for Error {
    fn from(err: swarm_tracker_peer_store::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            location: Location::caller(),
        }
    }
}
