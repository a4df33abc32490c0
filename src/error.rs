use std::time::Duration;
use thiserror::Error;

/// Failure classes surfaced by the locator.
///
/// Transport and timeout failures are routine on camera networks and must be
/// treated as "try the next candidate", not as crashes. Protocol failures end
/// one negotiation attempt but leave the wider workflow (other devices, the
/// subnet scan) intact.
#[derive(Debug, Error)]
pub enum LocateError {
    /// Rejected before any network I/O, e.g. no IP and no service address.
    #[error("{0}")]
    Input(String),

    /// Connection-level failure: refused, reset, unreachable, or a non-2xx
    /// ONVIF response.
    #[error("transport error: {0}")]
    Transport(String),

    /// No response within the configured bound.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The device answered but the conversation is missing a required field.
    #[error("{0}")]
    Protocol(#[from] ProtocolFailure),
}

/// Stage-tagged negotiation failures, one per pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolFailure {
    #[error("media service not found")]
    MediaServiceNotFound,

    #[error("no profiles found")]
    NoProfilesFound,

    #[error("stream URI not found")]
    StreamUriNotFound,
}

impl LocateError {
    /// Splits a reqwest failure into the timeout/transport classes. `budget`
    /// is the per-request bound that was in force.
    pub(crate) fn from_reqwest(err: reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            LocateError::Timeout(budget)
        } else {
            LocateError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for LocateError {
    fn from(err: std::io::Error) -> Self {
        LocateError::Transport(err.to_string())
    }
}
