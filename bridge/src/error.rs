use thiserror::Error;

/// Errors surfaced by the servo link.
///
/// All of these are recoverable by the operator retrying the connect
/// action; none are fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("invalid peer address: {0}")]
    InvalidAddress(String),

    #[error("a connection attempt is already in progress")]
    Busy,

    #[error("not connected")]
    NotConnected,

    #[error("connect failed: {0}")]
    ConnectFailure(String),

    #[error("write failed: {0}")]
    WriteFailure(String),

    #[error("link worker is no longer running")]
    WorkerGone,
}
