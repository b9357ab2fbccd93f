use std::io;

use thiserror::Error;

use crate::command::PerformanceMode;

/// Errors returned by SCAI protocol operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The firmware method could not be evaluated at all.
    #[error("firmware call failed: {0}")]
    Transport(#[from] io::Error),

    /// The firmware replied with the wrong object type or buffer length.
    #[error("unexpected response shape: {0}")]
    UnexpectedResponseShape(String),

    /// The firmware did not acknowledge the command.
    #[error("command rejected: {0}")]
    CommandRejected(String),

    /// A value outside the feature's accepted range. Nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("performance mode '{0}' is not supported by this device")]
    UnsupportedCapability(PerformanceMode),

    /// The session (or the targeted sub-feature) is not in a state that
    /// accepts commands.
    #[error("not ready: {0}")]
    NotReady(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
