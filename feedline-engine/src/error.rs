//! Engine-level errors. None of these can occur on the render path.

use core::fmt;

use feedline_core::BlockError;

/// Everything that can go wrong while configuring a session or posting to it.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A delivered sample block was refused at the boundary.
    Block(BlockError),
    /// `RenderConfig::validate` failed.
    Config(String),
    /// The synth worker thread could not be started.
    Worker(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Block(e) => write!(f, "rejected sample block: {e}"),
            Error::Config(msg) => write!(f, "invalid render config: {msg}"),
            Error::Worker(msg) => write!(f, "synth worker: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Block(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BlockError> for Error {
    fn from(e: BlockError) -> Self {
        Error::Block(e)
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
