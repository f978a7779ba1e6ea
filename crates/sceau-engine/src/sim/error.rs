//! Error type of the simulated engine.

use std::io;

use thiserror::Error;

use crate::abi::Handle;

/// Failures raised inside the simulated engine.
///
/// Rendered into the owned [`RawError`](crate::abi::RawError) message at the
/// boundary; callers only ever see the text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The handle is unknown or was already destroyed.
    #[error("invalid handle {0:#x}")]
    InvalidHandle(Handle),

    /// The handle is live but refers to another kind of object.
    #[error("handle {handle:#x} does not refer to a {expected}")]
    WrongHandleType {
        handle: Handle,
        expected: &'static str,
    },

    /// A required argument was missing or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Input bytes do not follow the expected layout.
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Key unusable for the requested operation.
    #[error("key error: {0}")]
    Key(String),

    /// Sealing, opening, or signing failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A host callback reported a failure.
    #[error("i/o error: {0}")]
    Io(io::Error),

    /// A panic was caught at the boundary.
    #[error("engine panic")]
    Panic,
}

impl EngineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub(crate) fn key(msg: impl Into<String>) -> Self {
        Self::Key(msg.into())
    }

    pub(crate) fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }

    /// Wrap into an `io::Error` so it can travel through `Read`/`Write`.
    pub(crate) fn into_io(self) -> io::Error {
        io::Error::other(self)
    }
}

// Engine errors raised inside a `Read`/`Write` layer come back out unchanged.
impl From<io::Error> for EngineError {
    fn from(err: io::Error) -> Self {
        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<Self>())
        {
            if let Some(inner) = err.into_inner() {
                return match inner.downcast::<Self>() {
                    Ok(engine) => *engine,
                    Err(other) => Self::Io(io::Error::other(other)),
                };
            }
            return Self::Io(io::Error::other("unknown i/o failure"));
        }
        Self::Io(err)
    }
}
