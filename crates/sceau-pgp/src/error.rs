//! Error types for `sceau-pgp`.

use std::io;

use sceau_engine::RawError;
use thiserror::Error;

/// Errors produced by the binding layer.
#[derive(Debug, Error)]
pub enum PgpError {
    /// Failure reported by the engine, with its message.
    #[error("pgp error: {0}")]
    Pgp(String),

    /// A default or already released handle was used.
    #[error("invalid {0} handle")]
    InvalidHandle(&'static str),

    /// The caller broke a local contract (stream state, buffer sizes).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Host-side I/O failure outside an engine callback.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed configuration file.
    #[error("config error: {0}")]
    Config(String),
}

impl PgpError {
    pub(crate) fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Turn the error into an [`io::Error`] for `Read`/`Write` impls.
    pub(crate) fn into_io(self) -> io::Error {
        match self {
            Self::Io(err) => err,
            other => io::Error::other(other),
        }
    }
}

/// Consume an engine error record.
///
/// The message buffer, if any, is copied and handed back to the engine
/// through `pgp_free` exactly once.
pub(crate) fn check(raw: RawError) -> Result<(), PgpError> {
    if raw.is_ok() {
        return Ok(());
    }
    let len = usize::try_from(raw.message_len).unwrap_or(0);
    // SAFETY: a non-null message points to `message_len` bytes owned by the
    // engine until `pgp_free` runs below.
    let message = String::from_utf8_lossy(unsafe { std::slice::from_raw_parts(raw.message, len) }).into_owned();
    // SAFETY: the pointer came from this record and is freed once.
    unsafe { sceau_engine::pgp_free(raw.message) };
    Err(PgpError::Pgp(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_record_is_success() {
        assert!(check(RawError::OK).is_ok());
    }

    #[test]
    fn engine_message_is_surfaced() {
        let mut out = 0;
        // SAFETY: null data with zero length is allowed.
        let raw = unsafe { sceau_engine::pgp_public_key_import(std::ptr::null(), 0, 0, &mut out) };
        let err = check(raw).unwrap_err();
        assert!(matches!(err, PgpError::Pgp(ref msg) if !msg.is_empty()));
    }

    #[test]
    fn io_conversion_keeps_kind() {
        let err = PgpError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(err.into_io().kind(), io::ErrorKind::BrokenPipe);
        let err = PgpError::InvalidHandle("key").into_io();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }
}
