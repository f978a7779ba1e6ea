//! Single-owner wrappers around engine handles.
//!
//! An [`OwnedHandle`] is created from a successful allocation call and
//! releases its engine object exactly once, either through
//! [`OwnedHandle::release`] or on drop. Raw values are only reachable
//! through a [`BorrowedHandle`], whose lifetime keeps the owner from being
//! released while a call is using it.

use std::fmt;
use std::marker::PhantomData;

use sceau_engine::{Handle, RawError, INVALID_HANDLE};

use crate::error::{check, PgpError};

/// Engine object kinds, each with its own destroy entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Key,
    SessionKey,
    Message,
    VerificationContext,
    SigningContext,
    VerificationResult,
    WriteCloser,
    Reader,
    SrpAuth,
    SrpClientHandshake,
    SrpServer,
}

impl HandleKind {
    /// Human-readable name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Key => "key",
            Self::SessionKey => "session key",
            Self::Message => "message",
            Self::VerificationContext => "verification context",
            Self::SigningContext => "signing context",
            Self::VerificationResult => "verification result",
            Self::WriteCloser => "write closer",
            Self::Reader => "reader",
            Self::SrpAuth => "SRP client",
            Self::SrpClientHandshake => "SRP client handshake",
            Self::SrpServer => "SRP server",
        }
    }

    fn destroy(self, raw: Handle) {
        // SAFETY: `raw` is a live handle of this kind owned by the caller,
        // which never uses it again.
        unsafe {
            match self {
                Self::Key => sceau_engine::pgp_key_destroy(raw),
                Self::SessionKey => sceau_engine::pgp_session_key_destroy(raw),
                Self::Message => sceau_engine::pgp_message_destroy(raw),
                Self::VerificationContext => sceau_engine::pgp_verification_context_destroy(raw),
                Self::SigningContext => sceau_engine::pgp_signing_context_destroy(raw),
                Self::VerificationResult => sceau_engine::pgp_verification_result_destroy(raw),
                Self::WriteCloser => sceau_engine::pgp_message_write_closer_destroy(raw),
                Self::Reader => sceau_engine::pgp_reader_destroy(raw),
                Self::SrpAuth => sceau_engine::srp_auth_destroy(raw),
                Self::SrpClientHandshake => sceau_engine::srp_client_handshake_destroy(raw),
                Self::SrpServer => sceau_engine::srp_server_destroy(raw),
            }
        }
    }
}

/// Owner of one engine handle.
///
/// Not `Clone`: two owners never hold the same handle value.
pub struct OwnedHandle {
    raw: Handle,
    kind: HandleKind,
}

impl OwnedHandle {
    /// Run an allocation call and take ownership of the handle it returns.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] when the engine reports a failure or hands
    /// back no handle.
    pub(crate) fn acquire(kind: HandleKind, call: impl FnOnce(*mut Handle) -> RawError) -> Result<Self, PgpError> {
        let mut raw = INVALID_HANDLE;
        check(call(&mut raw))?;
        Self::adopt(kind, raw)
    }

    /// Take ownership of a handle the engine stored in a result record.
    pub(crate) fn adopt(kind: HandleKind, raw: Handle) -> Result<Self, PgpError> {
        if raw == INVALID_HANDLE {
            return Err(PgpError::Pgp(format!("engine returned no {} handle", kind.name())));
        }
        tracing::trace!(kind = kind.name(), "handle acquired");
        Ok(Self { raw, kind })
    }

    /// An owner in the released state; every use fails.
    #[must_use]
    pub const fn invalid(kind: HandleKind) -> Self {
        Self {
            raw: INVALID_HANDLE,
            kind,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> HandleKind {
        self.kind
    }

    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.raw != INVALID_HANDLE
    }

    /// Borrow the handle for one engine call.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] once the handle was released.
    pub fn borrow(&self) -> Result<BorrowedHandle<'_>, PgpError> {
        if self.raw == INVALID_HANDLE {
            return Err(PgpError::InvalidHandle(self.kind.name()));
        }
        Ok(BorrowedHandle {
            raw: self.raw,
            _owner: PhantomData,
        })
    }

    /// Release the engine object. Later calls are no-ops.
    pub fn release(&mut self) {
        let raw = std::mem::replace(&mut self.raw, INVALID_HANDLE);
        if raw != INVALID_HANDLE {
            tracing::trace!(kind = self.kind.name(), "handle released");
            self.kind.destroy(raw);
        }
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("kind", &self.kind)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Non-owning view of a live handle, valid for one call.
#[derive(Clone, Copy)]
pub struct BorrowedHandle<'a> {
    raw: Handle,
    _owner: PhantomData<&'a OwnedHandle>,
}

impl BorrowedHandle<'_> {
    /// The raw value. Must not be stored past the current engine call.
    #[must_use]
    pub const fn dangerous_raw(self) -> Handle {
        self.raw
    }
}

impl fmt::Debug for BorrowedHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BorrowedHandle(..)")
    }
}
