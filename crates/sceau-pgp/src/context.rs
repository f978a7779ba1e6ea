//! Signature contexts.
//!
//! A signing context binds a signature to an application-defined scope. A
//! verification context states which scope is expected and whether a
//! signature without it is acceptable.

use sceau_engine::Handle;

use crate::bridge::collect;
use crate::error::{check, PgpError};
use crate::handle::{HandleKind, OwnedHandle};

/// When a verification context must be present on a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextRequirement {
    /// Signatures without a context still verify.
    #[default]
    Never,
    Always,
    /// Required for signatures created at or after this unix time in
    /// milliseconds.
    After(i64),
}

impl ContextRequirement {
    const fn flags(self) -> (bool, i64) {
        match self {
            Self::Never => (false, 0),
            Self::Always => (true, 0),
            Self::After(millis) => (true, millis),
        }
    }
}

#[derive(Debug)]
pub struct VerificationContext {
    handle: OwnedHandle,
}

impl VerificationContext {
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the value is not valid UTF-8 for the
    /// engine.
    pub fn new(value: &str, requirement: ContextRequirement) -> Result<Self, PgpError> {
        let (required, after) = requirement.flags();
        let handle = OwnedHandle::acquire(HandleKind::VerificationContext, |out| {
            // SAFETY: `value` is valid for its length.
            unsafe { sceau_engine::pgp_verification_context_new(value.as_ptr(), value.len(), required, after, out) }
        })?;
        Ok(Self { handle })
    }

    pub(crate) const fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn value(&self) -> Result<String, PgpError> {
        let raw = self.raw()?;
        let bytes = collect(0, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_verification_context_get_value(raw, w) }
        })?;
        String::from_utf8(bytes).map_err(|e| PgpError::Pgp(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn is_required(&self) -> Result<bool, PgpError> {
        let raw = self.raw()?;
        let mut out = false;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_verification_context_is_required(raw, &mut out) })?;
        Ok(out)
    }

    /// Unix milliseconds from which the context is required; `0` means
    /// always.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn is_required_after(&self) -> Result<i64, PgpError> {
        let raw = self.raw()?;
        let mut out = 0i64;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_verification_context_is_required_after(raw, &mut out) })?;
        Ok(out)
    }

    fn raw(&self) -> Result<Handle, PgpError> {
        Ok(self.handle.borrow()?.dangerous_raw())
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}

#[derive(Debug)]
pub struct SigningContext {
    handle: OwnedHandle,
}

impl SigningContext {
    /// A context stored in the signature; a critical one makes verifiers
    /// without context support reject it.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the engine refuses the value.
    pub fn new(value: &str, critical: bool) -> Result<Self, PgpError> {
        let handle = OwnedHandle::acquire(HandleKind::SigningContext, |out| {
            // SAFETY: `value` is valid for its length.
            unsafe { sceau_engine::pgp_signing_context_new(value.as_ptr(), value.len(), critical, out) }
        })?;
        Ok(Self { handle })
    }

    pub(crate) const fn handle(&self) -> &OwnedHandle {
        &self.handle
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}
