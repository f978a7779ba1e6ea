//! Signature verification and verification results.

use std::ffi::c_int;
use std::fmt;
use std::io::{Read, Write};

use sceau_engine::abi::status;
use sceau_engine::{Handle, PlaintextResult, RawError, SignatureDetailsRecord, INVALID_HANDLE};

use crate::bridge::{collect, WriteAnchor};
use crate::context::VerificationContext;
use crate::environment::{resolve_time, TimeSource};
use crate::error::{check, PgpError};
use crate::handle::{HandleKind, OwnedHandle};
use crate::keyring::PgpKeyRing;
use crate::params::{Encoding, VerificationCall};
use crate::streams::PullStream;

/// Outcome of a verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Ok,
    /// No signature was present.
    NotSigned,
    /// Signed, but by none of the verification keys.
    NoVerifier,
    Failed,
    /// The signature context does not satisfy the verification context.
    BadContext,
}

impl VerificationStatus {
    fn from_code(code: c_int) -> Result<Self, PgpError> {
        match code {
            status::OK => Ok(Self::Ok),
            status::NOT_SIGNED => Ok(Self::NotSigned),
            status::NO_VERIFIER => Ok(Self::NoVerifier),
            status::FAILED => Ok(Self::Failed),
            status::BAD_CONTEXT => Ok(Self::BadContext),
            other => Err(PgpError::Pgp(format!("unknown verification status {other}"))),
        }
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "ok",
            Self::NotSigned => "not signed",
            Self::NoVerifier => "no verifier",
            Self::Failed => "failed",
            Self::BadContext => "bad context",
        })
    }
}

/// One signature found in a verified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureDetails {
    pub key_id: u64,
    /// Unix seconds.
    pub creation_time: i64,
    pub status: VerificationStatus,
}

/// Engine-side verification result.
#[derive(Debug)]
pub struct VerificationResult {
    handle: OwnedHandle,
}

impl VerificationResult {
    pub(crate) fn acquire(call: impl FnOnce(*mut Handle) -> RawError) -> Result<Self, PgpError> {
        Ok(Self {
            handle: OwnedHandle::acquire(HandleKind::VerificationResult, call)?,
        })
    }

    fn adopt(raw: Handle) -> Result<Self, PgpError> {
        Ok(Self {
            handle: OwnedHandle::adopt(HandleKind::VerificationResult, raw)?,
        })
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn status(&self) -> Result<VerificationStatus, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut code: c_int = 0;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_verification_result_status(raw, &mut code) })?;
        VerificationStatus::from_code(code)
    }

    /// Why verification did not succeed, if the engine said.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn error_message(&self) -> Result<Option<String>, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let bytes = collect(0, |w| {
            // SAFETY: live handle, anchored writer.
            unsafe { sceau_engine::pgp_verification_result_error(raw, w) }
        })?;
        Ok((!bytes.is_empty()).then(|| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn signature_count(&self) -> Result<usize, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut count = 0usize;
        // SAFETY: live handle, valid out-pointer.
        check(unsafe { sceau_engine::pgp_verification_result_signature_count(raw, &mut count) })?;
        Ok(count)
    }

    /// Every signature the engine evaluated, in message order.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] after release.
    pub fn signatures(&self) -> Result<Vec<SignatureDetails>, PgpError> {
        let raw = self.handle.borrow()?.dangerous_raw();
        (0..self.signature_count()?)
            .map(|index| {
                let mut record = SignatureDetailsRecord {
                    key_id: 0,
                    creation_time: 0,
                    status: status::FAILED,
                };
                // SAFETY: live handle, valid out-pointer.
                check(unsafe { sceau_engine::pgp_verification_result_signature_details(raw, index, &mut record) })?;
                Ok(SignatureDetails {
                    key_id: record.key_id,
                    creation_time: record.creation_time,
                    status: VerificationStatus::from_code(record.status)?,
                })
            })
            .collect()
    }

    pub fn release(&mut self) {
        self.handle.release();
    }
}

/// Run a call that fills a [`PlaintextResult`], returning the writer and
/// the verification result if the engine produced one.
pub(crate) fn run_with_plaintext<W: Write>(
    writer: W,
    call: impl FnOnce(*mut PlaintextResult) -> RawError,
) -> Result<(W, Option<VerificationResult>), PgpError> {
    let anchor = WriteAnchor::new(writer);
    let mut result = PlaintextResult {
        has_verification_result: false,
        verification_result: INVALID_HANDLE,
        writer: anchor.raw(),
    };
    check(call(&mut result))?;
    let verification = if result.has_verification_result {
        Some(VerificationResult::adopt(result.verification_result)?)
    } else {
        None
    };
    Ok((anchor.into_inner(), verification))
}

fn required(result: Option<VerificationResult>) -> Result<VerificationResult, PgpError> {
    result.ok_or_else(|| PgpError::invalid_operation("engine produced no verification result"))
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies signatures against a ring of public keys.
///
/// ```no_run
/// # use sceau_pgp::{Encoding, PgpKey, PgpKeyRing, PgpVerifier};
/// # fn run(key: &PgpKey, data: &[u8], signature: &[u8]) -> Result<(), sceau_pgp::PgpError> {
/// let result = PgpVerifier::new(PgpKeyRing::single(key)).verify_detached(data, signature, Encoding::AsciiArmor)?;
/// assert!(result.status()?.is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct PgpVerifier<'a> {
    keys: PgpKeyRing<'a>,
    context: Option<&'a VerificationContext>,
    time: Option<&'a dyn TimeSource>,
    utf8: bool,
}

impl<'a> PgpVerifier<'a> {
    #[must_use]
    pub fn new(keys: impl Into<PgpKeyRing<'a>>) -> Self {
        Self {
            keys: keys.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: &'a VerificationContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Verify as of `time` instead of the default override or engine clock.
    #[must_use]
    pub fn with_time(mut self, time: &'a dyn TimeSource) -> Self {
        self.time = Some(time);
        self
    }

    /// Treat signed data as UTF-8 text.
    #[must_use]
    pub fn utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    fn call(&self) -> Result<VerificationCall<'_>, PgpError> {
        Ok(VerificationCall {
            keys: self.keys.raw_handles()?,
            context: self.context.map(|c| c.handle().borrow()).transpose()?,
            time: resolve_time(self.time),
            utf8: self.utf8,
        })
    }

    /// Verify a detached `signature` over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the signature cannot be parsed. A
    /// signature that does not verify is reported through the status.
    pub fn verify_detached(
        &self,
        data: &[u8],
        signature: &[u8],
        signature_encoding: Encoding,
    ) -> Result<VerificationResult, PgpError> {
        let call = self.call()?;
        let params = call.record();
        tracing::debug!(keys = self.keys.count(), encoding = ?signature_encoding, "verifying detached signature");
        VerificationResult::acquire(|out| {
            // SAFETY: `params`, `data` and `signature` outlive the call.
            unsafe {
                sceau_engine::pgp_verify_detached(
                    &params,
                    data.as_ptr(),
                    data.len(),
                    signature.as_ptr(),
                    signature.len(),
                    signature_encoding.code(),
                    out,
                )
            }
        })
    }

    /// As [`Self::verify_detached`], reading the data from `reader`.
    ///
    /// # Errors
    ///
    /// As [`Self::verify_detached`]; a failing reader aborts the call with
    /// an engine error.
    pub fn verify_detached_stream<R: Read>(
        &self,
        reader: R,
        signature: &[u8],
        signature_encoding: Encoding,
    ) -> Result<VerificationResult, PgpError> {
        let call = self.call()?;
        let params = call.record();
        let input = crate::bridge::ReadAnchor::new(reader);
        VerificationResult::acquire(|out| {
            // SAFETY: `params`, `signature` and the anchor outlive the call.
            unsafe {
                sceau_engine::pgp_verify_detached_stream(
                    &params,
                    input.raw(),
                    signature.as_ptr(),
                    signature.len(),
                    signature_encoding.code(),
                    out,
                )
            }
        })
    }

    /// Verify an inline-signed message and recover its content.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the message cannot be parsed.
    pub fn verify_inline(&self, message: &[u8], encoding: Encoding) -> Result<(Vec<u8>, VerificationResult), PgpError> {
        self.verify_inline_to(message, encoding, Vec::with_capacity(crate::estimate::plaintext_len(message.len(), encoding)))
    }

    /// As [`Self::verify_inline`], writing the content into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::verify_inline`].
    pub fn verify_inline_to<W: Write>(
        &self,
        message: &[u8],
        encoding: Encoding,
        writer: W,
    ) -> Result<(W, VerificationResult), PgpError> {
        let call = self.call()?;
        let params = call.record();
        let (writer, result) = run_with_plaintext(writer, |result| {
            // SAFETY: `params`, `message` and the result record outlive the call.
            unsafe { sceau_engine::pgp_verify_inline(&params, message.as_ptr(), message.len(), encoding.code(), result) }
        })?;
        Ok((writer, required(result)?))
    }

    /// Stream the content of an inline-signed message out of `reader`.
    ///
    /// The result is available from [`PullStream::verification_result`]
    /// once the stream has been read to the end.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidHandle`] if a key was released.
    pub fn open_inline_stream<R: Read>(&self, reader: R, encoding: Encoding) -> Result<PullStream<R>, PgpError> {
        let call = self.call()?;
        let params = call.record();
        PullStream::open(reader, true, |raw, out| {
            // SAFETY: `params` outlives the call; the stream keeps the reader
            // anchored for as long as the engine reader lives.
            unsafe { sceau_engine::pgp_verify_inline_stream(&params, raw, encoding.code(), out) }
        })
    }

    /// Verify a cleartext-signed message, returning its text.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if `message` is not a cleartext-signed block.
    pub fn verify_cleartext(&self, message: &[u8]) -> Result<(Vec<u8>, VerificationResult), PgpError> {
        let call = self.call()?;
        let params = call.record();
        let (text, result) = run_with_plaintext(Vec::with_capacity(message.len()), |result| {
            // SAFETY: `params`, `message` and the result record outlive the call.
            unsafe { sceau_engine::pgp_verify_cleartext(&params, message.as_ptr(), message.len(), result) }
        })?;
        Ok((text, required(result)?))
    }
}

impl fmt::Debug for PgpVerifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgpVerifier")
            .field("keys", &self.keys)
            .field("context", &self.context.is_some())
            .field("time_override", &self.time.is_some())
            .field("utf8", &self.utf8)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map() {
        assert_eq!(VerificationStatus::from_code(status::OK).unwrap(), VerificationStatus::Ok);
        assert_eq!(
            VerificationStatus::from_code(status::BAD_CONTEXT).unwrap(),
            VerificationStatus::BadContext
        );
        assert!(VerificationStatus::from_code(99).is_err());
        assert_eq!(VerificationStatus::NoVerifier.to_string(), "no verifier");
    }

    #[test]
    fn empty_detached_signature_is_an_engine_error() {
        let verifier = PgpVerifier::default();
        let result = verifier.verify_detached(b"data", b"", Encoding::Binary);
        assert!(matches!(result, Err(PgpError::Pgp(_))));
    }
}
