//! Decryption, with optional signature verification.

use std::fmt;
use std::io::{Read, Write};

use crate::bridge::SliceWriter;
use crate::context::VerificationContext;
use crate::environment::{resolve_time, TimeSource};
use crate::error::PgpError;
use crate::estimate;
use crate::keyring::PgpKeyRing;
use crate::params::{DecryptionCall, DetachedSignature, Encoding};
use crate::secrets::DecryptionSecrets;
use crate::streams::PullStream;
use crate::verify::{run_with_plaintext, VerificationResult};

/// Decrypts with private keys, a session key or a password.
///
/// A verification result is only produced when verification keys are set.
#[derive(Clone)]
pub struct PgpDecrypter<'a> {
    secrets: DecryptionSecrets<'a>,
    verification_keys: PgpKeyRing<'a>,
    context: Option<&'a VerificationContext>,
    detached: Option<DetachedSignature<'a>>,
    time: Option<&'a dyn TimeSource>,
    utf8: bool,
}

impl<'a> PgpDecrypter<'a> {
    #[must_use]
    pub fn new(secrets: impl Into<DecryptionSecrets<'a>>) -> Self {
        Self {
            secrets: secrets.into(),
            verification_keys: PgpKeyRing::empty(),
            context: None,
            detached: None,
            time: None,
            utf8: false,
        }
    }

    /// Verify signatures against these keys.
    #[must_use]
    pub fn with_verification_keys(mut self, keys: impl Into<PgpKeyRing<'a>>) -> Self {
        self.verification_keys = keys.into();
        self
    }

    #[must_use]
    pub fn with_verification_context(mut self, context: &'a VerificationContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Check this detached signature instead of an embedded one.
    #[must_use]
    pub fn with_detached_signature(mut self, signature: DetachedSignature<'a>) -> Self {
        self.detached = Some(signature);
        self
    }

    #[must_use]
    pub fn with_time(mut self, time: &'a dyn TimeSource) -> Self {
        self.time = Some(time);
        self
    }

    #[must_use]
    pub fn utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    fn call(&self) -> Result<DecryptionCall<'_>, PgpError> {
        let secrets = self.secrets.view();
        Ok(DecryptionCall {
            decryption_keys: secrets.key_ring.raw_handles()?,
            verification_keys: self.verification_keys.raw_handles()?,
            session_key: secrets.session_key.map(|s| s.handle().borrow()).transpose()?,
            verification_context: self.context.map(|c| c.handle().borrow()).transpose()?,
            password: secrets.password,
            time: resolve_time(self.time),
            utf8: self.utf8,
            detached: self.detached,
        })
    }

    /// Decrypt `message` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if no secret opens the message or the
    /// message is corrupt.
    pub fn decrypt(
        &self,
        message: &[u8],
        encoding: Encoding,
    ) -> Result<(Vec<u8>, Option<VerificationResult>), PgpError> {
        let capacity = estimate::plaintext_len(message.len(), encoding);
        self.decrypt_to_writer(message, Vec::with_capacity(capacity), encoding)
    }

    /// Decrypt into a caller buffer, returning the bytes written.
    ///
    /// # Errors
    ///
    /// As [`Self::decrypt`]; also fails when `output` is too small.
    pub fn decrypt_into(
        &self,
        message: &[u8],
        output: &mut [u8],
        encoding: Encoding,
    ) -> Result<(usize, Option<VerificationResult>), PgpError> {
        let (writer, result) = self.decrypt_to_writer(message, SliceWriter::new(output), encoding)?;
        Ok((writer.written(), result))
    }

    /// Decrypt into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::decrypt`].
    pub fn decrypt_to_writer<W: Write>(
        &self,
        message: &[u8],
        writer: W,
        encoding: Encoding,
    ) -> Result<(W, Option<VerificationResult>), PgpError> {
        let call = self.call()?;
        let params = call.record();
        tracing::debug!(
            keys = call.decryption_keys.len(),
            verifying = !self.verification_keys.is_empty(),
            ?encoding,
            "decrypting buffer"
        );
        run_with_plaintext(writer, |result| {
            // SAFETY: `params`, `message` and the result record outlive the call.
            unsafe { sceau_engine::pgp_decrypt(&params, message.as_ptr(), message.len(), encoding.code(), result) }
        })
    }

    /// Stream the plaintext of the message read from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if the message header cannot be opened.
    pub fn open_stream<R: Read>(&self, reader: R, encoding: Encoding) -> Result<PullStream<R>, PgpError> {
        let call = self.call()?;
        let params = call.record();
        let verifies = !self.verification_keys.is_empty();
        tracing::debug!(verifying = verifies, ?encoding, "opening decryption stream");
        PullStream::open(reader, verifies, |raw, out| {
            // SAFETY: `params` outlives the call; the stream keeps the reader
            // anchored while the engine reader lives.
            unsafe { sceau_engine::pgp_decrypt_stream(&params, raw, encoding.code(), out) }
        })
    }
}

impl fmt::Debug for PgpDecrypter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgpDecrypter")
            .field("secrets", &self.secrets)
            .field("verification_keys", &self.verification_keys)
            .field("detached_signature", &self.detached.is_some())
            .field("time_override", &self.time.is_some())
            .finish_non_exhaustive()
    }
}
