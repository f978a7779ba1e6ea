//! Signing: inline, detached and cleartext.

use std::fmt;
use std::io::{Read, Write};

use crate::bridge::{collect, pump, write_through, SliceWriter};
use crate::context::SigningContext;
use crate::environment::{resolve_time, stream_chunk_size, TimeSource};
use crate::error::PgpError;
use crate::estimate;
use crate::keyring::PgpPrivateKeyRing;
use crate::params::{Encoding, SigningCall};
use crate::streams::PushStream;

/// Where the signature goes relative to the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningMode {
    /// A signed message wrapping the data.
    #[default]
    Inline,
    /// Only the signature; the data travels separately.
    Detached,
}

impl SigningMode {
    const fn is_detached(self) -> bool {
        matches!(self, Self::Detached)
    }
}

/// Signs with one or more private keys.
#[derive(Clone, Default)]
pub struct PgpSigner<'a> {
    keys: PgpPrivateKeyRing<'a>,
    context: Option<&'a SigningContext>,
    time: Option<&'a dyn TimeSource>,
    utf8: bool,
}

impl<'a> PgpSigner<'a> {
    #[must_use]
    pub fn new(keys: impl Into<PgpPrivateKeyRing<'a>>) -> Self {
        Self {
            keys: keys.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: &'a SigningContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Sign as of `time`; the keys must already exist at that time.
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

    fn call(&self) -> Result<SigningCall<'_>, PgpError> {
        Ok(SigningCall {
            signers: self.keys.as_key_ring().raw_handles()?,
            context: self.context.map(|c| c.handle().borrow()).transpose()?,
            time: resolve_time(self.time),
            utf8: self.utf8,
        })
    }

    fn capacity(&self, data_len: usize, encoding: Encoding, mode: SigningMode) -> usize {
        match mode {
            SigningMode::Detached => estimate::signature_len(self.keys.count(), encoding),
            SigningMode::Inline => estimate::message_len(data_len, 0, self.keys.count(), encoding),
        }
    }

    /// Inline-signed message around `data`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] when no key can sign at the signing time.
    pub fn sign(&self, data: &[u8], encoding: Encoding) -> Result<Vec<u8>, PgpError> {
        self.sign_with(data, encoding, SigningMode::Inline)
    }

    /// Detached signature over `data`.
    ///
    /// # Errors
    ///
    /// As [`Self::sign`].
    pub fn sign_detached(&self, data: &[u8], encoding: Encoding) -> Result<Vec<u8>, PgpError> {
        self.sign_with(data, encoding, SigningMode::Detached)
    }

    fn sign_with(&self, data: &[u8], encoding: Encoding, mode: SigningMode) -> Result<Vec<u8>, PgpError> {
        let call = self.call()?;
        let params = call.record();
        tracing::debug!(keys = self.keys.count(), ?encoding, ?mode, "signing buffer");
        collect(self.capacity(data.len(), encoding, mode), |w| {
            // SAFETY: `params` and `data` outlive the call.
            unsafe {
                sceau_engine::pgp_sign(&params, data.as_ptr(), data.len(), encoding.code(), mode.is_detached(), w)
            }
        })
    }

    /// Sign into a caller buffer, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] when `output` is too small.
    pub fn sign_into(
        &self,
        data: &[u8],
        output: &mut [u8],
        encoding: Encoding,
        mode: SigningMode,
    ) -> Result<usize, PgpError> {
        let writer = self.sign_to_writer(data, SliceWriter::new(output), encoding, mode)?;
        Ok(writer.written())
    }

    /// Sign into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::sign`]; a failing writer surfaces as an engine error.
    pub fn sign_to_writer<W: Write>(
        &self,
        data: &[u8],
        writer: W,
        encoding: Encoding,
        mode: SigningMode,
    ) -> Result<W, PgpError> {
        let call = self.call()?;
        let params = call.record();
        write_through(writer, |w| {
            // SAFETY: `params` and `data` outlive the call.
            unsafe {
                sceau_engine::pgp_sign(&params, data.as_ptr(), data.len(), encoding.code(), mode.is_detached(), w)
            }
        })
    }

    /// A stream that signs what is written to it into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::sign`].
    pub fn open_stream<W: Write>(
        &self,
        writer: W,
        encoding: Encoding,
        mode: SigningMode,
    ) -> Result<PushStream<W>, PgpError> {
        let call = self.call()?;
        let params = call.record();
        tracing::debug!(keys = self.keys.count(), ?encoding, ?mode, "opening signing stream");
        PushStream::open(writer, |w, out| {
            // SAFETY: `params` outlives the call; the stream keeps `w` anchored.
            unsafe { sceau_engine::pgp_sign_stream(&params, w, encoding.code(), mode.is_detached(), out) }
        })
    }

    /// Copy `reader` through a signing stream into `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Io`] on a read failure, otherwise as
    /// [`Self::open_stream`].
    pub fn sign_stream<R: Read, W: Write>(
        &self,
        mut reader: R,
        writer: W,
        encoding: Encoding,
        mode: SigningMode,
    ) -> Result<W, PgpError> {
        let mut stream = self.open_stream(writer, encoding, mode)?;
        pump(&mut reader, &mut stream, stream_chunk_size())?;
        stream.finish()
    }

    /// A `-----BEGIN PGP SIGNED MESSAGE-----` block around `text`.
    ///
    /// # Errors
    ///
    /// As [`Self::sign`].
    pub fn sign_cleartext(&self, text: &[u8]) -> Result<Vec<u8>, PgpError> {
        let call = self.call()?;
        let params = call.record();
        let capacity = text
            .len()
            .saturating_add(estimate::signature_len(self.keys.count(), Encoding::AsciiArmor));
        collect(capacity, |w| {
            // SAFETY: `params` and `text` outlive the call.
            unsafe { sceau_engine::pgp_sign_cleartext(&params, text.as_ptr(), text.len(), w) }
        })
    }
}

impl fmt::Debug for PgpSigner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgpSigner")
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
    use crate::environment::FixedTime;
    use crate::key::{KeyGenerationRequest, PgpPrivateKey};
    use crate::keyring::PgpKeyRing;
    use crate::verify::{PgpVerifier, VerificationStatus};

    const CREATED: u64 = 1_600_000_000;

    fn key() -> PgpPrivateKey {
        PgpPrivateKey::generate(&KeyGenerationRequest {
            name: "signer",
            email: "signer@example.org",
            time: Some(&FixedTime::from_unix(CREATED)),
            ..KeyGenerationRequest::default()
        })
        .expect("key generation should succeed")
    }

    #[test]
    fn detached_armored_signature_has_signature_header() {
        let key = key();
        let signature = PgpSigner::new(&key)
            .sign_detached(b"plain text", Encoding::AsciiArmor)
            .expect("signing should succeed");
        assert!(signature.starts_with(b"-----BEGIN PGP SIGNATURE-----"));
    }

    #[test]
    fn no_signing_keys_is_an_engine_error() {
        let result = PgpSigner::default().sign(b"data", Encoding::Binary);
        assert!(matches!(result, Err(PgpError::Pgp(_))));
    }

    #[test]
    fn small_output_buffer_fails() {
        let key = key();
        let mut output = [0u8; 8];
        let result = PgpSigner::new(&key).sign_into(b"data", &mut output, Encoding::Binary, SigningMode::Detached);
        assert!(result.is_err());
    }

    #[test]
    fn stream_and_buffer_signatures_both_verify() {
        let key = key();
        let public = key.to_public().unwrap();
        let signer = PgpSigner::new(&key);
        let streamed = signer
            .sign_stream(&b"streamed"[..], Vec::new(), Encoding::Binary, SigningMode::Inline)
            .expect("stream signing should succeed");
        let (content, result) = PgpVerifier::new(PgpKeyRing::single(&public))
            .verify_inline(&streamed, Encoding::Binary)
            .expect("verification should succeed");
        assert_eq!(content, b"streamed");
        assert_eq!(result.status().unwrap(), VerificationStatus::Ok);
    }

    #[test]
    fn cleartext_round_trip() {
        let key = key();
        let signed = PgpSigner::new(&key).sign_cleartext(b"hello\nworld").unwrap();
        assert!(signed.starts_with(b"-----BEGIN PGP SIGNED MESSAGE-----"));
        let (text, result) = PgpVerifier::new(&*key).verify_cleartext(&signed).unwrap();
        assert_eq!(text, b"hello\nworld");
        assert!(result.status().unwrap().is_ok());
    }
}
