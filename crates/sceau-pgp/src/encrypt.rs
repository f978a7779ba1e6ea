//! Encryption in buffer, stream and split shapes.

use std::fmt;
use std::io::{self, Read, Write};

use sceau_engine::RawWriter;

use crate::bridge::{pump, SliceWriter, WriteAnchor};
use crate::context::SigningContext;
use crate::environment::{resolve_time, stream_chunk_size, TimeSource};
use crate::error::{check, PgpError};
use crate::estimate;
use crate::keyring::PgpPrivateKeyRing;
use crate::params::{Compression, EncryptionCall, EncryptionState, Encoding};
use crate::secrets::EncryptionSecrets;
use crate::streams::EncryptingStream;

fn writer_ptr(writer: Option<&RawWriter>) -> *const RawWriter {
    writer.map_or(std::ptr::null(), std::ptr::from_ref)
}

/// Encrypts to public keys, a session key or a password, optionally
/// signing in the same pass.
#[derive(Clone)]
pub struct PgpEncrypter<'a> {
    secrets: EncryptionSecrets<'a>,
    signers: PgpPrivateKeyRing<'a>,
    signing_context: Option<&'a SigningContext>,
    time: Option<&'a dyn TimeSource>,
    utf8: bool,
    compression: Compression,
}

impl<'a> PgpEncrypter<'a> {
    #[must_use]
    pub fn new(secrets: impl Into<EncryptionSecrets<'a>>) -> Self {
        Self {
            secrets: secrets.into(),
            signers: PgpPrivateKeyRing::empty(),
            signing_context: None,
            time: None,
            utf8: false,
            compression: Compression::None,
        }
    }

    /// Also sign with these keys.
    #[must_use]
    pub fn with_signing_keys(mut self, signers: impl Into<PgpPrivateKeyRing<'a>>) -> Self {
        self.signers = signers.into();
        self
    }

    #[must_use]
    pub fn with_signing_context(mut self, context: &'a SigningContext) -> Self {
        self.signing_context = Some(context);
        self
    }

    /// Encrypt and sign as of `time`.
    #[must_use]
    pub fn with_time(mut self, time: &'a dyn TimeSource) -> Self {
        self.time = Some(time);
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    fn call(&self, detached_signature: Option<EncryptionState>) -> Result<EncryptionCall<'_>, PgpError> {
        let secrets = self.secrets.view();
        Ok(EncryptionCall {
            recipients: secrets.key_ring.raw_handles()?,
            signers: self.signers.as_key_ring().raw_handles()?,
            session_key: secrets.session_key.map(|s| s.handle().borrow()).transpose()?,
            signing_context: self.signing_context.map(|c| c.handle().borrow()).transpose()?,
            password: secrets.password,
            time: resolve_time(self.time),
            detached_signature,
            utf8: self.utf8,
            compression: self.compression,
        })
    }

    fn capacity(&self, plaintext_len: usize, encoding: Encoding) -> usize {
        let recipients = self.secrets.view().key_ring.count();
        estimate::message_len(plaintext_len, recipients, self.signers.count(), encoding)
    }

    /// Encrypt `data` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Pgp`] if no recipient, session key or password
    /// was given, or a key is unusable at the encryption time.
    pub fn encrypt(&self, data: &[u8], encoding: Encoding) -> Result<Vec<u8>, PgpError> {
        let capacity = self.capacity(data.len(), encoding);
        self.encrypt_to_writer(data, Vec::with_capacity(capacity), encoding)
    }

    /// Encrypt into a caller buffer, returning the bytes written.
    ///
    /// # Errors
    ///
    /// As [`Self::encrypt`]; also fails when `output` is too small.
    pub fn encrypt_into(&self, data: &[u8], output: &mut [u8], encoding: Encoding) -> Result<usize, PgpError> {
        let writer = self.encrypt_to_writer(data, SliceWriter::new(output), encoding)?;
        Ok(writer.written())
    }

    /// Encrypt into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::encrypt`].
    pub fn encrypt_to_writer<W: Write>(&self, data: &[u8], writer: W, encoding: Encoding) -> Result<W, PgpError> {
        let call = self.call(None)?;
        let params = call.record();
        tracing::debug!(
            recipients = call.recipients.len(),
            signers = call.signers.len(),
            ?encoding,
            "encrypting buffer"
        );
        let output = WriteAnchor::new(writer);
        // SAFETY: `params`, `data` and the anchor outlive the call.
        check(unsafe {
            sceau_engine::pgp_encrypt(
                &params,
                data.as_ptr(),
                data.len(),
                encoding.code(),
                std::ptr::null(),
                output.raw(),
            )
        })?;
        Ok(output.into_inner())
    }

    /// Encrypt `data` and return the message and a separate signature.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidOperation`] without signing keys, otherwise
    /// as [`Self::encrypt`].
    pub fn encrypt_detached(
        &self,
        data: &[u8],
        encoding: Encoding,
        signature_state: EncryptionState,
    ) -> Result<(Vec<u8>, Vec<u8>), PgpError> {
        if self.signers.is_empty() {
            return Err(PgpError::invalid_operation("a detached signature needs signing keys"));
        }
        let call = self.call(Some(signature_state))?;
        let params = call.record();
        let output = WriteAnchor::new(Vec::with_capacity(self.capacity(data.len(), encoding)));
        let signature = WriteAnchor::new(Vec::with_capacity(estimate::signature_len(self.signers.count(), encoding)));
        let raw_signature = signature.raw();
        // SAFETY: `params`, `data`, `raw_signature` and both anchors outlive
        // the call.
        check(unsafe {
            sceau_engine::pgp_encrypt(
                &params,
                data.as_ptr(),
                data.len(),
                encoding.code(),
                &raw_signature,
                output.raw(),
            )
        })?;
        Ok((output.into_inner(), signature.into_inner()))
    }

    /// A stream that encrypts what is written to it into `writer`.
    ///
    /// # Errors
    ///
    /// As [`Self::encrypt`].
    pub fn open_stream<W: Write>(&self, writer: W, encoding: Encoding) -> Result<EncryptingStream<W>, PgpError> {
        self.open_stream_inner(writer, None::<io::Sink>, None, encoding)
    }

    /// As [`Self::open_stream`], writing a detached signature into
    /// `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidOperation`] without signing keys.
    pub fn open_stream_with_signature<W: Write, S: Write>(
        &self,
        writer: W,
        signature: S,
        signature_state: EncryptionState,
        encoding: Encoding,
    ) -> Result<EncryptingStream<W, S>, PgpError> {
        if self.signers.is_empty() {
            return Err(PgpError::invalid_operation("a detached signature needs signing keys"));
        }
        self.open_stream_inner(writer, Some(signature), Some(signature_state), encoding)
    }

    fn open_stream_inner<W: Write, S: Write>(
        &self,
        writer: W,
        signature: Option<S>,
        signature_state: Option<EncryptionState>,
        encoding: Encoding,
    ) -> Result<EncryptingStream<W, S>, PgpError> {
        let call = self.call(signature_state)?;
        let params = call.record();
        tracing::debug!(recipients = call.recipients.len(), ?encoding, "opening encryption stream");
        EncryptingStream::open(writer, signature, |w, sig, out| {
            // SAFETY: `params` outlives the call; the stream keeps every
            // writer anchored while the engine object lives.
            unsafe { sceau_engine::pgp_encrypt_stream(&params, w, writer_ptr(sig), encoding.code(), out) }
        })
    }

    /// A stream writing key packets and the data packet to separate sinks.
    ///
    /// Output is always binary.
    ///
    /// # Errors
    ///
    /// As [`Self::encrypt`].
    pub fn open_split_stream<D: Write, K: Write>(
        &self,
        data_packet: D,
        key_packets: K,
    ) -> Result<EncryptingStream<D, io::Sink, K>, PgpError> {
        self.open_split_inner(data_packet, None::<io::Sink>, None, key_packets)
    }

    /// As [`Self::open_split_stream`], with a third sink for a detached
    /// signature.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidOperation`] without signing keys.
    pub fn open_split_stream_with_signature<D: Write, S: Write, K: Write>(
        &self,
        data_packet: D,
        signature: S,
        signature_state: EncryptionState,
        key_packets: K,
    ) -> Result<EncryptingStream<D, S, K>, PgpError> {
        if self.signers.is_empty() {
            return Err(PgpError::invalid_operation("a detached signature needs signing keys"));
        }
        self.open_split_inner(data_packet, Some(signature), Some(signature_state), key_packets)
    }

    fn open_split_inner<D: Write, S: Write, K: Write>(
        &self,
        data_packet: D,
        signature: Option<S>,
        signature_state: Option<EncryptionState>,
        key_packets: K,
    ) -> Result<EncryptingStream<D, S, K>, PgpError> {
        let call = self.call(signature_state)?;
        let params = call.record();
        tracing::debug!(recipients = call.recipients.len(), "opening split encryption stream");
        EncryptingStream::open_split(data_packet, signature, key_packets, |w, sig, keys, out| {
            // SAFETY: as in `open_stream_inner`.
            unsafe { sceau_engine::pgp_encrypt_stream_split(&params, w, writer_ptr(sig), keys, out) }
        })
    }

    /// Copy `reader` through an encryption stream into `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::Io`] on a read failure, otherwise as
    /// [`Self::encrypt`].
    pub fn encrypt_stream<R: Read, W: Write>(&self, mut reader: R, writer: W, encoding: Encoding) -> Result<W, PgpError> {
        let mut stream = self.open_stream(writer, encoding)?;
        pump(&mut reader, &mut stream, stream_chunk_size())?;
        Ok(stream.finish()?.message)
    }
}

impl fmt::Debug for PgpEncrypter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgpEncrypter")
            .field("secrets", &self.secrets)
            .field("signers", &self.signers)
            .field("compression", &self.compression)
            .field("time_override", &self.time.is_some())
            .finish_non_exhaustive()
    }
}
