//! Push and pull stream types wrapping engine write-closers and readers.
//!
//! Each stream owns the engine handle and the anchors it writes to or
//! reads from. Fields are declared handle first so the engine object is
//! destroyed before any anchor it points at.

use std::fmt;
use std::io::{self, Read, Write};

use sceau_engine::{Handle, RawError, RawReader, RawWriter};

use crate::bridge::{ReadAnchor, WriteAnchor};
use crate::error::{check, PgpError};
use crate::handle::{HandleKind, OwnedHandle};
use crate::verify::VerificationResult;

// ---------------------------------------------------------------------------
// Write-closer core
// ---------------------------------------------------------------------------

struct WriteCloser {
    handle: OwnedHandle,
    closed: bool,
}

impl WriteCloser {
    fn acquire(call: impl FnOnce(*mut Handle) -> RawError) -> Result<Self, PgpError> {
        Ok(Self {
            handle: OwnedHandle::acquire(HandleKind::WriteCloser, call)?,
            closed: false,
        })
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, PgpError> {
        if self.closed {
            return Err(PgpError::invalid_operation("write after close"));
        }
        let raw = self.handle.borrow()?.dangerous_raw();
        let mut written = 0usize;
        // SAFETY: live handle; `data` is valid for its length.
        check(unsafe { sceau_engine::pgp_message_write_closer_write(raw, data.as_ptr(), data.len(), &mut written) })?;
        Ok(written)
    }

    /// Writes the trailer once; later calls do nothing.
    fn close(&mut self) -> Result<(), PgpError> {
        if self.closed {
            return Ok(());
        }
        let raw = self.handle.borrow()?.dangerous_raw();
        // SAFETY: live handle.
        check(unsafe { sceau_engine::pgp_message_write_closer_close(raw) })?;
        self.closed = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Push stream
// ---------------------------------------------------------------------------

/// Plaintext goes in through [`Write`]; the transformed bytes land in `W`.
///
/// [`PushStream::close`] must run before the output is complete.
pub struct PushStream<W: Write> {
    closer: WriteCloser,
    output: WriteAnchor<W>,
}

impl<W: Write> PushStream<W> {
    pub(crate) fn open(output: W, call: impl FnOnce(RawWriter, *mut Handle) -> RawError) -> Result<Self, PgpError> {
        let output = WriteAnchor::new(output);
        let raw = output.raw();
        let closer = WriteCloser::acquire(|out| call(raw, out))?;
        Ok(Self { closer, output })
    }

    /// Finalize the output. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the engine failure, e.g. when the output writer failed.
    pub fn close(&mut self) -> Result<(), PgpError> {
        self.closer.close()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closer.closed
    }

    /// Close and hand back the output writer.
    ///
    /// # Errors
    ///
    /// As [`Self::close`].
    pub fn finish(mut self) -> Result<W, PgpError> {
        self.close()?;
        let Self { closer, output } = self;
        drop(closer);
        Ok(output.into_inner())
    }
}

impl<W: Write> Write for PushStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.closer.write(buf).map_err(PgpError::into_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> fmt::Debug for PushStream<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushStream").field("closed", &self.closer.closed).finish()
    }
}

// ---------------------------------------------------------------------------
// Encrypting stream
// ---------------------------------------------------------------------------

/// Sinks handed back by [`EncryptingStream::finish`].
#[derive(Debug)]
pub struct EncryptedOutput<W, S, K> {
    /// The message, or only the data packet for split streams.
    pub message: W,
    pub signature: Option<S>,
    pub key_packets: Option<K>,
}

/// Push stream for encryption, with optional detached signature and key
/// packet sinks.
pub struct EncryptingStream<W: Write, S: Write = io::Sink, K: Write = io::Sink> {
    closer: WriteCloser,
    output: WriteAnchor<W>,
    signature: Option<WriteAnchor<S>>,
    key_packets: Option<WriteAnchor<K>>,
}

impl<W: Write, S: Write> EncryptingStream<W, S> {
    pub(crate) fn open(
        output: W,
        signature: Option<S>,
        call: impl FnOnce(RawWriter, Option<&RawWriter>, *mut Handle) -> RawError,
    ) -> Result<Self, PgpError> {
        let output = WriteAnchor::new(output);
        let signature = signature.map(WriteAnchor::new);
        let raw_output = output.raw();
        let raw_signature = signature.as_ref().map(WriteAnchor::raw);
        let closer = WriteCloser::acquire(|out| call(raw_output, raw_signature.as_ref(), out))?;
        Ok(Self {
            closer,
            output,
            signature,
            key_packets: None,
        })
    }
}

impl<W: Write, S: Write, K: Write> EncryptingStream<W, S, K> {
    pub(crate) fn open_split(
        output: W,
        signature: Option<S>,
        key_packets: K,
        call: impl FnOnce(RawWriter, Option<&RawWriter>, RawWriter, *mut Handle) -> RawError,
    ) -> Result<Self, PgpError> {
        let output = WriteAnchor::new(output);
        let signature = signature.map(WriteAnchor::new);
        let key_packets = WriteAnchor::new(key_packets);
        let raw_output = output.raw();
        let raw_signature = signature.as_ref().map(WriteAnchor::raw);
        let raw_keys = key_packets.raw();
        let closer = WriteCloser::acquire(|out| call(raw_output, raw_signature.as_ref(), raw_keys, out))?;
        Ok(Self {
            closer,
            output,
            signature,
            key_packets: Some(key_packets),
        })
    }

    /// Write the trailers. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the engine failure.
    pub fn close(&mut self) -> Result<(), PgpError> {
        self.closer.close()
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closer.closed
    }

    /// Close and hand back every sink.
    ///
    /// # Errors
    ///
    /// As [`Self::close`].
    pub fn finish(mut self) -> Result<EncryptedOutput<W, S, K>, PgpError> {
        self.close()?;
        let Self {
            closer,
            output,
            signature,
            key_packets,
        } = self;
        drop(closer);
        Ok(EncryptedOutput {
            message: output.into_inner(),
            signature: signature.map(WriteAnchor::into_inner),
            key_packets: key_packets.map(WriteAnchor::into_inner),
        })
    }
}

impl<W: Write, S: Write, K: Write> Write for EncryptingStream<W, S, K> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.closer.write(buf).map_err(PgpError::into_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write, S: Write, K: Write> fmt::Debug for EncryptingStream<W, S, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptingStream")
            .field("closed", &self.closer.closed)
            .field("detached_signature", &self.signature.is_some())
            .field("split", &self.key_packets.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Pull stream
// ---------------------------------------------------------------------------

/// Transformed bytes come out through [`Read`]; the engine pulls its input
/// from `R`.
pub struct PullStream<R: Read> {
    handle: OwnedHandle,
    input: ReadAnchor<R>,
    eof: bool,
    verifies: bool,
}

impl<R: Read> PullStream<R> {
    pub(crate) fn open(
        input: R,
        verifies: bool,
        call: impl FnOnce(RawReader, *mut Handle) -> RawError,
    ) -> Result<Self, PgpError> {
        let input = ReadAnchor::new(input);
        let raw = input.raw();
        let handle = OwnedHandle::acquire(HandleKind::Reader, |out| call(raw, out))?;
        Ok(Self {
            handle,
            input,
            eof: false,
            verifies,
        })
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    /// The verification result, once the stream was read to the end.
    ///
    /// # Errors
    ///
    /// Returns [`PgpError::InvalidOperation`] before end of stream or when
    /// the stream was opened without verification keys.
    pub fn verification_result(&self) -> Result<VerificationResult, PgpError> {
        if !self.verifies {
            return Err(PgpError::invalid_operation("this stream does not verify signatures"));
        }
        if !self.eof {
            return Err(PgpError::invalid_operation(
                "verification result requested before the end of the stream",
            ));
        }
        let raw = self.handle.borrow()?.dangerous_raw();
        VerificationResult::acquire(|out| {
            // SAFETY: live reader handle, valid out-pointer.
            unsafe { sceau_engine::pgp_verification_reader_get_verify_result(raw, out) }
        })
    }

    /// Drop the engine reader and return the input.
    pub fn into_inner(self) -> R {
        let Self { handle, input, .. } = self;
        drop(handle);
        input.into_inner()
    }
}

impl<R: Read> Read for PullStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.eof || buf.is_empty() {
            return Ok(0);
        }
        let raw = self.handle.borrow().map_err(PgpError::into_io)?.dangerous_raw();
        let mut produced = 0usize;
        // SAFETY: live handle; `buf` is writable for its length.
        check(unsafe { sceau_engine::pgp_reader_read(raw, buf.as_mut_ptr(), buf.len(), &mut produced) })
            .map_err(PgpError::into_io)?;
        if produced == 0 {
            self.eof = true;
        }
        Ok(produced)
    }
}

impl<R: Read> fmt::Debug for PullStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullStream")
            .field("eof", &self.eof)
            .field("verifies", &self.verifies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ArmorBlockType;

    fn armor_stream(output: Vec<u8>) -> PushStream<Vec<u8>> {
        PushStream::open(output, |w, out| {
            // SAFETY: the anchored writer outlives the stream's handle.
            unsafe { sceau_engine::pgp_armor_message_stream(w, ArmorBlockType::Message.code(), out) }
        })
        .expect("armor stream should open")
    }

    #[test]
    fn close_twice_matches_close_once() {
        let mut once = armor_stream(Vec::new());
        once.write_all(b"payload").unwrap();
        once.close().unwrap();
        let once = once.finish().unwrap();

        let mut twice = armor_stream(Vec::new());
        twice.write_all(b"payload").unwrap();
        twice.close().unwrap();
        twice.close().unwrap();
        assert_eq!(twice.finish().unwrap(), once);
    }

    #[cfg(feature = "sim")]
    #[test]
    fn dropping_an_open_stream_destroys_its_write_closer() {
        let mut stream = armor_stream(Vec::new());
        stream.write_all(b"never closed").unwrap();
        let raw = stream.closer.handle.borrow().unwrap().dangerous_raw();
        drop(stream);
        let mut written = 0usize;
        // SAFETY: `data` is valid for its length; the simulated engine
        // rejects the stale handle value.
        let result = check(unsafe {
            sceau_engine::pgp_message_write_closer_write(raw, b"x".as_ptr(), 1, &mut written)
        });
        assert!(matches!(result, Err(PgpError::Pgp(_))));
    }

    #[test]
    fn write_after_close_is_rejected() {
        let mut stream = armor_stream(Vec::new());
        stream.close().unwrap();
        assert!(stream.is_closed());
        assert!(stream.write(b"late").is_err());
    }

    #[test]
    fn pull_stream_without_verification() {
        let armored = {
            let mut s = armor_stream(Vec::new());
            s.write_all(b"hello").unwrap();
            s.finish().unwrap()
        };
        let mut stream = PullStream::open(armored.as_slice(), false, |r, out| {
            // SAFETY: the anchored reader outlives the stream's handle.
            unsafe { sceau_engine::pgp_unarmor_message_stream(r, out) }
        })
        .expect("unarmor stream should open");
        let mut plain = Vec::new();
        stream.read_to_end(&mut plain).unwrap();
        assert_eq!(plain, b"hello");
        assert!(stream.is_eof());
        assert!(matches!(stream.verification_result(), Err(PgpError::InvalidOperation(_))));
    }
}
