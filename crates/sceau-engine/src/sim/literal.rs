//! Literal data layer: the plaintext framing plus trailing signatures.
//!
//! Layout: `LITERAL_START(flags)`, any number of `LITERAL_DATA` packets,
//! then the inline `SIGNATURE` packets, if any.

use std::io::{self, Read, Write};
use std::sync::Arc;

use ring::digest;

use super::error::EngineError;
use super::io::Sink;
use super::packet::{self, tag};
use super::signature::{finish_digest, Signature, Signer};
use super::verify::{VerificationSlot, VerifyConfig};

const FLAG_TEXT: u8 = 0b01;
const FLAG_COMPRESSED: u8 = 0b10;

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

pub(crate) struct LiteralSink {
    data: Option<Box<dyn Sink>>,
    signer: Option<Signer>,
    signatures: Option<Box<dyn Sink>>,
    flags: u8,
    started: bool,
}

impl LiteralSink {
    /// `data` receives the literal packets; `signatures`, when present,
    /// receives the signature packets instead of `data`.
    pub(crate) fn new(
        data: Option<Box<dyn Sink>>,
        signer: Option<Signer>,
        signatures: Option<Box<dyn Sink>>,
        text: bool,
        compress: bool,
    ) -> Result<Self, EngineError> {
        if data.is_none() && (signer.is_none() || signatures.is_none()) {
            return Err(EngineError::invalid("literal layer without any output"));
        }
        let mut flags = 0;
        if text {
            flags |= FLAG_TEXT;
        }
        if compress {
            flags |= FLAG_COMPRESSED;
        }
        Ok(Self {
            data,
            signer,
            signatures,
            flags,
            started: false,
        })
    }

    fn start(&mut self) -> io::Result<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        if let Some(data) = self.data.as_mut() {
            packet::write_packet(data, tag::LITERAL_START, &[self.flags])?;
        }
        Ok(())
    }
}

impl Write for LiteralSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.start()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(signer) = self.signer.as_mut() {
            signer.update(buf);
        }
        if let Some(data) = self.data.as_mut() {
            packet::write_packet(data, tag::LITERAL_DATA, buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(data) = self.data.as_mut() {
            data.flush()?;
        }
        Ok(())
    }
}

impl Sink for LiteralSink {
    fn finish(&mut self) -> io::Result<()> {
        self.start()?;
        if let Some(signer) = self.signer.take() {
            let packets = signer.finish_packets().map_err(EngineError::into_io)?;
            match (self.signatures.as_mut(), self.data.as_mut()) {
                (Some(out), _) | (None, Some(out)) => out.write_all(&packets)?,
                (None, None) => {}
            }
        }
        if let Some(out) = self.signatures.as_mut() {
            out.finish()?;
        }
        if let Some(data) = self.data.as_mut() {
            data.finish()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Evaluates signatures once a [`LiteralSource`] reaches its end.
pub(crate) struct Verifier {
    pub(crate) config: VerifyConfig,
    /// Overrides the inline signatures when present.
    pub(crate) detached: Option<Vec<Signature>>,
    pub(crate) slot: VerificationSlot,
}

pub(crate) struct LiteralSource<R> {
    inner: R,
    started: bool,
    trailer: bool,
    done: bool,
    chunk: Vec<u8>,
    pos: usize,
    hasher: Option<digest::Context>,
    inline: Vec<Signature>,
    verifier: Option<Verifier>,
}

impl<R: Read> LiteralSource<R> {
    pub(crate) fn new(inner: R, verifier: Option<Verifier>) -> Self {
        Self {
            inner,
            started: false,
            trailer: false,
            done: false,
            chunk: Vec::new(),
            pos: 0,
            hasher: Some(digest::Context::new(&digest::SHA256)),
            inline: Vec::new(),
            verifier,
        }
    }

    fn begin(&mut self) -> io::Result<()> {
        match packet::read_packet(&mut self.inner)? {
            Some((tag::LITERAL_START, body)) if body.len() == 1 => {
                self.started = true;
                Ok(())
            }
            Some((tag::LITERAL_START, _)) => Err(EngineError::malformed("bad literal header").into_io()),
            Some((kind, _)) => {
                Err(EngineError::malformed(format!("expected literal data, found packet {kind:#x}")).into_io())
            }
            None => Err(EngineError::malformed("message contains no literal data").into_io()),
        }
    }

    fn conclude(&mut self) {
        self.done = true;
        let digest = self.hasher.take().map(finish_digest).unwrap_or_default();
        if let Some(verifier) = self.verifier.take() {
            let signatures = verifier.detached.as_deref().unwrap_or(&self.inline);
            let result = verifier.config.evaluate(&digest, signatures);
            tracing::debug!(status = result.status, signatures = signatures.len(), "message verified");
            *verifier.slot.lock() = Some(Arc::new(result));
        }
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        loop {
            match packet::read_packet(&mut self.inner)? {
                Some((tag::LITERAL_DATA, body)) if !self.trailer => {
                    if let Some(hasher) = self.hasher.as_mut() {
                        hasher.update(&body);
                    }
                    self.chunk = body;
                    self.pos = 0;
                    return Ok(());
                }
                Some((tag::SIGNATURE, body)) => {
                    self.trailer = true;
                    self.inline
                        .push(Signature::parse(&body).map_err(EngineError::into_io)?);
                }
                Some((kind, _)) => {
                    return Err(
                        EngineError::malformed(format!("unexpected packet {kind:#x} in literal data")).into_io(),
                    )
                }
                None => {
                    self.conclude();
                    return Ok(());
                }
            }
        }
    }
}

impl<R: Read> Read for LiteralSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.started {
            self.begin()?;
        }
        while self.pos >= self.chunk.len() {
            if self.done {
                return Ok(0);
            }
            self.next_chunk()?;
        }
        let available = &self.chunk[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos = self.pos.saturating_add(n);
        Ok(n)
    }
}

/// Signature key ids of an unencrypted literal message.
pub(crate) fn signature_key_ids(mut data: &[u8]) -> Result<Vec<u64>, EngineError> {
    let mut ids = Vec::new();
    while let Some((kind, body)) = packet::read_packet(&mut data)? {
        if kind == tag::SIGNATURE {
            ids.push(Signature::parse(&body)?.key_id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::abi::{algorithm, status};
    use crate::sim::io::testing::vec_writer;
    use crate::sim::io::ExternalSink;
    use crate::sim::keys::KeyMaterial;

    /// Framing bytes of an empty literal layer.
    const LITERAL_OVERHEAD: usize = packet::HEADER_LEN + 1;

    fn key() -> Arc<KeyMaterial> {
        Arc::new(KeyMaterial::generate(10, algorithm::DEFAULT, None).unwrap())
    }

    fn write_message(chunks: &[&[u8]], signer: Option<Signer>) -> Vec<u8> {
        let mut out = Vec::new();
        let mut sink = LiteralSink::new(
            Some(Box::new(ExternalSink::new(vec_writer(&mut out)))),
            signer,
            None,
            false,
            false,
        )
        .unwrap();
        for chunk in chunks {
            sink.write_all(chunk).unwrap();
        }
        sink.finish().unwrap();
        drop(sink);
        out
    }

    fn read_message(data: &[u8], keys: Vec<Arc<KeyMaterial>>) -> (Vec<u8>, VerificationSlot) {
        let slot: VerificationSlot = Arc::new(Mutex::new(None));
        let verifier = Verifier {
            config: VerifyConfig {
                keys,
                ..VerifyConfig::default()
            },
            detached: None,
            slot: Arc::clone(&slot),
        };
        let mut out = Vec::new();
        LiteralSource::new(data, Some(verifier)).read_to_end(&mut out).unwrap();
        (out, slot)
    }

    #[test]
    fn unsigned_round_trip() {
        let message = write_message(&[b"plain ", b"text"], None);
        let (plain, slot) = read_message(&message, vec![key()]);
        assert_eq!(plain, b"plain text");
        assert_eq!(slot.lock().as_ref().unwrap().status, status::NOT_SIGNED);
    }

    #[test]
    fn signed_round_trip() {
        let signer_key = key();
        let signer = Signer::new(vec![Arc::clone(&signer_key)], 20, false, None).unwrap();
        let message = write_message(&[b"plain text"], Some(signer));
        assert_eq!(signature_key_ids(&message).unwrap(), vec![signer_key.key_id()]);
        let (plain, slot) = read_message(&message, vec![signer_key]);
        assert_eq!(plain, b"plain text");
        assert_eq!(slot.lock().as_ref().unwrap().status, status::OK);
    }

    #[test]
    fn empty_message_still_has_header() {
        let message = write_message(&[], None);
        assert_eq!(message.len(), LITERAL_OVERHEAD);
        assert!(read_message(&message, Vec::new()).0.is_empty());
    }

    #[test]
    fn missing_literal_header_is_malformed() {
        let mut out = Vec::new();
        let err = LiteralSource::new(&[][..], None).read_to_end(&mut out).unwrap_err();
        assert!(matches!(EngineError::from(err), EngineError::Malformed(_)));
    }
}
