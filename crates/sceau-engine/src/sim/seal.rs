//! Chunked AEAD data layer.
//!
//! A sealed stream is one `SEALED` header packet (`cipher || base nonce`)
//! followed by `SEALED_CHUNK` packets and exactly one `SEALED_FINAL`
//! packet. Chunk `i` uses nonce `base ^ i` and AAD `tag || i`, so chunks
//! cannot be reordered, dropped, or truncated unnoticed.

use std::io::{self, Read, Write};

use ring::aead::LessSafeKey;

use super::crypto::{self, NONCE_LEN};
use super::error::EngineError;
use super::io::Sink;
use super::packet::{self, tag, Fields};
use super::session::SessionKey;

/// Plaintext bytes per sealed chunk.
pub(crate) const CHUNK_LEN: usize = 1 << 16;

fn chunk_nonce(base: &[u8; NONCE_LEN], index: u64) -> [u8; NONCE_LEN] {
    let mut nonce = *base;
    for (n, i) in nonce[NONCE_LEN.saturating_sub(8)..].iter_mut().zip(index.to_be_bytes()) {
        *n ^= i;
    }
    nonce
}

fn chunk_aad(kind: u8, index: u64) -> [u8; 9] {
    let mut aad = [0u8; 9];
    aad[0] = kind;
    aad[1..].copy_from_slice(&index.to_be_bytes());
    aad
}

// ---------------------------------------------------------------------------
// Encryption
// ---------------------------------------------------------------------------

pub(crate) struct SealSink {
    inner: Box<dyn Sink>,
    key: LessSafeKey,
    base: [u8; NONCE_LEN],
    index: u64,
    pending: Vec<u8>,
}

impl SealSink {
    /// Writes the header packet immediately.
    pub(crate) fn new(mut inner: Box<dyn Sink>, session: &SessionKey) -> Result<Self, EngineError> {
        let key = crypto::aead_key(&session.content_key()?)?;
        let base = crypto::random_array::<NONCE_LEN>()?;
        let mut header = [0u8; 1 + NONCE_LEN];
        header[0] = session.cipher();
        header[1..].copy_from_slice(&base);
        packet::write_packet(&mut inner, tag::SEALED, &header)?;
        Ok(Self {
            inner,
            key,
            base,
            index: 0,
            pending: Vec::new(),
        })
    }

    fn emit(&mut self, kind: u8, len: usize) -> io::Result<()> {
        let plain: Vec<u8> = self.pending.drain(..len).collect();
        let sealed = crypto::seal_with(
            &self.key,
            chunk_nonce(&self.base, self.index),
            &chunk_aad(kind, self.index),
            &plain,
        )
        .map_err(EngineError::into_io)?;
        packet::write_packet(&mut self.inner, kind, &sealed)?;
        self.index = self.index.saturating_add(1);
        Ok(())
    }
}

impl Write for SealSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        // The final chunk always carries the tail, so keep at least one byte.
        while self.pending.len() > CHUNK_LEN {
            self.emit(tag::SEALED_CHUNK, CHUNK_LEN)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Sink for SealSink {
    fn finish(&mut self) -> io::Result<()> {
        let rest = self.pending.len();
        self.emit(tag::SEALED_FINAL, rest)?;
        self.inner.finish()
    }
}

// ---------------------------------------------------------------------------
// Decryption
// ---------------------------------------------------------------------------

/// Parse a `SEALED` header body into `(cipher, base nonce)`.
pub(crate) fn parse_header(body: &[u8]) -> Result<(u8, [u8; NONCE_LEN]), EngineError> {
    let mut f = Fields::new(body);
    let cipher = f.u8()?;
    let base = f.array()?;
    f.end()?;
    Ok((cipher, base))
}

pub(crate) struct OpenSource<R> {
    inner: R,
    key: LessSafeKey,
    base: [u8; NONCE_LEN],
    index: u64,
    plain: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: Read> OpenSource<R> {
    /// `header` is the body of the already consumed `SEALED` packet.
    pub(crate) fn new(inner: R, header: &[u8], session: &SessionKey) -> Result<Self, EngineError> {
        let (cipher, base) = parse_header(header)?;
        if cipher != session.cipher() {
            return Err(EngineError::key(format!(
                "session key cipher {} does not match message cipher {cipher}",
                session.cipher()
            )));
        }
        Ok(Self {
            inner,
            key: crypto::aead_key(&session.content_key()?)?,
            base,
            index: 0,
            plain: Vec::new(),
            pos: 0,
            done: false,
        })
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        let (kind, body) = packet::read_packet(&mut self.inner)?
            .ok_or_else(|| EngineError::malformed("encrypted data is truncated").into_io())?;
        if kind != tag::SEALED_CHUNK && kind != tag::SEALED_FINAL {
            return Err(EngineError::malformed(format!("unexpected packet {kind:#x} in encrypted data")).into_io());
        }
        self.plain = crypto::open_with(
            &self.key,
            chunk_nonce(&self.base, self.index),
            &chunk_aad(kind, self.index),
            &body,
        )
        .map_err(|_| EngineError::crypto("encrypted data failed integrity check").into_io())?;
        self.pos = 0;
        self.index = self.index.saturating_add(1);
        if kind == tag::SEALED_FINAL {
            self.done = true;
            if packet::read_packet(&mut self.inner)?.is_some() {
                return Err(EngineError::malformed("trailing data after encrypted data").into_io());
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for OpenSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.plain.len() {
            if self.done {
                return Ok(0);
            }
            self.next_chunk()?;
        }
        let available = &self.plain[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos = self.pos.saturating_add(n);
        Ok(n)
    }
}

/// Open a complete sealed blob (header included) held in memory.
pub(crate) fn open_all(data: &[u8], session: &SessionKey) -> Result<Vec<u8>, EngineError> {
    let mut input = data;
    let (kind, header) = packet::read_packet(&mut input)?
        .ok_or_else(|| EngineError::malformed("empty encrypted data"))?;
    if kind != tag::SEALED {
        return Err(EngineError::malformed("missing encrypted data header"));
    }
    let mut out = Vec::new();
    OpenSource::new(input, &header, session)?.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::cipher;
    use crate::sim::io::testing::vec_writer;
    use crate::sim::io::ExternalSink;

    /// Header packet (5 + 1 + 12) plus an empty final chunk (5 + 16).
    const SEAL_OVERHEAD: usize = 39;

    fn seal(data: &[u8], session: &SessionKey) -> Vec<u8> {
        let mut out = Vec::new();
        let mut sink = SealSink::new(Box::new(ExternalSink::new(vec_writer(&mut out))), session).unwrap();
        sink.write_all(data).unwrap();
        sink.finish().unwrap();
        drop(sink);
        out
    }

    #[test]
    fn empty_payload_has_fixed_overhead() {
        let session = SessionKey::generate(cipher::AES256).unwrap();
        let sealed = seal(b"", &session);
        assert_eq!(sealed.len(), SEAL_OVERHEAD);
        assert!(open_all(&sealed, &session).unwrap().is_empty());
    }

    #[test]
    fn multi_chunk_round_trip() {
        let session = SessionKey::generate(cipher::AES128).unwrap();
        let data: Vec<u8> = (0..CHUNK_LEN * 2 + 17).map(|i| (i % 251) as u8).collect();
        let sealed = seal(&data, &session);
        assert_eq!(open_all(&sealed, &session).unwrap(), data);
    }

    #[test]
    fn truncation_is_detected() {
        let session = SessionKey::generate(cipher::AES256).unwrap();
        let data = vec![7u8; CHUNK_LEN + 10];
        let mut sealed = seal(&data, &session);
        // Drop the final chunk packet (5 header + 10 data + 16 tag).
        sealed.truncate(sealed.len() - 31);
        assert!(open_all(&sealed, &session).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let session = SessionKey::generate(cipher::AES256).unwrap();
        let other = SessionKey::generate(cipher::AES256).unwrap();
        let sealed = seal(b"secret", &session);
        assert!(matches!(open_all(&sealed, &other), Err(EngineError::Crypto(_))));
    }
}
