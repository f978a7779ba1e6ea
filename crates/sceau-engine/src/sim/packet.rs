//! Packet framing of the simulated message format.
//!
//! Every packet is `tag (1) || body length (u32 BE) || body`. The layout is
//! private to the simulated engine and intentionally simpler than RFC 9580.

use std::io::{self, Read, Write};

use super::error::EngineError;

pub(crate) mod tag {
    pub(crate) const KEY_PACKET: u8 = 0x01;
    pub(crate) const SIGNATURE: u8 = 0x02;
    pub(crate) const PASSWORD_PACKET: u8 = 0x03;
    pub(crate) const PUBLIC_KEY: u8 = 0x05;
    pub(crate) const SECRET_KEY: u8 = 0x06;
    pub(crate) const LITERAL_START: u8 = 0x0A;
    pub(crate) const LITERAL_DATA: u8 = 0x0B;
    pub(crate) const SEALED: u8 = 0x12;
    pub(crate) const SEALED_CHUNK: u8 = 0x13;
    pub(crate) const SEALED_FINAL: u8 = 0x14;
}

/// Bytes of framing in front of every body.
pub(crate) const HEADER_LEN: usize = 5;

/// Upper bound on a single body.
pub(crate) const MAX_BODY_LEN: usize = 1 << 24;

pub(crate) fn write_packet<W: Write + ?Sized>(out: &mut W, tag: u8, body: &[u8]) -> io::Result<()> {
    let len = u32::try_from(body.len())
        .ok()
        .filter(|l| usize::try_from(*l).is_ok_and(|l| l <= MAX_BODY_LEN))
        .ok_or_else(|| EngineError::invalid("packet body too large").into_io())?;
    let mut header = [0u8; HEADER_LEN];
    header[0] = tag;
    header[1..].copy_from_slice(&len.to_be_bytes());
    out.write_all(&header)?;
    out.write_all(body)
}

pub(crate) fn encode_packet(tag: u8, body: &[u8]) -> Result<Vec<u8>, EngineError> {
    let mut out = Vec::with_capacity(HEADER_LEN.saturating_add(body.len()));
    write_packet(&mut out, tag, body)?;
    Ok(out)
}

/// Read one packet, or `None` at a clean end of input.
pub(crate) fn read_packet<R: Read + ?Sized>(input: &mut R) -> io::Result<Option<(u8, Vec<u8>)>> {
    let mut first = [0u8; 1];
    loop {
        match input.read(&mut first) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    let mut len_bytes = [0u8; 4];
    input
        .read_exact(&mut len_bytes)
        .map_err(|_| EngineError::malformed("truncated packet header").into_io())?;
    let len = usize::try_from(u32::from_be_bytes(len_bytes))
        .ok()
        .filter(|l| *l <= MAX_BODY_LEN)
        .ok_or_else(|| EngineError::malformed("packet body too large").into_io())?;
    let mut body = vec![0u8; len];
    input
        .read_exact(&mut body)
        .map_err(|_| EngineError::malformed("truncated packet body").into_io())?;
    Ok(Some((first[0], body)))
}

/// Sequential field reader over a packet body.
pub(crate) struct Fields<'a> {
    rest: &'a [u8],
}

impl<'a> Fields<'a> {
    pub(crate) const fn new(body: &'a [u8]) -> Self {
        Self { rest: body }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], EngineError> {
        if self.rest.len() < n {
            return Err(EngineError::malformed("packet body too short"));
        }
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], EngineError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, EngineError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, EngineError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, EngineError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub(crate) fn i64(&mut self) -> Result<i64, EngineError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    /// `u16` length prefix followed by that many bytes.
    pub(crate) fn short_bytes(&mut self) -> Result<&'a [u8], EngineError> {
        let len = usize::from(self.u16()?);
        self.take(len)
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let rest = self.rest;
        self.rest = &[];
        rest
    }

    pub(crate) fn end(&self) -> Result<(), EngineError> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(EngineError::malformed("trailing bytes in packet body"))
        }
    }
}

/// Append a `u16` length prefix and `value`.
pub(crate) fn push_short_bytes(out: &mut Vec<u8>, value: &[u8]) -> Result<(), EngineError> {
    let len = u16::try_from(value.len()).map_err(|_| EngineError::invalid("field longer than 65535 bytes"))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value);
    Ok(())
}
