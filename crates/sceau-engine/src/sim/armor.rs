//! ASCII armor: streaming encoder and decoder.

use std::io::{self, BufRead, BufReader, Read, Write};

use data_encoding::BASE64;

use super::error::EngineError;
use super::io::Sink;
use crate::abi::{block_type, encoding};

/// Raw bytes per armored line (64 base64 characters).
const BYTES_PER_LINE: usize = 48;

pub(crate) fn label(block: u8) -> Result<&'static str, EngineError> {
    match block {
        block_type::MESSAGE => Ok("MESSAGE"),
        block_type::SIGNATURE => Ok("SIGNATURE"),
        block_type::PRIVATE_KEY => Ok("PRIVATE KEY BLOCK"),
        block_type::PUBLIC_KEY => Ok("PUBLIC KEY BLOCK"),
        other => Err(EngineError::invalid(format!("unknown armor block type {other}"))),
    }
}

/// Returns `true` when `data` starts with an armor header line.
pub(crate) fn looks_armored(data: &[u8]) -> bool {
    let trimmed = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&[][..], |start| &data[start..]);
    trimmed.starts_with(b"-----BEGIN PGP ")
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Armors everything written through it.
pub(crate) struct ArmorSink {
    inner: Box<dyn Sink>,
    label: &'static str,
    pending: Vec<u8>,
    started: bool,
}

impl ArmorSink {
    pub(crate) fn new(inner: Box<dyn Sink>, block: u8) -> Result<Self, EngineError> {
        Ok(Self {
            inner,
            label: label(block)?,
            pending: Vec::with_capacity(BYTES_PER_LINE),
            started: false,
        })
    }

    fn start(&mut self) -> io::Result<()> {
        if !self.started {
            self.started = true;
            write!(self.inner, "-----BEGIN PGP {}-----\n\n", self.label)?;
        }
        Ok(())
    }

    fn emit_lines(&mut self, include_partial: bool) -> io::Result<()> {
        let mut consumed = 0usize;
        for line in self.pending.chunks(BYTES_PER_LINE) {
            if line.len() < BYTES_PER_LINE && !include_partial {
                break;
            }
            let mut text = BASE64.encode(line);
            text.push('\n');
            self.inner.write_all(text.as_bytes())?;
            consumed = consumed.saturating_add(line.len());
        }
        self.pending.drain(..consumed);
        Ok(())
    }
}

impl Write for ArmorSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.start()?;
        self.pending.extend_from_slice(buf);
        if self.pending.len() >= BYTES_PER_LINE {
            self.emit_lines(false)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Sink for ArmorSink {
    fn finish(&mut self) -> io::Result<()> {
        self.start()?;
        self.emit_lines(true)?;
        write!(self.inner, "-----END PGP {}-----\n", self.label)?;
        self.inner.finish()
    }
}

/// Armor a whole buffer.
pub(crate) fn armor(data: &[u8], block: u8) -> Result<Vec<u8>, EngineError> {
    let label = label(block)?;
    let mut out = format!("-----BEGIN PGP {label}-----\n\n").into_bytes();
    for line in data.chunks(BYTES_PER_LINE) {
        out.extend_from_slice(BASE64.encode(line).as_bytes());
        out.push(b'\n');
    }
    out.extend_from_slice(format!("-----END PGP {label}-----\n").as_bytes());
    Ok(out)
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Body,
    Done,
}

/// Decodes one armored block, yielding the raw bytes.
pub(crate) struct ArmorSource<R> {
    inner: R,
    state: State,
    label: Option<String>,
    carry: String,
    decoded: Vec<u8>,
    pos: usize,
}

impl<R: BufRead> ArmorSource<R> {
    pub(crate) const fn new(inner: R) -> Self {
        Self {
            inner,
            state: State::Header,
            label: None,
            carry: String::new(),
            decoded: Vec::new(),
            pos: 0,
        }
    }

    /// Block label once the header has been read (`MESSAGE`, `SIGNATURE`…).
    #[cfg(test)]
    pub(crate) fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut raw = Vec::new();
        if self.inner.read_until(b'\n', &mut raw)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8(raw)
            .map_err(|_| EngineError::malformed("armor is not ASCII").into_io())?;
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }

    fn read_header(&mut self) -> io::Result<()> {
        loop {
            let line = self
                .next_line()?
                .ok_or_else(|| EngineError::malformed("armor header not found").into_io())?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let label = trimmed
                .strip_prefix("-----BEGIN PGP ")
                .and_then(|rest| rest.strip_suffix("-----"))
                .ok_or_else(|| EngineError::malformed("armor header not found").into_io())?;
            self.label = Some(label.to_owned());
            break;
        }
        // Optional `Key: Value` headers end at the first blank line.
        loop {
            let line = self
                .next_line()?
                .ok_or_else(|| EngineError::malformed("armor footer missing").into_io())?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                break;
            }
            if !trimmed.contains(':') {
                let trimmed = trimmed.to_owned();
                self.state = if self.body_line(&trimmed)? { State::Done } else { State::Body };
                return Ok(());
            }
        }
        self.state = State::Body;
        Ok(())
    }

    /// Feed one body line. Returns `true` at the footer.
    fn body_line(&mut self, line: &str) -> io::Result<bool> {
        if line.starts_with("-----END PGP ") {
            if !self.carry.is_empty() {
                let tail = std::mem::take(&mut self.carry);
                self.decode_chunk(&tail)?;
            }
            return Ok(true);
        }
        // CRC-24 checksum line.
        if line.len() == 5 && line.starts_with('=') {
            return Ok(false);
        }
        self.carry.push_str(line);
        let usable = self.carry.len() & !3;
        if usable > 0 {
            let chunk: String = self.carry.drain(..usable).collect();
            self.decode_chunk(&chunk)?;
        }
        Ok(false)
    }

    fn decode_chunk(&mut self, chunk: &str) -> io::Result<()> {
        let bytes = BASE64
            .decode(chunk.as_bytes())
            .map_err(|e| EngineError::malformed(format!("invalid armor body: {e}")).into_io())?;
        self.decoded.extend_from_slice(&bytes);
        Ok(())
    }
}

impl<R: BufRead> Read for ArmorSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.state == State::Header {
            self.read_header()?;
        }
        while self.pos >= self.decoded.len() {
            self.decoded.clear();
            self.pos = 0;
            if self.state == State::Done {
                return Ok(0);
            }
            let line = self
                .next_line()?
                .ok_or_else(|| EngineError::malformed("armor footer missing").into_io())?;
            if self.body_line(line.trim())? {
                self.state = State::Done;
            }
        }
        let available = &self.decoded[self.pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos = self.pos.saturating_add(n);
        Ok(n)
    }
}

/// Wrap `sink` in an armor encoder when `output` asks for armor.
pub(crate) fn encode_output(sink: Box<dyn Sink>, output: u8, block: u8) -> Result<Box<dyn Sink>, EngineError> {
    match output {
        encoding::BYTES => Ok(sink),
        encoding::ARMOR => Ok(Box::new(ArmorSink::new(sink, block)?)),
        other => Err(EngineError::invalid(format!("unknown encoding {other}"))),
    }
}

/// Wrap `input` in an armor decoder when `input_encoding` asks for armor.
pub(crate) fn decode_input<'a, R: Read + Send + 'a>(
    input: R,
    input_encoding: u8,
) -> Result<Box<dyn Read + Send + 'a>, EngineError> {
    match input_encoding {
        encoding::BYTES => Ok(Box::new(input)),
        encoding::ARMOR => Ok(Box::new(ArmorSource::new(BufReader::new(input)))),
        other => Err(EngineError::invalid(format!("unknown encoding {other}"))),
    }
}

/// Decode a whole armored buffer.
pub(crate) fn unarmor(data: &[u8]) -> Result<Vec<u8>, EngineError> {
    let mut source = ArmorSource::new(data);
    let mut out = Vec::new();
    source.read_to_end(&mut out)?;
    Ok(out)
}
