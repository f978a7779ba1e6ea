//! Stream objects handed out as handles: write-closers and pull readers.

use std::io::{Read, Write};
use std::sync::Arc;

use super::error::EngineError;
use super::io::Sink;
use super::verify::{Verification, VerificationSlot};

/// Push side of a streaming operation. Closing writes the trailer.
pub(crate) struct WriteCloser {
    sink: Option<Box<dyn Sink>>,
}

impl WriteCloser {
    pub(crate) fn new(sink: Box<dyn Sink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> Result<usize, EngineError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| EngineError::invalid("write after close"))?;
        sink.write_all(data)?;
        Ok(data.len())
    }

    /// Idempotent.
    pub(crate) fn close(&mut self) -> Result<(), EngineError> {
        if let Some(mut sink) = self.sink.take() {
            sink.finish()?;
            sink.flush()?;
        }
        Ok(())
    }
}

/// Pull side of a streaming operation.
pub(crate) struct PullReader {
    source: Box<dyn Read + Send>,
    slot: Option<VerificationSlot>,
    eof: bool,
}

impl PullReader {
    pub(crate) fn new(source: Box<dyn Read + Send>, slot: Option<VerificationSlot>) -> Self {
        Self {
            source,
            slot,
            eof: false,
        }
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Result<usize, EngineError> {
        if self.eof || buf.is_empty() {
            return Ok(0);
        }
        let n = self.source.read(buf)?;
        if n == 0 {
            self.eof = true;
        }
        Ok(n)
    }

    pub(crate) fn verification(&self) -> Result<Arc<Verification>, EngineError> {
        let slot = self
            .slot
            .as_ref()
            .ok_or_else(|| EngineError::invalid("this reader does not verify signatures"))?;
        if !self.eof {
            return Err(EngineError::invalid(
                "verification result is only available after the message has been read to the end",
            ));
        }
        slot.lock()
            .clone()
            .ok_or_else(|| EngineError::invalid("no verification result was produced"))
    }
}
