//! Byte sinks and sources backed by host callbacks.

use std::ffi::c_int;
use std::io::{self, Read, Write};

use crate::abi::{RawReader, RawWriter, READ_EOF, READ_ERROR, READ_MORE};

/// A `Write` layer that owns a trailer emitted by [`Sink::finish`].
///
/// `finish` must run the layer's own trailer and then finish the layer
/// below it.
pub(crate) trait Sink: Write + Send {
    fn finish(&mut self) -> io::Result<()>;
}

impl Sink for Vec<u8> {
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn finish(&mut self) -> io::Result<()> {
        (**self).finish()
    }
}

/// Sink writing into a host [`RawWriter`].
pub(crate) struct ExternalSink {
    writer: RawWriter,
}

// SAFETY: the host keeps the writer context alive and never calls into the
// same stream object from two threads at once.
unsafe impl Send for ExternalSink {}

impl ExternalSink {
    pub(crate) const fn new(writer: RawWriter) -> Self {
        Self { writer }
    }
}

impl Write for ExternalSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // SAFETY: the host guarantees `ctx` is valid for its own callback.
        let accepted = unsafe { (self.writer.write)(self.writer.ctx, buf.as_ptr(), buf.len()) };
        if accepted < 0 {
            return Err(io::Error::other("host writer failed"));
        }
        Ok(usize::try_from(accepted).unwrap_or(0).min(buf.len()))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Sink for ExternalSink {
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Source pulling from a host [`RawReader`].
pub(crate) struct ExternalSource {
    reader: RawReader,
    eof: bool,
}

// SAFETY: see `ExternalSink`.
unsafe impl Send for ExternalSource {}

impl ExternalSource {
    pub(crate) const fn new(reader: RawReader) -> Self {
        Self { reader, eof: false }
    }
}

impl Read for ExternalSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.eof || buf.is_empty() {
            return Ok(0);
        }
        loop {
            let mut status: c_int = READ_MORE;
            // SAFETY: the host guarantees `ctx` is valid for its own callback;
            // `buf` is valid for `buf.len()` bytes.
            let produced = unsafe {
                (self.reader.read)(self.reader.ctx, buf.as_mut_ptr(), buf.len(), &mut status)
            };
            if status == READ_ERROR || produced < 0 {
                return Err(io::Error::other("host reader failed"));
            }
            let produced = usize::try_from(produced).unwrap_or(0).min(buf.len());
            if status == READ_EOF {
                self.eof = true;
            }
            if produced > 0 || self.eof {
                return Ok(produced);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn external_sink_forwards_bytes() {
        let mut out = Vec::new();
        let mut sink = ExternalSink::new(vec_writer(&mut out));
        sink.write_all(b"hello").unwrap();
        sink.finish().unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn external_source_reads_to_eof() {
        let mut src = SliceSource { data: b"abcdef" };
        let mut source = ExternalSource::new(slice_reader(&mut src));
        let mut out = Vec::new();
        source.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abcdef");
    }
}
