//! Callback adapters between host I/O and the engine.
//!
//! An anchor moves the host reader or writer to a stable heap address and
//! hands the engine a callback record pointing at it. The anchor must
//! outlive every engine call, or engine object, that holds the record;
//! stream types keep the engine handle ahead of the anchor so the handle
//! is destroyed first.
//!
//! Callbacks never unwind into the engine: host errors and panics are
//! logged and reported as failure codes.

use std::ffi::{c_int, c_void};
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr::NonNull;

use sceau_engine::{RawReader, RawWriter, READ_EOF, READ_ERROR, READ_MORE};

use crate::error::PgpError;

/// Chunk size used when copying caller streams.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

// ---------------------------------------------------------------------------
// Write direction
// ---------------------------------------------------------------------------

/// Host writer pinned for the engine.
pub(crate) struct WriteAnchor<W: Write> {
    ptr: NonNull<W>,
    _owns: PhantomData<W>,
}

// SAFETY: the anchor owns `W`; the engine only touches it during calls made
// by the thread that currently owns the anchor.
unsafe impl<W: Write + Send> Send for WriteAnchor<W> {}

impl<W: Write> WriteAnchor<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            ptr: NonNull::from(Box::leak(Box::new(writer))),
            _owns: PhantomData,
        }
    }

    /// Callback record for the engine.
    pub(crate) fn raw(&self) -> RawWriter {
        RawWriter {
            ctx: self.ptr.as_ptr().cast::<c_void>(),
            write: write_callback::<W>,
        }
    }

    pub(crate) fn into_inner(self) -> W {
        let this = ManuallyDrop::new(self);
        // SAFETY: the pointer came from `Box::leak` and is reclaimed once;
        // `Drop` will not run for `this`.
        *unsafe { Box::from_raw(this.ptr.as_ptr()) }
    }
}

impl<W: Write> Drop for WriteAnchor<W> {
    fn drop(&mut self) {
        // SAFETY: see `into_inner`.
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

unsafe extern "C" fn write_callback<W: Write>(ctx: *mut c_void, data: *const u8, len: usize) -> i64 {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        if ctx.is_null() || (data.is_null() && len > 0) {
            return -1;
        }
        // SAFETY: `ctx` is the anchor's live `W`; the engine does not call
        // back concurrently.
        let writer = unsafe { &mut *ctx.cast::<W>() };
        let bytes = if len == 0 {
            &[][..]
        } else {
            // SAFETY: the engine passes `len` readable bytes at `data`.
            unsafe { std::slice::from_raw_parts(data, len) }
        };
        loop {
            match writer.write(bytes) {
                Ok(n) => return i64::try_from(n).unwrap_or(-1),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(error = %err, "host writer failed inside engine callback");
                    return -1;
                }
            }
        }
    }));
    outcome.unwrap_or_else(|_| {
        tracing::warn!("host writer panicked inside engine callback");
        -1
    })
}

// ---------------------------------------------------------------------------
// Read direction
// ---------------------------------------------------------------------------

/// Host reader pinned for the engine.
pub(crate) struct ReadAnchor<R: Read> {
    ptr: NonNull<R>,
    _owns: PhantomData<R>,
}

// SAFETY: as for `WriteAnchor`.
unsafe impl<R: Read + Send> Send for ReadAnchor<R> {}

impl<R: Read> ReadAnchor<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            ptr: NonNull::from(Box::leak(Box::new(reader))),
            _owns: PhantomData,
        }
    }

    pub(crate) fn raw(&self) -> RawReader {
        RawReader {
            ctx: self.ptr.as_ptr().cast::<c_void>(),
            read: read_callback::<R>,
        }
    }

    pub(crate) fn into_inner(self) -> R {
        let this = ManuallyDrop::new(self);
        // SAFETY: the pointer came from `Box::leak` and is reclaimed once.
        *unsafe { Box::from_raw(this.ptr.as_ptr()) }
    }
}

impl<R: Read> Drop for ReadAnchor<R> {
    fn drop(&mut self) {
        // SAFETY: see `into_inner`.
        drop(unsafe { Box::from_raw(self.ptr.as_ptr()) });
    }
}

unsafe extern "C" fn read_callback<R: Read>(ctx: *mut c_void, buf: *mut u8, len: usize, status: *mut c_int) -> i64 {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        if ctx.is_null() || (buf.is_null() && len > 0) {
            return (0, READ_ERROR);
        }
        // SAFETY: `ctx` is the anchor's live `R`.
        let reader = unsafe { &mut *ctx.cast::<R>() };
        let out = if len == 0 {
            &mut [][..]
        } else {
            // SAFETY: the engine passes `len` writable bytes at `buf`.
            unsafe { std::slice::from_raw_parts_mut(buf, len) }
        };
        loop {
            match reader.read(out) {
                Ok(0) => return (0, READ_EOF),
                Ok(n) => return (n, READ_MORE),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(error = %err, "host reader failed inside engine callback");
                    return (0, READ_ERROR);
                }
            }
        }
    }));
    let (produced, code) = outcome.unwrap_or_else(|_| {
        tracing::warn!("host reader panicked inside engine callback");
        (0, READ_ERROR)
    });
    if !status.is_null() {
        // SAFETY: non-null status pointer supplied by the engine.
        unsafe { *status = code };
    }
    tracing::trace!(produced, code, "read callback");
    i64::try_from(produced).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Fixed-capacity output
// ---------------------------------------------------------------------------

/// Writer over a caller buffer that accepts at most its capacity.
#[derive(Debug)]
pub struct SliceWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }

    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }
}

impl Write for SliceWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let remaining = self.buf.get_mut(self.written..).unwrap_or_default();
        let n = remaining.len().min(data.len());
        remaining[..n].copy_from_slice(&data[..n]);
        self.written = self.written.saturating_add(n);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run a call that writes into a fresh buffer of `capacity` bytes.
pub(crate) fn collect(
    capacity: usize,
    call: impl FnOnce(RawWriter) -> sceau_engine::RawError,
) -> Result<Vec<u8>, PgpError> {
    let anchor = WriteAnchor::new(Vec::with_capacity(capacity));
    crate::error::check(call(anchor.raw()))?;
    Ok(anchor.into_inner())
}

/// Run a call that writes into `writer`, handing the writer back.
pub(crate) fn write_through<W: Write>(
    writer: W,
    call: impl FnOnce(RawWriter) -> sceau_engine::RawError,
) -> Result<W, PgpError> {
    let anchor = WriteAnchor::new(writer);
    crate::error::check(call(anchor.raw()))?;
    Ok(anchor.into_inner())
}

/// Copy `reader` into `writer` in `chunk`-sized pieces.
///
/// # Errors
///
/// Returns [`PgpError::Io`] on a read failure and whatever the writer
/// reports on a write failure.
pub(crate) fn pump<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    chunk: usize,
) -> Result<u64, PgpError> {
    let mut buf = vec![0u8; chunk.max(1)];
    let mut total: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        writer.write_all(&buf[..n])?;
        total = total.saturating_add(u64::try_from(n).unwrap_or(u64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl Write for Failing {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Read for Failing {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("unplugged"))
        }
    }

    struct Panicking;

    impl Write for Panicking {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            panic!("writer bug")
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn call_write(raw: RawWriter, data: &[u8]) -> i64 {
        unsafe { (raw.write)(raw.ctx, data.as_ptr(), data.len()) }
    }

    fn call_read(raw: RawReader, buf: &mut [u8]) -> (i64, c_int) {
        let mut status = READ_MORE;
        let n = unsafe { (raw.read)(raw.ctx, buf.as_mut_ptr(), buf.len(), &mut status) };
        (n, status)
    }

    #[test]
    fn write_anchor_collects_bytes() {
        let anchor = WriteAnchor::new(Vec::new());
        assert_eq!(call_write(anchor.raw(), b"abc"), 3);
        assert_eq!(call_write(anchor.raw(), b"de"), 2);
        assert_eq!(anchor.into_inner(), b"abcde");
    }

    #[test]
    fn write_failures_become_status_codes() {
        let failing = WriteAnchor::new(Failing);
        assert_eq!(call_write(failing.raw(), b"x"), -1);
        let panicking = WriteAnchor::new(Panicking);
        assert_eq!(call_write(panicking.raw(), b"x"), -1);
    }

    #[test]
    fn read_anchor_reports_eof() {
        let anchor = ReadAnchor::new(&b"hello"[..]);
        let mut buf = [0u8; 3];
        assert_eq!(call_read(anchor.raw(), &mut buf), (3, READ_MORE));
        assert_eq!(call_read(anchor.raw(), &mut buf), (2, READ_MORE));
        assert_eq!(call_read(anchor.raw(), &mut buf), (0, READ_EOF));
    }

    #[test]
    fn read_failures_become_status_codes() {
        let anchor = ReadAnchor::new(Failing);
        let mut buf = [0u8; 4];
        assert_eq!(call_read(anchor.raw(), &mut buf), (0, READ_ERROR));
    }

    #[test]
    fn slice_writer_truncates() {
        let mut buf = [0u8; 4];
        let mut writer = SliceWriter::new(&mut buf);
        assert_eq!(writer.write(b"abc").unwrap(), 3);
        assert_eq!(writer.write(b"def").unwrap(), 1);
        assert_eq!(writer.write(b"g").unwrap(), 0);
        assert_eq!(writer.written(), 4);
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn pump_copies_in_chunks() {
        let data = vec![7u8; 20_000];
        let mut out = Vec::new();
        let copied = pump(&mut data.as_slice(), &mut out, 1000).unwrap();
        assert_eq!(copied, 20_000);
        assert_eq!(out, data);
    }
}
