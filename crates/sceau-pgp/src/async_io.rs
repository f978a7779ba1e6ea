//! Async drivers over `tokio::io::AsyncRead`.
//!
//! The engine calls stay synchronous. A driver only awaits the caller's
//! reader, feeds each chunk into a push stream and checks for
//! cancellation between chunks. Streams hold raw engine handles, so these
//! futures are not `Send`; run them on a current-thread runtime or a
//! `LocalSet`.

use std::io::Write;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;

use crate::encrypt::PgpEncrypter;
use crate::environment::stream_chunk_size;
use crate::error::PgpError;
use crate::params::Encoding;
use crate::sign::{PgpSigner, SigningMode};

/// Sender half of a cancellation flag.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver half, checked by drivers between chunks.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A linked handle and signal.
    #[must_use]
    pub fn pair() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Self { rx })
    }

    /// A signal nobody can fire.
    #[must_use]
    pub fn never() -> Self {
        Self::pair().1
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

/// Copy `reader` into `writer` chunk by chunk, returning the byte count.
///
/// # Errors
///
/// Returns [`PgpError::InvalidOperation`] once `cancel` fires,
/// [`PgpError::Io`] on a read failure and whatever `writer` reports.
pub async fn drain_async<R, W>(reader: &mut R, writer: &mut W, cancel: &CancelSignal) -> Result<u64, PgpError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; stream_chunk_size()];
    let mut total: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            tracing::debug!(total, "async drain cancelled");
            return Err(PgpError::invalid_operation("operation cancelled"));
        }
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n])?;
        total = total.saturating_add(u64::try_from(n).unwrap_or(u64::MAX));
    }
}

impl PgpSigner<'_> {
    /// Sign everything `reader` yields into `writer`.
    ///
    /// # Errors
    ///
    /// As [`drain_async`] and [`PgpSigner::open_stream`]. A cancelled run
    /// drops the stream without its trailer.
    pub async fn sign_async<R, W>(
        &self,
        mut reader: R,
        writer: W,
        encoding: Encoding,
        mode: SigningMode,
        cancel: &CancelSignal,
    ) -> Result<W, PgpError>
    where
        R: AsyncRead + Unpin,
        W: Write,
    {
        let mut stream = self.open_stream(writer, encoding, mode)?;
        drain_async(&mut reader, &mut stream, cancel).await?;
        stream.finish()
    }
}

impl PgpEncrypter<'_> {
    /// Encrypt everything `reader` yields into `writer`.
    ///
    /// # Errors
    ///
    /// As [`drain_async`] and [`PgpEncrypter::open_stream`].
    pub async fn encrypt_async<R, W>(
        &self,
        mut reader: R,
        writer: W,
        encoding: Encoding,
        cancel: &CancelSignal,
    ) -> Result<W, PgpError>
    where
        R: AsyncRead + Unpin,
        W: Write,
    {
        let mut stream = self.open_stream(writer, encoding)?;
        drain_async(&mut reader, &mut stream, cancel).await?;
        Ok(stream.finish()?.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_everything() {
        let data = vec![7u8; 20_000];
        let mut out = Vec::new();
        let n = drain_async(&mut data.as_slice(), &mut out, &CancelSignal::never())
            .await
            .expect("drain should succeed");
        assert_eq!(n, 20_000);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn cancelled_before_first_chunk() {
        let (handle, signal) = CancelSignal::pair();
        handle.cancel();
        let mut out = Vec::new();
        let result = drain_async(&mut &b"data"[..], &mut out, &signal).await;
        assert!(matches!(result, Err(PgpError::InvalidOperation(_))));
        assert!(out.is_empty());
    }

    #[test]
    fn never_is_not_cancelled() {
        assert!(!CancelSignal::default().is_cancelled());
    }
}
