//! Digest-verifying reader.
//!
//! Bytes pass through unchanged while feeding a running hash. The comparison
//! against the expected digest happens only in [`VerifyingReader::close`]: a
//! stream that is read partway and then dropped is never verified, so callers
//! must always close, even when aborting early.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::digest::{Digest, Hasher};
use crate::error::{RegistryError, RegistryResult};

/// Wraps a byte stream and checks it against an expected digest on close.
pub struct VerifyingReader<R> {
    inner: R,
    expected: Digest,
    hasher: Hasher,
    bytes_read: u64,
}

impl<R> VerifyingReader<R> {
    pub fn new(inner: R, expected: Digest) -> Self {
        let hasher = expected.algorithm().hasher();
        Self {
            inner,
            expected,
            hasher,
            bytes_read: 0,
        }
    }

    pub fn expected(&self) -> &Digest {
        &self.expected
    }

    /// Bytes passed through so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Close the underlying stream and verify everything read so far.
    ///
    /// The inner stream is released before the comparison, so it is closed
    /// whether or not verification succeeds.
    pub fn close(self) -> RegistryResult<()> {
        let Self {
            inner,
            expected,
            hasher,
            bytes_read,
        } = self;
        drop(inner);

        let actual = hasher.finalize_hex();
        if actual != expected.hex() {
            tracing::warn!(
                expected = %expected,
                bytes_read,
                "blob digest verification failed"
            );
            return Err(RegistryError::DigestMismatch {
                subject: "blob".to_string(),
                expected: expected.to_string(),
                actual: format!("{}:{}", expected.algorithm(), actual),
            });
        }
        Ok(())
    }
}

impl<R: AsyncRead + Unpin> VerifyingReader<R> {
    /// Drain the stream, close it, and return the verified bytes.
    pub async fn into_bytes(mut self) -> RegistryResult<Bytes> {
        let mut buf = Vec::new();
        let read = self.read_to_end(&mut buf).await;
        if let Err(e) = read {
            // Release the stream even though nothing gets verified.
            drop(self);
            return Err(RegistryError::Transport {
                message: format!("failed to read blob body: {}", e),
            });
        }
        self.close()?;
        Ok(Bytes::from(buf))
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for VerifyingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        let fresh = &buf.filled()[before..];
        this.hasher.update(fresh);
        this.bytes_read += fresh.len() as u64;
        Poll::Ready(Ok(()))
    }
}

impl<R> fmt::Debug for VerifyingReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingReader")
            .field("expected", &self.expected)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}
