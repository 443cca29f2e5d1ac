use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use pylog_types::Transform;

/// Default read size for the upstream source
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Failure on either side of a pump
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("failed to read from upstream")]
    Upstream(#[source] io::Error),

    #[error("failed to write downstream")]
    Downstream(#[source] io::Error),
}

impl PumpError {
    /// True when the downstream reader went away (e.g. `| head`)
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Self::Downstream(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PumpOptions {
    /// Maximum bytes read per upstream chunk
    pub chunk_size: usize,
}

impl Default for PumpOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub chunks_in: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub cancelled: bool,
}

/// Applies a [`Transform`] to every chunk of an inner byte stream.
///
/// When the inner stream ends the transform's residue is yielded once. When
/// it fails the residue is yielded first and the error after it; nothing is
/// polled from the inner stream after that.
pub struct TransformStream<S, T> {
    inner: S,
    transform: T,
    pending_error: Option<io::Error>,
    done: bool,
    chunks_in: u64,
    bytes_in: u64,
}

impl<S, T> TransformStream<S, T>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
    T: Transform + Unpin,
{
    pub fn new(inner: S, transform: T) -> Self {
        Self {
            inner,
            transform,
            pending_error: None,
            done: false,
            chunks_in: 0,
            bytes_in: 0,
        }
    }

    /// Stop consuming the inner stream and return the transform's residue
    pub fn close(&mut self) -> Bytes {
        if self.done {
            return Bytes::new();
        }
        self.done = true;
        Bytes::from(self.transform.finish())
    }

    pub fn chunks_in(&self) -> u64 {
        self.chunks_in
    }

    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }
}

impl<S, T> Stream for TransformStream<S, T>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
    T: Transform + Unpin,
{
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.as_mut().get_mut();

        if let Some(err) = this.pending_error.take() {
            return Poll::Ready(Some(Err(err)));
        }
        if this.done {
            return Poll::Ready(None);
        }

        match ready!(this.inner.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                this.chunks_in += 1;
                this.bytes_in += chunk.len() as u64;
                Poll::Ready(Some(Ok(Bytes::from(this.transform.process(&chunk)))))
            }
            Some(Err(err)) => {
                let residue = this.close();
                if residue.is_empty() {
                    Poll::Ready(Some(Err(err)))
                } else {
                    this.pending_error = Some(err);
                    Poll::Ready(Some(Ok(residue)))
                }
            }
            None => {
                let residue = this.close();
                if residue.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(residue)))
                }
            }
        }
    }
}

/// Drive `reader` through `transform` into `writer` until end of input.
///
/// Each output chunk is written and flushed before the next read, so a slow
/// writer holds back the reader. Cancellation stops reading but still flushes
/// the transform's residue and shuts the writer down.
pub async fn pump<R, W, T>(
    reader: R,
    mut writer: W,
    transform: T,
    options: PumpOptions,
    cancel: CancellationToken,
) -> Result<PumpStats, PumpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    T: Transform + Unpin,
{
    let source = ReaderStream::with_capacity(reader, options.chunk_size.max(1));
    let mut stream = TransformStream::new(source, transform);
    let mut stats = PumpStats::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("pump cancelled, flushing residue");
                stats.cancelled = true;
                Some(Ok(stream.close()))
            }
            next = stream.next() => next,
        };

        let chunk = match next {
            Some(Ok(chunk)) => chunk,
            Some(Err(err)) => {
                tracing::warn!(error = %err, "upstream read failed");
                // Residue was yielded before the error; make it visible downstream
                if let Err(flush_err) = writer.flush().await {
                    tracing::debug!(error = %flush_err, "flush after upstream failure failed");
                }
                return Err(PumpError::Upstream(err));
            }
            None => break,
        };

        if !chunk.is_empty() {
            writer
                .write_all(&chunk)
                .await
                .map_err(PumpError::Downstream)?;
            writer.flush().await.map_err(PumpError::Downstream)?;
            stats.bytes_out += chunk.len() as u64;
        }

        if stats.cancelled {
            break;
        }
    }

    writer.shutdown().await.map_err(PumpError::Downstream)?;

    stats.chunks_in = stream.chunks_in();
    stats.bytes_in = stream.bytes_in();
    tracing::debug!(
        chunks_in = stats.chunks_in,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        "pump finished"
    );
    Ok(stats)
}
