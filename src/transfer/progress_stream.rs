//! Byte-counting stream wrapper for upload bodies.

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;

/// Wraps an upload body stream and counts the bytes that actually went out,
/// so failures can report how far the transfer got.
pub struct ProgressStream<S> {
    inner: S,
    sent: Arc<AtomicU64>,
}

impl<S> ProgressStream<S> {
    /// Returns the wrapper and a handle to the running byte count.
    pub fn new(inner: S) -> (Self, Arc<AtomicU64>) {
        let sent = Arc::new(AtomicU64::new(0));
        (
            Self {
                inner,
                sent: Arc::clone(&sent),
            },
            sent,
        )
    }
}

impl<S, E> Stream for ProgressStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let inner = Pin::new(&mut self.inner);
        match inner.poll_next(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                self.sent.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                Poll::Ready(Some(Ok(bytes)))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{stream, StreamExt};

    #[tokio::test]
    async fn counts_every_chunk() {
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let (mut wrapped, sent) = ProgressStream::new(stream::iter(chunks));

        while let Some(chunk) = wrapped.next().await {
            chunk.unwrap();
        }

        assert_eq!(sent.load(Ordering::Relaxed), 11);
    }
}
