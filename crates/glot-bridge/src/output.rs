//! Broadcast bus for captured output.
//!
//! Uses [`tokio::sync::broadcast`] under the hood so every subscriber sees
//! every chunk without any single subscriber blocking the evaluator. A slow
//! subscriber lags (old chunks are dropped for it) rather than stalling the
//! foreign process.

use futures_util::stream::{self, BoxStream, StreamExt};
use glot_types::OutputChunk;
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered chunks before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Shared output bus. Clone it cheaply – all clones share the same
/// underlying broadcast channel.
#[derive(Clone, Debug)]
pub struct OutputBus {
    sender: broadcast::Sender<OutputChunk>,
}

impl OutputBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a chunk to all current subscribers.
    ///
    /// A send error only means there are no subscribers right now; the
    /// chunk is dropped silently in that case, matching the semantics of a
    /// front-end with no attached display.
    pub fn publish(&self, chunk: OutputChunk) {
        let _ = self.sender.send(chunk);
    }

    /// Subscribe to the raw broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<OutputChunk> {
        self.sender.subscribe()
    }

    /// Subscribe as an async stream of chunks.
    ///
    /// Lagged receivers skip ahead (with a warning) instead of erroring
    /// out; the stream ends when the bus is dropped.
    pub fn stream(&self) -> BoxStream<'static, OutputChunk> {
        let rx = self.sender.subscribe();
        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(chunk) => return Some((chunk, rx)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "output subscriber lagged; dropping chunks");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

impl Default for OutputBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use glot_types::StreamName;

    #[tokio::test]
    async fn subscriber_receives_published_chunk() {
        let bus = OutputBus::default();
        let mut rx = bus.subscribe();

        bus.publish(OutputChunk::now(StreamName::Stdout, "hello"));

        let chunk = rx.recv().await.unwrap();
        assert_eq!(chunk.stream, StreamName::Stdout);
        assert_eq!(chunk.text, "hello");
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_panic() {
        let bus = OutputBus::default();
        bus.publish(OutputChunk::now(StreamName::Stderr, "nobody listening"));
    }

    #[tokio::test]
    async fn stream_yields_chunks_in_order() {
        let bus = OutputBus::default();
        let mut stream = bus.stream();

        bus.publish(OutputChunk::now(StreamName::Stdout, "one"));
        bus.publish(OutputChunk::now(StreamName::Stdout, "two"));

        assert_eq!(stream.next().await.unwrap().text, "one");
        assert_eq!(stream.next().await.unwrap().text, "two");
    }

    #[tokio::test]
    async fn stream_ends_when_bus_dropped() {
        let bus = OutputBus::default();
        let mut stream = bus.stream();
        drop(bus);
        assert!(stream.next().await.is_none());
    }
}
