//! Fan-in of many producers into one result stream
//!
//! Every producer is registered up front and reports completion exactly once.
//! After [`ResultSink::seal`], the stream ends as soon as the completion tally
//! reaches the number of registered producers.

use futures::Stream;
use parking_lot::Mutex;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::error::SinkError;

struct SinkState<T> {
    /// Held until the sink is sealed and every producer completed
    sender: Option<mpsc::UnboundedSender<T>>,
    registered: usize,
    completed: usize,
    sealed: bool,
}

impl<T> SinkState<T> {
    fn close_if_done(&mut self) {
        if self.sealed && self.completed == self.registered {
            self.sender = None;
        }
    }
}

/// Registration side of the fan-in
pub struct ResultSink<T> {
    state: Arc<Mutex<SinkState<T>>>,
}

impl<T> Clone for ResultSink<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> ResultSink<T> {
    /// Create a sink and the stream it feeds
    pub fn new() -> (Self, ResultStream<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let sink = Self {
            state: Arc::new(Mutex::new(SinkState {
                sender: Some(sender),
                registered: 0,
                completed: 0,
                sealed: false,
            })),
        };

        (sink, ResultStream { receiver })
    }

    /// Register a new producer
    pub fn register(&self) -> Result<ResultProducer<T>, SinkError> {
        let mut state = self.state.lock();
        let sender = state.sender.clone().ok_or(SinkError::Closed)?;
        state.registered += 1;

        Ok(ResultProducer {
            sender: Some(sender),
            state: self.state.clone(),
        })
    }

    /// Declare that no further producers will register
    ///
    /// Further registrations still succeed until the last registered producer
    /// completes, at which point the stream ends.
    pub fn seal(&self) {
        let mut state = self.state.lock();
        state.sealed = true;
        state.close_if_done();
    }

    /// Whether the stream has been (or is about to be) ended
    pub fn is_closed(&self) -> bool {
        self.state.lock().sender.is_none()
    }

    pub fn registered(&self) -> usize {
        self.state.lock().registered
    }

    pub fn completed(&self) -> usize {
        self.state.lock().completed
    }
}

/// One registered producer; completes on [`complete`](Self::complete) or drop
pub struct ResultProducer<T> {
    sender: Option<mpsc::UnboundedSender<T>>,
    state: Arc<Mutex<SinkState<T>>>,
}

impl<T> ResultProducer<T> {
    /// Publish one item
    pub fn send(&self, item: T) -> Result<(), SinkError> {
        match &self.sender {
            Some(sender) => sender.send(item).map_err(|_| SinkError::Disconnected),
            None => Err(SinkError::Closed),
        }
    }

    /// Report this producer finished
    pub fn complete(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.sender.take().is_none() {
            return;
        }

        let mut state = self.state.lock();
        state.completed += 1;
        state.close_if_done();
    }
}

impl<T> Drop for ResultProducer<T> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Merged stream of every producer's items
///
/// Items from one producer arrive in the order they were sent; there is no
/// ordering across producers. Yields `None` exactly once the sink is sealed and
/// every producer has completed.
pub struct ResultStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> ResultStream<T> {
    /// Receive the next item, or `None` at end of stream
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Receive an item if one is ready
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Collect every remaining item until end of stream
    pub async fn collect_all(mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.recv().await {
            items.push(item);
        }
        items
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_recv(cx)
    }
}

impl<T> std::fmt::Debug for ResultStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stream_ends_when_all_producers_complete() {
        let (sink, stream) = ResultSink::new();
        let producers: Vec<_> = (0..3).map(|_| sink.register().unwrap()).collect();
        sink.seal();

        for (i, producer) in producers.into_iter().enumerate() {
            tokio::spawn(async move {
                for j in 0..10 {
                    producer.send(i * 100 + j).unwrap();
                }
                producer.complete();
            });
        }

        let mut items = stream.collect_all().await;
        items.sort_unstable();
        assert_eq!(items.len(), 30);
        assert!(sink.is_closed());
        assert_eq!(sink.completed(), 3);
    }

    #[tokio::test]
    async fn test_per_producer_order_is_preserved() {
        let (sink, stream) = ResultSink::new();
        let a = sink.register().unwrap();
        let b = sink.register().unwrap();
        sink.seal();

        let first = tokio::spawn(async move {
            for i in 0..50 {
                a.send(("a", i)).unwrap();
                tokio::task::yield_now().await;
            }
        });
        let second = tokio::spawn(async move {
            for i in 0..50 {
                b.send(("b", i)).unwrap();
                tokio::task::yield_now().await;
            }
        });
        first.await.unwrap();
        second.await.unwrap();

        let items: Vec<_> = stream.collect().await;
        for name in ["a", "b"] {
            let seq: Vec<_> = items
                .iter()
                .filter(|(producer, _)| *producer == name)
                .map(|(_, i)| *i)
                .collect();
            assert_eq!(seq, (0..50).collect::<Vec<_>>());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsealed_sink_stays_open() {
        let (sink, mut stream) = ResultSink::<u32>::new();
        sink.register().unwrap().complete();

        let next = tokio::time::timeout(Duration::from_millis(100), stream.recv()).await;
        assert!(next.is_err());

        sink.seal();
        assert_eq!(stream.recv().await, None);
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn test_register_after_close_fails() {
        let (sink, mut stream) = ResultSink::<u32>::new();
        sink.seal();

        assert_eq!(stream.recv().await, None);
        assert_eq!(sink.register().err(), Some(SinkError::Closed));
    }

    #[tokio::test]
    async fn test_dropped_producer_counts_as_complete() {
        let (sink, stream) = ResultSink::new();
        let producer = sink.register().unwrap();
        sink.seal();

        producer.send(7u32).unwrap();
        drop(producer);

        assert_eq!(stream.collect_all().await, vec![7]);
    }

    #[test]
    fn test_send_after_stream_dropped() {
        let (sink, stream) = ResultSink::new();
        let producer = sink.register().unwrap();
        drop(stream);

        assert_eq!(producer.send(1u8), Err(SinkError::Disconnected));
    }
}
