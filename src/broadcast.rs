//! Fan-out delivery of completed frames.
//!
//! Each subscriber owns the receiving end of an unbounded channel, so publishing never blocks
//! the ingestion path and every subscriber sees frames in emission order. A subscriber stops
//! receiving by dropping its receiver; its sender is pruned on the next publish.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use crate::frame::TimelineFrame;

#[derive(Debug, Default)]
pub struct FrameBroadcaster {
    subscribers: Vec<Sender<Arc<TimelineFrame>>>,
}

impl FrameBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<Arc<TimelineFrame>> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    /// Deliver `frame` to every live subscriber.
    pub fn publish(&mut self, frame: Arc<TimelineFrame>) {
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&frame)).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
