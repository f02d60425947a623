//! Two-stage URL buffering
//!
//! Producers (seeding, link extraction, retries) deposit into OUT, an
//! unbounded LIFO that biases the crawl toward depth-first exploration of a
//! freshly discovered subtree. Workers consume IN, a bounded FIFO that
//! applies backpressure. The feeder task is the only bridge between the two,
//! which is what keeps the pair deadlock-free: workers never push IN,
//! the feeder never pops it.

mod feeder;

pub use feeder::run_feeder;

use crate::crawler::FetchRequest;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::Notify;

/// Unbounded LIFO deposit queue for newly discovered URLs
#[derive(Debug, Default)]
pub struct OutQueue {
    items: Mutex<Vec<FetchRequest>>,
    notify: Notify,
}

impl OutQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, request: FetchRequest) {
        self.items.lock().unwrap().push(request);
        self.notify.notify_one();
    }

    pub fn push_many(&self, requests: impl IntoIterator<Item = FetchRequest>) {
        let mut items = self.items.lock().unwrap();
        items.extend(requests);
        drop(items);
        self.notify.notify_one();
    }

    /// Pops the most recently pushed request (LIFO)
    pub fn pop(&self) -> Option<FetchRequest> {
        self.items.lock().unwrap().pop()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().unwrap().is_empty()
    }

    /// Resolves on the next push; armed before condition checks in the feeder
    pub async fn wait_for_push(&self) {
        self.notify.notified().await;
    }
}

/// Sender half of the bounded IN queue (held only by the feeder)
pub type InSender = mpsc::Sender<FetchRequest>;

/// Receiver half of the IN queue, shared by all workers
///
/// tokio's mpsc receiver is single-consumer, so workers take turns through
/// an async mutex; each holds it just long enough to pull one block.
pub type SharedInReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<FetchRequest>>>;

/// Builds the bounded IN queue
pub fn in_queue(capacity: usize) -> (InSender, SharedInReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, Arc::new(tokio::sync::Mutex::new(rx)))
}
