//! Single-writer, multi-reader event fan-out.
//!
//! The controller components publish their notifications through plain
//! channels instead of a signal/slot mesh: every interested party calls
//! [`EventHub::subscribe`] and drains its own receiver. Publishing never
//! blocks; subscribers that went away are pruned on the next publish.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

pub struct EventHub<T> {
    subscribers: Mutex<Vec<Sender<T>>>,
}

impl<T: Clone> EventHub<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber and hand back its receiving end.
    pub fn subscribe(&self) -> Receiver<T> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber, dropping the dead ones.
    pub fn publish(&self, event: T) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl<T: Clone> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}
