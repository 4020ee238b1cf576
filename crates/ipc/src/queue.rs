use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nuke_openjd_types::Action;

/// FIFO of actions shared between the adaptor lifecycle and the IPC server.
///
/// The lifecycle enqueues, the server's `GET /action` handler dequeues.
/// Cloning is cheap and shares the underlying queue.
#[derive(Debug, Clone, Default)]
pub struct ActionsQueue {
    inner: Arc<Mutex<VecDeque<Action>>>,
}

impl ActionsQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the back of the queue.
    pub fn enqueue(&self, action: Action) {
        self.inner.lock().expect("actions queue poisoned").push_back(action);
    }

    /// Push an action ahead of everything already queued. Used for `close`
    /// during cleanup so shutdown is not stuck behind stale work.
    pub fn enqueue_front(&self, action: Action) {
        self.inner.lock().expect("actions queue poisoned").push_front(action);
    }

    /// Pop the next action, if any.
    pub fn dequeue(&self) -> Option<Action> {
        self.inner.lock().expect("actions queue poisoned").pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("actions queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
