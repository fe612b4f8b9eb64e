//! Latest-wins single-slot mailboxes between the tick driver and I/O tasks

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::game::Intent;

use super::protocol::Snapshot;

/// How a newer message folds over an older one that was never consumed
pub trait Coalesce: Sized {
    fn coalesce(self, newer: Self) -> Self;
}

impl Coalesce for Snapshot {
    fn coalesce(self, newer: Self) -> Self {
        Snapshot::coalesce(self, newer)
    }
}

impl Coalesce for Intent {
    fn coalesce(self, newer: Self) -> Self {
        Intent::coalesce(self, newer)
    }
}

/// Depth-one queue. Posting never blocks; an unconsumed value is folded into
/// the new one.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    notify: Notify,
}

impl<T: Coalesce> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Store a value; returns true when it superseded an unconsumed one
    pub fn post(&self, value: T) -> bool {
        let superseded = {
            let mut slot = self.slot.lock();
            match slot.take() {
                Some(older) => {
                    *slot = Some(older.coalesce(value));
                    true
                }
                None => {
                    *slot = Some(value);
                    false
                }
            }
        };
        self.notify.notify_one();
        superseded
    }

    /// Take the pending value without waiting
    pub fn take(&self) -> Option<T> {
        self.slot.lock().take()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Wait until a value is available and take it
    pub async fn recv(&self) -> T {
        loop {
            if let Some(value) = self.take() {
                return value;
            }
            self.notify.notified().await;
        }
    }
}

impl<T: Coalesce> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
