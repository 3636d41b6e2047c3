use std::collections::VecDeque;

use log::trace;

/// Cache of `%Stop:` notifications that arrived while a synchronous reply
/// was expected, drained in arrival order.
///
/// Only syscall stops are worth keeping: they are the events the main loop
/// must not lose. Everything else a `vStopped` drain turns up (plain traps,
/// thread stops from attach) is covered by thread enumeration and dropped
/// here.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    queue: VecDeque<Vec<u8>>,
}

impl NotificationQueue {
    pub fn new() -> NotificationQueue {
        NotificationQueue::default()
    }

    /// Cache `payload` if it is a syscall stop; drop it otherwise.
    pub fn push(&mut self, payload: &[u8]) {
        // type byte + two code digits, then the stop reason
        if payload.len() < 10 || &payload[3..10] != b"syscall" {
            return;
        }

        trace!("pushed {}", String::from_utf8_lossy(payload));
        self.queue.push_back(payload.to_vec());
    }

    /// The oldest cached notification, if any.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        let payload = self.queue.pop_front();
        if let Some(p) = &payload {
            trace!("popped {}", String::from_utf8_lossy(p));
        }
        payload
    }
}
