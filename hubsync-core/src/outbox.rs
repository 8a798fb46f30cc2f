//! Per-account action queue.
//!
//! Every entity kind of an account pushes into the same queue; nothing is
//! delivered until [`ActionQueue::drain`] runs at the end of the account.

use crate::error::SyncResult;
use crate::sink::ActionSink;
use crate::types::ActionEvent;
use tracing::{debug, warn};

/// Buffers action events until the account's single flush.
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending_events: Vec<ActionEvent>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event. No I/O.
    pub fn push(&mut self, event: ActionEvent) {
        self.pending_events.push(event);
    }

    /// Takes all pending events, resetting the buffer.
    pub fn take_pending(&mut self) -> Vec<ActionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn pending(&self) -> &[ActionEvent] {
        &self.pending_events
    }

    pub fn pending_count(&self) -> usize {
        self.pending_events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_events.is_empty()
    }

    /// Submits everything pending to `sink` in one batch and clears the
    /// queue. Returns the number of events delivered.
    ///
    /// An empty queue is never submitted. If the sink rejects the batch the
    /// events stay queued.
    pub async fn drain(&mut self, sink: &dyn ActionSink, api_key: &str) -> SyncResult<usize> {
        if self.pending_events.is_empty() {
            debug!("action queue empty, nothing to drain");
            return Ok(0);
        }

        let events = self.take_pending();
        let count = events.len();

        if let Err(e) = sink.submit(api_key, &events).await {
            warn!("action sink rejected {count} events: {e}");
            // only a successful submit clears the queue
            self.pending_events = events;
            return Err(e);
        }

        debug!("drained {count} actions");
        Ok(count)
    }
}
