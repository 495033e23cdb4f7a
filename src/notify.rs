//! Notification intake queue.
//!
//! BLE notifications arrive on the Bluetooth host task, off the control-loop
//! cadence.  The transport never touches controller state directly: it pushes
//! the raw payload into a bounded `embassy-sync` channel and the control loop
//! drains it, so every decode → valve → alarm transition runs with exclusive
//! access to the shared state.
//!
//! ```text
//! ┌──────────────┐ Notification ┌───────────────────┐
//! │  BLE host    │─────────────▶│  Control loop     │
//! │  (callback)  │  try_send    │  (drain + decode) │
//! └──────────────┘              └───────────────────┘
//! ```
//!
//! Every subscription is tagged with a session number.  Tearing the link
//! down bumps the session, so anything still queued (or delivered late by
//! the stack) for the old subscription is discarded on drain instead of
//! being routed into the controller.

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Channel depth.  At the oximeter's ~1 Hz notify rate eight slots cover
/// far more than one control tick of backlog.
pub const QUEUE_DEPTH: usize = 8;

/// Largest payload kept per notification (default ATT MTU minus header).
pub const MAX_PAYLOAD: usize = 20;

/// One raw notification, tagged with the subscription it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub session: u32,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

/// Bounded queue between the transport callback and the control loop.
pub struct NotificationQueue {
    channel: Channel<CriticalSectionRawMutex, Notification, QUEUE_DEPTH>,
    dropped: AtomicU32,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue a payload.  Returns `false` when the queue is full and the
    /// notification was dropped.
    pub fn push(&self, session: u32, bytes: &[u8]) -> bool {
        let keep = bytes.len().min(MAX_PAYLOAD);
        let mut payload = Vec::new();
        // Cannot fail: `keep` never exceeds the capacity.
        let _ = payload.extend_from_slice(&bytes[..keep]);

        if self.channel.try_send(Notification { session, payload }).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    /// Pop the oldest pending notification, if any.
    pub fn pop(&self) -> Option<Notification> {
        self.channel.try_receive().ok()
    }

    /// Number of notifications waiting to be drained.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Notifications discarded because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Delivery handle handed to the transport when subscribing.
///
/// `Copy` and `'static` so it can be parked in a C-callback bridge; it
/// carries no reference to controller state.
#[derive(Clone, Copy)]
pub struct NotifySink {
    session: u32,
    queue: &'static NotificationQueue,
}

impl NotifySink {
    pub fn new(session: u32, queue: &'static NotificationQueue) -> Self {
        Self { session, queue }
    }

    pub fn session(&self) -> u32 {
        self.session
    }

    /// Forward a notification payload.  Safe to call from the BLE host task.
    pub fn deliver(&self, bytes: &[u8]) -> bool {
        self.queue.push(self.session, bytes)
    }
}

impl core::fmt::Debug for NotifySink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotifySink")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
