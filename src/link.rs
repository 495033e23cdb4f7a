//! Peripheral link supervisor.
//!
//! Owns the one connection to the oximeter and the one notification
//! subscription riding on it.
//!
//! ```text
//!  Disconnected ──connect()──▶ Connecting ──ok──▶ Connected{since}
//!        ▲                        │  │                 │
//!        │◀──── connect failed ───┘  │         drop / teardown
//!        │                           ▼                 │
//!        │             ServiceUnavailable              │
//!        └─────────────────────────────────────────────┘
//! ```
//!
//! Transport errors stop here: they become a state transition and a
//! [`LinkError`] for the orchestrator to log and retry on its fixed cadence.
//! Nothing above this module ever sees a transport handle.

use log::{info, warn};

use crate::app::ports::CentralPort;
use crate::config::PeripheralConfig;
use crate::error::LinkError;
use crate::notify::{Notification, NotificationQueue, NotifySink};

/// Link lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected { since_ms: u64 },
    /// The peripheral answered but does not expose the oximeter service or
    /// its notify characteristic.
    ServiceUnavailable,
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Handles held while connected.  Dropped together, after disconnect.
struct Session<C: CentralPort> {
    conn: C::Conn,
    service: C::Service,
    notify_char: C::Char,
}

pub struct LinkSupervisor<C: CentralPort> {
    central: C,
    peripheral: PeripheralConfig,
    queue: &'static NotificationQueue,
    state: LinkState,
    session: Option<Session<C>>,
    /// Tag of the live subscription.  Bumped on every teardown and connect.
    session_id: u32,
}

impl<C: CentralPort> LinkSupervisor<C> {
    pub fn new(central: C, peripheral: PeripheralConfig, queue: &'static NotificationQueue) -> Self {
        Self {
            central,
            peripheral,
            queue,
            state: LinkState::Disconnected,
            session: None,
            session_id: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Establish the link and subscribe.  Any previous link is torn down first.
    pub fn connect(&mut self, now_ms: u64) -> Result<(), LinkError> {
        self.teardown();
        self.state = LinkState::Connecting;
        info!("Link: connecting to {}", self.peripheral.address);

        let conn = match self.central.connect(&self.peripheral.address) {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Link: connect failed ({})", e);
                self.state = LinkState::Disconnected;
                return Err(LinkError::ConnectFailed);
            }
        };
        info!("Link: connected, resolving service");

        let Some(service) = self.central.lookup_service(&conn, self.peripheral.service_uuid) else {
            warn!("Link: service {:032x} not found", self.peripheral.service_uuid);
            self.abandon(conn);
            return Err(LinkError::ServiceUnavailable);
        };

        let Some(notify_char) = self
            .central
            .lookup_characteristic(&service, self.peripheral.notify_char_uuid)
        else {
            warn!("Link: notify characteristic {:032x} not found", self.peripheral.notify_char_uuid);
            self.abandon(conn);
            return Err(LinkError::CharacteristicUnavailable);
        };

        self.session_id = self.session_id.wrapping_add(1);
        let sink = NotifySink::new(self.session_id, self.queue);
        if let Err(e) = self.central.subscribe(&notify_char, sink) {
            warn!("Link: subscribe failed ({})", e);
            self.abandon(conn);
            return Err(LinkError::CharacteristicUnavailable);
        }

        self.session = Some(Session {
            conn,
            service,
            notify_char,
        });
        self.state = LinkState::Connected { since_ms: now_ms };
        info!("Link: subscribed (session {})", self.session_id);
        Ok(())
    }

    /// Release the link.  Idempotent.
    ///
    /// The transport disconnect (which drops the subscription) runs before
    /// the handles are released, and the session tag is bumped so anything
    /// the stack already queued for the old subscription is discarded.
    pub fn teardown(&mut self) {
        if let Some(session) = self.session.take() {
            let Session { conn, service, notify_char } = session;
            self.central.disconnect(conn);
            drop(notify_char);
            drop(service);
            info!("Link: torn down");
        }
        self.session_id = self.session_id.wrapping_add(1);
        self.state = LinkState::Disconnected;
    }

    /// Detect a drop the stack reported without us asking.  Returns `true`
    /// if the link was found dead and torn down.
    pub fn check_alive(&mut self) -> bool {
        let alive = match &self.session {
            Some(session) => self.central.is_alive(&session.conn),
            None => return false,
        };
        if alive {
            return false;
        }
        warn!("Link: peripheral dropped the connection");
        self.teardown();
        true
    }

    /// Take the next notification belonging to the live subscription.
    /// Stale ones are discarded on the way.
    pub fn next_notification(&mut self) -> Option<Notification> {
        while let Some(n) = self.queue.pop() {
            if self.state.is_connected() && n.session == self.session_id {
                return Some(n);
            }
            info!("Link: discarding notification from stale session {}", n.session);
        }
        None
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn central(&self) -> &C {
        &self.central
    }

    pub fn central_mut(&mut self) -> &mut C {
        &mut self.central
    }

    // ── Internal ──────────────────────────────────────────────

    /// Disconnect a half-built link and park in `ServiceUnavailable`.
    fn abandon(&mut self, conn: C::Conn) {
        self.central.disconnect(conn);
        self.session_id = self.session_id.wrapping_add(1);
        self.state = LinkState::ServiceUnavailable;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Reconnect cadence
// ═══════════════════════════════════════════════════════════════

/// Fixed-interval retry gate.  No backoff and no attempt limit: an
/// unattended controller keeps trying for as long as it is powered.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectTimer {
    interval_ms: u64,
    last_attempt_ms: Option<u64>,
}

impl ReconnectTimer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_attempt_ms: None,
        }
    }

    /// Whether an attempt may start at `now_ms`.
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_attempt_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Record an attempt started at `now_ms`.
    pub fn record_attempt(&mut self, now_ms: u64) {
        self.last_attempt_ms = Some(now_ms);
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn last_attempt_ms(&self) -> Option<u64> {
        self.last_attempt_ms
    }
}
