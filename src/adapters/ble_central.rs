//! BLE central adapter.
//!
//! Implements [`CentralPort`]: the GATT-client half of the link to the
//! pulse oximeter.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT client via `esp_idf_svc::sys`.
//!   Every call blocks until the matching GATTC event arrives (or times out).
//! - **all other targets**: a scriptable simulation used by host tests.
//!
//! ## Notification path
//!
//! Bluedroid callbacks are C function pointers that cannot capture Rust
//! closures.  The [`NotifySink`] handed over at subscribe time is parked in
//! a static and the GATTC handler forwards `NOTIFY_EVT` payloads into it.
//! `disconnect` clears the parked sink before closing, so the stack can
//! never deliver into a torn-down subscription.

use log::{info, warn};

use crate::app::ports::CentralPort;
use crate::config::PeerAddress;
use crate::error::TransportError;
use crate::notify::NotifySink;

// ───────────────────────────────────────────────────────────────
// Handles
// ───────────────────────────────────────────────────────────────

/// Open connection to one peripheral.
#[derive(Debug, PartialEq, Eq)]
pub struct ConnHandle {
    pub conn_id: u16,
    pub peer: PeerAddress,
}

/// Attribute range of a discovered primary service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHandle {
    pub conn_id: u16,
    pub peer: PeerAddress,
    pub start: u16,
    pub end: u16,
}

/// Value handle of a discovered characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharHandle {
    pub conn_id: u16,
    pub peer: PeerAddress,
    pub handle: u16,
}

// ───────────────────────────────────────────────────────────────
// GATTC event routing
// ───────────────────────────────────────────────────────────────

/// Sentinel for "no teardown in progress".
pub const NO_CONN: u32 = u32::MAX;

/// What an `OPEN_EVT` means for the caller of `connect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenRoute {
    /// `connect` is still waiting for this answer.
    Deliver,
    /// `connect` timed out but the stack opened the link anyway; nobody owns
    /// it, so it must be closed.
    CloseOrphan,
    /// `connect` timed out and the open failed too.
    Drop,
}

pub fn route_open(abandoned: bool, ok: bool) -> OpenRoute {
    match (abandoned, ok) {
        (false, _) => OpenRoute::Deliver,
        (true, true) => OpenRoute::CloseOrphan,
        (true, false) => OpenRoute::Drop,
    }
}

/// What a `DISCONNECT_EVT` or `CLOSE_EVT` means for the tracked link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRoute {
    /// The close `disconnect` is waiting for.
    TeardownConfirmed,
    /// The live connection went down without being asked to.
    LinkLost,
    /// Belongs to a link that is already released or being released.
    Stale,
}

/// `closing` is the conn_id `disconnect` is releasing (or [`NO_CONN`]);
/// `live` and `connected` describe the connection `is_alive` reports on.
pub fn route_close(conn_id: u16, close_evt: bool, closing: u32, live: u32, connected: bool) -> CloseRoute {
    let id = u32::from(conn_id);
    if id == closing {
        if close_evt {
            CloseRoute::TeardownConfirmed
        } else {
            CloseRoute::Stale
        }
    } else if id == live && connected {
        CloseRoute::LinkLost
    } else {
        CloseRoute::Stale
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF GATTC static state
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod gattc {
    use core::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
    use std::sync::Mutex;

    use esp_idf_svc::sys::*;

    use super::{route_close, route_open, CloseRoute, OpenRoute, NO_CONN};
    use crate::notify::NotifySink;

    /// Sentinel for "no GATTC answer yet".
    pub const PENDING: i32 = -1;
    pub const MAX_SERVICES: usize = 8;
    /// Client Characteristic Configuration descriptor.
    pub const CCCD_UUID16: u16 = 0x2902;

    pub static GATTC_IF: AtomicU32 = AtomicU32::new(0);
    pub static REGISTERED: AtomicBool = AtomicBool::new(false);
    pub static OPEN_STATUS: AtomicI32 = AtomicI32::new(PENDING);
    pub static CONN_ID: AtomicU32 = AtomicU32::new(0);
    pub static CONNECTED: AtomicBool = AtomicBool::new(false);
    /// Set when `connect` gave up on an open the stack may still complete.
    pub static OPEN_ABANDONED: AtomicBool = AtomicBool::new(false);
    /// conn_id whose `CLOSE_EVT` `disconnect` is waiting for.
    pub static CLOSING_CONN: AtomicU32 = AtomicU32::new(NO_CONN);
    pub static SEARCH_DONE: AtomicBool = AtomicBool::new(false);
    pub static NOTIFY_REG_STATUS: AtomicI32 = AtomicI32::new(PENDING);
    pub static DESCR_WRITE_STATUS: AtomicI32 = AtomicI32::new(PENDING);
    pub static NOTIFY_HANDLE: AtomicU32 = AtomicU32::new(0);

    /// `(uuid, start, end)` of every primary service the last search reported.
    pub static SERVICES: Mutex<heapless::Vec<(u128, u16, u16), MAX_SERVICES>> =
        Mutex::new(heapless::Vec::new());

    /// Where `NOTIFY_EVT` payloads go.  `None` once unsubscribed.
    pub static SINK: Mutex<Option<NotifySink>> = Mutex::new(None);

    pub fn uuid128_to_esp(uuid: u128) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 16;
        t.uuid.uuid128 = uuid.to_le_bytes();
        t
    }

    pub fn uuid16_to_esp(uuid: u16) -> esp_bt_uuid_t {
        let mut t: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
        t.len = 2;
        t.uuid.uuid16 = uuid;
        t
    }

    pub fn esp_to_uuid128(uuid: &esp_bt_uuid_t) -> Option<u128> {
        if uuid.len == 16 {
            Some(u128::from_le_bytes(unsafe { uuid.uuid.uuid128 }))
        } else {
            None
        }
    }

    pub fn gattc_if() -> esp_gatt_if_t {
        GATTC_IF.load(Ordering::Acquire) as esp_gatt_if_t
    }

    fn link_down(conn_id: u16, close_evt: bool) {
        let route = route_close(
            conn_id,
            close_evt,
            CLOSING_CONN.load(Ordering::Acquire),
            CONN_ID.load(Ordering::Acquire),
            CONNECTED.load(Ordering::Acquire),
        );
        match route {
            CloseRoute::TeardownConfirmed => {
                CLOSING_CONN.store(NO_CONN, Ordering::Release);
                log::info!("BLE GATTC: link closed (conn_id={})", conn_id);
            }
            CloseRoute::LinkLost => {
                CONNECTED.store(false, Ordering::Release);
                log::info!("BLE GATTC: link lost (conn_id={})", conn_id);
            }
            CloseRoute::Stale => {
                log::debug!("BLE GATTC: ignoring close of released conn_id={}", conn_id);
            }
        }
    }

    /// Poll `done` every 10 ms for up to `timeout_ms`.
    pub fn wait_until(timeout_ms: u32, done: impl Fn() -> bool) -> bool {
        let mut waited = 0;
        while !done() {
            if waited >= timeout_ms {
                return false;
            }
            esp_idf_svc::hal::delay::FreeRtos::delay_ms(10);
            waited += 10;
        }
        true
    }

    pub unsafe extern "C" fn event_handler(
        event: esp_gattc_cb_event_t,
        gattc_if: esp_gatt_if_t,
        param: *mut esp_ble_gattc_cb_param_t,
    ) {
        match event {
            esp_gattc_cb_event_t_ESP_GATTC_REG_EVT => {
                GATTC_IF.store(gattc_if as u32, Ordering::Release);
                REGISTERED.store(true, Ordering::Release);
                log::info!("BLE GATTC: app registered (if={})", gattc_if);
            }
            esp_gattc_cb_event_t_ESP_GATTC_OPEN_EVT => {
                let p = unsafe { &(*param).open };
                let ok = p.status == esp_gatt_status_t_ESP_GATT_OK;
                match route_open(OPEN_ABANDONED.swap(false, Ordering::AcqRel), ok) {
                    OpenRoute::Deliver => {
                        CONN_ID.store(p.conn_id as u32, Ordering::Release);
                        CONNECTED.store(ok, Ordering::Release);
                        OPEN_STATUS.store(p.status as i32, Ordering::Release);
                    }
                    OpenRoute::CloseOrphan => {
                        log::warn!("BLE GATTC: open completed after timeout, closing conn_id={}", p.conn_id);
                        unsafe { esp_ble_gattc_close(gattc_if, p.conn_id) };
                    }
                    OpenRoute::Drop => {}
                }
            }
            esp_gattc_cb_event_t_ESP_GATTC_SEARCH_RES_EVT => {
                let p = unsafe { &(*param).search_res };
                if let Some(uuid) = esp_to_uuid128(&p.srvc_id.uuid) {
                    if let Ok(mut services) = SERVICES.lock() {
                        let _ = services.push((uuid, p.start_handle, p.end_handle));
                    }
                }
            }
            esp_gattc_cb_event_t_ESP_GATTC_SEARCH_CMPL_EVT => {
                SEARCH_DONE.store(true, Ordering::Release);
            }
            esp_gattc_cb_event_t_ESP_GATTC_REG_FOR_NOTIFY_EVT => {
                let p = unsafe { &(*param).reg_for_notify };
                NOTIFY_REG_STATUS.store(p.status as i32, Ordering::Release);
            }
            esp_gattc_cb_event_t_ESP_GATTC_WRITE_DESCR_EVT => {
                let p = unsafe { &(*param).write };
                DESCR_WRITE_STATUS.store(p.status as i32, Ordering::Release);
            }
            esp_gattc_cb_event_t_ESP_GATTC_NOTIFY_EVT => {
                let p = unsafe { &(*param).notify };
                if p.handle as u32 != NOTIFY_HANDLE.load(Ordering::Acquire) {
                    return;
                }
                let data = unsafe { core::slice::from_raw_parts(p.value, p.value_len as usize) };
                if let Ok(sink) = SINK.lock() {
                    if let Some(sink) = sink.as_ref() {
                        if !sink.deliver(data) {
                            log::warn!("BLE GATTC: notification queue full, payload dropped");
                        }
                    }
                }
            }
            esp_gattc_cb_event_t_ESP_GATTC_DISCONNECT_EVT => {
                let p = unsafe { &(*param).disconnect };
                link_down(p.conn_id, false);
            }
            esp_gattc_cb_event_t_ESP_GATTC_CLOSE_EVT => {
                let p = unsafe { &(*param).close };
                link_down(p.conn_id, true);
            }
            _ => {}
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BLE central adapter
// ───────────────────────────────────────────────────────────────

/// How long a blocking GATTC operation may wait for its event.
pub const GATT_TIMEOUT_MS: u32 = 10_000;

/// How long `disconnect` waits for the stack to confirm the close.
pub const CLOSE_TIMEOUT_MS: u32 = 2_000;

pub struct BleCentral {
    #[cfg(not(target_os = "espidf"))]
    sim: SimPeripheral,
}

/// Scripted peripheral behaviour for host builds.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimPeripheral {
    /// Whether `connect` succeeds.
    pub reachable: bool,
    /// UUIDs the peripheral advertises once connected.
    pub service_uuid: Option<u128>,
    pub notify_char_uuid: Option<u128>,
    /// Whether enabling notifications succeeds.
    pub subscribe_ok: bool,
    alive: bool,
    current_conn: Option<u16>,
    next_conn_id: u16,
    sink: Option<NotifySink>,
    connects: u32,
    disconnects: u32,
}

#[cfg(not(target_os = "espidf"))]
impl SimPeripheral {
    /// A reachable oximeter exposing the expected service and characteristic.
    pub fn oximeter() -> Self {
        Self {
            reachable: true,
            service_uuid: Some(crate::config::OXIMETER_SERVICE_UUID),
            notify_char_uuid: Some(crate::config::OXIMETER_NOTIFY_UUID),
            subscribe_ok: true,
            alive: false,
            current_conn: None,
            next_conn_id: 1,
            sink: None,
            connects: 0,
            disconnects: 0,
        }
    }
}

impl BleCentral {
    /// Bring up the controller and Bluedroid, then register as a GATT client.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, TransportError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        unsafe {
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return Err(TransportError::NotInitialised);
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return Err(TransportError::NotInitialised);
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return Err(TransportError::NotInitialised);
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return Err(TransportError::NotInitialised);
            }

            esp_ble_gattc_register_callback(Some(gattc::event_handler));
            esp_ble_gattc_app_register(0);
        }

        if !gattc::wait_until(GATT_TIMEOUT_MS, || gattc::REGISTERED.load(Ordering::Acquire)) {
            return Err(TransportError::Timeout);
        }
        info!("BLE(espidf): GATT client ready");
        Ok(Self {})
    }

    /// Simulated central backed by a scripted peripheral.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(peripheral: SimPeripheral) -> Self {
        Self { sim: peripheral }
    }

    /// Scripted peripheral, for tests to adjust mid-run.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim(&mut self) -> &mut SimPeripheral {
        &mut self.sim
    }

    /// Push a notification as the peripheral would.  Returns `false` if
    /// nothing is subscribed or the queue is full.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_notify(&self, bytes: &[u8]) -> bool {
        match (self.sim.alive, self.sim.sink.as_ref()) {
            (true, Some(sink)) => sink.deliver(bytes),
            _ => false,
        }
    }

    /// The peripheral drops the link without the central asking.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        info!("BLE(sim): peripheral dropped link");
        self.sim.alive = false;
    }

    /// Sink currently registered for notifications, if any.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_sink(&self) -> Option<NotifySink> {
        self.sim.sink
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_connects(&self) -> u32 {
        self.sim.connects
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_disconnects(&self) -> u32 {
        self.sim.disconnects
    }
}

// ───────────────────────────────────────────────────────────────
// CentralPort implementation (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl CentralPort for BleCentral {
    type Conn = ConnHandle;
    type Service = ServiceHandle;
    type Char = CharHandle;

    fn connect(&mut self, address: &PeerAddress) -> Result<ConnHandle, TransportError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        if gattc::OPEN_ABANDONED.load(Ordering::Acquire) {
            warn!("BLE GATTC: previous open still pending in the stack");
            return Err(TransportError::Busy);
        }
        gattc::OPEN_STATUS.store(gattc::PENDING, Ordering::Release);
        let mut bda = address.octets();
        let ret = unsafe {
            esp_ble_gattc_open(
                gattc::gattc_if(),
                bda.as_mut_ptr(),
                esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                true,
            )
        };
        if ret != ESP_OK as i32 {
            return Err(TransportError::Gatt(ret));
        }
        if !gattc::wait_until(GATT_TIMEOUT_MS, || {
            gattc::OPEN_STATUS.load(Ordering::Acquire) != gattc::PENDING
        }) {
            // Hand the open over to the event handler, which closes it if it
            // ever completes, then cancel the pending direct connection.
            gattc::OPEN_ABANDONED.store(true, Ordering::Release);
            if gattc::OPEN_STATUS.load(Ordering::Acquire) != gattc::PENDING
                && gattc::OPEN_ABANDONED.swap(false, Ordering::AcqRel)
            {
                // OPEN_EVT landed between the timeout and the hand-over.
                gattc::CONNECTED.store(false, Ordering::Release);
                if gattc::OPEN_STATUS.load(Ordering::Acquire) == esp_gatt_status_t_ESP_GATT_OK as i32 {
                    unsafe { esp_ble_gattc_close(gattc::gattc_if(), gattc::CONN_ID.load(Ordering::Acquire) as u16) };
                }
            }
            unsafe { esp_ble_gap_disconnect(bda.as_mut_ptr()) };
            warn!("BLE GATTC: open to {} timed out", address);
            return Err(TransportError::Timeout);
        }
        let status = gattc::OPEN_STATUS.load(Ordering::Acquire);
        if status != esp_gatt_status_t_ESP_GATT_OK as i32 {
            return Err(TransportError::Unreachable);
        }
        Ok(ConnHandle {
            conn_id: gattc::CONN_ID.load(Ordering::Acquire) as u16,
            peer: *address,
        })
    }

    fn is_alive(&self, conn: &ConnHandle) -> bool {
        use core::sync::atomic::Ordering;
        gattc::CONNECTED.load(Ordering::Acquire)
            && gattc::CONN_ID.load(Ordering::Acquire) as u16 == conn.conn_id
    }

    fn lookup_service(&mut self, conn: &ConnHandle, uuid: u128) -> Option<ServiceHandle> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        if let Ok(mut services) = gattc::SERVICES.lock() {
            services.clear();
        }
        gattc::SEARCH_DONE.store(false, Ordering::Release);
        let mut filter = gattc::uuid128_to_esp(uuid);
        let ret = unsafe { esp_ble_gattc_search_service(gattc::gattc_if(), conn.conn_id, &mut filter) };
        if ret != ESP_OK as i32 {
            warn!("BLE GATTC: search_service failed ({})", ret);
            return None;
        }
        if !gattc::wait_until(GATT_TIMEOUT_MS, || gattc::SEARCH_DONE.load(Ordering::Acquire)) {
            warn!("BLE GATTC: service search timed out");
            return None;
        }
        let services = gattc::SERVICES.lock().ok()?;
        services
            .iter()
            .find(|(u, _, _)| *u == uuid)
            .map(|&(_, start, end)| ServiceHandle {
                conn_id: conn.conn_id,
                peer: conn.peer,
                start,
                end,
            })
    }

    fn lookup_characteristic(&mut self, service: &ServiceHandle, uuid: u128) -> Option<CharHandle> {
        use esp_idf_svc::sys::*;

        let mut elem: esp_gattc_char_elem_t = unsafe { core::mem::zeroed() };
        let mut count: u16 = 1;
        let status = unsafe {
            esp_ble_gattc_get_char_by_uuid(
                gattc::gattc_if(),
                service.conn_id,
                service.start,
                service.end,
                gattc::uuid128_to_esp(uuid),
                &mut elem,
                &mut count,
            )
        };
        if status != esp_gatt_status_t_ESP_GATT_OK || count == 0 {
            return None;
        }
        Some(CharHandle {
            conn_id: service.conn_id,
            peer: service.peer,
            handle: elem.char_handle,
        })
    }

    fn subscribe(&mut self, characteristic: &CharHandle, sink: NotifySink) -> Result<(), TransportError> {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        // Park the sink before the stack can start delivering.
        if let Ok(mut slot) = gattc::SINK.lock() {
            *slot = Some(sink);
        }
        gattc::NOTIFY_HANDLE.store(characteristic.handle as u32, Ordering::Release);

        gattc::NOTIFY_REG_STATUS.store(gattc::PENDING, Ordering::Release);
        let mut bda = characteristic.peer.octets();
        let ret = unsafe {
            esp_ble_gattc_register_for_notify(gattc::gattc_if(), bda.as_mut_ptr(), characteristic.handle)
        };
        if ret != ESP_OK as i32 {
            return Err(TransportError::Gatt(ret));
        }
        if !gattc::wait_until(GATT_TIMEOUT_MS, || {
            gattc::NOTIFY_REG_STATUS.load(Ordering::Acquire) != gattc::PENDING
        }) {
            return Err(TransportError::Timeout);
        }
        let status = gattc::NOTIFY_REG_STATUS.load(Ordering::Acquire);
        if status != esp_gatt_status_t_ESP_GATT_OK as i32 {
            return Err(TransportError::Gatt(status));
        }

        // Enable notifications on the peripheral side through the CCCD.
        let mut descr: esp_gattc_descr_elem_t = unsafe { core::mem::zeroed() };
        let mut count: u16 = 1;
        let status = unsafe {
            esp_ble_gattc_get_descr_by_char_handle(
                gattc::gattc_if(),
                characteristic.conn_id,
                characteristic.handle,
                gattc::uuid16_to_esp(gattc::CCCD_UUID16),
                &mut descr,
                &mut count,
            )
        };
        if status != esp_gatt_status_t_ESP_GATT_OK || count == 0 {
            return Err(TransportError::Gatt(status as i32));
        }

        gattc::DESCR_WRITE_STATUS.store(gattc::PENDING, Ordering::Release);
        let mut enable = [0x01u8, 0x00];
        let ret = unsafe {
            esp_ble_gattc_write_char_descr(
                gattc::gattc_if(),
                characteristic.conn_id,
                descr.handle,
                enable.len() as u16,
                enable.as_mut_ptr(),
                esp_gatt_write_type_t_ESP_GATT_WRITE_TYPE_RSP,
                esp_gatt_auth_req_t_ESP_GATT_AUTH_REQ_NONE,
            )
        };
        if ret != ESP_OK as i32 {
            return Err(TransportError::Gatt(ret));
        }
        if !gattc::wait_until(GATT_TIMEOUT_MS, || {
            gattc::DESCR_WRITE_STATUS.load(Ordering::Acquire) != gattc::PENDING
        }) {
            return Err(TransportError::Timeout);
        }
        let status = gattc::DESCR_WRITE_STATUS.load(Ordering::Acquire);
        if status != esp_gatt_status_t_ESP_GATT_OK as i32 {
            return Err(TransportError::Gatt(status));
        }
        info!("BLE GATTC: notifications enabled (handle={})", characteristic.handle);
        Ok(())
    }

    fn disconnect(&mut self, conn: ConnHandle) {
        use core::sync::atomic::Ordering;
        use esp_idf_svc::sys::*;

        // Unsubscribe first: nothing may be delivered past this point.
        if let Ok(mut slot) = gattc::SINK.lock() {
            *slot = None;
        }
        let handle = gattc::NOTIFY_HANDLE.swap(0, Ordering::AcqRel) as u16;
        let mut bda = conn.peer.octets();
        gattc::CONNECTED.store(false, Ordering::Release);
        gattc::CLOSING_CONN.store(conn.conn_id as u32, Ordering::Release);
        unsafe {
            if handle != 0 {
                esp_ble_gattc_unregister_for_notify(gattc::gattc_if(), bda.as_mut_ptr(), handle);
            }
            esp_ble_gattc_close(gattc::gattc_if(), conn.conn_id);
        }
        // Wait for CLOSE_EVT so it cannot land on the next connection.
        if !gattc::wait_until(CLOSE_TIMEOUT_MS, || {
            gattc::CLOSING_CONN.load(Ordering::Acquire) == NO_CONN
        }) {
            warn!("BLE GATTC: no close confirmation for conn_id={}", conn.conn_id);
            gattc::CLOSING_CONN.store(NO_CONN, Ordering::Release);
        }
        info!("BLE GATTC: disconnected (conn_id={})", conn.conn_id);
    }
}

// ───────────────────────────────────────────────────────────────
// CentralPort implementation (simulation)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl CentralPort for BleCentral {
    type Conn = ConnHandle;
    type Service = ServiceHandle;
    type Char = CharHandle;

    fn connect(&mut self, address: &PeerAddress) -> Result<ConnHandle, TransportError> {
        self.sim.connects += 1;
        if !self.sim.reachable {
            info!("BLE(sim): {} unreachable", address);
            return Err(TransportError::Unreachable);
        }
        let conn_id = self.sim.next_conn_id;
        self.sim.next_conn_id = self.sim.next_conn_id.wrapping_add(1);
        self.sim.current_conn = Some(conn_id);
        self.sim.alive = true;
        info!("BLE(sim): connected to {} (conn_id={})", address, conn_id);
        Ok(ConnHandle { conn_id, peer: *address })
    }

    fn is_alive(&self, conn: &ConnHandle) -> bool {
        self.sim.alive && self.sim.current_conn == Some(conn.conn_id)
    }

    fn lookup_service(&mut self, conn: &ConnHandle, uuid: u128) -> Option<ServiceHandle> {
        (self.sim.service_uuid == Some(uuid)).then_some(ServiceHandle {
            conn_id: conn.conn_id,
            peer: conn.peer,
            start: 0x0028,
            end: 0xFFFF,
        })
    }

    fn lookup_characteristic(&mut self, service: &ServiceHandle, uuid: u128) -> Option<CharHandle> {
        (self.sim.notify_char_uuid == Some(uuid)).then_some(CharHandle {
            conn_id: service.conn_id,
            peer: service.peer,
            handle: 0x002B,
        })
    }

    fn subscribe(&mut self, characteristic: &CharHandle, sink: NotifySink) -> Result<(), TransportError> {
        if !self.sim.subscribe_ok {
            warn!("BLE(sim): CCCD write rejected");
            return Err(TransportError::Gatt(0x85));
        }
        info!(
            "BLE(sim): subscribed to handle {} (session {})",
            characteristic.handle,
            sink.session()
        );
        self.sim.sink = Some(sink);
        Ok(())
    }

    fn disconnect(&mut self, conn: ConnHandle) {
        self.sim.sink = None;
        if self.sim.current_conn == Some(conn.conn_id) {
            self.sim.current_conn = None;
        }
        self.sim.alive = false;
        self.sim.disconnects += 1;
        info!("BLE(sim): disconnected (conn_id={})", conn.conn_id);
    }
}
