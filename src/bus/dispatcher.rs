//! Control-bus dispatcher: interrupt-side staging, task-side application.
//!
//! `on_write`/`on_read` run in the bus interrupt callback and must return
//! quickly: they stage bytes under a critical section, enqueue a one-byte
//! command tag without blocking, and never log. The heavier Wi-Fi
//! configuration calls happen on the worker task that drains the queue.
//!
//! Shared-state rules (the only ISR↔task state in the firmware):
//! - the command queue is a bounded MPMC channel with drop-on-full
//!   `try_send` from the ISR side;
//! - each staging buffer is written whole under a critical section and read
//!   whole under the same lock, so a reader never observes a torn value;
//! - the published IP is a single atomic word.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex as StdMutex;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as IsrMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::ports::WifiControlPort;

use super::protocol::{
    ControlCommand, CMD_IP, CMD_RECONNECT, CMD_SET_PASSWORD, CMD_SET_SSID, CMD_VERSION,
    PASSWORD_MAX, QUEUE_DEPTH, RESPONSE_MAX, SSID_MAX,
};

type Staging<const N: usize> = IsrMutex<CriticalSectionRawMutex, RefCell<[u8; N]>>;

/// The bridge's control-channel state. One static instance serves the
/// firmware; tests construct their own.
pub struct ControlBus {
    queue: Channel<CriticalSectionRawMutex, ControlCommand, QUEUE_DEPTH>,
    ssid: Staging<SSID_MAX>,
    password: Staging<PASSWORD_MAX>,
    /// Latest IPv4 address in lwIP byte order; 0 while unassigned.
    /// Written by the Wi-Fi adapter, read by bus IP queries.
    ip: AtomicU32,
}

/// The firmware-wide control bus instance.
pub static CONTROL_BUS: ControlBus = ControlBus::new();

impl ControlBus {
    pub const fn new() -> Self {
        Self {
            queue: Channel::new(),
            ssid: IsrMutex::new(RefCell::new([0; SSID_MAX])),
            password: IsrMutex::new(RefCell::new([0; PASSWORD_MAX])),
            ip: AtomicU32::new(0),
        }
    }

    // ── Interrupt-side entry points ───────────────────────────

    /// Handle a completed write transaction: `frame[0]` is the command
    /// byte, the rest is payload. Runs in the bus interrupt callback —
    /// no blocking, no logging.
    ///
    /// Oversized payloads are discarded without touching the staging
    /// buffer or the queue; the master gets no NACK beyond what the bus
    /// protocol itself provides.
    pub fn on_write(&self, frame: &[u8]) {
        let Some((&cmd, payload)) = frame.split_first() else {
            return;
        };
        match cmd {
            CMD_SET_SSID => self.stage(&self.ssid, payload, ControlCommand::SetSsid),
            CMD_SET_PASSWORD => self.stage(&self.password, payload, ControlCommand::SetPassword),
            CMD_RECONNECT => self.enqueue(ControlCommand::Reconnect),
            // Read commands and unknown bytes carry no write action.
            _ => {}
        }
    }

    /// Populate the response for a read transaction. Runs in the bus
    /// interrupt callback when the read begins — the master expects the
    /// bytes within the same transaction, so nothing goes through the
    /// queue here.
    pub fn on_read(&self, cmd: u8) -> heapless::Vec<u8, RESPONSE_MAX> {
        let mut response = heapless::Vec::new();
        match cmd {
            // Version responses are reserved; masters treat an empty
            // read as unsupported.
            CMD_VERSION => {}
            CMD_IP => {
                let ip = self.ip.load(Ordering::Relaxed);
                // lwIP stores the address little-endian, first octet in
                // the low byte; the wire format is the same four bytes.
                let _ = response.extend_from_slice(&ip.to_le_bytes());
            }
            _ => {}
        }
        response
    }

    // ── IP register ───────────────────────────────────────────

    /// Publish the current IPv4 address (0 to clear). Called by the Wi-Fi
    /// adapter on address acquisition and loss.
    pub fn publish_ip(&self, ip: u32) {
        self.ip.store(ip, Ordering::Relaxed);
    }

    pub fn published_ip(&self) -> u32 {
        self.ip.load(Ordering::Relaxed)
    }

    // ── Worker-side application ───────────────────────────────

    /// Apply one queued command if any is pending. Returns whether a
    /// command was applied.
    pub fn try_service<W: WifiControlPort + ?Sized>(&self, wifi: &mut W) -> bool {
        match self.queue.try_receive() {
            Ok(cmd) => {
                self.apply(cmd, wifi);
                true
            }
            Err(_) => false,
        }
    }

    /// Worker loop: drain the queue forever, one Wi-Fi call per command.
    pub fn run<W: WifiControlPort + Send>(&self, wifi: &StdMutex<W>) {
        info!("control worker started");
        loop {
            let cmd = futures_lite::future::block_on(self.queue.receive());
            let mut wifi = wifi.lock().expect("wifi port mutex poisoned");
            self.apply(cmd, &mut *wifi);
        }
    }

    /// Snapshot of the staged SSID (test and diagnostics use).
    pub fn staged_ssid(&self) -> [u8; SSID_MAX] {
        self.ssid.lock(|b| *b.borrow())
    }

    /// Snapshot of the staged password (test and diagnostics use).
    pub fn staged_password(&self) -> [u8; PASSWORD_MAX] {
        self.password.lock(|b| *b.borrow())
    }

    // ── Internal ──────────────────────────────────────────────

    fn stage<const N: usize>(&self, slot: &Staging<N>, payload: &[u8], cmd: ControlCommand) {
        if payload.len() > N {
            // Over the declared maximum: the staging buffer keeps its
            // previous value and nothing is enqueued.
            return;
        }
        slot.lock(|buf| {
            let mut buf = buf.borrow_mut();
            buf.fill(0);
            buf[..payload.len()].copy_from_slice(payload);
        });
        self.enqueue(cmd);
    }

    fn enqueue(&self, cmd: ControlCommand) {
        // Queue full ⇒ the command is lost. The bus transaction itself must
        // still succeed, so there is nothing useful to do here.
        let _ = self.queue.try_send(cmd);
    }

    fn apply<W: WifiControlPort + ?Sized>(&self, cmd: ControlCommand, wifi: &mut W) {
        match cmd {
            ControlCommand::SetSsid => {
                let ssid = self.ssid.lock(|b| *b.borrow());
                match wifi.set_ssid(&ssid) {
                    Ok(()) => info!("bus: SSID updated"),
                    Err(e) => warn!("bus: SSID update failed: {e}"),
                }
            }
            ControlCommand::SetPassword => {
                let password = self.password.lock(|b| *b.borrow());
                match wifi.set_password(&password) {
                    Ok(()) => info!("bus: password updated"),
                    Err(e) => warn!("bus: password update failed: {e}"),
                }
            }
            ControlCommand::Reconnect => match wifi.reconnect() {
                Ok(()) => info!("bus: reconnect triggered"),
                Err(e) => warn!("bus: reconnect failed: {e}"),
            },
        }
    }
}

impl Default for ControlBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::wifi_sim::SimWifiControl;

    fn ssid_frame(payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![CMD_SET_SSID];
        frame.extend_from_slice(payload);
        frame
    }

    #[test]
    fn ssid_is_staged_zero_padded_and_queued() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();

        bus.on_write(&ssid_frame(b"lab-net"));
        let mut expected = [0u8; SSID_MAX];
        expected[..7].copy_from_slice(b"lab-net");
        assert_eq!(bus.staged_ssid(), expected);

        assert!(bus.try_service(&mut wifi));
        assert_eq!(wifi.ssid, expected);
        assert!(!bus.try_service(&mut wifi));
    }

    #[test]
    fn exact_limit_payload_is_applied_unmodified() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();
        let full = [b'x'; SSID_MAX];

        bus.on_write(&ssid_frame(&full));
        assert!(bus.try_service(&mut wifi));
        assert_eq!(wifi.ssid, full);
    }

    #[test]
    fn oversized_payload_leaves_staging_and_queue_untouched() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();

        bus.on_write(&ssid_frame(b"before"));
        assert!(bus.try_service(&mut wifi));

        let oversize = [b'y'; SSID_MAX + 1];
        bus.on_write(&ssid_frame(&oversize));
        let mut expected = [0u8; SSID_MAX];
        expected[..6].copy_from_slice(b"before");
        assert_eq!(bus.staged_ssid(), expected);
        assert!(!bus.try_service(&mut wifi));
    }

    #[test]
    fn repeated_ssid_writes_are_idempotent() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();

        bus.on_write(&ssid_frame(b"same"));
        assert!(bus.try_service(&mut wifi));
        let first = (bus.staged_ssid(), wifi.ssid);

        bus.on_write(&ssid_frame(b"same"));
        assert!(bus.try_service(&mut wifi));
        assert_eq!((bus.staged_ssid(), wifi.ssid), first);
    }

    #[test]
    fn password_uses_its_own_staging_buffer() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();

        let mut frame = vec![CMD_SET_PASSWORD];
        frame.extend_from_slice(b"hunter22");
        bus.on_write(&frame);

        assert!(bus.try_service(&mut wifi));
        let mut expected = [0u8; PASSWORD_MAX];
        expected[..8].copy_from_slice(b"hunter22");
        assert_eq!(bus.staged_password(), expected);
        assert_eq!(wifi.password, expected);
        // The SSID staging is untouched.
        assert_eq!(bus.staged_ssid(), [0; SSID_MAX]);
    }

    #[test]
    fn each_queued_reconnect_invokes_the_port_once() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();

        // Two commands arrive back-to-back before the worker runs.
        bus.on_write(&[CMD_RECONNECT]);
        bus.on_write(&[CMD_RECONNECT]);

        assert!(bus.try_service(&mut wifi));
        assert!(bus.try_service(&mut wifi));
        assert!(!bus.try_service(&mut wifi));
        assert_eq!(wifi.reconnects, 2);
    }

    #[test]
    fn queue_overflow_drops_commands_silently() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();

        for _ in 0..QUEUE_DEPTH + 5 {
            bus.on_write(&[CMD_RECONNECT]);
        }
        let mut applied = 0;
        while bus.try_service(&mut wifi) {
            applied += 1;
        }
        assert_eq!(applied, QUEUE_DEPTH);
        assert_eq!(wifi.reconnects, QUEUE_DEPTH as u32);
    }

    #[test]
    fn ip_read_reflects_published_address() {
        let bus = ControlBus::new();
        // No address yet: all zeroes, exactly four bytes.
        assert_eq!(bus.on_read(CMD_IP).as_slice(), &[0, 0, 0, 0]);

        // 192.168.4.1 in lwIP (little-endian) storage.
        bus.publish_ip(u32::from_le_bytes([192, 168, 4, 1]));
        assert_eq!(bus.on_read(CMD_IP).as_slice(), &[192, 168, 4, 1]);
    }

    #[test]
    fn version_read_is_reserved_and_empty() {
        let bus = ControlBus::new();
        assert!(bus.on_read(CMD_VERSION).is_empty());
    }

    #[test]
    fn unknown_and_empty_frames_are_ignored() {
        let bus = ControlBus::new();
        let mut wifi = SimWifiControl::new();
        bus.on_write(&[]);
        bus.on_write(&[0x7F, 1, 2, 3]);
        bus.on_write(&[CMD_IP]); // read command in a write frame
        assert!(!bus.try_service(&mut wifi));
    }
}
