//! TCP client link state machine.
//!
//! Two states, `Disconnected` (initial) and `Connected`, owned by the TCP
//! accept loop and observed by the tcp-tx forwarding path and the tcp-rx
//! pump. Transitions are edge-counted and broadcast on a condvar so a task
//! blocked on "became connected" (or "became disconnected") wakes once per
//! transition, exactly like an event-group wait.
//!
//! The `is_connected()` fast path is a bare atomic read: the tcp-tx path
//! checks it immediately before every network write and tolerates the
//! narrow race where a disconnect lands mid-check — the resulting transport
//! error is treated as a dropped chunk, never as a fault.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Disconnected,
    Connected,
}

#[derive(Debug, Default)]
struct Edges {
    connects: u64,
    disconnects: u64,
}

/// Single-writer (accept loop / rx pump) multiple-reader link state.
/// Constructed once at startup, alive for the process lifetime.
pub struct LinkState {
    connected: AtomicBool,
    edges: Mutex<Edges>,
    changed: Condvar,
}

impl LinkState {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            edges: Mutex::new(Edges::default()),
            changed: Condvar::new(),
        }
    }

    /// Race-tolerant snapshot used by per-write guards.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn status(&self) -> LinkStatus {
        if self.is_connected() {
            LinkStatus::Connected
        } else {
            LinkStatus::Disconnected
        }
    }

    /// Record the `Disconnected → Connected` edge.
    ///
    /// Returns `false` without touching anything when a client is already
    /// attached — a second connection attempt is refused, not queued.
    pub fn mark_connected(&self) -> bool {
        let mut edges = self.edges.lock().expect("link state mutex poisoned");
        if self.connected.load(Ordering::Relaxed) {
            return false;
        }
        self.connected.store(true, Ordering::Release);
        edges.connects += 1;
        self.changed.notify_all();
        true
    }

    /// Record the `Connected → Disconnected` edge.
    /// Returns `false` when no client was attached.
    pub fn mark_disconnected(&self) -> bool {
        let mut edges = self.edges.lock().expect("link state mutex poisoned");
        if !self.connected.load(Ordering::Relaxed) {
            return false;
        }
        self.connected.store(false, Ordering::Release);
        edges.disconnects += 1;
        self.changed.notify_all();
        true
    }

    /// Block the caller until a client is attached.
    pub fn wait_until_connected(&self) {
        let mut edges = self.edges.lock().expect("link state mutex poisoned");
        while !self.connected.load(Ordering::Relaxed) {
            edges = self
                .changed
                .wait(edges)
                .expect("link state mutex poisoned");
        }
    }

    /// Block the caller for as long as a client stays attached.
    pub fn wait_while_connected(&self) {
        let mut edges = self.edges.lock().expect("link state mutex poisoned");
        while self.connected.load(Ordering::Relaxed) {
            edges = self
                .changed
                .wait(edges)
                .expect("link state mutex poisoned");
        }
    }

    /// Bounded variant of [`wait_until_connected`](Self::wait_until_connected);
    /// returns whether a client is attached when it gives up.
    pub fn wait_until_connected_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut edges = self.edges.lock().expect("link state mutex poisoned");
        while !self.connected.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .changed
                .wait_timeout(edges, deadline - now)
                .expect("link state mutex poisoned");
            edges = guard;
        }
        true
    }

    /// Number of completed `→ Connected` edges since startup.
    pub fn sessions(&self) -> u64 {
        self.edges
            .lock()
            .expect("link state mutex poisoned")
            .connects
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}
