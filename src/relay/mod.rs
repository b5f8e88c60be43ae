//! The byte-stream relay fabric.
//!
//! Six bounded byte channels connect the three endpoint adapters, and three
//! fixed routes pump bytes between them:
//!
//! ```text
//!  USB ──▶ usb-rx ─────────────────────────▶ uart-tx ──▶ STM32
//!  STM32 ─▶ uart-rx ──┬──▶ usb-tx ──▶ USB
//!                     └──▶ tcp-tx ──▶ TCP client   (only while connected)
//!  TCP ──▶ tcp-rx ────────────────────────▶ uart-tx ──▶ STM32
//! ```
//!
//! The wiring is a static table handed to a generic forwarding loop; no
//! channel is ever added or removed after startup.

pub mod channel;
pub mod forward;

use std::sync::Arc;

pub use channel::ByteChannel;
pub use forward::spawn_relay;

// ---------------------------------------------------------------------------
// Channel identity
// ---------------------------------------------------------------------------

/// Logical names of the six relay channels.
/// Must stay in sync with the array layout in [`ChannelSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelId {
    UsbRx = 0,
    UsbTx = 1,
    UartRx = 2,
    UartTx = 3,
    TcpRx = 4,
    TcpTx = 5,
}

impl ChannelId {
    /// Total number of channels — used to size the set.
    pub const COUNT: usize = 6;
}

// ---------------------------------------------------------------------------
// Channel set
// ---------------------------------------------------------------------------

/// The immutable mapping from [`ChannelId`] to channel instance.
/// Built once before any task starts and shared via `Arc` for process life.
pub struct ChannelSet {
    channels: [ByteChannel; ChannelId::COUNT],
}

impl ChannelSet {
    /// Create all six channels with the same capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: core::array::from_fn(|_| ByteChannel::new(capacity)),
        }
    }

    pub fn get(&self, id: ChannelId) -> &ByteChannel {
        &self.channels[id as usize]
    }
}

// ---------------------------------------------------------------------------
// Route table
// ---------------------------------------------------------------------------

/// Static descriptor for one forwarding route.
#[derive(Debug, Clone, Copy)]
pub struct RouteSpec {
    /// Task / log tag.
    pub name: &'static str,
    pub source: ChannelId,
    pub primary: ChannelId,
    /// Fan-out of one when `None`.
    pub secondary: Option<ChannelId>,
    /// Skip the secondary destination (discarding the data for it) while no
    /// TCP client is attached. Keeps tcp-tx empty across disconnection
    /// instead of queueing stale bytes for the next client.
    pub gate_secondary: bool,
}

/// The fixed relay topology.
pub static ROUTES: [RouteSpec; 3] = [
    RouteSpec {
        name: "fw usb->stm",
        source: ChannelId::UsbRx,
        primary: ChannelId::UartTx,
        secondary: None,
        gate_secondary: false,
    },
    RouteSpec {
        name: "fw stm->usb+tcp",
        source: ChannelId::UartRx,
        primary: ChannelId::UsbTx,
        secondary: Some(ChannelId::TcpTx),
        gate_secondary: true,
    },
    RouteSpec {
        name: "fw tcp->stm",
        source: ChannelId::TcpRx,
        primary: ChannelId::UartTx,
        secondary: None,
        gate_secondary: false,
    },
];

/// Shared handle type used by every relay task.
pub type SharedChannels = Arc<ChannelSet>;
