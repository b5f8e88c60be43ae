//! Unified error types for the bridge firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! relay and control-worker loops' error handling uniform. All variants are
//! `Copy` so results can be passed between tasks without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A byte-channel operation failed.
    Channel(ChannelError),
    /// A network or Wi-Fi subsystem call failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(e) => write!(f, "channel: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Byte-channel errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The payload did not fit within the timeout. The caller owns the data
    /// and decides whether to drop it; the channel performs no retry.
    Rejected,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "send rejected (buffer full)"),
        }
    }
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Channel(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// The TCP listener could not bind or listen on its port.
    /// Fatal to the TCP subsystem only; the USB↔UART relay keeps running.
    BindFailed,
    /// Applying an SSID or password to the Wi-Fi driver failed.
    WifiConfigFailed,
    /// The disconnect/connect cycle of a reconnect request failed.
    ReconnectFailed,
    /// Toggling the modem power-save mode failed.
    PowerSaveFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BindFailed => write!(f, "TCP bind/listen failed"),
            Self::WifiConfigFailed => write!(f, "Wi-Fi config update failed"),
            Self::ReconnectFailed => write!(f, "Wi-Fi reconnect failed"),
            Self::PowerSaveFailed => write!(f, "Wi-Fi power-save toggle failed"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
