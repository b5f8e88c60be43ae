//! Wire protocol of the control bus.
//!
//! Every write transaction is `[command byte, payload…]`; every read
//! transaction names a command whose response must already be staged when
//! the master clocks it out.
//!
//! | byte | direction | payload  | effect                               |
//! |------|-----------|----------|--------------------------------------|
//! | 0x01 | read      | —        | firmware version (reserved)          |
//! | 0x02 | read      | —        | IPv4 address, 4 bytes little-endian  |
//! | 0x03 | write     | ≤32 B    | stage SSID, queue apply              |
//! | 0x04 | write     | ≤64 B    | stage password, queue apply          |
//! | 0x05 | write     | —        | queue reconnect                      |

/// Firmware version query (read). Reserved — answered with an empty buffer.
pub const CMD_VERSION: u8 = 0x01;
/// Current IPv4 address query (read).
pub const CMD_IP: u8 = 0x02;
/// Stage a new station SSID (write).
pub const CMD_SET_SSID: u8 = 0x03;
/// Stage a new station password (write).
pub const CMD_SET_PASSWORD: u8 = 0x04;
/// Re-associate with the currently configured network (write).
pub const CMD_RECONNECT: u8 = 0x05;

/// Maximum SSID length (802.11 limit).
pub const SSID_MAX: usize = 32;
/// Maximum WPA passphrase length.
pub const PASSWORD_MAX: usize = 64;
/// Largest read-transaction response the bus ever produces.
pub const RESPONSE_MAX: usize = 8;
/// Commands the queue can hold before further ones are dropped.
pub const QUEUE_DEPTH: usize = 10;

/// A queued write command. Only the tag travels through the queue; the
/// payload is read from the staging buffers when the command is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    SetSsid,
    SetPassword,
    Reconnect,
}
