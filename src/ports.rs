//! Port traits — the boundary between the bridge core and its collaborators.
//!
//! The control-channel worker and the TCP accept loop drive the Wi-Fi
//! subsystem exclusively through [`WifiControlPort`]; the core owns no
//! Wi-Fi connection logic itself. Adapters (real ESP-IDF driver, in-memory
//! test double) implement the trait.

use crate::bus::{PASSWORD_MAX, SSID_MAX};
use crate::Result;

/// Out-of-band control surface of the Wi-Fi subsystem.
///
/// Credentials are fixed-size zero-padded buffers, applied whole — the
/// staging discipline in the control bus guarantees a reader never sees a
/// partially written value.
pub trait WifiControlPort {
    /// Current IPv4 address in lwIP byte order, 0 while unassigned.
    fn ip(&self) -> u32;

    /// Replace the station SSID (zero-padded to 32 bytes).
    fn set_ssid(&mut self, ssid: &[u8; SSID_MAX]) -> Result<()>;

    /// Replace the station password (zero-padded to 64 bytes).
    fn set_password(&mut self, password: &[u8; PASSWORD_MAX]) -> Result<()>;

    /// Drop the current association and reconnect with the stored config.
    fn reconnect(&mut self) -> Result<()>;

    /// Toggle modem power saving. Disabled for the duration of a TCP
    /// session to keep relay latency down.
    fn set_power_save(&mut self, enabled: bool) -> Result<()>;
}
