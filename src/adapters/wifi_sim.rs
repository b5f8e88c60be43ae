//! In-memory Wi-Fi control stand-in.
//!
//! Records every port call so host-side tests can assert on the applied
//! configuration and the power-save history without a radio. Also serves
//! as the Wi-Fi backend when the relay core is exercised on a dev machine.

use log::info;

use crate::bus::{PASSWORD_MAX, SSID_MAX};
use crate::ports::WifiControlPort;
use crate::Result;

pub struct SimWifiControl {
    pub ssid: [u8; SSID_MAX],
    pub password: [u8; PASSWORD_MAX],
    pub reconnects: u32,
    pub power_save: bool,
    /// Every value ever passed to `set_power_save`, in order.
    pub power_save_history: Vec<bool>,
    pub ip: u32,
}

impl SimWifiControl {
    pub fn new() -> Self {
        Self {
            ssid: [0; SSID_MAX],
            password: [0; PASSWORD_MAX],
            reconnects: 0,
            // The radio boots with modem power saving on.
            power_save: true,
            power_save_history: Vec::new(),
            ip: 0,
        }
    }
}

impl Default for SimWifiControl {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiControlPort for SimWifiControl {
    fn ip(&self) -> u32 {
        self.ip
    }

    fn set_ssid(&mut self, ssid: &[u8; SSID_MAX]) -> Result<()> {
        self.ssid = *ssid;
        Ok(())
    }

    fn set_password(&mut self, password: &[u8; PASSWORD_MAX]) -> Result<()> {
        self.password = *password;
        Ok(())
    }

    fn reconnect(&mut self) -> Result<()> {
        self.reconnects += 1;
        info!("wifi(sim): reconnect #{}", self.reconnects);
        Ok(())
    }

    fn set_power_save(&mut self, enabled: bool) -> Result<()> {
        self.power_save = enabled;
        self.power_save_history.push(enabled);
        Ok(())
    }
}
