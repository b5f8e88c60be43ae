//! ESP-IDF Wi-Fi station adapter.
//!
//! Implements [`WifiControlPort`] over `EspWifi`. The adapter owns no
//! connection policy — ESP-IDF's station machinery handles association and
//! retry; this code only applies credentials, toggles power saving, and
//! publishes the acquired IPv4 address to the control bus so IP queries can
//! be answered from interrupt context.

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use crate::bus::{ControlBus, PASSWORD_MAX, SSID_MAX};
use crate::error::{CommsError, Error, Result};
use crate::ports::WifiControlPort;

pub struct EspWifiControl {
    wifi: EspWifi<'static>,
    bus: &'static ControlBus,
}

impl EspWifiControl {
    /// Bring the station interface up with whatever credentials the Wi-Fi
    /// NVS partition remembers. Association happens in the background.
    pub fn init(modem: Modem, bus: &'static ControlBus) -> Result<Self> {
        let sysloop = EspSystemEventLoop::take().map_err(|_| Error::Init("system event loop"))?;
        let nvs = EspDefaultNvsPartition::take().map_err(|_| Error::Init("NVS partition"))?;

        let mut wifi = EspWifi::new(modem, sysloop, Some(nvs)).map_err(|_| Error::Init("Wi-Fi driver"))?;

        // Station mode with the stored configuration; an empty SSID just
        // means the bus master has not provisioned us yet.
        if wifi.get_configuration().map_err(|_| Error::Init("Wi-Fi config"))?
            == Configuration::None
        {
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                auth_method: AuthMethod::WPA2Personal,
                ..ClientConfiguration::default()
            }))
            .map_err(|_| Error::Init("Wi-Fi config"))?;
        }

        wifi.start().map_err(|_| Error::Init("Wi-Fi start"))?;
        if let Err(e) = wifi.connect() {
            // Not fatal: provisioning over the control bus comes later.
            warn!("wifi: initial connect failed ({e:?}), waiting for credentials");
        }

        // Modem power saving on by default; TCP sessions switch it off.
        unsafe {
            esp_idf_sys::esp_wifi_set_ps(esp_idf_sys::wifi_ps_type_t_WIFI_PS_MAX_MODEM);
        }

        let adapter = Self { wifi, bus };
        adapter.refresh_ip();
        Ok(adapter)
    }

    /// Re-read the station netif address and publish it to the control bus.
    /// Called after (re)connects and polled by the main loop.
    pub fn refresh_ip(&self) {
        let ip = self
            .wifi
            .sta_netif()
            .get_ip_info()
            .map(|netif| u32::from_le_bytes(netif.ip.octets()))
            .unwrap_or(0);
        self.bus.publish_ip(ip);
    }

    fn client_config(&mut self) -> Result<ClientConfiguration> {
        match self
            .wifi
            .get_configuration()
            .map_err(|_| Error::from(CommsError::WifiConfigFailed))?
        {
            Configuration::Client(c) => Ok(c),
            _ => Ok(ClientConfiguration::default()),
        }
    }

    fn apply_client_config(&mut self, config: ClientConfiguration) -> Result<()> {
        self.wifi
            .set_configuration(&Configuration::Client(config))
            .map_err(|_| Error::from(CommsError::WifiConfigFailed))
    }
}

/// Strip the zero padding of a staged credential buffer.
fn trimmed(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

impl WifiControlPort for EspWifiControl {
    fn ip(&self) -> u32 {
        self.bus.published_ip()
    }

    fn set_ssid(&mut self, ssid: &[u8; SSID_MAX]) -> Result<()> {
        let mut config = self.client_config()?;
        config.ssid = core::str::from_utf8(trimmed(ssid))
            .map_err(|_| Error::from(CommsError::WifiConfigFailed))?
            .try_into()
            .map_err(|_| Error::from(CommsError::WifiConfigFailed))?;
        self.apply_client_config(config)?;
        info!("wifi: SSID updated");
        Ok(())
    }

    fn set_password(&mut self, password: &[u8; PASSWORD_MAX]) -> Result<()> {
        let mut config = self.client_config()?;
        config.password = core::str::from_utf8(trimmed(password))
            .map_err(|_| Error::from(CommsError::WifiConfigFailed))?
            .try_into()
            .map_err(|_| Error::from(CommsError::WifiConfigFailed))?;
        self.apply_client_config(config)
    }

    fn reconnect(&mut self) -> Result<()> {
        self.bus.publish_ip(0);
        self.wifi
            .disconnect()
            .map_err(|_| Error::from(CommsError::ReconnectFailed))?;
        self.wifi
            .connect()
            .map_err(|_| Error::from(CommsError::ReconnectFailed))?;
        info!("wifi: reconnecting");
        Ok(())
    }

    fn set_power_save(&mut self, enabled: bool) -> Result<()> {
        let mode = if enabled {
            esp_idf_sys::wifi_ps_type_t_WIFI_PS_MAX_MODEM
        } else {
            esp_idf_sys::wifi_ps_type_t_WIFI_PS_NONE
        };
        let ret = unsafe { esp_idf_sys::esp_wifi_set_ps(mode) };
        if ret != esp_idf_sys::ESP_OK {
            return Err(CommsError::PowerSaveFailed.into());
        }
        Ok(())
    }
}
