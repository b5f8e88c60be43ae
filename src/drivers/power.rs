//! CPU power management setup.
//!
//! Enables dynamic frequency scaling between 40 and 160 MHz. Light sleep
//! stays off: wake latency from light sleep is long enough to cost relay
//! bytes at 115200 baud.

use log::info;

use crate::error::{Error, Result};

const MAX_FREQ_MHZ: i32 = 160;
const MIN_FREQ_MHZ: i32 = 40;

pub fn init_power_management() -> Result<()> {
    let config = esp_idf_sys::esp_pm_config_t {
        max_freq_mhz: MAX_FREQ_MHZ,
        min_freq_mhz: MIN_FREQ_MHZ,
        light_sleep_enable: false,
    };

    let ret = unsafe { esp_idf_sys::esp_pm_configure(&config as *const _ as *const _) };
    if ret != esp_idf_sys::ESP_OK {
        return Err(Error::Init("esp_pm_configure"));
    }

    info!(
        "power management: {}–{} MHz DFS, light sleep off",
        MIN_FREQ_MHZ, MAX_FREQ_MHZ
    );
    Ok(())
}
