//! USB-Serial-JTAG endpoint adapter.
//!
//! Pumps bytes between the host-facing USB CDC port and the usb-rx/usb-tx
//! channels. The driver does its own FIFO buffering; these loops only move
//! whole chunks with short driver timeouts so they stay responsive.

use std::sync::Arc;
use std::time::Duration;

use esp_idf_hal::delay::TickType;
use esp_idf_hal::usb_serial::{UsbSerialConfig, UsbSerialDriver};
use esp_idf_hal::peripheral::Peripheral;
use log::{info, warn};

use crate::config::BridgeConfig;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::{Error, Result};
use crate::relay::{ChannelId, ChannelSet};

const READ_BUF: usize = 1024;
const DRIVER_TIMEOUT_MS: u32 = 20;
const CHANNEL_SEND_TIMEOUT: Duration = Duration::from_secs(1);
const CHANNEL_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Install the USB-Serial-JTAG driver and spawn the rx/tx pumps.
pub fn spawn(
    usb_serial: impl Peripheral<P = esp_idf_hal::usb_serial::USB_SERIAL> + 'static,
    channels: Arc<ChannelSet>,
    cfg: &BridgeConfig,
) -> Result<()> {
    let driver = UsbSerialDriver::new(usb_serial, &UsbSerialConfig::new())
        .map_err(|_| Error::Init("USB serial driver"))?;
    let driver = Arc::new(std::sync::Mutex::new(driver));
    info!("usb: serial-jtag driver installed");

    let chunk = cfg.forward_chunk;
    {
        let driver = Arc::clone(&driver);
        let channels = Arc::clone(&channels);
        spawn_on_core(Core::App, 10, 8, "usb rx", move || {
            let usb_rx = channels.get(ChannelId::UsbRx);
            let mut buf = [0u8; READ_BUF];
            loop {
                let n = {
                    let mut drv = driver.lock().expect("usb driver mutex poisoned");
                    drv.read(&mut buf, TickType::new_millis(DRIVER_TIMEOUT_MS.into()).ticks())
                        .unwrap_or(0)
                };
                if n > 0 && usb_rx.send(&buf[..n], CHANNEL_SEND_TIMEOUT).is_err() {
                    warn!("usb rx: relay buffer full, dropped {n} bytes");
                }
            }
        });
    }
    {
        spawn_on_core(Core::App, 10, 8, "usb tx", move || {
            let usb_tx = channels.get(ChannelId::UsbTx);
            loop {
                let Some(data) = usb_tx.recv_up_to(chunk, CHANNEL_RECV_TIMEOUT) else {
                    continue;
                };
                let mut drv = driver.lock().expect("usb driver mutex poisoned");
                if drv
                    .write(&data, TickType::new_millis(DRIVER_TIMEOUT_MS.into()).ticks())
                    .is_err()
                {
                    warn!("usb tx: driver write failed, dropped {} bytes", data.len());
                }
            }
        });
    }

    Ok(())
}
