//! I2C-slave glue between the bus peripheral and the control dispatcher.
//!
//! The bridge answers on a fixed slave address. A write transaction
//! delivers `[command, payload…]` to [`ControlBus::on_write`]; a read
//! transaction is answered from [`ControlBus::on_read`], which must be
//! staged before the master clocks the response out — the response buffer
//! is therefore refilled as soon as the command byte of a read command
//! arrives.

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio;
use esp_idf_hal::i2c::{I2cSlaveConfig, I2cSlaveDriver, I2C0};
use esp_idf_hal::peripheral::Peripheral;
use log::info;

use crate::bus::{ControlBus, CMD_IP, CMD_VERSION};
use crate::config::BridgeConfig;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::{Error, Result};

/// Largest transaction the master may send: command + password payload.
const FRAME_MAX: usize = 1 + crate::bus::PASSWORD_MAX;

/// Install the I2C slave driver and spawn the transaction service task.
pub fn spawn(
    i2c: impl Peripheral<P = I2C0> + 'static,
    sda: impl Peripheral<P = impl gpio::InputPin + gpio::OutputPin> + 'static,
    scl: impl Peripheral<P = impl gpio::InputPin + gpio::OutputPin> + 'static,
    bus: &'static ControlBus,
    cfg: &BridgeConfig,
) -> Result<()> {
    let config = I2cSlaveConfig::new()
        .rx_buffer_length(FRAME_MAX * 2)
        .tx_buffer_length(crate::bus::RESPONSE_MAX * 2);
    let mut driver = I2cSlaveDriver::new(i2c, sda, scl, cfg.bus_address, &config)
        .map_err(|_| Error::Init("I2C slave driver"))?;
    info!("bus: I2C slave at 0x{:02x}", cfg.bus_address);

    spawn_on_core(Core::App, 10, 8, "i2c slave", move || {
        let mut frame = [0u8; FRAME_MAX];
        loop {
            let Ok(n) = driver.read(&mut frame, TickType::new_millis(1000).ticks()) else {
                continue;
            };
            if n == 0 {
                continue;
            }
            match frame[0] {
                // Read commands: stage the response for the master's
                // repeated-start read phase.
                cmd @ (CMD_VERSION | CMD_IP) => {
                    let response = bus.on_read(cmd);
                    if !response.is_empty() {
                        let _ = driver.write(&response, TickType::new_millis(100).ticks());
                    }
                }
                _ => bus.on_write(&frame[..n]),
            }
        }
    });

    Ok(())
}
