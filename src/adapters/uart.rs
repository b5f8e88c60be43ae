//! STM32 controller UART endpoint adapter.
//!
//! UART2 at the configured baud rate with 8E1 framing, bound to the
//! uart-rx/uart-tx channels. Hardware FIFO overflow and framing trouble
//! are resolved inside the driver (flush and carry on) and never surface
//! as channel-level errors.

use std::sync::Arc;
use std::time::Duration;

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use esp_idf_hal::uart::{config, UartDriver};
use log::{info, warn};

use crate::config::BridgeConfig;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::{Error, Result};
use crate::relay::{ChannelId, ChannelSet};

const READ_BUF: usize = 256;
const DRIVER_TIMEOUT_MS: u32 = 20;
/// The STM32 link lives on UART2.
const UART_PORT: esp_idf_sys::uart_port_t = 2;
const CHANNEL_SEND_TIMEOUT: Duration = Duration::from_secs(1);
const CHANNEL_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// Install the UART driver and spawn the rx/tx pumps.
pub fn spawn(
    uart: impl Peripheral<P = esp_idf_hal::uart::UART2> + 'static,
    tx_pin: impl Peripheral<P = impl gpio::OutputPin> + 'static,
    rx_pin: impl Peripheral<P = impl gpio::InputPin> + 'static,
    channels: Arc<ChannelSet>,
    cfg: &BridgeConfig,
) -> Result<()> {
    let uart_config = config::Config::new()
        .baudrate(Hertz(cfg.uart_baud))
        .parity_even()
        .stop_bits(config::StopBits::STOP1)
        .flow_control(config::FlowControl::None);

    let driver = UartDriver::new(
        uart,
        tx_pin,
        rx_pin,
        Option::<gpio::AnyIOPin>::None,
        Option::<gpio::AnyIOPin>::None,
        &uart_config,
    )
    .map_err(|_| Error::Init("UART driver"))?;

    // Fire the rx interrupt after 32 buffered bytes or 5 idle symbol
    // periods, whichever comes first: small enough for low relay latency,
    // large enough to batch full protocol frames.
    unsafe {
        esp_idf_sys::uart_set_rx_full_threshold(UART_PORT, 32);
        esp_idf_sys::uart_set_rx_timeout(UART_PORT, 5);
    }
    info!("uart: driver installed at {} baud 8E1", cfg.uart_baud);

    let (uart_tx_half, uart_rx_half) = driver.into_split();
    let chunk = cfg.forward_chunk;

    {
        let channels = Arc::clone(&channels);
        spawn_on_core(Core::App, 10, 8, "uart rx", move || {
            let uart_rx = channels.get(ChannelId::UartRx);
            let mut buf = [0u8; READ_BUF];
            loop {
                match uart_rx_half.read(&mut buf, TickType::new_millis(DRIVER_TIMEOUT_MS.into()).ticks())
                {
                    Ok(0) | Err(_) => {}
                    Ok(n) => {
                        if uart_rx.send(&buf[..n], CHANNEL_SEND_TIMEOUT).is_err() {
                            warn!("uart rx: relay buffer full, dropped {n} bytes");
                        }
                    }
                }
            }
        });
    }
    {
        spawn_on_core(Core::App, 10, 8, "uart tx", move || {
            let uart_tx = channels.get(ChannelId::UartTx);
            loop {
                let Some(data) = uart_tx.recv_up_to(chunk, CHANNEL_RECV_TIMEOUT) else {
                    continue;
                };
                if uart_tx_half.write(&data).is_err() {
                    warn!("uart tx: driver write failed, dropped {} bytes", data.len());
                }
            }
        });
    }

    Ok(())
}
