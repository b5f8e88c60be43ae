//! StimBridge firmware — main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Adapters (outer ring)                  │
//! │                                                              │
//! │   UsbSerial        Uart (STM32)       Tcp        BusGlue     │
//! │   usb-rx/usb-tx    uart-rx/uart-tx    tcp-rx/tx  (I2C slave) │
//! │                                                              │
//! │  ───────────────── Byte-channel boundary ─────────────────   │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  Relay fabric: 3 forwarding tasks over 6 channels      │  │
//! │  │  LinkState gates the STM→TCP leg                       │  │
//! │  │  ControlBus worker applies Wi-Fi commands              │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use log::{error, info};

use esp_idf_hal::gpio::AnyOutputPin;
use esp_idf_hal::peripherals::Peripherals;

use stimbridge::adapters::{bus_glue, tcp, uart, usb_serial, wifi::EspWifiControl};
use stimbridge::bus::CONTROL_BUS;
use stimbridge::config::BridgeConfig;
use stimbridge::drivers::{boot_led, power};
use stimbridge::link::LinkState;
use stimbridge::pins;
use stimbridge::relay::{spawn_relay, ChannelSet};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("StimBridge v{} starting", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let config = BridgeConfig::default();

    // ── 2. Board plumbing ─────────────────────────────────────
    if let Err(e) = power::init_power_management() {
        error!("power management setup failed: {e}");
    }
    if let Err(e) = boot_led::start(
        peripherals.ledc.timer0,
        peripherals.ledc.channel0,
        unsafe { AnyOutputPin::new(pins::BOOT_LED_GPIO) },
    ) {
        error!("boot LED setup failed: {e}");
    }

    // ── 3. Relay fabric state ─────────────────────────────────
    let channels = Arc::new(ChannelSet::new(config.channel_capacity));
    let link = Arc::new(LinkState::new());

    // ── 4. Wi-Fi + control channel ────────────────────────────
    let wifi = Arc::new(Mutex::new(EspWifiControl::init(
        peripherals.modem,
        &CONTROL_BUS,
    )?));

    bus_glue::spawn(
        peripherals.i2c0,
        unsafe { esp_idf_hal::gpio::AnyIOPin::new(pins::BUS_SDA_GPIO) },
        unsafe { esp_idf_hal::gpio::AnyIOPin::new(pins::BUS_SCL_GPIO) },
        &CONTROL_BUS,
        &config,
    )?;

    {
        let wifi = Arc::clone(&wifi);
        thread::Builder::new()
            .name("wifi control".into())
            .spawn(move || CONTROL_BUS.run(&wifi))?;
    }

    // ── 5. Endpoint adapters ──────────────────────────────────
    usb_serial::spawn(peripherals.usb_serial, Arc::clone(&channels), &config)?;
    uart::spawn(
        peripherals.uart2,
        unsafe { esp_idf_hal::gpio::AnyIOPin::new(pins::STM_UART_TX_GPIO) },
        unsafe { esp_idf_hal::gpio::AnyIOPin::new(pins::STM_UART_RX_GPIO) },
        Arc::clone(&channels),
        &config,
    )?;

    // The relay must survive a dead TCP subsystem: USB↔UART never depends
    // on it, so a bind failure only costs the network leg.
    if let Err(e) = tcp::spawn(
        Arc::clone(&channels),
        Arc::clone(&link),
        Arc::clone(&wifi),
        &config,
    ) {
        error!("TCP subsystem down: {e}");
    }

    // ── 6. Forwarding tasks ───────────────────────────────────
    spawn_relay(&channels, &link, &config);
    info!("relay running");

    // ── 7. Idle housekeeping ──────────────────────────────────
    loop {
        thread::sleep(Duration::from_secs(5));
        wifi.lock()
            .expect("wifi port mutex poisoned")
            .refresh_ip();
    }
}
