//! Adapters — the endpoint pumps and collaborator bindings.
//!
//! | Adapter      | Binds                          | Targets        |
//! |--------------|--------------------------------|----------------|
//! | `tcp`        | TCP socket ↔ tcp-rx/tcp-tx     | all            |
//! | `usb_serial` | USB-Serial-JTAG ↔ usb-rx/usb-tx| espidf         |
//! | `uart`       | STM32 UART ↔ uart-rx/uart-tx   | espidf         |
//! | `wifi`       | ESP-IDF Wi-Fi STA driver       | espidf         |
//! | `wifi_sim`   | in-memory Wi-Fi stand-in       | all (tests)    |
//! | `bus_glue`   | I2C slave ↔ control bus        | espidf         |

#[cfg(feature = "espidf")]
pub mod bus_glue;
pub mod tcp;
#[cfg(feature = "espidf")]
pub mod uart;
#[cfg(feature = "espidf")]
pub mod usb_serial;
#[cfg(feature = "espidf")]
pub mod wifi;
pub mod wifi_sim;
