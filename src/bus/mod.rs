//! Control channel — the I2C-slave configuration bus.
//!
//! A bus master (the STM32 controller) issues single-byte commands with a
//! trailing payload. Write commands are staged and queued from the bus
//! interrupt callback and applied by a worker task; read commands are
//! answered synchronously from a response buffer because the bus protocol
//! expects the reply within the same transaction.
//!
//! ```text
//! ┌─────────────┐ on_write/on_read ┌────────────┐ ControlCommand ┌───────────┐
//! │ bus ISR     │─────────────────▶│ ControlBus │───────────────▶│  worker   │
//! │ (callback)  │◀── response ─────│  staging   │                │  task     │
//! └─────────────┘                  └────────────┘                └───────────┘
//! ```

mod dispatcher;
pub mod protocol;

pub use dispatcher::{ControlBus, CONTROL_BUS};
pub use protocol::{
    ControlCommand, CMD_IP, CMD_RECONNECT, CMD_SET_PASSWORD, CMD_SET_SSID, CMD_VERSION,
    PASSWORD_MAX, RESPONSE_MAX, SSID_MAX,
};
