//! GPIO / peripheral pin assignments for the bridge board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers. The `board-v40` feature selects the older board
//! revision with the original I2C/UART routing.

/// Boot-indicator LED (LEDC-dimmed).
pub const BOOT_LED_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Control bus (I2C slave)
// ---------------------------------------------------------------------------

#[cfg(feature = "board-v40")]
pub const BUS_SCL_GPIO: i32 = 7;
#[cfg(feature = "board-v40")]
pub const BUS_SDA_GPIO: i32 = 1;

#[cfg(not(feature = "board-v40"))]
pub const BUS_SCL_GPIO: i32 = 38;
#[cfg(not(feature = "board-v40"))]
pub const BUS_SDA_GPIO: i32 = 37;

// ---------------------------------------------------------------------------
// STM32 controller UART
// ---------------------------------------------------------------------------

#[cfg(feature = "board-v40")]
pub const STM_UART_RX_GPIO: i32 = 33;
#[cfg(feature = "board-v40")]
pub const STM_UART_TX_GPIO: i32 = 34;

#[cfg(not(feature = "board-v40"))]
pub const STM_UART_RX_GPIO: i32 = 17;
/// Moved off GPIO 34 in rev 4.1 because of startup glitches on that pin.
#[cfg(not(feature = "board-v40"))]
pub const STM_UART_TX_GPIO: i32 = 18;
