//! Bridge configuration parameters.
//!
//! All tunable parameters for the relay fabric and transports. The defaults
//! are the values the bridge ships with; nothing here is persisted — the
//! Wi-Fi subsystem keeps its own credentials in NVS.

use core::time::Duration;

/// Core bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    // --- Relay fabric ---
    /// Capacity of each of the six byte channels, in bytes.
    pub channel_capacity: usize,
    /// How long a forwarding task waits for source data before re-polling.
    pub forward_recv_timeout_ms: u32,
    /// Budget for enqueueing a chunk at a destination before dropping it.
    pub forward_send_timeout_ms: u32,
    /// Largest chunk a forwarding task moves per cycle (bytes).
    pub forward_chunk: usize,

    // --- TCP transport ---
    /// Well-known listening port for the single TCP client.
    pub tcp_port: u16,
    /// Socket read buffer size for the TCP rx pump (bytes).
    pub tcp_read_chunk: usize,

    // --- STM32 UART link ---
    /// Baud rate of the downstream controller UART (8E1 framing).
    pub uart_baud: u32,

    // --- Control bus ---
    /// I2C slave address the bridge answers on.
    pub bus_address: u8,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // Relay
            channel_capacity: 1028,
            forward_recv_timeout_ms: 500,
            forward_send_timeout_ms: 1000,
            forward_chunk: 1000,

            // TCP
            tcp_port: 55533,
            tcp_read_chunk: 128,

            // UART
            uart_baud: 115_200,

            // Control bus
            bus_address: 0x72,
        }
    }
}

impl BridgeConfig {
    /// Forwarding-task receive timeout as a `Duration`.
    pub fn forward_recv_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.forward_recv_timeout_ms))
    }

    /// Forwarding-task send timeout as a `Duration`.
    pub fn forward_send_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.forward_send_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = BridgeConfig::default();
        assert!(c.channel_capacity >= 1024);
        assert!(c.forward_chunk <= c.channel_capacity);
        assert!(c.tcp_read_chunk > 0);
        assert!(c.forward_recv_timeout_ms > 0);
        assert!(c.forward_send_timeout_ms > 0);
        assert!(c.uart_baud > 0);
    }

    #[test]
    fn recv_timeout_keeps_tasks_responsive() {
        // The receive timeout bounds how long a forwarding task can be
        // blind to the outside world; it must stay well under a second.
        let c = BridgeConfig::default();
        assert!(c.forward_recv_timeout() <= Duration::from_secs(1));
    }

    #[test]
    fn chunk_fits_inside_a_channel() {
        let c = BridgeConfig::default();
        assert!(
            c.forward_chunk < c.channel_capacity,
            "one forwarded chunk must never fill a destination on its own"
        );
    }
}
