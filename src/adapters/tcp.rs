//! TCP endpoint adapter: one listener, one client, three pumps.
//!
//! The accept loop owns the session lifecycle and the link state machine's
//! write side; the rx pump fills tcp-rx from the socket; the tx pump drains
//! tcp-tx into the socket while a client is attached. Modem power saving is
//! switched off for the duration of a session and restored on disconnect.
//!
//! Bind/listen failure stops this subsystem only — the USB↔UART relay does
//! not depend on it.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use crate::config::BridgeConfig;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::error::{CommsError, Error, Result};
use crate::link::LinkState;
use crate::ports::WifiControlPort;
use crate::relay::{ChannelId, ChannelSet};

/// How long the rx pump waits to hand socket bytes to the relay before
/// dropping them, and the tx pump's poll interval on the tcp-tx channel.
const CHANNEL_SEND_TIMEOUT: Duration = Duration::from_secs(1);
const CHANNEL_RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// The active client socket, published by the accept loop before the
/// connect edge and taken back after the disconnect edge. The rx and tx
/// pumps work on `try_clone()` handles of it.
#[derive(Default)]
struct SessionSlot(Mutex<Option<TcpStream>>);

impl SessionSlot {
    fn publish(&self, stream: TcpStream) {
        *self.0.lock().expect("session slot mutex poisoned") = Some(stream);
    }

    fn take(&self) -> Option<TcpStream> {
        self.0.lock().expect("session slot mutex poisoned").take()
    }

    fn handle(&self) -> Option<TcpStream> {
        self.0
            .lock()
            .expect("session slot mutex poisoned")
            .as_ref()
            .and_then(|s| s.try_clone().ok())
    }
}

/// Bind the listener and spawn the accept/rx/tx tasks.
///
/// Returns the bound address (useful when the configured port is 0, as in
/// tests). An `Err` here means the TCP subsystem is down for good; callers
/// log it and keep the rest of the relay running.
pub fn spawn<W: WifiControlPort + Send + 'static>(
    channels: Arc<ChannelSet>,
    link: Arc<LinkState>,
    wifi: Arc<Mutex<W>>,
    cfg: &BridgeConfig,
) -> Result<SocketAddr> {
    let listener = TcpListener::bind(("0.0.0.0", cfg.tcp_port)).map_err(|e| {
        error!("tcp: bind to port {} failed: {e}", cfg.tcp_port);
        Error::from(CommsError::BindFailed)
    })?;
    let local_addr = listener.local_addr().map_err(|e| {
        error!("tcp: local_addr failed: {e}");
        Error::from(CommsError::BindFailed)
    })?;
    info!("tcp: listening on {local_addr}");

    let slot = Arc::new(SessionSlot::default());

    {
        let link = Arc::clone(&link);
        let slot = Arc::clone(&slot);
        spawn_on_core(Core::Pro, 5, 12, "tcp server", move || {
            accept_loop(&listener, &link, &slot, &wifi);
        });
    }
    {
        let channels = Arc::clone(&channels);
        let link = Arc::clone(&link);
        let slot = Arc::clone(&slot);
        let read_chunk = cfg.tcp_read_chunk;
        spawn_on_core(Core::Pro, 5, 12, "tcp rx", move || {
            rx_loop(&channels, &link, &slot, read_chunk);
        });
    }
    {
        let chunk = cfg.forward_chunk;
        spawn_on_core(Core::Pro, 5, 12, "tcp tx", move || {
            tx_loop(&channels, &link, &slot, chunk);
        });
    }

    Ok(local_addr)
}

// ── Accept loop ───────────────────────────────────────────────

fn accept_loop<W: WifiControlPort>(
    listener: &TcpListener,
    link: &LinkState,
    slot: &SessionSlot,
    wifi: &Mutex<W>,
) {
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) => {
                error!("tcp: accept failed: {e}");
                continue;
            }
        };

        // Single active client. The state machine refuses a second edge, so
        // anything that sneaks past the backlog is simply closed again.
        if link.is_connected() {
            warn!("tcp: refusing {peer}, a client is already attached");
            continue;
        }

        info!("tcp: client {peer} attached");
        if stream.set_nodelay(true).is_err() {
            warn!("tcp: failed to set NODELAY for {peer}");
        }

        // Publish the socket before the edge so the rx pump finds it as
        // soon as it wakes.
        slot.publish(stream);
        if !link.mark_connected() {
            slot.take();
            continue;
        }

        // Latency over battery while a session runs.
        set_power_save(wifi, false);
        link.wait_while_connected();
        set_power_save(wifi, true);

        if let Some(stream) = slot.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        info!("tcp: session with {peer} closed");
    }
}

fn set_power_save<W: WifiControlPort>(wifi: &Mutex<W>, enabled: bool) {
    let mut wifi = wifi.lock().expect("wifi port mutex poisoned");
    if let Err(e) = wifi.set_power_save(enabled) {
        warn!("tcp: power-save({enabled}) failed: {e}");
    }
}

// ── Rx pump: socket → tcp-rx channel ─────────────────────────

fn rx_loop(channels: &ChannelSet, link: &LinkState, slot: &SessionSlot, read_chunk: usize) {
    let tcp_rx = channels.get(ChannelId::TcpRx);
    let mut buf = vec![0u8; read_chunk];
    loop {
        link.wait_until_connected();
        let Some(stream) = slot.handle() else {
            // Raced a teardown between the edge and the slot read.
            thread::sleep(Duration::from_millis(10));
            continue;
        };

        loop {
            match (&stream).read(&mut buf) {
                Ok(0) => {
                    info!("tcp: connection closed by peer");
                    break;
                }
                Ok(n) => {
                    if tcp_rx.send(&buf[..n], CHANNEL_SEND_TIMEOUT).is_err() {
                        warn!("tcp rx: relay buffer full, dropped {n} bytes");
                    }
                }
                Err(e) => {
                    error!("tcp rx: {e}");
                    break;
                }
            }
        }

        link.mark_disconnected();
    }
}

// ── Tx pump: tcp-tx channel → socket ─────────────────────────

fn tx_loop(channels: &ChannelSet, link: &LinkState, slot: &SessionSlot, chunk: usize) {
    let tcp_tx = channels.get(ChannelId::TcpTx);
    loop {
        let Some(data) = tcp_tx.recv_up_to(chunk, CHANNEL_RECV_TIMEOUT) else {
            continue;
        };

        // Guard immediately before the write. A disconnect landing between
        // the check and the write surfaces as an I/O error below, which is
        // a drop, not a fault.
        if !link.is_connected() {
            continue;
        }
        let Some(stream) = slot.handle() else {
            continue;
        };

        if let Err(e) = (&stream).write_all(&data) {
            error!("tcp tx: {e}, dropped {} bytes", data.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::wifi_sim::SimWifiControl;
    use std::net::TcpStream as ClientStream;

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            tcp_port: 0, // ephemeral
            ..BridgeConfig::default()
        }
    }

    fn connect(addr: SocketAddr) -> ClientStream {
        let s = ClientStream::connect(addr).expect("client connect");
        s.set_nodelay(true).unwrap();
        s
    }

    fn wait_for<F: Fn() -> bool>(cond: F, what: &str) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("timed out waiting for {what}");
    }

    #[test]
    fn client_bytes_land_in_tcp_rx() {
        let channels = Arc::new(ChannelSet::new(1028));
        let link = Arc::new(LinkState::new());
        let wifi = Arc::new(Mutex::new(SimWifiControl::new()));
        let addr = spawn(
            Arc::clone(&channels),
            Arc::clone(&link),
            wifi,
            &test_config(),
        )
        .unwrap();

        let mut client = connect(addr);
        wait_for(|| link.is_connected(), "connect edge");
        client.write_all(b"to-stm").unwrap();

        let got = channels
            .get(ChannelId::TcpRx)
            .recv_up_to(64, Duration::from_secs(2))
            .expect("bytes relayed from socket");
        assert_eq!(got, b"to-stm");
    }

    #[test]
    fn tcp_tx_reaches_the_client_and_peer_close_disconnects() {
        let channels = Arc::new(ChannelSet::new(1028));
        let link = Arc::new(LinkState::new());
        let wifi = Arc::new(Mutex::new(SimWifiControl::new()));
        let addr = spawn(
            Arc::clone(&channels),
            Arc::clone(&link),
            Arc::clone(&wifi),
            &test_config(),
        )
        .unwrap();

        let mut client = connect(addr);
        wait_for(|| link.is_connected(), "connect edge");
        wait_for(
            || !wifi.lock().unwrap().power_save,
            "power save off during session",
        );

        channels
            .get(ChannelId::TcpTx)
            .send(b"from-stm", Duration::ZERO)
            .unwrap();
        let mut buf = [0u8; 8];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"from-stm");

        drop(client);
        wait_for(|| !link.is_connected(), "disconnect edge");
        wait_for(
            || wifi.lock().unwrap().power_save,
            "power save restored after session",
        );
        assert_eq!(link.sessions(), 1);
    }

    #[test]
    fn tx_discards_while_no_client_is_attached() {
        let channels = Arc::new(ChannelSet::new(1028));
        let link = Arc::new(LinkState::new());
        let wifi = Arc::new(Mutex::new(SimWifiControl::new()));
        spawn(
            Arc::clone(&channels),
            Arc::clone(&link),
            wifi,
            &test_config(),
        )
        .unwrap();

        channels
            .get(ChannelId::TcpTx)
            .send(b"nobody-listening", Duration::ZERO)
            .unwrap();
        // The tx pump drains and discards; the channel ends up empty
        // without any client having existed.
        wait_for(
            || channels.get(ChannelId::TcpTx).is_empty(),
            "tx pump drains the channel",
        );
        assert!(!link.is_connected());
    }
}
