//! Generic forwarding task: drain one channel, fan out to one or two.
//!
//! One task runs per [`RouteSpec`](super::RouteSpec), started at boot and
//! never terminating. The receive timeout only keeps the task responsive to
//! outside inspection; the loop simply polls again when it fires. Delivery
//! to the two destinations is independent — a full or gated destination
//! loses its copy of the data without delaying the other destination or the
//! next receive cycle. No backpressure ever propagates upstream: a
//! persistently full destination loses data, it never stalls the source.

use std::sync::Arc;
use std::time::Duration;

use log::warn;

use crate::config::BridgeConfig;
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::link::LinkState;

use super::{ChannelSet, RouteSpec, ROUTES};

/// Timing/size knobs of one forwarding loop, derived from [`BridgeConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ForwardTiming {
    pub recv_timeout: Duration,
    pub send_timeout: Duration,
    pub chunk: usize,
}

impl ForwardTiming {
    pub fn from_config(cfg: &BridgeConfig) -> Self {
        Self {
            recv_timeout: cfg.forward_recv_timeout(),
            send_timeout: cfg.forward_send_timeout(),
            chunk: cfg.forward_chunk,
        }
    }
}

/// Run one receive/forward cycle. Returns the number of bytes taken from
/// the source (0 when the receive timed out).
pub fn pump_once(
    route: &RouteSpec,
    channels: &ChannelSet,
    link: &LinkState,
    timing: &ForwardTiming,
) -> usize {
    let Some(data) = channels
        .get(route.source)
        .recv_up_to(timing.chunk, timing.recv_timeout)
    else {
        return 0;
    };

    if channels
        .get(route.primary)
        .send(&data, timing.send_timeout)
        .is_err()
    {
        warn!("{}: dropped {} bytes (primary full)", route.name, data.len());
    }

    if let Some(secondary) = route.secondary {
        if route.gate_secondary && !link.is_connected() {
            // No client — this leg's copy is discarded, not queued.
        } else if channels
            .get(secondary)
            .send(&data, timing.send_timeout)
            .is_err()
        {
            warn!(
                "{}: dropped {} bytes (secondary full)",
                route.name,
                data.len()
            );
        }
    }

    data.len()
}

/// Forward forever. Only returns if the process is torn down around it.
pub fn run(
    route: &'static RouteSpec,
    channels: Arc<ChannelSet>,
    link: Arc<LinkState>,
    timing: ForwardTiming,
) {
    log::info!("{}: forwarding started", route.name);
    loop {
        pump_once(route, &channels, &link, &timing);
    }
}

/// Spawn one forwarding task per entry in [`ROUTES`].
pub fn spawn_relay(
    channels: &Arc<ChannelSet>,
    link: &Arc<LinkState>,
    cfg: &BridgeConfig,
) -> Vec<std::thread::JoinHandle<()>> {
    let timing = ForwardTiming::from_config(cfg);
    ROUTES
        .iter()
        .map(|route| {
            let channels = Arc::clone(channels);
            let link = Arc::clone(link);
            spawn_on_core(Core::App, 5, 8, route.name, move || {
                run(route, channels, link, timing);
            })
        })
        .collect()
}
