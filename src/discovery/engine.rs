use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{interval, sleep_until, Instant};

use crate::config::DiscoveryConfig;
use crate::error::LocateError;
use crate::onvif::soap;
use crate::types::DiscoveredDevice;

use super::multicast::{MulticastLock, NoopMulticastLock};
use super::parse::DeviceRegistry;

const MULTICAST_ADDRESS: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const BROADCAST_ADDRESS: Ipv4Addr = Ipv4Addr::BROADCAST;
const WS_DISCOVERY_PORT: u16 = 3702;
const SSDP_PORT: u16 = 1900;
const PROBE_RESEND_INTERVAL: Duration = Duration::from_millis(500);

// One untyped probe plus the two type filters cameras answer selectively.
const PROBE_TYPE_FILTERS: [Option<&str>; 3] = [
    None,
    Some("dn:NetworkVideoTransmitter"),
    Some("tds:Device"),
];

const SSDP_SEARCH_TARGETS: [&str; 3] = [
    "urn:schemas-upnp-org:device:Basic:1",
    "upnp:rootdevice",
    "ssdp:all",
];

/// Probes the local network for cameras over WS-Discovery and SSDP and
/// collects their responses for the configured window.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    lock: Box<dyn MulticastLock>,
}

impl DiscoveryEngine {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self {
            config,
            lock: Box::new(NoopMulticastLock),
        }
    }

    pub fn with_multicast_lock(config: DiscoveryConfig, lock: Box<dyn MulticastLock>) -> Self {
        Self { config, lock }
    }

    /// A failed lock acquisition downgrades to a warning; most platforms
    /// receive multicast fine without one, and broadcast probes still work
    /// everywhere.
    pub async fn run(&self) -> Result<Vec<DiscoveredDevice>, LocateError> {
        if let Err(err) = self.lock.acquire() {
            tracing::warn!("Multicast lock unavailable, continuing without it: {}", err);
        }
        let result = self.run_probes().await;
        self.lock.release();
        result
    }

    async fn run_probes(&self) -> Result<Vec<DiscoveredDevice>, LocateError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;
        if let Err(err) = socket.join_multicast_v4(MULTICAST_ADDRESS, Ipv4Addr::UNSPECIFIED) {
            tracing::debug!("Could not join discovery multicast group: {}", err);
        }

        let mut registry = DeviceRegistry::new();
        let deadline = Instant::now() + self.config.timeout();
        let mut resend = interval(PROBE_RESEND_INTERVAL);
        let mut rounds_sent = 0u32;
        let mut buf = vec![0u8; 64 * 1024];

        loop {
            tokio::select! {
                _ = sleep_until(deadline) => break,
                _ = resend.tick(), if rounds_sent < self.config.retries => {
                    rounds_sent += 1;
                    tracing::debug!("Sending probe round {}/{}", rounds_sent, self.config.retries);
                    self.send_probe_round(&socket).await;
                }
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, addr)) => {
                            tracing::trace!("Discovery datagram from {} ({} bytes)", addr, len);
                            let payload = String::from_utf8_lossy(&buf[..len]);
                            registry.observe(&payload, addr.ip());
                        }
                        Err(err) => {
                            if registry.is_empty() {
                                return Err(err.into());
                            }
                            tracing::warn!(
                                "Discovery socket failed after {} device(s), returning partial results: {}",
                                registry.len(),
                                err
                            );
                            break;
                        }
                    }
                }
            }
        }

        let devices = registry.into_devices();
        tracing::info!("Discovery finished with {} device(s)", devices.len());
        Ok(devices)
    }

    /// One round: every WS-Discovery type filter and every SSDP search
    /// target, each to the multicast group and the broadcast address. A
    /// failed send is logged and skipped so one unroutable target cannot
    /// sink the round.
    async fn send_probe_round(&self, socket: &UdpSocket) {
        let ws_targets = [
            SocketAddr::from((MULTICAST_ADDRESS, WS_DISCOVERY_PORT)),
            SocketAddr::from((BROADCAST_ADDRESS, WS_DISCOVERY_PORT)),
        ];
        for filter in PROBE_TYPE_FILTERS {
            let message = soap::build_probe_message(filter);
            for target in ws_targets {
                if let Err(err) = socket.send_to(message.as_bytes(), target).await {
                    tracing::debug!("Probe send to {} failed: {}", target, err);
                }
            }
        }

        let ssdp_targets = [
            SocketAddr::from((MULTICAST_ADDRESS, SSDP_PORT)),
            SocketAddr::from((BROADCAST_ADDRESS, SSDP_PORT)),
        ];
        for search_target in SSDP_SEARCH_TARGETS {
            let message = soap::build_ssdp_message(search_target);
            for target in ssdp_targets {
                if let Err(err) = socket.send_to(message.as_bytes(), target).await {
                    tracing::debug!("SSDP send to {} failed: {}", target, err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLock;

    impl MulticastLock for FailingLock {
        fn acquire(&self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "denied"))
        }

        fn release(&self) {}
    }

    #[tokio::test]
    async fn test_run_survives_lock_failure() {
        let config = DiscoveryConfig {
            timeout_ms: 50,
            retries: 0,
        };
        let engine = DiscoveryEngine::with_multicast_lock(config, Box::new(FailingLock));
        let devices = engine.run().await.unwrap();
        assert!(devices.is_empty());
    }
}
