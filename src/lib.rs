pub mod config;
pub mod discovery;
pub mod error;
pub mod net;
pub mod onvif;
pub mod scan;
pub mod types;

pub use config::{AppConfig, DiscoveryConfig, OnvifConfig, ScanConfig, SecurityMode};
pub use error::{LocateError, ProtocolFailure};
pub use types::{
    Credentials, DiscoveredDevice, MatchHint, MediaProfileToken, ScanHit, StreamDescriptor,
};

pub use onvif::auth::ensure_rtsp_credentials;
pub use scan::rtsp::{build_rtsp_url_from_path, normalize_manual_rtsp_input};
pub use scan::verify::verify_onvif_service;

/// Negotiates a playable RTSP URL with one ONVIF device and splices the
/// credentials into the result.
pub async fn resolve_stream_url(
    ip: &str,
    xaddrs: &[String],
    credentials: Credentials,
    config: &OnvifConfig,
) -> Result<StreamDescriptor, LocateError> {
    onvif::StreamResolver::new(credentials, config)
        .resolve(ip, xaddrs)
        .await
}

/// Probes the local network for cameras over WS-Discovery and SSDP.
pub async fn scan_for_devices(
    config: &DiscoveryConfig,
) -> Result<Vec<DiscoveredDevice>, LocateError> {
    discovery::DiscoveryEngine::new(config.clone()).run().await
}

/// Sweeps a /24 for live RTSP endpoints.
pub async fn scan_subnet(config: &ScanConfig, credentials: &Credentials) -> Vec<ScanHit> {
    scan::SubnetScanner::new(config.clone(), credentials.clone())
        .scan_subnet()
        .await
}

/// Probes an explicit list of hosts for RTSP endpoints.
pub async fn filter_rtsp_hosts(
    config: &ScanConfig,
    credentials: &Credentials,
    hosts: &[String],
) -> Vec<ScanHit> {
    scan::SubnetScanner::new(config.clone(), credentials.clone())
        .filter_hosts(hosts)
        .await
}
