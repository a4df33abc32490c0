use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use anyhow::{Context, Result};

use crate::types::Credentials;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub onvif: OnvifConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OnvifConfig {
    /// Budget for each SOAP round trip, connect included.
    #[serde(default = "default_onvif_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub security: SecurityMode,
}

/// How the password travels in the WS-Security header.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// UsernameToken with the password sent as PasswordText.
    #[default]
    Text,
    /// UsernameToken with a SHA-1 digest, nonce and created timestamp.
    /// Needed for firmware that refuses plaintext tokens.
    Digest,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiscoveryConfig {
    /// Wall-clock bound for one probe run. Expiry is normal completion.
    #[serde(default = "default_discovery_timeout_ms")]
    pub timeout_ms: u64,
    /// Probe send rounds per run, 500ms apart.
    #[serde(default = "default_discovery_retries")]
    pub retries: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScanConfig {
    /// First three octets of the subnet to sweep. Looked up from the local
    /// interface when absent.
    #[serde(default)]
    pub subnet_prefix: Option<String>,
    #[serde(default = "default_rtsp_port")]
    pub port: u16,
    #[serde(default = "default_rtsp_paths")]
    pub paths: Vec<String>,
    /// Per-probe bound covering connect and response.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    /// Simultaneous probes, independent of subnet size.
    #[serde(default = "default_scan_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_host_min")]
    pub host_min: u8,
    #[serde(default = "default_host_max")]
    pub host_max: u8,
    /// Pause between hosts on one worker slot. Zero disables.
    #[serde(default)]
    pub probe_delay_ms: u64,
    /// Count hosts that accept the connection but never answer.
    #[serde(default)]
    pub allow_connect_only: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_onvif_timeout_ms() -> u64 {
    6000
}

fn default_discovery_timeout_ms() -> u64 {
    4000
}

fn default_discovery_retries() -> u32 {
    2
}

fn default_rtsp_port() -> u16 {
    554
}

fn default_rtsp_paths() -> Vec<String> {
    vec!["/onvif1".to_string()]
}

fn default_probe_timeout_ms() -> u64 {
    700
}

fn default_scan_concurrency() -> usize {
    24
}

fn default_host_min() -> u8 {
    1
}

fn default_host_max() -> u8 {
    254
}

fn default_user_agent() -> String {
    "AndroidXMedia3/1.8.0".to_string()
}

impl Default for OnvifConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_onvif_timeout_ms(),
            security: SecurityMode::default(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_discovery_timeout_ms(),
            retries: default_discovery_retries(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            subnet_prefix: None,
            port: default_rtsp_port(),
            paths: default_rtsp_paths(),
            timeout_ms: default_probe_timeout_ms(),
            concurrency: default_scan_concurrency(),
            host_min: default_host_min(),
            host_max: default_host_max(),
            probe_delay_ms: 0,
            allow_connect_only: false,
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .context("Failed to read configuration file")?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .context("Failed to parse YAML configuration")?;

        Ok(config)
    }
}

impl OnvifConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl DiscoveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ScanConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Host octet range, clamped to 1..=254.
    pub fn host_range(&self) -> (u8, u8) {
        let min = self.host_min.clamp(1, 254);
        let max = self.host_max.clamp(min, 254);
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_expectations() {
        let config = AppConfig::default();
        assert_eq!(config.onvif.timeout_ms, 6000);
        assert_eq!(config.onvif.security, SecurityMode::Text);
        assert_eq!(config.discovery.timeout_ms, 4000);
        assert_eq!(config.discovery.retries, 2);
        assert_eq!(config.scan.port, 554);
        assert_eq!(config.scan.timeout_ms, 700);
        assert_eq!(config.scan.concurrency, 24);
        assert_eq!(config.scan.paths, vec!["/onvif1".to_string()]);
    }

    #[test]
    fn test_partial_yaml_fills_in_defaults() {
        let yaml = r#"
credentials:
  username: admin
  password: secret
scan:
  subnet_prefix: "192.168.30"
  host_min: 10
  host_max: 20
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.credentials.username, "admin");
        assert_eq!(config.scan.subnet_prefix.as_deref(), Some("192.168.30"));
        assert_eq!(config.scan.host_range(), (10, 20));
        assert_eq!(config.scan.port, 554);
        assert_eq!(config.onvif.timeout_ms, 6000);
    }

    #[test]
    fn test_host_range_is_clamped() {
        let config = ScanConfig {
            host_min: 0,
            host_max: 255,
            ..ScanConfig::default()
        };
        assert_eq!(config.host_range(), (1, 254));

        let inverted = ScanConfig {
            host_min: 40,
            host_max: 10,
            ..ScanConfig::default()
        };
        assert_eq!(inverted.host_range(), (40, 40));
    }

    #[test]
    fn test_security_mode_parses_lowercase() {
        let yaml = "onvif:\n  security: digest\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.onvif.security, SecurityMode::Digest);
    }
}
