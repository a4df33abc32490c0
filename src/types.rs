use std::fmt;

use serde::{Deserialize, Serialize};

/// Username/password pair for a device. Empty strings mean anonymous; both
/// the Basic-Auth header and the WS-Security header are omitted entirely in
/// that case rather than sent empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

/// A device seen during one discovery run. `ip` is the identity key;
/// `service_addresses` accumulates every advertised control URL for that IP
/// across all probe responses, deduplicated in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    pub ip: String,
    pub service_addresses: Vec<String>,
}

/// Opaque GetProfiles token, consumed by the GetStreamUri call that follows
/// it. Never cached beyond one negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaProfileToken(String);

impl MediaProfileToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaProfileToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final output of a successful negotiation: a playable RTSP URL with
/// credentials already embedded when a password was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub rtsp_url: String,
}

/// One responding host found by the subnet scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanHit {
    pub ip: String,
    pub rtsp_path: String,
    pub rtsp_port: u16,
    pub match_hint: MatchHint,
    /// The TCP connection opened but nothing readable came back before the
    /// per-probe deadline. Only produced when the scan allows it.
    pub connect_only: bool,
}

/// Soft identification signals scraped from an RTSP response. These help a
/// caller rank or label hits; they never decide whether a hit counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchHint {
    pub realm: Option<String>,
    pub server: Option<String>,
}

impl MatchHint {
    /// True when either signal contains `needle`, ASCII-case-insensitively.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_ascii_lowercase();
        self.realm
            .iter()
            .chain(self.server.iter())
            .any(|value| value.to_ascii_lowercase().contains(&needle))
    }

    pub fn is_empty(&self) -> bool {
        self.realm.is_none() && self.server.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_credentials() {
        assert!(Credentials::anonymous().is_anonymous());
        assert!(!Credentials::new("admin", "").is_anonymous());
        assert!(!Credentials::new("", "secret").is_anonymous());
    }

    #[test]
    fn test_match_hint_is_case_insensitive() {
        let hint = MatchHint {
            realm: Some("HiCamera".to_string()),
            server: None,
        };
        assert!(hint.matches("hicam"));
        assert!(!hint.matches("reolink"));
        assert!(!MatchHint::default().matches("anything"));
    }
}
