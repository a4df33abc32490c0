use std::time::Duration;

use reqwest::Client;

use crate::onvif::device::capabilities_body;
use crate::onvif::soap;

pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_millis(900);

/// Checks whether `ip` answers like an ONVIF device on any of `ports`.
/// Leans positive: any status an ONVIF endpoint plausibly returns to an
/// unauthenticated GetCapabilities counts, as does a body mentioning onvif.
/// Network failures count as no.
pub async fn verify_onvif_service(ip: &str, ports: &[u16], timeout: Duration) -> bool {
    if ip.is_empty() || ports.is_empty() {
        return false;
    }
    let client = match Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(_) => return false,
    };
    for &port in ports {
        if port == 0 {
            continue;
        }
        if verify_at_port(&client, ip, port).await {
            return true;
        }
    }
    false
}

async fn verify_at_port(client: &Client, ip: &str, port: u16) -> bool {
    let url = format!("http://{}:{}/onvif/device_service", ip, port);
    let envelope = soap::build_envelope(&capabilities_body(), None);

    let response = match client
        .post(&url)
        .header("Content-Type", "application/soap+xml; charset=utf-8")
        .body(envelope)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::trace!("ONVIF verification against {} failed: {}", url, err);
            return false;
        }
    };

    // 401/403/405 mean an ONVIF stack noticed us, even if it said no.
    let status = response.status().as_u16();
    if matches!(status, 200 | 400 | 401 | 403 | 405) {
        return true;
    }
    match response.text().await {
        Ok(text) => text.to_lowercase().contains("onvif"),
        Err(_) => false,
    }
}
