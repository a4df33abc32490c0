use crate::error::LocateError;

use super::client::OnvifClient;
use super::soap::DEVICE_NS;

pub struct DeviceService;

impl DeviceService {
    /// GetCapabilities with Category=All; the response carries the XAddr of
    /// every service the device exposes, the media service included.
    pub async fn get_capabilities(
        client: &OnvifClient,
        device_service_url: &str,
    ) -> Result<String, LocateError> {
        client
            .send_soap_request(
                device_service_url,
                &format!("{}/GetCapabilities", DEVICE_NS),
                &capabilities_body(),
            )
            .await
    }
}

pub fn capabilities_body() -> String {
    format!(
        r#"<tds:GetCapabilities xmlns:tds="{}"><tds:Category>All</tds:Category></tds:GetCapabilities>"#,
        DEVICE_NS
    )
}

/// The conventional device service endpoint. Nearly every camera answers
/// here even when its discovery XAddrs advertise another port.
pub fn default_device_service_url(ip: &str) -> Option<String> {
    if ip.is_empty() {
        return None;
    }
    Some(format!("http://{}:80/onvif/device_service", ip))
}

/// First advertised HTTP XAddr, or the conventional endpoint when discovery
/// gave none.
pub fn pick_device_service_url(ip: &str, xaddrs: &[String]) -> Option<String> {
    xaddrs
        .iter()
        .find(|addr| addr.starts_with("http"))
        .cloned()
        .or_else(|| default_device_service_url(ip))
}

/// Derives a media endpoint from the device service URL for devices whose
/// capabilities omit the media XAddr. A trailing `device_service` segment is
/// swapped for `media`; anything else gets `/media` appended.
pub fn build_fallback_media_url(device_service_url: &str) -> Option<String> {
    if device_service_url.is_empty() {
        return None;
    }
    let trimmed = device_service_url.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    const SUFFIX: &str = "device_service";
    if trimmed.to_ascii_lowercase().ends_with(SUFFIX) {
        let head = &trimmed[..trimmed.len() - SUFFIX.len()];
        Some(format!("{}media", head))
    } else {
        Some(format!("{}/media", trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_device_service_url() {
        assert_eq!(
            default_device_service_url("10.0.0.5").as_deref(),
            Some("http://10.0.0.5:80/onvif/device_service")
        );
        assert_eq!(default_device_service_url(""), None);
    }

    #[test]
    fn test_pick_device_service_url() {
        let xaddrs = vec![
            "ftp://10.0.0.5/ignored".to_string(),
            "http://10.0.0.5:8080/onvif/device_service".to_string(),
            "http://10.0.0.5:80/onvif/device_service".to_string(),
        ];
        assert_eq!(
            pick_device_service_url("10.0.0.5", &xaddrs).as_deref(),
            Some("http://10.0.0.5:8080/onvif/device_service")
        );

        assert_eq!(
            pick_device_service_url("10.0.0.5", &[]).as_deref(),
            Some("http://10.0.0.5:80/onvif/device_service")
        );
        assert_eq!(pick_device_service_url("", &[]), None);
    }

    #[test]
    fn test_build_fallback_media_url_swaps_suffix() {
        assert_eq!(
            build_fallback_media_url("http://10.0.0.5/onvif/device_service").as_deref(),
            Some("http://10.0.0.5/onvif/media")
        );
        assert_eq!(
            build_fallback_media_url("http://10.0.0.5/onvif/Device_Service/").as_deref(),
            Some("http://10.0.0.5/onvif/media")
        );
    }

    #[test]
    fn test_build_fallback_media_url_appends() {
        assert_eq!(
            build_fallback_media_url("http://10.0.0.5/onvif").as_deref(),
            Some("http://10.0.0.5/onvif/media")
        );
        assert_eq!(build_fallback_media_url(""), None);
    }

    #[test]
    fn test_capabilities_body_requests_everything() {
        let body = capabilities_body();
        assert!(body.contains("GetCapabilities"));
        assert!(body.contains("<tds:Category>All</tds:Category>"));
    }
}
