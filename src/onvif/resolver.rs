use crate::config::OnvifConfig;
use crate::error::{LocateError, ProtocolFailure};
use crate::types::{Credentials, StreamDescriptor};

use super::auth::ensure_rtsp_credentials;
use super::client::OnvifClient;
use super::device::{self, DeviceService};
use super::media::MediaService;
use super::soap;

/// Walks one device from its service address to a playable RTSP URL,
/// stopping at the first stage the device cannot satisfy.
pub struct StreamResolver {
    client: OnvifClient,
    credentials: Credentials,
}

impl StreamResolver {
    pub fn new(credentials: Credentials, config: &OnvifConfig) -> Self {
        let client = OnvifClient::new(credentials.clone(), config);
        Self {
            client,
            credentials,
        }
    }

    /// `xaddrs` are the service addresses discovery reported for the device;
    /// they may be empty, in which case the conventional endpoint on port 80
    /// is tried.
    pub async fn resolve(
        &self,
        ip: &str,
        xaddrs: &[String],
    ) -> Result<StreamDescriptor, LocateError> {
        let device_service_url = device::pick_device_service_url(ip, xaddrs)
            .ok_or_else(|| LocateError::Input("missing device service URL".to_string()))?;
        tracing::debug!("Negotiating stream URI via {}", device_service_url);

        let capabilities =
            DeviceService::get_capabilities(&self.client, &device_service_url).await?;
        let media_service_url = resolve_media_url(&capabilities, &device_service_url)?;
        tracing::debug!("Using media service at {}", media_service_url);

        let profiles = MediaService::get_profiles(&self.client, &media_service_url).await?;
        let token =
            soap::extract_profile_token(&profiles).ok_or(ProtocolFailure::NoProfilesFound)?;
        tracing::debug!("Selected media profile {}", token);

        let stream_response =
            MediaService::get_stream_uri(&self.client, &media_service_url, &token).await?;
        let uri = soap::extract_tag_value(&stream_response, "Uri")
            .ok_or(ProtocolFailure::StreamUriNotFound)?;

        let rtsp_url = ensure_rtsp_credentials(&uri, &self.credentials);
        Ok(StreamDescriptor { rtsp_url })
    }
}

// Media endpoint from capabilities, or the derived fallback when the
// response does not advertise one.
fn resolve_media_url(
    capabilities_xml: &str,
    device_service_url: &str,
) -> Result<String, ProtocolFailure> {
    soap::extract_media_xaddr(capabilities_xml)
        .or_else(|| device::build_fallback_media_url(device_service_url))
        .ok_or(ProtocolFailure::MediaServiceNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_media_url_from_capabilities() {
        let xml = r#"<Capabilities><Media><XAddr>http://10.0.0.5/onvif/media</XAddr></Media></Capabilities>"#;
        assert_eq!(
            resolve_media_url(xml, "http://10.0.0.5/onvif/device_service").as_deref(),
            Ok("http://10.0.0.5/onvif/media")
        );
    }

    #[test]
    fn test_resolve_media_url_derives_fallback() {
        assert_eq!(
            resolve_media_url("<Capabilities/>", "http://10.0.0.5/onvif/device_service").as_deref(),
            Ok("http://10.0.0.5/onvif/media")
        );
    }

    #[test]
    fn test_resolve_media_url_without_any_source() {
        assert_eq!(
            resolve_media_url("<Capabilities/>", ""),
            Err(ProtocolFailure::MediaServiceNotFound)
        );
    }
}
