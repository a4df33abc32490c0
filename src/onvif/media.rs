use crate::error::LocateError;
use crate::types::MediaProfileToken;

use super::client::OnvifClient;
use super::soap::{escape_xml, MEDIA_NS, SCHEMA_NS};

pub struct MediaService;

impl MediaService {
    pub async fn get_profiles(
        client: &OnvifClient,
        media_service_url: &str,
    ) -> Result<String, LocateError> {
        let request_body = format!(r#"<trt:GetProfiles xmlns:trt="{}"/>"#, MEDIA_NS);

        client
            .send_soap_request(
                media_service_url,
                &format!("{}/GetProfiles", MEDIA_NS),
                &request_body,
            )
            .await
    }

    /// GetStreamUri for RTP-Unicast over RTSP, the setup every RTSP consumer
    /// understands.
    pub async fn get_stream_uri(
        client: &OnvifClient,
        media_service_url: &str,
        profile_token: &MediaProfileToken,
    ) -> Result<String, LocateError> {
        let request_body = format!(
            r#"<trt:GetStreamUri xmlns:trt="{}">
  <trt:StreamSetup>
    <tt:Stream xmlns:tt="{}">RTP-Unicast</tt:Stream>
    <tt:Transport xmlns:tt="{}">
      <tt:Protocol>RTSP</tt:Protocol>
    </tt:Transport>
  </trt:StreamSetup>
  <trt:ProfileToken>{}</trt:ProfileToken>
</trt:GetStreamUri>"#,
            MEDIA_NS,
            SCHEMA_NS,
            SCHEMA_NS,
            escape_xml(profile_token.as_str())
        );

        client
            .send_soap_request(
                media_service_url,
                &format!("{}/GetStreamUri", MEDIA_NS),
                &request_body,
            )
            .await
    }
}
