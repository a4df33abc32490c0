use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use uuid::Uuid;

use crate::types::MediaProfileToken;

pub const SOAP_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const DEVICE_NS: &str = "http://www.onvif.org/ver10/device/wsdl";
pub const MEDIA_NS: &str = "http://www.onvif.org/ver10/media/wsdl";
pub const SCHEMA_NS: &str = "http://www.onvif.org/ver10/schema";

pub fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Wraps a body fragment in a SOAP 1.2 envelope. The `<s:Header>` block is
/// emitted only when a security header is supplied.
pub fn build_envelope(body: &str, security_header: Option<&str>) -> String {
    let header_block = match security_header {
        Some(header) if !header.is_empty() => format!("<s:Header>{}</s:Header>", header),
        _ => String::new(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="{}">
  {}
  <s:Body>{}</s:Body>
</s:Envelope>"#,
        SOAP_ENV_NS, header_block, body
    )
}

/// WS-Discovery Probe. An untyped probe (no filter) makes devices answer
/// regardless of the type they advertise; some firmware only answers one
/// particular filter.
pub fn build_probe_message(types_filter: Option<&str>) -> String {
    let types_block = match types_filter {
        Some(types) => format!("\n      <d:Types>{}</d:Types>\n    ", types),
        None => String::new(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<e:Envelope
  xmlns:e="http://www.w3.org/2003/05/soap-envelope"
  xmlns:w="http://schemas.xmlsoap.org/ws/2004/08/addressing"
  xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery"
  xmlns:dn="http://www.onvif.org/ver10/network/wsdl"
  xmlns:tds="http://www.onvif.org/ver10/device/wsdl">
  <e:Header>
    <w:MessageID>{}</w:MessageID>
    <w:To>urn:schemas-xmlsoap-org:ws:2005:04:discovery</w:To>
    <w:Action>http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</w:Action>
  </e:Header>
  <e:Body>
    <d:Probe>{}</d:Probe>
  </e:Body>
</e:Envelope>"#,
        build_message_id(),
        types_block
    )
}

/// SSDP M-SEARCH request, CRLF framed with the blank-line terminator.
pub fn build_ssdp_message(search_target: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nMAN: \"ssdp:discover\"\r\nMX: 2\r\nST: {}\r\n\r\n",
        search_target
    )
}

// Unique within a discovery run is all WS-Discovery asks of the message id.
fn build_message_id() -> String {
    format!(
        "uuid:{}-{}",
        Uuid::new_v4().simple(),
        Utc::now().timestamp_millis()
    )
}

/// Tolerant tag extraction: matches the local tag name whatever its
/// namespace prefix and returns the first non-empty value. Empty tags are
/// treated as absent and scanning continues. Malformed XML yields `None`,
/// never an error; this must be safe to call on anything a device sends.
pub fn extract_tag_value(xml: &str, local_tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut capture_depth: Option<usize> = None;
    let mut value = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                if capture_depth.is_none() && local_name_eq(e.local_name().as_ref(), local_tag) {
                    capture_depth = Some(depth);
                    value.clear();
                }
            }
            Ok(Event::Text(e)) => {
                if capture_depth == Some(depth) {
                    value.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(_)) => {
                if capture_depth == Some(depth) {
                    capture_depth = None;
                    let trimmed = value.trim();
                    if !trimmed.is_empty() {
                        return Some(trimmed.to_string());
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Media service endpoint from a GetCapabilities response. An XAddr nested
/// in a `Media` element wins; otherwise any XAddr mentioning "media",
/// otherwise the first XAddr in the document.
pub fn extract_media_xaddr(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut media_depth: Option<usize> = None;
    let mut xaddr_depth: Option<usize> = None;
    let mut current = String::new();
    let mut candidates: Vec<(String, bool)> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                if media_depth.is_none() && local_name_eq(name.as_ref(), "Media") {
                    media_depth = Some(depth);
                }
                if xaddr_depth.is_none() && local_name_eq(name.as_ref(), "XAddr") {
                    xaddr_depth = Some(depth);
                    current.clear();
                }
            }
            Ok(Event::Text(e)) => {
                if xaddr_depth == Some(depth) {
                    current.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(_)) => {
                if xaddr_depth == Some(depth) {
                    xaddr_depth = None;
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        candidates.push((trimmed.to_string(), media_depth.is_some()));
                    }
                }
                if media_depth == Some(depth) {
                    media_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            // Keep whatever was collected before a malformed tail.
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some((value, _)) = candidates.iter().find(|(_, in_media)| *in_media) {
        return Some(value.clone());
    }
    if let Some((value, _)) = candidates
        .iter()
        .find(|(value, _)| value.to_lowercase().contains("media"))
    {
        return Some(value.clone());
    }
    candidates.into_iter().next().map(|(value, _)| value)
}

/// `token` attribute of the first `Profiles` element that carries one.
pub fn extract_profile_token(xml: &str) -> Option<MediaProfileToken> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if local_name_eq(e.local_name().as_ref(), "Profiles") {
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref().eq_ignore_ascii_case(b"token") {
                            if let Ok(value) = attr.unescape_value() {
                                let trimmed = value.trim();
                                if !trimmed.is_empty() {
                                    return Some(MediaProfileToken::new(trimmed));
                                }
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn local_name_eq(name: &[u8], tag: &str) -> bool {
    name.eq_ignore_ascii_case(tag.as_bytes())
}
