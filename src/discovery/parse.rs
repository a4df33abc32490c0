use std::collections::HashMap;
use std::net::IpAddr;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::types::DiscoveredDevice;

/// Accumulates devices across probe responses. Devices keep first-seen
/// order; repeat sightings of an IP merge their service addresses instead
/// of producing duplicates, so observing the same datagram twice leaves the
/// registry unchanged.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<DiscoveredDevice>,
    index: HashMap<String, usize>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one datagram into the registry. WS-Discovery ProbeMatch XAddrs
    /// and SSDP LOCATION headers both count as service addresses; the
    /// sender's IP is recorded even when the payload yields nothing, since
    /// answering the probe at all marks the host as a device.
    pub fn observe(&mut self, datagram: &str, sender: IpAddr) {
        let mut addresses = extract_xaddrs(datagram);
        if addresses.is_empty() {
            if let Some(location) = extract_ssdp_location(datagram) {
                addresses.push(location);
            }
        }

        let mut ips: Vec<String> = Vec::new();
        for address in &addresses {
            collect_ipv4_literals(address, &mut ips);
        }
        let sender_ip = sender.to_string();
        if !ips.contains(&sender_ip) {
            ips.push(sender_ip);
        }

        for ip in ips {
            self.record(ip, &addresses);
        }
    }

    fn record(&mut self, ip: String, addresses: &[String]) {
        if let Some(&position) = self.index.get(&ip) {
            let device = &mut self.devices[position];
            for address in addresses {
                if !device.service_addresses.contains(address) {
                    device.service_addresses.push(address.clone());
                }
            }
        } else {
            self.index.insert(ip.clone(), self.devices.len());
            self.devices.push(DiscoveredDevice {
                ip,
                service_addresses: addresses.to_vec(),
            });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn into_devices(self) -> Vec<DiscoveredDevice> {
        self.devices
    }
}

/// All XAddrs values in the document, whitespace-split and deduplicated in
/// order of appearance. A parse error keeps whatever was collected before
/// it; devices pad their ProbeMatch responses with junk often enough that
/// discarding the whole datagram would lose real addresses.
pub fn extract_xaddrs(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut capture_depth: Option<usize> = None;
    let mut current = String::new();
    let mut addresses: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                if capture_depth.is_none()
                    && e.local_name().as_ref().eq_ignore_ascii_case(b"XAddrs")
                {
                    capture_depth = Some(depth);
                    current.clear();
                }
            }
            Ok(Event::Text(e)) => {
                if capture_depth == Some(depth) {
                    current.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(_)) => {
                if capture_depth == Some(depth) {
                    capture_depth = None;
                    for address in current.split_whitespace() {
                        if !addresses.iter().any(|a| a == address) {
                            addresses.push(address.to_string());
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    addresses
}

/// LOCATION header of an SSDP response, whatever its casing.
pub fn extract_ssdp_location(payload: &str) -> Option<String> {
    for line in payload.lines() {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("location") {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Appends every dotted-quad literal found in `value` to `out`, skipping
/// duplicates. Groups must be one to three digits; a fifth group starts a
/// fresh scan, so "1.2.3.4.5" yields "1.2.3.4".
pub fn collect_ipv4_literals(value: &str, out: &mut Vec<String>) {
    for run in value.split(|c: char| !c.is_ascii_digit() && c != '.') {
        if run.is_empty() {
            continue;
        }
        let groups: Vec<&str> = run.split('.').collect();
        let mut i = 0;
        while i + 4 <= groups.len() {
            let window = &groups[i..i + 4];
            if window.iter().all(|g| !g.is_empty() && g.len() <= 3) {
                let literal = window.join(".");
                if !out.contains(&literal) {
                    out.push(literal);
                }
                i += 4;
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const PROBE_MATCH: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<e:Envelope xmlns:e="http://www.w3.org/2003/05/soap-envelope" xmlns:d="http://schemas.xmlsoap.org/ws/2005/04/discovery">
  <e:Body>
    <d:ProbeMatches>
      <d:ProbeMatch>
        <d:XAddrs>http://192.168.1.64/onvif/device_service http://192.168.1.64:8080/onvif/device_service</d:XAddrs>
      </d:ProbeMatch>
    </d:ProbeMatches>
  </e:Body>
</e:Envelope>"#;

    fn sender(last_octet: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 168, 1, last_octet))
    }

    #[test]
    fn test_extract_xaddrs_prefixed_and_bare() {
        let addrs = extract_xaddrs(PROBE_MATCH);
        assert_eq!(
            addrs,
            vec![
                "http://192.168.1.64/onvif/device_service",
                "http://192.168.1.64:8080/onvif/device_service"
            ]
        );

        let bare = "<ProbeMatch><XAddrs>http://10.0.0.9/onvif/device_service</XAddrs></ProbeMatch>";
        assert_eq!(
            extract_xaddrs(bare),
            vec!["http://10.0.0.9/onvif/device_service"]
        );
    }

    #[test]
    fn test_extract_xaddrs_dedupes_and_salvages() {
        let repeated = "<m><XAddrs>http://a http://a http://b</XAddrs></m>";
        assert_eq!(extract_xaddrs(repeated), vec!["http://a", "http://b"]);

        // A malformed tail keeps what was already parsed.
        let truncated = "<m><XAddrs>http://10.0.0.9/x</XAddrs><oops <<";
        assert_eq!(extract_xaddrs(truncated), vec!["http://10.0.0.9/x"]);

        assert!(extract_xaddrs("garbage").is_empty());
    }

    #[test]
    fn test_extract_ssdp_location() {
        let response = "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age=1800\r\nLocation: http://192.168.1.20:49152/desc.xml\r\nST: upnp:rootdevice\r\n\r\n";
        assert_eq!(
            extract_ssdp_location(response).as_deref(),
            Some("http://192.168.1.20:49152/desc.xml")
        );
        assert_eq!(extract_ssdp_location("HTTP/1.1 200 OK\r\n\r\n"), None);
    }

    #[test]
    fn test_collect_ipv4_literals() {
        let mut out = Vec::new();
        collect_ipv4_literals("http://192.168.1.64:8899/onvif/device_service", &mut out);
        assert_eq!(out, vec!["192.168.1.64"]);

        let mut out = Vec::new();
        collect_ipv4_literals("1.2.3.4.5", &mut out);
        assert_eq!(out, vec!["1.2.3.4"]);

        let mut out = Vec::new();
        collect_ipv4_literals("no addresses here", &mut out);
        assert!(out.is_empty());

        let mut out = Vec::new();
        collect_ipv4_literals("10.0.0", &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_observe_is_idempotent() {
        let mut registry = DeviceRegistry::new();
        registry.observe(PROBE_MATCH, sender(64));
        let after_first: Vec<_> = registry.devices.clone();
        registry.observe(PROBE_MATCH, sender(64));
        assert_eq!(registry.devices, after_first);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_observe_merges_addresses_for_known_ip() {
        let mut registry = DeviceRegistry::new();
        registry.observe(PROBE_MATCH, sender(64));
        registry.observe(
            "<m><XAddrs>http://192.168.1.64:9000/alt</XAddrs></m>",
            sender(64),
        );

        let devices = registry.into_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(
            devices[0].service_addresses,
            vec![
                "http://192.168.1.64/onvif/device_service",
                "http://192.168.1.64:8080/onvif/device_service",
                "http://192.168.1.64:9000/alt"
            ]
        );
    }

    #[test]
    fn test_observe_records_sender_without_payload() {
        let mut registry = DeviceRegistry::new();
        registry.observe("", sender(33));
        let devices = registry.into_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].ip, "192.168.1.33");
        assert!(devices[0].service_addresses.is_empty());
    }

    #[test]
    fn test_observe_records_sender_alongside_advertised_ips() {
        // NAT-ish setups advertise one IP while answering from another.
        let mut registry = DeviceRegistry::new();
        registry.observe(PROBE_MATCH, sender(200));
        let devices = registry.into_devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].ip, "192.168.1.64");
        assert_eq!(devices[1].ip, "192.168.1.200");
        assert_eq!(devices[0].service_addresses, devices[1].service_addresses);
    }

    #[test]
    fn test_observe_ssdp_response() {
        let mut registry = DeviceRegistry::new();
        let response =
            "HTTP/1.1 200 OK\r\nLOCATION: http://192.168.1.20:49152/desc.xml\r\n\r\n";
        registry.observe(response, sender(20));
        let devices = registry.into_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].ip, "192.168.1.20");
        assert_eq!(
            devices[0].service_addresses,
            vec!["http://192.168.1.20:49152/desc.xml"]
        );
    }

    #[test]
    fn test_devices_keep_first_seen_order() {
        let mut registry = DeviceRegistry::new();
        registry.observe("<m><XAddrs>http://10.0.0.7/x</XAddrs></m>", sender(7));
        registry.observe("<m><XAddrs>http://10.0.0.3/x</XAddrs></m>", sender(3));
        let ips: Vec<_> = registry.into_devices().into_iter().map(|d| d.ip).collect();
        assert_eq!(ips, vec!["10.0.0.7", "10.0.0.3"]);
    }
}
