use std::net::IpAddr;

/// First three octets of the local IPv4 address, the default subnet for
/// scanning. `None` when the lookup fails or the host only has IPv6.
pub fn local_subnet_prefix() -> Option<String> {
    match local_ip_address::local_ip() {
        Ok(IpAddr::V4(ip)) => {
            let octets = ip.octets();
            Some(format!("{}.{}.{}", octets[0], octets[1], octets[2]))
        }
        Ok(IpAddr::V6(ip)) => {
            tracing::debug!("Local address {} is IPv6, no scannable /24", ip);
            None
        }
        Err(err) => {
            tracing::debug!("Local address lookup failed: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_subnet_prefix_shape() {
        // Environment dependent; when a prefix comes back it must be three
        // dotted octets.
        if let Some(prefix) = local_subnet_prefix() {
            assert_eq!(prefix.split('.').count(), 3);
            assert!(prefix.split('.').all(|part| part.parse::<u8>().is_ok()));
        }
    }
}
