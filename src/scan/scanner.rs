use std::net::Ipv4Addr;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout_at, Instant};

use crate::config::ScanConfig;
use crate::net;
use crate::types::{Credentials, MatchHint, ScanHit};

use super::rtsp;

// OPTIONS sometimes gets silence from servers that do answer DESCRIBE;
// the nudge goes out this long after connecting if nothing has arrived.
const FOLLOWUP_DELAY: Duration = Duration::from_millis(350);

/// Sweeps a /24 for live RTSP endpoints by speaking a little RTSP at every
/// host. Probes run through a bounded worker pool so a subnet of dead
/// addresses finishes in a handful of timeout windows.
pub struct SubnetScanner {
    config: ScanConfig,
    credentials: Credentials,
}

impl SubnetScanner {
    pub fn new(config: ScanConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Scans the configured subnet, or the subnet of the local address when
    /// none is configured. No subnet at all yields an empty result, not an
    /// error; callers treat that the same as a subnet with no cameras.
    pub async fn scan_subnet(&self) -> Vec<ScanHit> {
        let prefix = match self
            .config
            .subnet_prefix
            .clone()
            .or_else(net::local_subnet_prefix)
        {
            Some(prefix) => prefix,
            None => {
                tracing::warn!("No subnet prefix available, skipping RTSP scan");
                return Vec::new();
            }
        };

        let (host_min, host_max) = self.config.host_range();
        let hosts: Vec<String> = (host_min..=host_max)
            .map(|octet| format!("{}.{}", prefix, octet))
            .collect();
        tracing::info!(
            "Scanning {} host(s) on {}.0/24 across {} path(s)",
            hosts.len(),
            prefix,
            self.config.paths.len()
        );
        self.scan_hosts(hosts).await
    }

    /// Probes an explicit host list instead of a whole subnet. Duplicates
    /// and blank entries are dropped, order is preserved.
    pub async fn filter_hosts(&self, hosts: &[String]) -> Vec<ScanHit> {
        let mut unique: Vec<String> = Vec::new();
        for host in hosts {
            let trimmed = host.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !unique.iter().any(|h| h == trimmed) {
                unique.push(trimmed.to_string());
            }
        }
        if unique.is_empty() {
            return Vec::new();
        }
        tracing::info!("Probing {} explicit host(s)", unique.len());
        self.scan_hosts(unique).await
    }

    async fn scan_hosts(&self, hosts: Vec<String>) -> Vec<ScanHit> {
        let concurrency = self.config.concurrency.max(1);
        let mut hits: Vec<ScanHit> = stream::iter(hosts)
            .map(|host| self.probe_host(host))
            .buffer_unordered(concurrency)
            .filter_map(|hit| async move { hit })
            .collect()
            .await;

        hits.sort_by_key(|hit| ip_sort_key(&hit.ip));
        tracing::info!("RTSP scan finished with {} hit(s)", hits.len());
        hits
    }

    // First path that answers wins; remaining paths on that host are
    // skipped. The inter-host delay applies whether or not the host hit,
    // to keep the probe rate steady on networks that throttle.
    async fn probe_host(&self, host: String) -> Option<ScanHit> {
        let mut found = None;
        for path in &self.config.paths {
            if let Some(hit) = self.probe_path(&host, path).await {
                found = Some(hit);
                break;
            }
        }
        if self.config.probe_delay_ms > 0 {
            sleep(Duration::from_millis(self.config.probe_delay_ms)).await;
        }
        found
    }

    /// One TCP probe against `host:port` for `path`. The deadline covers
    /// the connect and the response together, so a slow connect eats into
    /// the response window instead of extending it.
    async fn probe_path(&self, host: &str, path: &str) -> Option<ScanHit> {
        let port = self.config.port;
        let url = rtsp::probe_target_url(host, port, path, &self.credentials);
        let deadline = Instant::now() + self.config.probe_timeout();

        let mut stream = match timeout_at(deadline, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                tracing::trace!("Connect to {}:{} failed: {}", host, port, err);
                return None;
            }
            Err(_) => return None,
        };
        let followup_at = Instant::now() + FOLLOWUP_DELAY;

        let options = rtsp::build_options_request(&url, &self.config.user_agent, &self.credentials);
        match timeout_at(deadline, stream.write_all(options.as_bytes())).await {
            Ok(Ok(())) => {}
            _ => return None,
        }

        let mut buffer = String::new();
        let mut chunk = [0u8; 2048];
        let mut describe_sent = false;
        let mut connection_live = true;

        loop {
            let wait_until = if describe_sent || !buffer.is_empty() {
                deadline
            } else {
                followup_at.min(deadline)
            };

            match timeout_at(wait_until, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => {
                    connection_live = false;
                    break;
                }
                Ok(Ok(n)) => {
                    buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
                    if rtsp::is_rtsp_response(&buffer) {
                        let hint = rtsp::extract_match_hint(&buffer);
                        tracing::debug!(
                            "RTSP response from {}:{}{} (realm={:?}, server={:?})",
                            host,
                            port,
                            path,
                            hint.realm,
                            hint.server
                        );
                        return Some(ScanHit {
                            ip: host.to_string(),
                            rtsp_path: path.to_string(),
                            rtsp_port: port,
                            match_hint: hint,
                            connect_only: false,
                        });
                    }
                }
                Ok(Err(err)) => {
                    tracing::trace!("Read from {}:{} failed: {}", host, port, err);
                    connection_live = false;
                    break;
                }
                Err(_) => {
                    // The timer that fired is either the follow-up moment
                    // or the overall deadline.
                    if !describe_sent && buffer.is_empty() && Instant::now() < deadline {
                        describe_sent = true;
                        let describe = rtsp::build_describe_request(
                            &url,
                            &self.config.user_agent,
                            &self.credentials,
                        );
                        match timeout_at(deadline, stream.write_all(describe.as_bytes())).await {
                            Ok(Ok(())) => continue,
                            _ => {
                                connection_live = false;
                                break;
                            }
                        }
                    }
                    break;
                }
            }
        }

        // Deadline expired with the connection still up. Filtered firewalls
        // cannot fake this; only something listening accepts the connect.
        if self.config.allow_connect_only && connection_live {
            tracing::debug!("Connect-only hit at {}:{}{}", host, port, path);
            return Some(ScanHit {
                ip: host.to_string(),
                rtsp_path: path.to_string(),
                rtsp_port: port,
                match_hint: MatchHint::default(),
                connect_only: true,
            });
        }
        None
    }
}

// Unparseable addresses sort last; they only appear when a caller feeds
// hostnames through filter_hosts.
fn ip_sort_key(ip: &str) -> u32 {
    ip.parse::<Ipv4Addr>().map(u32::from).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_sort_key_orders_numerically() {
        let mut ips = vec!["192.168.1.100", "192.168.1.2", "192.168.1.30"];
        ips.sort_by_key(|ip| ip_sort_key(ip));
        assert_eq!(ips, vec!["192.168.1.2", "192.168.1.30", "192.168.1.100"]);
        assert_eq!(ip_sort_key("not-an-ip"), u32::MAX);
    }

    #[tokio::test]
    async fn test_filter_hosts_dedupes_and_handles_empty() {
        let scanner = SubnetScanner::new(ScanConfig::default(), Credentials::anonymous());
        assert!(scanner.filter_hosts(&[]).await.is_empty());
        assert!(scanner
            .filter_hosts(&["".to_string(), "   ".to_string()])
            .await
            .is_empty());
    }
}
