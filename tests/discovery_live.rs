use onvif_locator::{scan_for_devices, DiscoveryConfig};

// Sends real probes on the attached network; run explicitly with
// `cargo test -- --ignored` on a network where that is acceptable.
#[tokio::test]
#[ignore = "requires a live network"]
async fn test_live_discovery_smoke() {
    let devices = scan_for_devices(&DiscoveryConfig::default())
        .await
        .expect("discovery run failed");

    for device in &devices {
        println!("{} -> {:?}", device.ip, device.service_addresses);
        assert!(!device.ip.is_empty());
    }
}
