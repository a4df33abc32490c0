use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onvif_locator::config::AppConfig;
use onvif_locator::scan::rtsp;
use onvif_locator::{resolve_stream_url, scan_for_devices, scan_subnet};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onvif_locator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting camera locator");

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/locator.yaml".to_string());

    let config = if std::path::Path::new(&config_path).exists() {
        AppConfig::load_from_file(&config_path).context("Failed to load configuration")?
    } else {
        tracing::info!("No configuration at {}, using defaults", config_path);
        AppConfig::default()
    };

    let devices = scan_for_devices(&config.discovery)
        .await
        .context("Device discovery failed")?;
    tracing::info!("Discovered {} device(s)", devices.len());

    let mut located = 0usize;
    for device in &devices {
        match resolve_stream_url(
            &device.ip,
            &device.service_addresses,
            config.credentials.clone(),
            &config.onvif,
        )
        .await
        {
            Ok(stream) => {
                located += 1;
                println!("{}\t{}", device.ip, stream.rtsp_url);
            }
            Err(err) => {
                tracing::warn!("Negotiation with {} failed: {}", device.ip, err);
            }
        }
    }

    // Cameras that ignore discovery probes still answer on their RTSP port.
    if located == 0 {
        tracing::info!("No stream negotiated via discovery, falling back to RTSP subnet scan");
        let hits = scan_subnet(&config.scan, &config.credentials).await;
        for hit in &hits {
            if let Some(url) = rtsp::build_rtsp_url_from_path(
                &hit.ip,
                &hit.rtsp_path,
                hit.rtsp_port,
                &config.credentials,
            ) {
                let marker = if hit.connect_only { "\t(connect-only)" } else { "" };
                println!("{}\t{}{}", hit.ip, url, marker);
            }
        }
        if hits.is_empty() {
            tracing::info!("RTSP scan found nothing");
        }
    }

    Ok(())
}
