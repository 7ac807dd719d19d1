//! # CCSDS Link
//!
//! Telemetry beacon and ground receiver for a CCSDS packet radio link.
//!
//! In `downlink` mode the binary transmits a telemetry packet built from the
//! configured beacon values at a fixed interval. In `ground` mode it receives
//! frames, verifies their CRC, decodes them with the configured payload format
//! and appends each record to rotating JSON Lines logs.
//!
//! # Examples
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```
//!
//! Expected output (downlink mode):
//! ```text
//! INFO ccsds_link: CCSDS Link v0.1.0 starting...
//! INFO ccsds_link::link: Opened radio modem at /dev/ttyUSB0 (115200 baud)
//! INFO ccsds_link: Transmitting telemetry beacon every 1000ms (APID 100)
//! INFO ccsds_link: Sent 60 packets
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ccsds_link::config::{Config, LinkMode};
use ccsds_link::link::port_trait::FramePort;
use ccsds_link::link::{Downlink, SerialLink};
use ccsds_link::telemetry::{GroundStation, StationEvent, TelemetryLogger, TelemetryReceiver};

/// Config file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of packets between status log messages
const LOG_INTERVAL_PACKETS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(writer)
        .init();

    info!("CCSDS Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = load_config(std::env::args().nth(1))?;
    let link = SerialLink::open(&config.link)?;
    info!("Radio link opened at: {}", link.device_path());

    match config.link.mode {
        LinkMode::Downlink => run_downlink(link, &config).await,
        LinkMode::Ground => run_ground(link, &config).await,
    }
}

/// Load the config named on the command line, else the default file, else built-in defaults
fn load_config(arg: Option<String>) -> Result<Config> {
    if let Some(path) = arg {
        return Config::load(&path).with_context(|| format!("loading config {}", path));
    }

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        return Config::load(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("loading config {}", DEFAULT_CONFIG_PATH));
    }

    warn!("No config file found, using built-in defaults");
    Ok(Config::default())
}

async fn run_downlink<P: FramePort>(port: P, config: &Config) -> Result<()> {
    let mut downlink = Downlink::new(port, config.telemetry.apid);
    let mut beacon = interval(Duration::from_millis(config.telemetry.interval_ms));

    info!(
        "Transmitting telemetry beacon every {}ms (APID {})",
        config.telemetry.interval_ms, config.telemetry.apid
    );
    info!("Press Ctrl+C to exit");

    let mut last_log_count: u64 = 0;

    loop {
        tokio::select! {
            _ = beacon.tick() => {
                if let Err(e) = downlink.send_telemetry(&config.telemetry.beacon_values).await {
                    warn!("Failed to send packet: {}", e);
                    continue;
                }

                let sent = downlink.packets_sent();
                if sent - last_log_count >= LOG_INTERVAL_PACKETS {
                    info!("Sent {} packets", sent);
                    last_log_count = sent;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total packets sent: {}", downlink.packets_sent());
                break;
            }
        }
    }

    Ok(())
}

async fn run_ground<P: FramePort>(port: P, config: &Config) -> Result<()> {
    let receiver = TelemetryReceiver::new(config.format_descriptor()?);
    let logger = if config.logging.enabled {
        Some(TelemetryLogger::from_config(&config.logging)?)
    } else {
        None
    };

    info!(
        "Receiving telemetry (format: {}, logging: {})",
        receiver.format(),
        config.logging.enabled
    );
    info!("Press Ctrl+C to exit");

    let mut station = GroundStation::new(port, receiver, logger);
    let mut result = Ok(());

    loop {
        tokio::select! {
            event = station.next_event() => match event {
                Ok(StationEvent::Closed) => {
                    warn!("Link closed");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Giving up on the link: {}", e);
                    result = Err(e.into());
                    break;
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let stats = station.receiver().stats();
    info!(
        "Accepted {} packets ({} checksum failures, {} malformed, {} lost)",
        stats.accepted, stats.checksum_failures, stats.malformed, stats.sequence_gaps
    );

    result
}
