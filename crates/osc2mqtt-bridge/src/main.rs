//! Command-line entry point for the OSC/MQTT bridge.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use osc2mqtt_bridge::{Bridge, BridgeConfig};

/// Bridge between OSC and MQTT.
#[derive(Parser, Debug)]
#[command(name = "osc2mqtt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read configuration from the given file.
    #[arg(short, long, value_name = "FILE", default_value = "osc2mqtt.toml")]
    config: PathBuf,

    /// Local OSC server (UDP) port.
    #[arg(short = 'p', long, value_name = "PORT")]
    osc_port: Option<u16>,

    /// MQTT broker addr[:port].
    #[arg(short, long, value_name = "ADDR[:PORT]")]
    mqtt_broker: Option<String>,

    /// Also bridge MQTT to an OSC receiver addr[:port] via UDP
    /// (default: one-way).
    #[arg(short, long, value_name = "ADDR[:PORT]")]
    osc_receiver: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "osc2mqtt=debug,osc2mqtt_core=debug,osc2mqtt_bridge=debug"
    } else {
        "osc2mqtt=info,osc2mqtt_bridge=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // JSON logs for container environments.
    let json_logging = std::env::var("OSC2MQTT_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = if args.config.exists() {
        BridgeConfig::load(&args.config)?
    } else {
        warn!(path = %args.config.display(), "config file not found, using defaults");
        BridgeConfig::default()
    };

    // Command-line flags override file settings.
    if let Some(port) = args.osc_port {
        config.osc.port = port;
    }
    if let Some(broker) = args.mqtt_broker {
        config.mqtt.broker = broker;
    }
    if let Some(receiver) = args.osc_receiver {
        config.osc.receiver = Some(receiver);
    }

    let bridge = Bridge::start(&config).await?;
    tokio::select! {
        _ = bridge.run() => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    Ok(())
}
