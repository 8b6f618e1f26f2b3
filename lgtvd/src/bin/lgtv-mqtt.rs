use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use lgtv_serial::{Port, SerialDevice, Simulator};
use lgtvd::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Bridge an LG TV's RS-232 control port to MQTT
#[derive(Debug, clap::Parser)]
#[command(version)]
struct Args {
    #[command(flatten)]
    device: DeviceArgs,

    #[arg(value_name = "MQTT_BROKER")]
    broker: String,

    #[arg(long, default_value_t = 1883)]
    port: u16,

    #[arg(long, value_name = "MQTT_TOPIC_PREFIX", default_value = topics::DEFAULT_PREFIX)]
    topic_prefix: String,

    /// Seconds between status updates
    #[arg(long, value_name = "SECONDS", default_value_t = 15)]
    interval: u64,

    #[arg(long, default_value = "lgtv-mqtt")]
    client_id: String,
}

async fn serve<P: Port>(args: &Args, port: P) -> Result<(), Error> {
    // an unknown model must fail before touching the broker
    let tv = args.device.controller(port)?;
    info!(model = %args.device.model, family = ?tv.tv().table().family(), "tv ready");

    let mut mqtt = MqttConfig::new(&args.broker, args.port);
    mqtt.client_id = args.client_id.clone();
    let config = BridgeConfig {
        topics: Topics::new(&args.topic_prefix),
        interval: Duration::from_secs(args.interval),
        ..Default::default()
    };

    Bridge::new(MqttBus::new(&mqtt), tv, config).run().await;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = if args.device.simulate {
        serve(&args, Simulator::new()).await
    } else {
        serve(&args, SerialDevice::new(&args.device.serial)).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
