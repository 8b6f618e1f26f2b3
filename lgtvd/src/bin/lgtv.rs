use std::process::ExitCode;

use clap::Parser;
use lgtv_serial::{Port, Reply, SerialDevice, Simulator};
use lgtvd::DeviceArgs;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Send a single command to an LG TV over RS-232
#[derive(Debug, clap::Parser)]
#[command(version)]
struct Args {
    #[command(flatten)]
    device: DeviceArgs,

    #[arg(short, long, conflicts_with = "command")]
    list_commands: bool,

    #[arg(short, long, value_name = "COMMAND")]
    command: Option<String>,

    /// Replaces the command's data byte, 0-255
    #[arg(short, long, value_name = "DATA", requires = "command", allow_hyphen_values = true)]
    data: Option<i64>,

    /// Log what goes over the wire
    #[arg(short, long)]
    verbose: bool,
}

fn run<P: Port>(args: &Args, port: P) -> Result<ExitCode, lgtv_serial::Error> {
    let mut tv = args.device.controller(port)?;

    if args.list_commands {
        for (name, code) in tv.tv().commands() {
            println!("{} : {}", name, code);
        }
    } else if let Some(command) = &args.command {
        match tv.command(command, args.data) {
            Ok(Reply::Value(value)) => println!("{:#x}", value),
            Ok(Reply::Input(name)) => println!("{}", name),
            Ok(Reply::Ack) => println!("true"),
            Err(e) if e.is_transport() => {
                eprintln!("TV rejected the command");
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = if args.device.simulate {
        run(&args, Simulator::new())
    } else {
        run(&args, SerialDevice::new(&args.device.serial))
    };

    result.unwrap_or_else(|e| {
        error!("{}", e);
        ExitCode::FAILURE
    })
}
