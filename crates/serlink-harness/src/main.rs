use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};

use serlink_harness::{HarnessConfig, Role, logging, run_master, run_slave};
use serlink_link::SerialLink;

#[derive(Parser)]
#[command(name = "serlink", about = "Serial link qualification harness")]
struct Cli {
    /// Path to an optional TOML tuning file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initiate a session: propose settings, transmit first
    Client {
        /// Serial port path (e.g. /dev/ttyUSB0 or COM3)
        port: String,
        /// Line rate in bits per second
        baud: u32,
        /// Payload bytes per frame
        payload_size: u32,
        /// Frames to exchange in each direction
        frame_count: u32,
    },
    /// Respond to a session: accept settings, receive first
    Server {
        port: String,
        baud: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    let (role, port, baud) = match &cli.command {
        Command::Client { port, baud, .. } => (Role::Master, port.clone(), *baud),
        Command::Server { port, baud } => (Role::Slave, port.clone(), *baud),
    };

    if let Err(e) = logging::init(role.wire_name(), &port) {
        eprintln!("failed to open log file: {e}");
        std::process::exit(1);
    }

    let config = match &cli.config {
        Some(path) => match HarnessConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => HarnessConfig::default(),
    };

    let link = match SerialLink::open(&port, baud) {
        Ok(link) => link,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    let cancel = AtomicBool::new(false);
    let outcome = match cli.command {
        Command::Client {
            payload_size,
            frame_count,
            ..
        } => run_master(&link, payload_size, frame_count, &config, &cancel),
        Command::Server { .. } => run_slave(&link, &config, &cancel),
    };

    if let Err(e) = outcome {
        tracing::error!("session failed: {e}");
        std::process::exit(1);
    }
}
