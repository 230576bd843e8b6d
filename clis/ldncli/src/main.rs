use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use ldn::{
    model::{generate_passphrase, Config},
    proto::ScanFilter,
    MasterSession,
};

mod logging;

#[derive(Parser)]
#[clap(about = "Talk to an LDN relay server")]
struct Args {
    #[clap(long, short, help = "JSON config file, defaults are used when missing")]
    config: Option<PathBuf>,

    #[clap(long, default_value = "info", help = "trace, debug, info, warn, error or off")]
    log_level: LevelFilter,

    #[clap(long, help = "Write logs to this file instead of stderr")]
    log_file: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    #[clap(about = "List the networks the relay reports")]
    Scan {
        #[clap(long, default_value = "1")]
        channel: u16,
    },
    #[clap(about = "Print a new random private network passphrase")]
    Passphrase,
    #[clap(about = "Check the config file and print the resolved relay address")]
    CheckConfig,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _guard = logging::setup_logging(args.log_level, args.log_file.as_deref())?;

    match args.cmd {
        Cmd::Passphrase => println!("{}", generate_passphrase()),
        Cmd::CheckConfig => {
            let config = load_config(args.config.as_ref())?;
            let relay = config.server.resolve()?;
            println!("{:#?}", config);
            println!("Relay resolves to {}", relay);
        }
        Cmd::Scan { channel } => {
            let session = MasterSession::new(load_config(args.config.as_ref())?)?;
            let networks = session.scan(channel, ScanFilter::default()).await;
            session.disconnect_and_stop().await;

            println!("{} network(s) on {}", networks.len(), session.relay());
            for (index, network) in networks.iter().enumerate() {
                println!("{}: {:?}", index, network);
            }
        }
    }

    Ok(())
}
