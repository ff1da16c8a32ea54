//! Reference CLI for driving a [`shepherd::Shepherd`] against the
//! in-process mock radio, the way the teacher crate's `example` binary
//! drives an SCPI device tree against a mock instrument.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shepherd::{
    JsonDevBox, MockAfLayer, MockController, PermitJoinType, ResetMode, Shepherd, ShepherdOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shepherd-gateway", about = "Drive a Shepherd against a mock Zigbee coordinator")]
struct Cli {
    /// Path to the device store JSON file.
    #[arg(long, default_value = "shepherd-devices.json")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the coordinator and print its network info.
    Start,
    /// List every known device.
    List,
    /// Open the network to joins for `seconds`.
    PermitJoin { seconds: u8 },
    /// Reset the coordinator. `hard` also wipes the device store.
    Reset {
        #[arg(value_enum)]
        mode: ResetModeArg,
    },
    /// Run the event loop, printing every indication as it arrives.
    Watch,
}

#[derive(Clone, clap::ValueEnum)]
enum ResetModeArg {
    Soft,
    Hard,
}

impl From<ResetModeArg> for ResetMode {
    fn from(v: ResetModeArg) -> Self {
        match v {
            ResetModeArg::Soft => ResetMode::Soft,
            ResetModeArg::Hard => ResetMode::Hard,
        }
    }
}

fn build_shepherd(db: &PathBuf) -> anyhow::Result<Shepherd> {
    let store = JsonDevBox::open(db)?;
    let coord_ieee = shepherd::IeeeAddr::parse("0x00124b0001020304")?;
    let (controller, _handle) = MockController::new(coord_ieee, 0x0000);
    Ok(Shepherd::new(Box::new(store), Box::new(controller), MockAfLayer::new()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let options = ShepherdOptions::new(cli.db.clone());
    tracing::debug!(db_path = ?options.db_path, "configured shepherd options");

    let shepherd = build_shepherd(&cli.db)?;

    match cli.command {
        Command::Start => {
            shepherd.start(false).await?;
            let info = shepherd.info().await?;
            println!(
                "started: channel={} panId={:#06x} ieeeAddr={}",
                info.channel, info.pan_id, info.ieee_addr
            );
        }
        Command::List => {
            shepherd.start(true).await?;
            for dev in shepherd.list_all(true) {
                println!("{} nwk={:#06x} type={:?}", dev.ieee_addr, dev.nwk_addr, dev.device_type);
            }
        }
        Command::PermitJoin { seconds } => {
            shepherd.start(true).await?;
            shepherd.permit_join(seconds, PermitJoinType::All).await?;
            println!("permit join open for {seconds}s");
        }
        Command::Reset { mode } => {
            shepherd.reset(mode.into()).await?;
            println!("reset issued");
        }
        Command::Watch => {
            shepherd.start(false).await?;
            println!("watching for events, Ctrl-C to stop");
            loop {
                tokio::select! {
                    ev = shepherd.poll_event() => {
                        match ev {
                            Some(event) => println!("{event:?}"),
                            None => break,
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
        }
    }

    Ok(())
}
