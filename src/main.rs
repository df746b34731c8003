//! server-updater: sync a Minecraft server's plugins and mods with a manifest.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use server_updater::{logging, run_update};

#[derive(Parser, Debug)]
#[clap(name = "server-updater", about = "Keeps server plugins and mods up to date", version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// 0 = debug, 1 = info, 2-3 = warn, 4 = error
    #[clap(short, long, default_value_t = 1, global = true)]
    verbosity: u8,

    /// Disable all log output
    #[clap(short, long, global = true)]
    silent: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download and place everything the manifest lists
    Update {
        /// Server root directory
        #[clap(default_value = ".")]
        root: PathBuf,

        /// Manifest file, relative to the current directory
        #[clap(short = 'c', long = "config", value_name = "MANIFEST", default_value = "server_manifest.json")]
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbosity, cli.silent);

    match cli.command {
        Command::Update { root, manifest } => match run_update(&root, &manifest).await {
            Ok(report) => {
                info!("Update finished: {}", report);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Update failed: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
