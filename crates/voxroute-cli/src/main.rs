//! VoxRoute CLI
//!
//! Command-line interface for managing a VoxRoute configuration

mod versions;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "voxroute")]
#[command(about = "VoxRoute - ElevenLabs conversation statistics proxy", long_about = None)]
struct Cli {
    /// Path to the server configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "VOXROUTE_CONFIG",
        default_value = "voxroute.yaml",
        global = true
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or change the default API version
    Versions {
        #[command(subcommand)]
        command: VersionsCommand,
    },
}

#[derive(Subcommand)]
enum VersionsCommand {
    /// Show the default version
    Current,
    /// List registered versions
    List,
    /// Make another registered version the default
    Set {
        /// Version tag, e.g. v2
        version: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Versions { command } => {
            let mut document = versions::ConfigDocument::load(&cli.config)?;

            match command {
                VersionsCommand::Current => {
                    println!("Current default version: {}", document.default_version());
                }
                VersionsCommand::List => {
                    let current = document.default_version();
                    for tag in document.version_tags() {
                        let marker = if tag == current { "*" } else { " " };
                        println!("{} {}", marker, tag);
                    }
                }
                VersionsCommand::Set { version } => {
                    let previous = document.default_version();
                    document.set_default_version(&version)?;
                    document.save(&cli.config)?;
                    println!(
                        "Default version changed from {} to {} in {}",
                        previous,
                        version,
                        cli.config.display()
                    );
                    println!("Restart voxroute-server to apply the change.");
                }
            }
        }
    }

    Ok(())
}
