//! # svnfs CLI
//!
//! Mounts the revision history of a Subversion repository as a read-only
//! filesystem: `/{rev}/{path}` is `path` as it was at revision `rev`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use svnfs_config::{init_logging, Config};

mod mount;

#[derive(Parser)]
#[command(name = "svnfs")]
#[command(version, about = "Browse Subversion history as a filesystem", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount a repository's revision history
    Mount(mount::MountArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the location of the global config file
    Path,
}

fn main() -> Result<()> {
    // Exit quietly when piped into `head` and friends
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(config.log_level());

    match cli.command {
        Commands::Mount(args) => mount::run(args, &config),
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
            ConfigCommands::Path => {
                let path = Config::global_config_path()
                    .context("Cannot determine home directory")?;
                println!("{}", path.display());
                Ok(())
            }
        },
    }
}
