use anyhow::Context;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use config::CliConfig;
use directories::ProjectDirs;
use std::path::PathBuf;

mod cmd;
mod config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// config file to use instead of the default location
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a hex-encoded channel message and print its value
    Decode {
        /// Message bytes in hex, whitespace is ignored
        hex: String,
    },
    /// Decode a hex-encoded reply envelope and print its result or error
    Reply {
        /// Reply bytes in hex, whitespace is ignored
        hex: String,
        /// Channel the reply arrived on, used in error messages
        #[arg(long, value_name = "NAME", default_value = "unknown")]
        channel: String,
    },
    /// List the custom value tags of the BLE codec
    Tags,
    /// List the platform and callback channel names
    Channels {
        /// Overrides the channel suffix from the config
        #[arg(long, value_name = "SUFFIX")]
        suffix: Option<String>,
    },
    /// Print the effective config as TOML
    Config,
    /// Send a sample scan result through an in-memory callback channel and
    /// print the bytes on the wire
    Selftest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    // ~/.config/uble/config.toml unless --config is given
    let config = match cli.config {
        Some(path) => CliConfig::load(&path)?,
        None => {
            let dirs = ProjectDirs::from("", "", "uble")
                .context("failed to determine config directory path")?;
            CliConfig::load_or_default(&dirs.config_dir().join("config.toml"))?
        }
    };

    cmd::run_command(config, cli.cmd).await
}
