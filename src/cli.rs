use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "surveillance-card",
    version,
    about = "Terminal surveillance card: camera thumbnails, motion focus and snapshot capture"
)]
pub struct Cli {
    #[command(flatten)]
    pub card: CardArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the interactive card.
    Tui,
    /// Validate the card config and print the resolved cameras.
    Check(CheckArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CardArgs {
    /// Card configuration file (YAML or JSON).
    #[arg(short, long, global = true, default_value = "surveillance-card.yaml")]
    pub config: PathBuf,

    /// Host state snapshot file (JSON), re-read whenever it changes.
    #[arg(short, long, global = true)]
    pub states: Option<PathBuf>,

    /// Behave as the host's mobile app shell (capture controls disabled).
    #[arg(long, global = true, default_value_t = false)]
    pub mobile_app: bool,

    /// Treat fullscreen as unsupported by the host.
    #[arg(long, global = true, default_value_t = false)]
    pub no_fullscreen: bool,

    /// Host state file poll period in milliseconds.
    #[arg(long, global = true, default_value_t = 500)]
    pub poll_ms: u64,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Print machine-readable JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
