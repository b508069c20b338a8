use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dcmlens",
    about = "DICOM upload service with content dedup and PNG previews",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP upload server
    Serve(ServeArgs),
    /// Show a tag and the preview headers of a local DICOM file
    Inspect(InspectArgs),
    /// Write the normalized PNG preview of a local DICOM file
    Render(RenderArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Overrides `bind_addr` from the config
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Overrides `upload_dir` from the config
    #[arg(long)]
    pub upload_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Tag as GGGG,EEEE
    #[arg(short, long)]
    pub tag: String,
}

#[derive(Args)]
pub struct RenderArgs {
    pub file: PathBuf,
    #[arg(short, long)]
    pub output: PathBuf,
}
