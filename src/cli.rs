use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nextcloud-exporter",
    version,
    about = "Prometheus exporter for Nextcloud servers"
)]
pub struct Cli {
    #[command(flatten)]
    pub args: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags shared by the serve and login commands. Every flag overrides the
/// matching `NEXTCLOUD_*` environment variable and config file entry.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Path to YAML configuration file
    #[arg(short = 'c', long)]
    pub config_file: Option<PathBuf>,

    /// URL of the Nextcloud server
    #[arg(short = 's', long)]
    pub server: Option<String>,

    /// Address to listen on for connections
    #[arg(short = 'a', long)]
    pub addr: Option<String>,

    /// Timeout for getting the server info document, in seconds
    #[arg(short = 't', long)]
    pub timeout_seconds: Option<u64>,

    /// Username for connecting to Nextcloud
    #[arg(short = 'u', long)]
    pub username: Option<String>,

    /// Password for connecting to Nextcloud; prefix with @ to read it from a file
    #[arg(short = 'p', long)]
    pub password: Option<String>,

    /// Authentication token (app password) to use instead of username/password
    #[arg(long)]
    pub auth_token: Option<String>,

    /// Skip TLS certificate verification (for self-signed certificates)
    #[arg(long)]
    pub tls_skip_verify: bool,

    /// Tell the server to omit the app listing from the info document
    #[arg(long)]
    pub skip_apps: bool,

    /// Tell the server to omit the update check from the info document
    #[arg(long)]
    pub skip_update: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the exporter (default when no subcommand is given)
    Serve,

    /// Interactively create an app password via the Login flow v2
    Login,

    /// Print version information
    Version,
}
