use anyhow::Result;
use clap::Parser;
use tracing::info;

use nextcloud_exporter::{
    cli::{Cli, Commands},
    config::{self, RunMode},
    init_tracing,
    login::LoginClient,
    server,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing();

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let cfg = config::load(&args.args, RunMode::Serve)?;
            server::run(cfg).await?;
        }
        Commands::Login => {
            let cfg = config::load(&args.args, RunMode::Login)?;
            let client = LoginClient::new(
                cfg.server.clone(),
                &config::user_agent(),
                cfg.tls_skip_verify,
            )?;
            let login = client.start_interactive().await?;
            info!("Username: {}", login.username);
            info!("Password: {}", login.password);
        }
        Commands::Version => {
            println!("nextcloud-exporter v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
