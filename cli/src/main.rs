mod commands;
mod terminal;

use std::sync::Arc;

use commands::{CommandLine, Commands, devices, serve, spoof};
use lure_common::config::Config;
use lure_core::network::link::{LinkProvider, SystemLinks};
use terminal::logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CommandLine::parse_args();
    let config = Config::load(cli.config.as_deref(), cli.overrides())?;

    logging::init_logging(&config.logging.level);
    info!("lure v{}", env!("CARGO_PKG_VERSION"));

    let links: Arc<dyn LinkProvider> = Arc::new(SystemLinks);
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::serve(config, links).await,
        Commands::Devices => devices::devices(links.as_ref()),
        Commands::Spoof => spoof::spoof(&config, links.as_ref()).await,
    }
}
