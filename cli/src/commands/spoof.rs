use lure_common::config::Config;
use lure_core::network::link::LinkProvider;
use lure_core::session::{Session, SessionConfig};
use tracing::info;

pub async fn spoof(config: &Config, links: &dyn LinkProvider) -> anyhow::Result<()> {
    let summary = Session::run(SessionConfig::from(&config.session), links).await?;

    info!(
        host = %summary.host,
        targets = summary.targets,
        poison_sent = summary.poison.sent,
        poison_skipped = summary.poison.skipped,
        restore_sent = summary.restore.sent,
        interference = summary.observer.interference,
        "Session complete"
    );
    Ok(())
}
