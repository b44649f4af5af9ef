use lure_core::network::link::LinkProvider;
use tracing::{info, warn};

pub fn devices(links: &dyn LinkProvider) -> anyhow::Result<()> {
    let devices = links.devices();
    if devices.is_empty() {
        warn!("No capture devices found");
        return Ok(());
    }
    for device in devices {
        if device.description.is_empty() {
            info!("{}", device.name);
        } else {
            info!("{} ({})", device.name, device.description);
        }
    }
    Ok(())
}
