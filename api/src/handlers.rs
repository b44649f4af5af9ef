pub mod devices;
pub mod spoof;

pub use devices::list_devices;
pub use spoof::arp_spoof;
