//! Découverte SSDP des devices UPnP.

pub mod registry;
pub mod upnp_discoverer;

pub use registry::{DeviceRegistry, DeviceSubscription};
pub use upnp_discoverer::{DiscoveredDevices, DiscoveryOptions, DiscoveryRun, UpnpDiscoverer};
