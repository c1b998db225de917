//! # igdcontrol - Control point UPnP pour passerelles IGD
//!
//! ## Architecture
//!
//! - [`UpnpDiscoverer`] : découverte SSDP en exécution unique, avec rejeu des
//!   devices déjà connus pour les abonnés tardifs
//! - [`UpnpDevice`] / [`UpnpService`] : devices découverts et leurs services
//! - [`SoapInvoker`] : invocation des actions SOAP
//! - [`WanIpConnectionClient`] : actions du service `WANIPConnection`
//! - [`UpnpGateway`] : IP externe et mappings de ports, sans se soucier de la
//!   découverte
//!
//! ## Exemple
//!
//! ```no_run
//! use igdcontrol::UpnpGateway;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = igdconfig::get_config()?;
//! let gateway = UpnpGateway::from_config(&config)?;
//! if let Some(ip) = gateway.get_external_ip().await? {
//!     println!("External IP: {}", ip);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config_ext;
pub mod device;
pub mod discovery;
pub mod environment;
pub mod errors;
pub mod gateway;
pub mod result;
pub mod service;
pub mod soap_client;
pub mod transport;
pub mod wan_ip_connection;

pub use config_ext::IgdConfigExt;
pub use device::UpnpDevice;
pub use discovery::{DeviceSubscription, DiscoveryOptions, DiscoveryRun, UpnpDiscoverer};
pub use environment::{NetworkEnvironment, SystemEnvironment};
pub use errors::IgdError;
pub use igdupnp::UpnpError;
pub use gateway::{GatewaySettings, UpnpGateway};
pub use result::InvocationResult;
pub use service::UpnpService;
pub use soap_client::SoapInvoker;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportOptions};
pub use wan_ip_connection::{MappingProtocol, PortMappingRequest, WanIpConnectionClient};
