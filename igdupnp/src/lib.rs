//! # igdupnp - Codec UPnP pour le contrôle des passerelles IGD
//!
//! Cette crate regroupe tout ce qui touche au format des messages échangés
//! avec une passerelle UPnP, sans aucune entrée/sortie réseau :
//!
//! - [`ssdp`] : datagramme M-SEARCH et décodage des en-têtes de réponse
//! - [`soap`] : construction des enveloppes d'action, décodage des réponses
//!   et des fautes UPnP
//! - [`description`] : lecture des documents de description de device
//!
//! Le transport (UDP, HTTP) est à la charge de `igdcontrol`.

pub mod description;
pub mod soap;
pub mod ssdp;

pub use description::{DescriptionError, ServiceDescription};
pub use soap::{SoapBuildError, SoapParseError, UpnpError};
pub use ssdp::SsdpHeaders;
