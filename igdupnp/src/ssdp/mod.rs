//! # Module SSDP - Simple Service Discovery Protocol
//!
//! Partie "codec" de la découverte SSDP côté control point :
//!
//! - [`encode_search_datagram`] : requête M-SEARCH envoyée en multicast
//! - [`decode_ssdp_response`] : extraction des en-têtes `CLÉ: valeur`
//!   d'une réponse
//!
//! ## Constants SSDP
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Search Target**: `ssdp:all`
//! - **MX**: 3 secondes

mod headers;

pub use headers::{SsdpHeaders, decode_ssdp_response};

use std::net::Ipv4Addr;

/// Adresse multicast SSDP
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// Port SSDP
pub const SSDP_PORT: u16 = 1900;

/// TTL multicast des requêtes (restreint au lien local)
pub const SSDP_MULTICAST_TTL: u32 = 1;

/// Requête M-SEARCH envoyée par le control point
pub const SEARCH_MESSAGE: &str = "M-SEARCH * HTTP/1.1\r\n\
HOST:239.255.255.250:1900\r\n\
MAN:\"ssdp:discover\"\r\n\
ST:ssdp:all\r\n\
MX:3\r\n\
\r\n";

/// Encode la requête M-SEARCH en UTF-8.
pub fn encode_search_datagram() -> Vec<u8> {
    SEARCH_MESSAGE.as_bytes().to_vec()
}
