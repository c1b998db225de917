//! # Module SOAP - Simple Object Access Protocol
//!
//! Côté control point : construction des requêtes d'action UPnP et décodage
//! des réponses renvoyées par le device.
//!
//! ## Architecture
//!
//! - [`encode_soap_envelope`] : enveloppe d'une action et de ses arguments
//! - [`decode_soap_response`] : arguments de sortie d'une réponse, ou
//!   [`UpnpError`] si le device renvoie une faute
//!
//! ## Example
//!
//! ```
//! use igdupnp::soap::{decode_soap_response, encode_soap_envelope};
//!
//! let ns = "urn:schemas-upnp-org:service:WANIPConnection:1";
//! let request = encode_soap_envelope(ns, "GetExternalIPAddress", &[]).unwrap();
//! assert!(String::from_utf8(request).unwrap().contains("GetExternalIPAddress"));
//!
//! let body = r#"<?xml version="1.0"?>
//! <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
//!   <s:Body>
//!     <u:GetExternalIPAddressResponse xmlns:u="urn:schemas-upnp-org:service:WANIPConnection:1">
//!       <NewExternalIPAddress>203.0.113.7</NewExternalIPAddress>
//!     </u:GetExternalIPAddressResponse>
//!   </s:Body>
//! </s:Envelope>"#;
//!
//! let values = decode_soap_response(body.as_bytes(), ns).unwrap();
//! assert_eq!(values["NewExternalIPAddress"], "203.0.113.7");
//! ```

mod builder;
pub(crate) mod fault;
mod parser;

pub use builder::{SoapBuildError, encode_soap_envelope};
pub use fault::{UpnpError, find_upnp_error};
pub use parser::{SoapParseError, decode_soap_response};

/// Namespace des enveloppes SOAP 1.1
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Style d'encodage SOAP exigé par UPnP
pub const SOAP_ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Codes d'erreur SOAP UPnP standards
pub mod error_codes {
    /// Action invalide
    pub const INVALID_ACTION: i32 = 401;

    /// Arguments invalides
    pub const INVALID_ARGS: i32 = 402;

    /// Action échouée
    pub const ACTION_FAILED: i32 = 501;

    /// Valeur d'argument invalide
    pub const ARGUMENT_VALUE_INVALID: i32 = 600;

    /// Argument hors limites
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: i32 = 601;

    /// Action optionnelle non implémentée
    pub const OPTIONAL_ACTION_NOT_IMPLEMENTED: i32 = 602;

    /// Mémoire insuffisante
    pub const OUT_OF_MEMORY: i32 = 603;

    /// Intervention humaine requise
    pub const HUMAN_INTERVENTION_REQUIRED: i32 = 604;

    /// Argument sous forme de chaîne trop long
    pub const STRING_ARGUMENT_TOO_LONG: i32 = 605;

    /// Index hors de la table des mappings (fin d'énumération)
    pub const SPECIFIED_ARRAY_INDEX_INVALID: i32 = 713;

    /// Mapping inexistant
    pub const NO_SUCH_ENTRY_IN_ARRAY: i32 = 714;

    /// Mapping en conflit avec un mapping existant
    pub const CONFLICT_IN_MAPPING_ENTRY: i32 = 718;

    /// Seuls les baux permanents sont acceptés
    pub const ONLY_PERMANENT_LEASES_SUPPORTED: i32 = 725;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trip() {
        let request =
            encode_soap_envelope("urn:x:1", "Foo", &[("NewExternalPort", "80".to_string())])
                .unwrap();

        // Le device "écho" renvoie simplement la requête
        let values = decode_soap_response(&request, "urn:x:1").unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("NewExternalPort").map(String::as_str), Some("80"));
    }

    #[test]
    fn test_round_trip_preserves_argument_order() {
        let args = [
            ("NewRemoteHost", String::new()),
            ("NewExternalPort", "8080".to_string()),
            ("NewProtocol", "TCP".to_string()),
        ];
        let request = encode_soap_envelope("urn:x:1", "Bar", &args).unwrap();
        let values = decode_soap_response(&request, "urn:x:1").unwrap();

        let keys: Vec<&str> = values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["NewRemoteHost", "NewExternalPort", "NewProtocol"]);
        assert_eq!(values["NewRemoteHost"], "");
    }
}
