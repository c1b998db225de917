//! Décodage des réponses SOAP

use super::fault::{UpnpError, child_elements, find_upnp_error};
use indexmap::IndexMap;
use std::io::BufReader;
use tracing::trace;
use xmltree::Element;

/// Erreur de décodage d'une réponse SOAP
#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    /// Le device a répondu par un SOAP Fault UPnP
    #[error(transparent)]
    Fault(UpnpError),

    #[error("No element in namespace {0} found in SOAP response")]
    MissingResponse(String),
}

/// Décode la réponse SOAP d'une action.
///
/// Une faute UPnP est renvoyée sous la forme [`SoapParseError::Fault`].
/// Sinon, le premier élément du document appartenant au namespace `action_ns`
/// est l'élément de réponse : ses enfants directs donnent la table
/// `nom local -> texte`, dans l'ordre du document.
pub fn decode_soap_response(
    xml: &[u8],
    action_ns: &str,
) -> Result<IndexMap<String, String>, SoapParseError> {
    let root = Element::parse(BufReader::new(xml))?;

    if let Some(error) = find_upnp_error(&root) {
        trace!(code = error.code, "UPnP fault in SOAP response");
        return Err(SoapParseError::Fault(error));
    }

    let response = find_in_namespace(&root, action_ns)
        .ok_or_else(|| SoapParseError::MissingResponse(action_ns.to_string()))?;

    Ok(child_elements(response)
        .map(|child| {
            let text = child.get_text().map(|t| t.into_owned()).unwrap_or_default();
            (child.name.clone(), text)
        })
        .collect())
}

/// Parcours en profondeur, dans l'ordre du document.
fn find_in_namespace<'a>(element: &'a Element, ns: &str) -> Option<&'a Element> {
    if element.namespace.as_deref() == Some(ns) {
        return Some(element);
    }
    child_elements(element).find_map(|child| find_in_namespace(child, ns))
}
