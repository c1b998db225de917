//! SOAP Faults pour UPnP

use super::SOAP_ENVELOPE_NS;
use xmltree::Element;

/// Erreur UPnP renvoyée par un device dans le détail d'un SOAP Fault
///
/// Quelques codes ont une signification particulière pour le contrôle
/// d'une passerelle : voir [`error_codes`](super::error_codes).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("UPnP error {code}: {description}")]
pub struct UpnpError {
    /// Code d'erreur UPnP (ex: 401, 713), 0 s'il est absent ou illisible
    pub code: i32,

    /// Description de l'erreur
    pub description: String,
}

impl UpnpError {
    pub fn new(code: i32, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    pub fn is(&self, code: i32) -> bool {
        self.code == code
    }
}

/// Cherche un `UPnPError` sous `Envelope/Body/Fault/detail`.
///
/// Retourne `None` si le document n'est pas une faute UPnP.
pub fn find_upnp_error(root: &Element) -> Option<UpnpError> {
    if !is_soap(root, "Envelope") {
        return None;
    }

    let body = child_elements(root).find(|e| is_soap(e, "Body"))?;
    let fault = child_elements(body).find(|e| is_soap(e, "Fault"))?;
    let detail = child_elements(fault).find(|e| e.name == "detail")?;
    let error = child_elements(detail).find(|e| e.name == "UPnPError")?;

    let error_ns = error.namespace.as_deref();
    let field = |name: &str| {
        child_elements(error)
            .find(|e| e.name == name && e.namespace.as_deref() == error_ns)
            .or_else(|| child_elements(error).find(|e| e.name == name))
            .and_then(|e| e.get_text())
            .map(|t| t.trim().to_string())
    };

    let code = field("errorCode")
        .and_then(|c| c.parse::<i32>().ok())
        .unwrap_or(0);
    let description = field("errorDescription").unwrap_or_default();

    Some(UpnpError { code, description })
}

fn is_soap(element: &Element, name: &str) -> bool {
    element.name == name && element.namespace.as_deref() == Some(SOAP_ENVELOPE_NS)
}

pub(crate) fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|n| n.as_element())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn parse(xml: &str) -> Element {
        Element::parse(BufReader::new(xml.as_bytes())).unwrap()
    }

    const FAULT: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
          <errorCode>714</errorCode>
          <errorDescription>NoSuchEntryInArray</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn test_find_upnp_error() {
        let error = find_upnp_error(&parse(FAULT)).unwrap();
        assert_eq!(error.code, 714);
        assert_eq!(error.description, "NoSuchEntryInArray");
        assert!(error.is(super::super::error_codes::NO_SUCH_ENTRY_IN_ARRAY));
    }

    #[test]
    fn test_unparsable_code_is_zero() {
        let xml = FAULT.replace("<errorCode>714</errorCode>", "<errorCode>oops</errorCode>");
        let error = find_upnp_error(&parse(&xml)).unwrap();
        assert_eq!(error.code, 0);
        assert_eq!(error.description, "NoSuchEntryInArray");
    }

    #[test]
    fn test_missing_description_is_empty() {
        let xml = FAULT.replace(
            "<errorDescription>NoSuchEntryInArray</errorDescription>",
            "",
        );
        let error = find_upnp_error(&parse(&xml)).unwrap();
        assert_eq!(error.code, 714);
        assert_eq!(error.description, "");
    }

    #[test]
    fn test_fault_without_upnp_detail() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body><s:Fault><faultcode>s:Server</faultcode></s:Fault></s:Body>
</s:Envelope>"#;
        assert!(find_upnp_error(&parse(xml)).is_none());
    }

    #[test]
    fn test_display() {
        let error = UpnpError::new(713, "SpecifiedArrayIndexInvalid");
        assert_eq!(error.to_string(), "UPnP error 713: SpecifiedArrayIndexInvalid");
    }
}
