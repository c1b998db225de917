//! Lecture des documents de description de device UPnP (`rootDesc.xml`)

use crate::soap::fault::child_elements;
use std::io::BufReader;
use tracing::trace;
use xmltree::Element;

/// Erreur de lecture d'une description de device
#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),
}

/// Entrée `<service>` d'une description de device.
///
/// Les champs sont ceux du document, sans validation : un champ absent vaut
/// `None`. `service_type` reprend `serviceId` quand `serviceType` manque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    pub service_id: Option<String>,
    pub service_type: Option<String>,
    pub control_url: Option<String>,
    pub scpd_url: Option<String>,
}

/// Parse le document de description d'un device.
pub fn parse_description(xml: &[u8]) -> Result<Element, DescriptionError> {
    Ok(Element::parse(BufReader::new(xml))?)
}

/// Namespace par défaut de l'élément racine.
pub fn default_namespace(root: &Element) -> Option<&str> {
    match root.prefix {
        None => root.namespace.as_deref(),
        Some(_) => None,
    }
}

/// Tous les éléments `service` du namespace par défaut, dans l'ordre du
/// document (y compris ceux des sous-devices embarqués).
pub fn services(root: &Element) -> Vec<ServiceDescription> {
    let ns = default_namespace(root);
    let mut found = Vec::new();
    collect_services(root, ns, &mut found);
    trace!(namespace = ?ns, count = found.len(), "Services read from device description");
    found
}

fn collect_services(element: &Element, ns: Option<&str>, found: &mut Vec<ServiceDescription>) {
    for child in child_elements(element) {
        if child.name == "service" && child.namespace.as_deref() == ns {
            found.push(read_service(child, ns));
        }
        collect_services(child, ns, found);
    }
}

fn read_service(service: &Element, ns: Option<&str>) -> ServiceDescription {
    let field = |name: &str| {
        child_elements(service)
            .find(|e| e.name == name && e.namespace.as_deref() == ns)
            .and_then(|e| e.get_text())
            .map(|t| t.trim().to_string())
    };

    let service_id = field("serviceId");
    let service_type = field("serviceType").or_else(|| service_id.clone());

    ServiceDescription {
        service_id,
        service_type,
        control_url: field("controlURL"),
        scpd_url: field("SCPDURL"),
    }
}
