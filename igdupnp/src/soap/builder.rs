//! Construction des requêtes SOAP

use super::{SOAP_ENCODING_STYLE, SOAP_ENVELOPE_NS};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Erreur de construction d'une enveloppe SOAP
#[derive(Debug, thiserror::Error)]
pub enum SoapBuildError {
    #[error("XML write error: {0}")]
    Write(#[from] std::io::Error),
}

/// Construit l'enveloppe SOAP d'une action UPnP.
///
/// Le préfixe `u` est lié à `action_ns` sur l'enveloppe ; l'action est
/// qualifiée par ce namespace et chaque argument devient un élément enfant
/// non qualifié, dans l'ordre fourni.
///
/// # Arguments
///
/// * `action_ns` - URN du service (ex: "urn:schemas-upnp-org:service:WANIPConnection:1")
/// * `action` - Nom de l'action (ex: "GetExternalIPAddress")
/// * `args` - Arguments d'entrée `(nom, valeur)`
pub fn encode_soap_envelope(
    action_ns: &str,
    action: &str,
    args: &[(&str, String)],
) -> Result<Vec<u8>, SoapBuildError> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let envelope = BytesStart::new("s:Envelope").with_attributes([
        ("xmlns:s", SOAP_ENVELOPE_NS),
        ("s:encodingStyle", SOAP_ENCODING_STYLE),
        ("xmlns:u", action_ns),
    ]);
    writer.write_event(Event::Start(envelope))?;

    writer.write_event(Event::Empty(BytesStart::new("s:Header")))?;

    writer.write_event(Event::Start(BytesStart::new("s:Body")))?;

    let action_tag = format!("u:{}", action);
    writer.write_event(Event::Start(BytesStart::new(action_tag.as_str())))?;
    for (name, value) in args {
        writer.write_event(Event::Start(BytesStart::new(*name)))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new(*name)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(action_tag.as_str())))?;

    writer.write_event(Event::End(BytesEnd::new("s:Body")))?;
    writer.write_event(Event::End(BytesEnd::new("s:Envelope")))?;

    Ok(writer.into_inner())
}
