//! Décodage des en-têtes d'une réponse SSDP

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static HEADER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([0-9A-Za-z\-]+): ([^\r\n]+)").expect("valid SSDP header regex")
});

/// En-têtes d'une réponse SSDP, dans l'ordre d'apparition.
///
/// Les clés sont sensibles à la casse et les valeurs débarrassées des blancs
/// de bord. Pour une clé répétée, la dernière valeur l'emporte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsdpHeaders(IndexMap<String, String>);

impl SsdpHeaders {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

/// Une ligne `Clé: Valeur` par en-tête, séparées par des retours à la ligne.
impl fmt::Display for SsdpHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        Ok(())
    }
}

/// Extrait les lignes `CLÉ: VALEUR` d'une réponse SSDP.
///
/// Le séparateur est `": "`. La ligne de statut, les lignes sans ce
/// séparateur et les valeurs vides sont ignorées. Aucune erreur n'est possible : un texte sans en-tête donne une
/// table vide, que l'appelant traite comme un datagramme à ignorer.
pub fn decode_ssdp_response(text: &str) -> SsdpHeaders {
    let mut headers = SsdpHeaders::default();
    for caps in HEADER_LINE.captures_iter(text) {
        let value = caps[2].trim();
        if !value.is_empty() {
            headers.insert(&caps[1], value);
        }
    }
    headers
}
