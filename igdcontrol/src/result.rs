use crate::service::UpnpService;
use indexmap::IndexMap;

/// Résultat d'une action UPnP.
///
/// `success == false` signale une opération non réalisée (pas de service
/// correspondant, mapping absent...) ; `response_data` est alors vide.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    pub service: Option<UpnpService>,
    pub action: String,
    pub response_data: IndexMap<String, String>,
    pub success: bool,
}

impl InvocationResult {
    pub fn new(service: UpnpService, action: &str, response_data: IndexMap<String, String>) -> Self {
        Self {
            service: Some(service),
            action: action.to_string(),
            response_data,
            success: true,
        }
    }

    /// Résultat "non réalisé".
    pub fn failed(service: Option<UpnpService>, action: &str) -> Self {
        Self {
            service,
            action: action.to_string(),
            response_data: IndexMap::new(),
            success: false,
        }
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.response_data.get(key).map(String::as_str)
    }
}
