use crate::device::UpnpDevice;
use crate::errors::IgdError;
use igdupnp::ServiceDescription;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use url::Url;

static SIMPLE_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*:([a-zA-Z]+[a-zA-Z0-9]+)(?::|$)").expect("valid service type regex")
});

/// Service contrôlable d'un device.
///
/// Un service sans device (voir [`UpnpService::detached`]) ne sert qu'à la
/// description : il ne peut pas être invoqué.
#[derive(Debug, Clone)]
pub struct UpnpService {
    device: Option<Arc<UpnpDevice>>,
    id: String,
    service_type: String,
    control_url: String,
    scpd_url: String,
}

impl UpnpService {
    /// Construit un service ; les quatre champs sont obligatoires.
    pub fn new(
        id: Option<String>,
        service_type: Option<String>,
        control_url: Option<String>,
        scpd_url: Option<String>,
        device: Option<Arc<UpnpDevice>>,
    ) -> Result<Self, IgdError> {
        Ok(Self {
            id: id.ok_or(IgdError::InvalidService("serviceId"))?,
            service_type: service_type.ok_or(IgdError::InvalidService("serviceType"))?,
            control_url: control_url.ok_or(IgdError::InvalidService("controlURL"))?,
            scpd_url: scpd_url.ok_or(IgdError::InvalidService("SCPDURL"))?,
            device,
        })
    }

    pub fn from_description(
        description: ServiceDescription,
        device: Option<Arc<UpnpDevice>>,
    ) -> Result<Self, IgdError> {
        Self::new(
            description.service_id,
            description.service_type,
            description.control_url,
            description.scpd_url,
            device,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn control_url(&self) -> &str {
        &self.control_url
    }

    pub fn scpd_url(&self) -> &str {
        &self.scpd_url
    }

    pub fn device(&self) -> Option<&Arc<UpnpDevice>> {
        self.device.as_ref()
    }

    /// Nom court du service : `WANIPConnection` pour
    /// `urn:schemas-upnp-org:service:WANIPConnection:1`.
    pub fn simple_type(&self) -> Option<&str> {
        SIMPLE_TYPE
            .captures(&self.service_type)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// URL de contrôle résolue par rapport au `LOCATION` du device.
    pub fn control_endpoint(&self) -> Result<Url, IgdError> {
        self.resolve(&self.control_url)
    }

    pub fn scpd_endpoint(&self) -> Result<Url, IgdError> {
        self.resolve(&self.scpd_url)
    }

    /// Copie du service sans lien vers son device.
    pub fn detached(&self) -> Self {
        Self {
            device: None,
            ..self.clone()
        }
    }

    fn resolve(&self, relative: &str) -> Result<Url, IgdError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| IgdError::DetachedService(self.service_type.clone()))?;
        let base = device
            .location()
            .ok_or_else(|| IgdError::invalid_url("device has no usable LOCATION"))?;
        base.join(relative)
            .map_err(|e| IgdError::invalid_url(format!("{} relative to {}: {}", relative, base, e)))
    }
}
