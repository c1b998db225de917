//! Device UPnP découvert par SSDP.

use crate::errors::IgdError;
use crate::service::UpnpService;
use crate::transport::{HttpRequest, HttpTransport};
use igdupnp::description;
use igdupnp::ssdp::{SsdpHeaders, decode_ssdp_response};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::{Host, Url};
use xmltree::Element;

/// Device issu d'une réponse SSDP.
///
/// Les en-têtes sont figés à la construction. Le document de description
/// est téléchargé au premier appel de [`UpnpDevice::get_services`] puis
/// conservé ; des appels concurrents partagent le même téléchargement.
#[derive(Debug)]
pub struct UpnpDevice {
    data: SsdpHeaders,
    location: Option<Url>,
    description: OnceCell<Arc<Element>>,
}

impl UpnpDevice {
    pub fn from_ssdp(text: &str) -> Self {
        Self::from_headers(decode_ssdp_response(text))
    }

    pub fn from_headers(data: SsdpHeaders) -> Self {
        let location = data.get("LOCATION").and_then(|l| Url::parse(l.trim()).ok());
        Self {
            data,
            location,
            description: OnceCell::new(),
        }
    }

    pub fn data(&self) -> &SsdpHeaders {
        &self.data
    }

    /// Vrai si la réponse SSDP ne contenait aucun en-tête.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.data.get(name)
    }

    pub fn server_name(&self) -> Option<&str> {
        self.data.get("SERVER")
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    /// Vrai si `LOCATION` désigne un document XML complet.
    pub fn has_description_location(&self) -> bool {
        self.location
            .as_ref()
            .is_some_and(|url| url.path().to_ascii_lowercase().ends_with(".xml"))
    }

    /// Adresse réseau du device, quand l'hôte de `LOCATION` est une IP.
    pub fn address(&self) -> Option<SocketAddr> {
        let url = self.location.as_ref()?;
        let port = url.port_or_known_default()?;
        match url.host()? {
            Host::Ipv4(ip) => Some(SocketAddr::from((ip, port))),
            Host::Ipv6(ip) => Some(SocketAddr::from((ip, port))),
            Host::Domain(_) => None,
        }
    }

    /// Clé de déduplication : `hôte:port` de `LOCATION`, ou la valeur brute
    /// de `LOCATION` si elle n'est pas une URL.
    pub fn registry_key(&self) -> String {
        if let Some(address) = self.address() {
            return address.to_string();
        }
        if let Some(url) = &self.location {
            if let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) {
                return format!("{}:{}", host, port);
            }
        }
        self.data.get("LOCATION").unwrap_or_default().to_string()
    }

    /// Liste les services déclarés par la description du device.
    ///
    /// Chaque appel produit de nouveaux [`UpnpService`] rattachés à ce device ;
    /// seul le document XML est mis en cache. Une entrée `<service>`
    /// incomplète est écartée sans masquer les autres.
    pub async fn get_services(
        self: &Arc<Self>,
        transport: &dyn HttpTransport,
    ) -> Result<Vec<UpnpService>, IgdError> {
        let document = self.description(transport).await?;

        Ok(description::services(&document)
            .into_iter()
            .filter_map(|entry| {
                let id = entry.service_id.clone();
                match UpnpService::from_description(entry, Some(self.clone())) {
                    Ok(service) => Some(service),
                    Err(e) => {
                        warn!(
                            "Skipping service {} of {}: {}",
                            id.as_deref().unwrap_or("<no serviceId>"),
                            self.registry_key(),
                            e
                        );
                        None
                    }
                }
            })
            .collect())
    }

    async fn description(&self, transport: &dyn HttpTransport) -> Result<Arc<Element>, IgdError> {
        let document = self
            .description
            .get_or_try_init(|| self.fetch_description(transport))
            .await?;
        Ok(document.clone())
    }

    async fn fetch_description(&self, transport: &dyn HttpTransport) -> Result<Arc<Element>, IgdError> {
        let url = self
            .location
            .clone()
            .ok_or_else(|| IgdError::invalid_url("device has no usable LOCATION"))?;

        debug!("📥 Fetching device description {}", url);
        let response = transport.send(HttpRequest::get(url.clone())).await?;
        if !response.is_success() {
            return Err(IgdError::transport(format!(
                "GET {} returned HTTP status {}",
                url, response.status
            )));
        }

        Ok(Arc::new(description::parse_description(&response.body)?))
    }
}

impl fmt::Display for UpnpDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}
