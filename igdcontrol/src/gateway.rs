//! API haut niveau de contrôle d'une passerelle NAT.

use crate::config_ext::IgdConfigExt;
use crate::discovery::UpnpDiscoverer;
use crate::environment::{NetworkEnvironment, SystemEnvironment};
use crate::errors::IgdError;
use crate::result::InvocationResult;
use crate::service::UpnpService;
use crate::soap_client::SoapInvoker;
use crate::transport::ReqwestTransport;
use crate::wan_ip_connection::{
    MappingProtocol, PortMappingRequest, WAN_IP_CONNECTION, WanIpConnectionClient,
};
use indexmap::IndexMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

const DESCRIPTION_NAME_MAX_CHARS: usize = 12;

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Nom utilisé dans les descriptions quand le nom du processus est inconnu
    pub default_name: String,
    /// Nombre maximal d'index parcourus par `list_port_mappings`
    pub max_entries: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            default_name: "IGD UPnP".to_string(),
            max_entries: 1000,
        }
    }
}

/// Passerelle UPnP découverte à la demande.
///
/// Chaque opération cherche le premier device exposant un service
/// `WANIPConnection`, en déclenchant la découverte si elle n'a pas encore eu
/// lieu.
#[derive(Clone)]
pub struct UpnpGateway {
    discoverer: UpnpDiscoverer,
    invoker: SoapInvoker,
    environment: Arc<dyn NetworkEnvironment>,
    settings: GatewaySettings,
}

impl UpnpGateway {
    pub fn new(
        discoverer: UpnpDiscoverer,
        invoker: SoapInvoker,
        environment: Arc<dyn NetworkEnvironment>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            discoverer,
            invoker,
            environment,
            settings,
        }
    }

    /// Passerelle sur le réseau réel : sockets SSDP sur toutes les adresses
    /// locales, HTTP via `reqwest`, réglages lus dans la configuration.
    pub fn from_config(config: &igdconfig::Config) -> anyhow::Result<Self> {
        let environment: Arc<dyn NetworkEnvironment> = Arc::new(SystemEnvironment);
        let transport = ReqwestTransport::new(&config.transport_options()?)?;

        Ok(UpnpGateway::new(
            UpnpDiscoverer::new(environment.clone(), config.discovery_options()?),
            SoapInvoker::new(Arc::new(transport)),
            environment,
            config.gateway_settings()?,
        ))
    }

    pub fn discoverer(&self) -> &UpnpDiscoverer {
        &self.discoverer
    }

    /// Premier service dont le nom court vaut `simple_type` (sans tenir
    /// compte de la casse).
    ///
    /// Un device dont la description est inaccessible ou invalide est ignoré.
    pub async fn find_service(&self, simple_type: &str) -> Option<UpnpService> {
        let transport = self.invoker.transport().clone();
        let wanted = simple_type.to_string();

        self.discoverer
            .get_first(|device| {
                let transport = transport.clone();
                let wanted = wanted.clone();
                async move {
                    match device.get_services(transport.as_ref()).await {
                        Ok(services) => services.into_iter().find(|s| {
                            s.simple_type()
                                .is_some_and(|t| t.eq_ignore_ascii_case(&wanted))
                        }),
                        Err(e) => {
                            warn!("Cannot read services of {}: {}", device.registry_key(), e);
                            None
                        }
                    }
                }
            })
            .await
    }

    pub async fn wan_ip_connection(&self) -> Option<WanIpConnectionClient> {
        let service = self.find_service(WAN_IP_CONNECTION).await;
        match service {
            Some(service) => {
                debug!("Using {} at {}", service.service_type(), service.control_url());
                Some(WanIpConnectionClient::new(self.invoker.clone(), service))
            }
            None => {
                info!("No {} service found on the network", WAN_IP_CONNECTION);
                None
            }
        }
    }

    pub async fn get_external_ip(&self) -> Result<Option<Ipv4Addr>, IgdError> {
        match self.wan_ip_connection().await {
            Some(client) => client.get_external_ip().await,
            None => Ok(None),
        }
    }

    /// Tous les mappings de la passerelle (vide sans passerelle).
    pub async fn list_port_mappings(&self) -> Result<Vec<IndexMap<String, String>>, IgdError> {
        match self.wan_ip_connection().await {
            Some(client) => client.list_port_mappings(self.settings.max_entries).await,
            None => Ok(Vec::new()),
        }
    }

    /// Ouvre `port` (externe et interne) vers `lan_ip`.
    ///
    /// `lan_ip` vaut par défaut l'adresse LAN de la machine ; une description
    /// absente ou vide est générée à partir du nom du processus.
    pub async fn add_port_mapping(
        &self,
        port: u16,
        protocol: MappingProtocol,
        lan_ip: Option<Ipv4Addr>,
        description: Option<&str>,
    ) -> Result<InvocationResult, IgdError> {
        let Some(client) = self.wan_ip_connection().await else {
            return Ok(InvocationResult::failed(None, "AddPortMapping"));
        };

        let description = match description.map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => self.default_description(port, protocol),
        };

        let request = PortMappingRequest {
            external_port: port,
            internal_port: port,
            protocol,
            internal_client: lan_ip.unwrap_or_else(|| self.environment.lan_ip()),
            description,
        };
        info!(
            "➕ AddPortMapping {} {} -> {} ({})",
            request.protocol, port, request.internal_client, request.description
        );
        client.add_port_mapping(&request).await
    }

    pub async fn get_port_mapping(
        &self,
        port: u16,
        protocol: MappingProtocol,
        lan_ip: Option<Ipv4Addr>,
    ) -> Result<InvocationResult, IgdError> {
        let Some(client) = self.wan_ip_connection().await else {
            return Ok(InvocationResult::failed(None, "GetSpecificPortMappingEntry"));
        };
        let remote_host = lan_ip.unwrap_or_else(|| self.environment.lan_ip());
        client
            .get_specific_port_mapping_entry(remote_host, port, protocol)
            .await
    }

    /// Supprime un mapping ; `success` indique s'il existait.
    pub async fn delete_port_mapping(
        &self,
        port: u16,
        protocol: MappingProtocol,
        lan_ip: Option<Ipv4Addr>,
    ) -> Result<InvocationResult, IgdError> {
        let Some(client) = self.wan_ip_connection().await else {
            return Ok(InvocationResult::failed(None, "DeletePortMapping"));
        };
        let remote_host = lan_ip.unwrap_or_else(|| self.environment.lan_ip());
        info!("➖ DeletePortMapping {} {}", protocol, port);
        client
            .delete_port_mapping(remote_host, port, protocol)
            .await
    }

    /// `"<nom> <PROTOCOLE> <port>"`, le nom étant tronqué à 12 caractères.
    pub fn default_description(&self, port: u16, protocol: MappingProtocol) -> String {
        let name = self
            .environment
            .process_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_name.clone());
        let name: String = name.chars().take(DESCRIPTION_NAME_MAX_CHARS).collect();
        format!("{} {} {}", name, protocol, port)
    }
}
