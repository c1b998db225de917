use crate::errors::IgdError;
use crate::result::InvocationResult;
use crate::service::UpnpService;
use crate::soap_client::SoapInvoker;
use igdupnp::soap::error_codes::{NO_SUCH_ENTRY_IN_ARRAY, SPECIFIED_ARRAY_INDEX_INVALID};
use indexmap::IndexMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::debug;

/// Nom court du service de contrôle NAT
pub const WAN_IP_CONNECTION: &str = "WANIPConnection";

/// Protocole d'un mapping de port.
///
/// `Both` est transmis tel quel (`BOTH`) ; IGD ne définit que `TCP` et `UDP`,
/// le comportement du device pour cette valeur n'est pas garanti.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingProtocol {
    Udp,
    Tcp,
    Both,
}

impl MappingProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingProtocol::Udp => "UDP",
            MappingProtocol::Tcp => "TCP",
            MappingProtocol::Both => "BOTH",
        }
    }
}

impl fmt::Display for MappingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UDP" => Ok(MappingProtocol::Udp),
            "TCP" => Ok(MappingProtocol::Tcp),
            "BOTH" => Ok(MappingProtocol::Both),
            other => Err(format!("unknown protocol '{}' (expected UDP, TCP or BOTH)", other)),
        }
    }
}

/// Paramètres complets d'un `AddPortMapping`.
#[derive(Debug, Clone)]
pub struct PortMappingRequest {
    pub external_port: u16,
    pub internal_port: u16,
    pub protocol: MappingProtocol,
    pub internal_client: Ipv4Addr,
    pub description: String,
}

/// Client typé d'un service `WANIPConnection`.
#[derive(Clone)]
pub struct WanIpConnectionClient {
    invoker: SoapInvoker,
    service: UpnpService,
}

impl WanIpConnectionClient {
    pub fn new(invoker: SoapInvoker, service: UpnpService) -> Self {
        Self { invoker, service }
    }

    pub fn service(&self) -> &UpnpService {
        &self.service
    }

    /// `GetExternalIPAddress` ; `None` si la valeur est absente ou n'est pas
    /// une adresse IPv4.
    pub async fn get_external_ip(&self) -> Result<Option<Ipv4Addr>, IgdError> {
        let result = self
            .invoker
            .invoke(&self.service, "GetExternalIPAddress", &[])
            .await?;

        Ok(result
            .get("NewExternalIPAddress")
            .and_then(|ip| ip.trim().parse::<Ipv4Addr>().ok()))
    }

    pub async fn get_generic_port_mapping_entry(
        &self,
        index: usize,
    ) -> Result<InvocationResult, IgdError> {
        self.invoker
            .invoke(
                &self.service,
                "GetGenericPortMappingEntry",
                &[("NewPortMappingIndex", index.to_string())],
            )
            .await
    }

    /// Énumère les mappings par index jusqu'à l'erreur 713.
    ///
    /// Toute autre faute interrompt l'énumération et est renvoyée.
    pub async fn list_port_mappings(
        &self,
        max_entries: usize,
    ) -> Result<Vec<IndexMap<String, String>>, IgdError> {
        let mut entries = Vec::new();
        for index in 0..max_entries {
            match self.get_generic_port_mapping_entry(index).await {
                Ok(result) => entries.push(result.response_data),
                Err(e) if e.is_upnp_code(SPECIFIED_ARRAY_INDEX_INVALID) => {
                    debug!("End of port mapping table at index {}", index);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(entries)
    }

    pub async fn add_port_mapping(
        &self,
        request: &PortMappingRequest,
    ) -> Result<InvocationResult, IgdError> {
        let args = [
            ("NewRemoteHost", String::new()),
            ("NewInternalClient", request.internal_client.to_string()),
            ("NewInternalPort", request.internal_port.to_string()),
            ("NewExternalPort", request.external_port.to_string()),
            ("NewProtocol", request.protocol.to_string()),
            ("NewPortMappingDescription", request.description.clone()),
            ("NewLeaseDuration", "0".to_string()),
            ("NewEnabled", "1".to_string()),
        ];
        self.invoker
            .invoke(&self.service, "AddPortMapping", &args)
            .await
    }

    /// `GetSpecificPortMappingEntry` ; un mapping inexistant (714) donne un
    /// résultat `success == false`.
    pub async fn get_specific_port_mapping_entry(
        &self,
        remote_host: Ipv4Addr,
        external_port: u16,
        protocol: MappingProtocol,
    ) -> Result<InvocationResult, IgdError> {
        let action = "GetSpecificPortMappingEntry";
        let args = mapping_key_args(remote_host, external_port, protocol);
        self.swallow_missing(action, self.invoker.invoke(&self.service, action, &args).await)
    }

    /// Supprime un mapping.
    ///
    /// `success` indique si le mapping existait avant la suppression.
    pub async fn delete_port_mapping(
        &self,
        remote_host: Ipv4Addr,
        external_port: u16,
        protocol: MappingProtocol,
    ) -> Result<InvocationResult, IgdError> {
        let existed = self
            .get_specific_port_mapping_entry(remote_host, external_port, protocol)
            .await?
            .success;

        let action = "DeletePortMapping";
        let args = mapping_key_args(remote_host, external_port, protocol);
        let result = self.swallow_missing(action, self.invoker.invoke(&self.service, action, &args).await)?;
        Ok(result.with_success(existed))
    }

    fn swallow_missing(
        &self,
        action: &str,
        result: Result<InvocationResult, IgdError>,
    ) -> Result<InvocationResult, IgdError> {
        match result {
            Err(e) if e.is_upnp_code(NO_SUCH_ENTRY_IN_ARRAY) => {
                debug!("{}: no such port mapping", action);
                Ok(InvocationResult::failed(Some(self.service.clone()), action))
            }
            other => other,
        }
    }
}

fn mapping_key_args(
    remote_host: Ipv4Addr,
    external_port: u16,
    protocol: MappingProtocol,
) -> [(&'static str, String); 3] {
    [
        ("NewRemoteHost", remote_host.to_string()),
        ("NewExternalPort", external_port.to_string()),
        ("NewProtocol", protocol.to_string()),
    ]
}
