//! Accès aux informations de la machine hôte.

use std::net::Ipv4Addr;

/// Informations sur l'hôte dont la découverte et les mappings ont besoin.
pub trait NetworkEnvironment: Send + Sync {
    /// Adresses IPv4 locales sur lesquelles ouvrir les sockets SSDP.
    fn local_ipv4_addresses(&self) -> Vec<Ipv4Addr>;

    /// Adresse LAN utilisée par défaut comme client interne d'un mapping.
    fn lan_ip(&self) -> Ipv4Addr;

    /// Nom du processus courant, si disponible.
    fn process_name(&self) -> Option<String>;
}

/// Implémentation basée sur `igdutils`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnvironment;

impl NetworkEnvironment for SystemEnvironment {
    fn local_ipv4_addresses(&self) -> Vec<Ipv4Addr> {
        igdutils::list_local_ipv4()
    }

    fn lan_ip(&self) -> Ipv4Addr {
        igdutils::guess_local_ip()
    }

    fn process_name(&self) -> Option<String> {
        igdutils::current_process_name()
    }
}
