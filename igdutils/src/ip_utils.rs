use get_if_addrs::get_if_addrs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::warn;

/// Devine l'adresse IP locale de la machine.
///
/// Cette fonction tente de déterminer l'adresse IP locale en créant une connexion UDP
/// vers un serveur DNS public (8.8.8.8). Cette technique permet d'identifier l'interface
/// réseau qui serait utilisée pour communiquer avec Internet.
///
/// # Fonctionnement
///
/// 1. Crée un socket UDP lié à `0.0.0.0:0`
/// 2. Tente une connexion (non effective pour UDP) vers `8.8.8.8:80`
/// 3. Récupère l'adresse IPv4 locale du socket
/// 4. En cas d'échec à n'importe quelle étape, retourne `127.0.0.1`
///
/// # Note
///
/// Aucun paquet n'est envoyé : le système d'exploitation indique simplement
/// quelle interface serait utilisée pour joindre l'adresse cible.
pub fn guess_local_ip() -> Ipv4Addr {
    match UdpSocket::bind("0.0.0.0:0") {
        Ok(socket) => {
            if socket.connect("8.8.8.8:80").is_ok() {
                if let Ok(local_addr) = socket.local_addr() {
                    if let IpAddr::V4(ipv4) = local_addr.ip() {
                        return ipv4;
                    }
                }
            }
            Ipv4Addr::LOCALHOST
        }
        Err(_) => Ipv4Addr::LOCALHOST,
    }
}

/// Liste les adresses IPv4 non-loopback de toutes les interfaces réseau.
///
/// Les adresses sont retournées dans l'ordre d'énumération des interfaces,
/// sans doublon. Une erreur d'énumération donne une liste vide.
pub fn list_local_ipv4() -> Vec<Ipv4Addr> {
    let mut result = Vec::new();

    match get_if_addrs() {
        Ok(interfaces) => {
            for iface in interfaces {
                if let IpAddr::V4(ipv4) = iface.ip() {
                    if ipv4.is_loopback() || result.contains(&ipv4) {
                        continue;
                    }
                    result.push(ipv4);
                }
            }
        }
        Err(e) => {
            warn!("Failed to list network interfaces: {}", e);
        }
    }

    result
}
