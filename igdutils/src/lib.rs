//! Host helpers used by the IGD control point.
//!
//! These functions answer the few questions the discovery and port mapping
//! code needs to ask about the machine it runs on:
//!
//! - [`list_local_ipv4`] : IPv4 addresses on which SSDP sockets can be bound
//! - [`guess_local_ip`] : the LAN address used for outgoing traffic
//! - [`current_process_name`] : best-effort name of the running executable
//! - [`get_os_string`] : OS name and version, used in the HTTP `User-Agent`
//!
//! # Examples
//!
//! ```no_run
//! use igdutils::guess_local_ip;
//!
//! let ip = guess_local_ip();
//! println!("Adresse IP locale: {}", ip);
//! ```
mod ip_utils;
mod process;

pub use ip_utils::{guess_local_ip, list_local_ipv4};
pub use process::current_process_name;

/// Retourne une chaîne décrivant le système d'exploitation et sa version.
///
/// Utilise la crate `os_info` pour obtenir de manière portable
/// les informations sur le système d'exploitation courant.
///
/// # Format
/// - macOS: "macOS/15.1"
/// - Linux: "Linux/6.5.0" ou "Ubuntu/22.04"
/// - Windows: "Windows/10.0.19045"
/// - Autre: "{OS}/Unknown"
pub fn get_os_string() -> String {
    let info = os_info::get();
    let os_type = format!("{:?}", info.os_type());

    let version = info.version();
    if version != &os_info::Version::Unknown {
        format!("{}/{}", os_type, version)
    } else {
        format!("{}/Unknown", os_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_string_has_version_part() {
        let os = get_os_string();
        assert!(os.contains('/'), "OS string should be '<os>/<version>': {}", os);
    }
}
