//! Extension pour lire la configuration du control point dans igdconfig
//!
//! Même principe que les `config_ext.rs` des autres crates : un trait
//! implémenté pour `igdconfig::Config` qui regroupe les réglages utiles à
//! cette crate.

use crate::discovery::DiscoveryOptions;
use crate::gateway::GatewaySettings;
use crate::transport::{TransportOptions, default_user_agent};
use anyhow::Result;
use igdconfig::Config;
use std::time::Duration;

/// Trait d'extension pour construire les options du control point depuis
/// `igdconfig::Config`.
///
/// # Exemple
///
/// ```rust,ignore
/// use igdconfig::get_config;
/// use igdcontrol::IgdConfigExt;
///
/// let config = get_config()?;
/// let options = config.discovery_options()?;
/// ```
pub trait IgdConfigExt {
    /// `discovery.timeout_ms` et `discovery.idle_poll_ms`
    fn discovery_options(&self) -> Result<DiscoveryOptions>;

    /// `http.timeout_secs`
    fn transport_options(&self) -> Result<TransportOptions>;

    /// `mapping.default_name` et `mapping.max_entries`
    fn gateway_settings(&self) -> Result<GatewaySettings>;
}

impl IgdConfigExt for Config {
    fn discovery_options(&self) -> Result<DiscoveryOptions> {
        Ok(DiscoveryOptions {
            timeout: Duration::from_millis(self.get_discovery_timeout_ms()?),
            idle_poll: Duration::from_millis(self.get_discovery_idle_poll_ms()?.max(1)),
        })
    }

    fn transport_options(&self) -> Result<TransportOptions> {
        Ok(TransportOptions {
            timeout: Duration::from_secs(self.get_http_timeout_secs()?),
            user_agent: default_user_agent(),
        })
    }

    fn gateway_settings(&self) -> Result<GatewaySettings> {
        Ok(GatewaySettings {
            default_name: self.get_mapping_default_name()?,
            max_entries: self.get_mapping_max_entries()?,
        })
    }
}

impl DiscoveryOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.discovery_options()
    }
}

impl TransportOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.transport_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn options_from_default_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        let discovery = DiscoveryOptions::from_config(&config).unwrap();
        assert_eq!(discovery.timeout, Duration::from_secs(60));
        assert_eq!(discovery.idle_poll, Duration::from_millis(10));

        let transport = TransportOptions::from_config(&config).unwrap();
        assert_eq!(transport.timeout, Duration::from_secs(30));

        let settings = config.gateway_settings().unwrap();
        assert_eq!(settings.default_name, "IGD UPnP");
        assert_eq!(settings.max_entries, 1000);
    }

    #[test]
    fn options_follow_config_changes() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        config.set_discovery_timeout_ms(1500).unwrap();
        config.set_mapping_max_entries(16).unwrap();

        assert_eq!(
            config.discovery_options().unwrap().timeout,
            Duration::from_millis(1500)
        );
        assert_eq!(config.gateway_settings().unwrap().max_entries, 16);
    }
}
