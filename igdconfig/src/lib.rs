//! # igdctl Configuration Module
//!
//! Configuration management for the IGD control point:
//! - Loading configuration from a `config.yaml` file
//! - Merging with the embedded default configuration
//! - Environment variable overrides (`IGDCTL_CONFIG__SECTION__KEY=value`)
//! - Typed getters and setters for the discovery, HTTP and mapping settings
//! - Lazily initialised global instance
//!
//! ## Usage
//!
//! ```no_run
//! use igdconfig::get_config;
//!
//! let config = get_config()?;
//!
//! let timeout = config.get_discovery_timeout_ms()?;
//! config.set_http_timeout_secs(10)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_yaml::{Mapping, Number, Value};
use std::{env, fs, path::Path, sync::Arc};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("igdctl.yaml");

static CONFIG: OnceCell<Arc<Config>> = OnceCell::new();

const ENV_CONFIG_DIR: &str = "IGDCTL_CONFIG";
const ENV_PREFIX: &str = "IGDCTL_CONFIG__";
const CONFIG_DIR_NAME: &str = ".igdctl";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
const DEFAULT_DISCOVERY_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_DISCOVERY_IDLE_POLL_MS: u64 = 10;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAPPING_NAME: &str = "IGD UPnP";
const DEFAULT_MAPPING_MAX_ENTRIES: usize = 1000;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            match self.get_value($path)? {
                Value::Number(n) => Ok(n.as_u64().map(|v| v as usize).unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for u64 values with default
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<u64> {
            match self.get_value($path)? {
                Value::Number(n) => Ok(n.as_u64().unwrap_or($default)),
                Value::String(s) => Ok(s.trim().parse::<u64>().unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path)? {
                Value::Bool(b) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Macro to generate getter/setter for string values with default
macro_rules! impl_string_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<String> {
            match self.get_value($path)? {
                Value::String(s) => Ok(s),
                _ => Ok($default.to_string()),
            }
        }

        pub fn $setter(&self, value: String) -> Result<()> {
            self.set_value($path, Value::String(value))
        }
    };
}

/// Configuration manager for igdctl
///
/// # Examples
///
/// ```no_run
/// use igdconfig::get_config;
///
/// let config = get_config()?;
/// println!("Discovery timeout: {} ms", config.get_discovery_timeout_ms()?);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        let data = self.data.lock().clone();
        Self {
            config_dir: self.config_dir.clone(),
            path: self.path.clone(),
            data: Mutex::new(data),
        }
    }
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return CONFIG_DIR_NAME.to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        CONFIG_DIR_NAME.to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!(
                "Config path {} is not a directory",
                path.display()
            ));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `IGDCTL_CONFIG` environment variable
    /// 3. `.igdctl` in the current directory
    /// 4. `.igdctl` in the user's home directory
    ///
    /// The directory is created if it doesn't exist.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// The embedded defaults are merged with `config.yaml` (if present),
    /// keys are lowercased, `IGDCTL_CONFIG__*` overrides are applied and the
    /// merged result is written back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        let external_value: Value = serde_yaml::from_slice(&yaml_data)?;
        let mut config_value = Self::lower_keys_value(default_value);
        merge_yaml(&mut config_value, &Self::lower_keys_value(external_value));

        Self::apply_env_overrides(&mut config_value, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = {
            let data = self.data.lock();
            serde_yaml::to_string(&*data)?
        };
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["http", "timeout_secs"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.data.lock();
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                if let Some(next) = map.get(&Value::String(key.to_lowercase())) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value, vars: impl Iterator<Item = (String, String)>) {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    let new_key = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    new_map.insert(new_key, Self::lower_keys_value(v));
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    impl_string_config!(
        get_log_min_level,
        set_log_min_level,
        &["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL
    );

    impl_u64_config!(
        get_discovery_timeout_ms,
        set_discovery_timeout_ms,
        &["discovery", "timeout_ms"],
        DEFAULT_DISCOVERY_TIMEOUT_MS
    );

    impl_u64_config!(
        get_discovery_idle_poll_ms,
        set_discovery_idle_poll_ms,
        &["discovery", "idle_poll_ms"],
        DEFAULT_DISCOVERY_IDLE_POLL_MS
    );

    impl_u64_config!(
        get_http_timeout_secs,
        set_http_timeout_secs,
        &["http", "timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    impl_usize_config!(
        get_mapping_max_entries,
        set_mapping_max_entries,
        &["mapping", "max_entries"],
        DEFAULT_MAPPING_MAX_ENTRIES
    );

    /// Préfixe utilisé pour la description d'un mapping quand le nom du
    /// processus courant n'est pas disponible.
    pub fn get_mapping_default_name(&self) -> Result<String> {
        match self.get_value(&["mapping", "default_name"])? {
            Value::String(s) if !s.trim().is_empty() => Ok(s),
            _ => Ok(DEFAULT_MAPPING_NAME.to_string()),
        }
    }

    pub fn set_mapping_default_name(&self, name: String) -> Result<()> {
        self.set_value(&["mapping", "default_name"], Value::String(name))
    }
}

/// Returns the global configuration instance
///
/// The configuration is loaded on first access; a loading failure is
/// returned to the caller and retried on the next call.
pub fn get_config() -> Result<Arc<Config>> {
    CONFIG
        .get_or_try_init(|| Config::load_config("").map(Arc::new))
        .cloned()
}

/// Merges external YAML configuration into default configuration
///
/// Mappings are merged key by key; scalars and sequences from `external`
/// replace the default value.
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
