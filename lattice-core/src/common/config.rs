/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use lazy_static::lazy_static;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the lattice message bus.
///
/// Loaded from TOML files in XDG-compliant directories; every value has a
/// default, so a missing or partial file is never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct BusConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Default values configuration
    pub defaults: DefaultsConfig,
    /// Tracing and logging configuration
    pub tracing: TracingConfig,
    /// The raw parsed table, kept for ad-hoc [`property`](BusConfig::property)
    /// lookups that the typed sections above do not cover.
    #[serde(skip)]
    raw: toml::Table,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long the dispatcher waits for a message before considering
    /// itself idle, in milliseconds
    pub dispatch_idle_ms: u64,
    /// Upper bound on a single node attachment, in milliseconds
    pub attach_timeout_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest wire frame the bus will accept from a remote peer
    pub max_wire_frame_bytes: u32,
}

/// Default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Name given to the runtime's message queue
    pub queue_name: String,
    /// Name given to the runtime's root hub
    pub root_hub_name: String,
}

/// Tracing and logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Default level used when no filter is supplied externally
    pub default_level: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dispatch_idle_ms: 250,
            attach_timeout_ms: 10_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_wire_frame_bytes: 16 * 1024 * 1024,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            queue_name: "main".to_string(),
            root_hub_name: "root".to_string(),
        }
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
        }
    }
}

impl BusConfig {
    /// The dispatcher's idle window as a Duration.
    pub const fn dispatch_idle(&self) -> Duration {
        Duration::from_millis(self.timeouts.dispatch_idle_ms)
    }

    /// The attachment deadline as a Duration.
    pub const fn attach_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.attach_timeout_ms)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// This function attempts to load configuration from the following locations
    /// in order of preference:
    /// 1. `$XDG_CONFIG_HOME/lattice/config.toml` (Linux/macOS)
    /// 2. `~/.config/lattice/config.toml` (Linux fallback)
    /// 3. `~/Library/Application Support/lattice/config.toml` (macOS fallback)
    /// 4. `%APPDATA%/lattice/config.toml` (Windows)
    ///
    /// If no configuration file is found, returns the default configuration.
    /// If a configuration file exists but is malformed, logs an error and uses defaults.
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("lattice") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let config_path = xdg_dirs.find_config_file("config.toml");

        if let Some(path) = config_path {
            info!("Loading configuration from: {}", path.display());
            match std::fs::read_to_string(&path) {
                Ok(config_str) => match Self::parse(&config_str) {
                    Ok(config) => {
                        info!("Successfully loaded configuration");
                        config
                    }
                    Err(e) => {
                        error!("Failed to parse configuration file {}: {}", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    error!("Failed to read configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            info!("No configuration file found, using defaults");
            Self::default()
        }
    }

    /// Parses a TOML document, keeping the raw table for untyped lookups.
    pub fn parse(config_str: &str) -> Result<Self, toml::de::Error> {
        let raw: toml::Table = toml::from_str(config_str)?;
        let mut config: Self = toml::from_str(config_str)?;
        config.raw = raw;
        Ok(config)
    }

    /// Looks up an arbitrary dotted property from the raw document, e.g.
    /// `property::<u64>("timeouts.attach_timeout_ms")`. Returns `None` when
    /// the path is absent or the value has the wrong shape.
    pub fn property<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let mut current = self.raw.get(name.split('.').next()?)?;
        for segment in name.split('.').skip(1) {
            current = current.as_table()?.get(segment)?;
        }
        current.clone().try_into().ok()
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: BusConfig = BusConfig::load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_document_is_empty() {
        let config = BusConfig::parse("").expect("empty document should parse");
        assert_eq!(config.timeouts.dispatch_idle_ms, 250);
        assert_eq!(config.defaults.queue_name, "main");
        assert_eq!(config.limits.max_wire_frame_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn partial_document_overrides_only_named_values() {
        let doc = r#"
            [timeouts]
            dispatch_idle_ms = 25

            [defaults]
            queue_name = "primary"
        "#;
        let config = BusConfig::parse(doc).expect("partial document should parse");
        assert_eq!(config.timeouts.dispatch_idle_ms, 25);
        assert_eq!(config.defaults.queue_name, "primary");
        assert_eq!(config.timeouts.attach_timeout_ms, 10_000);
    }

    #[test]
    fn property_walks_dotted_paths() {
        let doc = r#"
            [custom]
            retries = 3

            [custom.nested]
            label = "edge"
        "#;
        let config = BusConfig::parse(doc).expect("document should parse");
        assert_eq!(config.property::<u64>("custom.retries"), Some(3));
        assert_eq!(
            config.property::<String>("custom.nested.label"),
            Some("edge".to_string())
        );
        assert_eq!(config.property::<u64>("custom.missing"), None);
        assert_eq!(config.property::<String>("custom.retries"), None);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(BusConfig::parse("timeouts = 7").is_err());
    }
}
