//! Typed, discoverable bus configuration.
//!
//! Discovery follows the same layering the rest of this workspace uses for
//! optional project config: an explicit path wins, then a project-local
//! file, then built-in defaults. Unlike schema loading, an explicit path
//! that fails to parse is surfaced rather than swallowed — see
//! [`BusConfig::load_from`].

use camino::Utf8PathBuf;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use swarmbus_utils::BusError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT_PER_LISTENER: usize = 10;
const DEFAULT_HEALTH_PING_INTERVAL_SECS: u64 = 10;
const CONFIG_FILE_NAME: &str = "swarmbus.toml";

/// Runtime configuration for a [`Bus`](../swarmbus_engine/struct.Bus.html).
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub schema_dirs: Vec<Utf8PathBuf>,
    pub default_timeout: Duration,
    pub max_concurrent_per_listener: usize,
    pub health_ping_interval: Duration,
    pub enable_health_ping: bool,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            schema_dirs: Vec::new(),
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent_per_listener: DEFAULT_MAX_CONCURRENT_PER_LISTENER,
            health_ping_interval: Duration::from_secs(DEFAULT_HEALTH_PING_INTERVAL_SECS),
            enable_health_ping: true,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    schema_dirs: Vec<String>,
    default_timeout_secs: Option<u64>,
    max_concurrent_per_listener: Option<usize>,
    health_ping_interval_secs: Option<u64>,
    enable_health_ping: Option<bool>,
}

impl From<RawConfig> for BusConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = BusConfig::default();
        BusConfig {
            schema_dirs: raw.schema_dirs.into_iter().map(Utf8PathBuf::from).collect(),
            default_timeout: raw
                .default_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_timeout),
            max_concurrent_per_listener: raw
                .max_concurrent_per_listener
                .unwrap_or(defaults.max_concurrent_per_listener),
            health_ping_interval: raw
                .health_ping_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.health_ping_interval),
            enable_health_ping: raw.enable_health_ping.unwrap_or(defaults.enable_health_ping),
        }
    }
}

impl BusConfig {
    /// Discover configuration: explicit path, then `./swarmbus.toml`, then
    /// defaults. Never fails bus construction — a bad file at any step just
    /// falls through to the next one, logged at `warn`.
    pub fn discover(explicit_path: Option<&Path>) -> BusConfig {
        if let Some(path) = explicit_path {
            match Self::load_from(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "explicit config path failed to load, falling back");
                }
            }
        }

        let local = Path::new(CONFIG_FILE_NAME);
        if local.exists() {
            match Self::load_from(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(error = %e, "./swarmbus.toml failed to load, using defaults");
                }
            }
        }

        BusConfig::default()
    }

    /// Load configuration from a specific path. Failures are returned to the
    /// caller rather than swallowed — used by the CLI when a `--config` path
    /// was named explicitly and silent fallback would be surprising.
    pub fn load_from(path: &Path) -> Result<BusConfig, BusError> {
        let content = std::fs::read_to_string(path)?;
        let raw: RawConfig = toml::from_str(&content)
            .map_err(|e| BusError::Config(format!("{}: {e}", path.display())))?;
        Ok(raw.into())
    }
}
