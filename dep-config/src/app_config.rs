use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use dep_core::{CoreError, CoreResult};

/// Raw enrollment settings as they arrive from files and `DEP_*` variables.
///
/// Every field is optional here; [`crate::resolve`] decides what the active
/// environment actually requires.
#[derive(Debug, Deserialize, Clone)]
pub struct DepSettings {
    /// `DEP_ENV`: UAT or PROD
    pub env: Option<String>,
    /// `DEP_SHIPTO`: ship-to account number
    pub shipto: Option<String>,
    pub reseller_id: Option<String>,
    pub uat_cert: Option<PathBuf>,
    pub uat_private_key: Option<PathBuf>,
    pub prod_cert: Option<PathBuf>,
    pub prod_private_key: Option<PathBuf>,
    /// Overrides the parity-selected endpoint.
    pub base_url: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// `timeZone` sent in the request context of lookup calls
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_lang_code")]
    pub lang_code: String,
}

fn default_connect_timeout() -> u64 { 10 }
fn default_timeout() -> u64 { 30 }
// Pacific time
fn default_time_zone() -> String { "420".to_string() }
fn default_lang_code() -> String { "en".to_string() }

impl Default for DepSettings {
    fn default() -> Self {
        Self {
            env: None,
            shipto: None,
            reseller_id: None,
            uat_cert: None,
            uat_private_key: None,
            prod_cert: None,
            prod_private_key: None,
            base_url: None,
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            time_zone: default_time_zone(),
            lang_code: default_lang_code(),
        }
    }
}

/// Timeouts and request-context defaults handed to the transport client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub time_zone: String,
    pub lang_code: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(default_connect_timeout()),
            timeout: Duration::from_secs(default_timeout()),
            time_zone: default_time_zone(),
            lang_code: default_lang_code(),
        }
    }
}

impl DepSettings {
    pub fn load() -> CoreResult<Self> {
        let s = config::Config::builder()
            // Optional shared settings file, any format `config` understands
            .add_source(config::File::with_name("config/dep").required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // DEP_ENV, DEP_SHIPTO, DEP_UAT_PRIVATE_KEY, DEP_TIME_ZONE, ...
            .add_source(
                config::Environment::with_prefix("DEP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_error)?;

        Self::from_config(s)
    }

    pub fn from_config(source: config::Config) -> CoreResult<Self> {
        source.try_deserialize().map_err(config_error)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            time_zone: self.time_zone.clone(),
            lang_code: self.lang_code.clone(),
        }
    }
}

fn config_error(err: config::ConfigError) -> CoreError {
    CoreError::ConfigurationError(format!("unable to load DEP settings: {}", err))
}
