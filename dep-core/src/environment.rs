use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Deployment target of the enrollment service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepEnvironment {
    Uat,
    Prod,
}

impl DepEnvironment {
    /// Endpoint for this environment. Accounts are split across two hosts by
    /// the parity of the numeric ship-to.
    pub fn default_base_url(&self, ship_to_is_even: bool) -> &'static str {
        match (self, ship_to_is_even) {
            (DepEnvironment::Uat, true) => "https://api-applecareconnect-ept.apple.com/enroll-service/1.0",
            (DepEnvironment::Uat, false) => "https://api-applecareconnect-ept2.apple.com/enroll-service/1.0",
            (DepEnvironment::Prod, true) => "https://api-applecareconnect.apple.com/enroll-service/1.0",
            (DepEnvironment::Prod, false) => "https://api-applecareconnect2.apple.com/enroll-service/1.0",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepEnvironment::Uat => "UAT",
            DepEnvironment::Prod => "PROD",
        }
    }
}

impl fmt::Display for DepEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepEnvironment {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "UAT" => Ok(DepEnvironment::Uat),
            "PROD" | "PRODUCTION" => Ok(DepEnvironment::Prod),
            "" => Err(CoreError::ConfigurationError(
                "environment discriminator is empty (expected UAT or PROD)".to_string(),
            )),
            other => Err(CoreError::ConfigurationError(format!(
                "unrecognized environment `{}` (expected UAT or PROD)",
                other
            ))),
        }
    }
}

/// Everything a transport call needs to reach one environment.
///
/// Resolved once per process and shared read-only; it holds certificate
/// *paths*, never certificate contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentProfile {
    environment: DepEnvironment,
    base_url: String,
    ship_to: String,
    reseller_id: String,
    certificate_path: PathBuf,
    private_key_path: PathBuf,
}

impl EnvironmentProfile {
    pub fn new(
        environment: DepEnvironment,
        base_url: impl Into<String>,
        ship_to: impl Into<String>,
        reseller_id: impl Into<String>,
        certificate_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> CoreResult<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(CoreError::ConfigurationError(format!(
                "base url `{}` must be an http(s) URL",
                base_url
            )));
        }
        if base_url.starts_with("http://") {
            tracing::warn!("DEP base url {} is not HTTPS; requests travel unencrypted", base_url);
        }

        let ship_to = required("ship-to", ship_to.into())?;
        let reseller_id = required("reseller id", reseller_id.into())?;
        let certificate_path = required_path("certificate path", certificate_path.into())?;
        let private_key_path = required_path("private key path", private_key_path.into())?;

        Ok(Self {
            environment,
            base_url,
            ship_to,
            reseller_id,
            certificate_path,
            private_key_path,
        })
    }

    pub fn environment(&self) -> DepEnvironment {
        self.environment
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// False only for a plain `http://` base url, which is meant for local test servers.
    pub fn uses_tls(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    pub fn ship_to(&self) -> &str {
        &self.ship_to
    }

    pub fn reseller_id(&self) -> &str {
        &self.reseller_id
    }

    pub fn certificate_path(&self) -> &Path {
        &self.certificate_path
    }

    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    /// `{base_url}/{endpoint}`
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

fn required(name: &str, value: String) -> CoreResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(CoreError::ConfigurationError(format!("{} is required", name)));
    }
    Ok(value)
}

fn required_path(name: &str, value: PathBuf) -> CoreResult<PathBuf> {
    let (blank, has_nul) = {
        let raw = value.to_string_lossy();
        (raw.trim().is_empty(), raw.contains('\0'))
    };
    if blank {
        return Err(CoreError::ConfigurationError(format!("{} is required", name)));
    }
    if has_nul {
        return Err(CoreError::ConfigurationError(format!(
            "{} contains a NUL byte",
            name
        )));
    }
    Ok(value)
}
