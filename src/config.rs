//! Provider configuration.
//!
//! Each setting may come from the provider configuration block or, when
//! absent or empty there, from an environment variable:
//!
//! | setting    | variable        | default               |
//! |------------|-----------------|-----------------------|
//! | `org`      | `CPLN_ORG`      | required              |
//! | `endpoint` | `CPLN_ENDPOINT` | `https://api.cpln.io` |
//! | `profile`  | `CPLN_PROFILE`  |                       |
//! | `token`    | `CPLN_TOKEN`    |                       |

use serde::Deserialize;
use serde_json::Value;

use crate::schema::{Attribute, Diagnostic, Schema};
use crate::transport::DEFAULT_ENDPOINT;

/// Environment variable for the organization.
pub const ENV_ORG: &str = "CPLN_ORG";
/// Environment variable for the API endpoint.
pub const ENV_ENDPOINT: &str = "CPLN_ENDPOINT";
/// Environment variable for the profile.
pub const ENV_PROFILE: &str = "CPLN_PROFILE";
/// Environment variable for the API token.
pub const ENV_TOKEN: &str = "CPLN_TOKEN";

/// Resolved provider configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Organization whose logging is managed.
    pub org: String,
    /// API endpoint.
    pub endpoint: String,
    /// Named profile. Resolving a profile to credentials happens outside
    /// this crate.
    pub profile: Option<String>,
    /// API token sent as the `Authorization` header.
    pub token: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("org", &self.org)
            .field("endpoint", &self.endpoint)
            .field("profile", &self.profile)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawProviderConfig {
    #[serde(default)]
    org: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

// The org name is formatted into `/org/{name}` unescaped.
fn is_path_segment(name: &str) -> bool {
    !name
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace())
}

impl ProviderConfig {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "org",
                Attribute::optional_string()
                    .with_description("Organization name. Falls back to CPLN_ORG."),
            )
            .with_attribute(
                "endpoint",
                Attribute::optional_string()
                    .with_description("API endpoint. Falls back to CPLN_ENDPOINT."),
            )
            .with_attribute(
                "profile",
                Attribute::optional_string()
                    .with_description("Profile name. Falls back to CPLN_PROFILE."),
            )
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description("API token. Falls back to CPLN_TOKEN."),
            )
    }

    /// Resolve configuration from `config` and the process environment.
    pub fn resolve(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from `config`, using `env` for fallbacks.
    pub fn resolve_with<F>(config: &Value, env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawProviderConfig = match config {
            Value::Null => RawProviderConfig::default(),
            other => serde_json::from_value(other.clone()).map_err(|e| {
                vec![Diagnostic::error("Invalid provider configuration").with_detail(e.to_string())]
            })?,
        };

        let pick = |value: Option<String>, key: &str| {
            value
                .filter(|v| !v.is_empty())
                .or_else(|| env(key).filter(|v| !v.is_empty()))
        };

        let Some(org) = pick(raw.org, ENV_ORG) else {
            return Err(vec![Diagnostic::error("Missing organization")
                .with_detail(format!("Set 'org' in the provider block or {}", ENV_ORG))
                .with_attribute("org")]);
        };

        if !is_path_segment(&org) {
            return Err(vec![Diagnostic::error("Invalid organization name")
                .with_detail(format!(
                    "'{}' cannot be used in a request path; it must not contain '/', '?', '#', '%' or whitespace",
                    org
                ))
                .with_attribute("org")]);
        }

        Ok(Self {
            org,
            endpoint: pick(raw.endpoint, ENV_ENDPOINT).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            profile: pick(raw.profile, ENV_PROFILE),
            token: pick(raw.token, ENV_TOKEN),
        })
    }

    /// Warnings about settings that resolved but will not be used as given.
    pub fn warnings(&self) -> Vec<Diagnostic> {
        match (&self.token, &self.profile) {
            (None, Some(profile)) => vec![Diagnostic::warning("No token configured")
                .with_detail(format!(
                    "Profile '{}' is not resolved to credentials here; set 'token' or {}",
                    profile, ENV_TOKEN
                ))
                .with_attribute("token")],
            (None, None) => vec![Diagnostic::warning("No token configured")
                .with_detail("Requests will be sent unauthenticated")
                .with_attribute("token")],
            _ => Vec::new(),
        }
    }
}
