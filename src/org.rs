//! Wire model and client for the organization resource.
//!
//! The API returns the full organization document on `GET /org/{name}` and
//! accepts partial writes on `PATCH /org/{name}`. A key of the form
//! `$replace/<field>` overwrites that subtree wholesale instead of merging
//! into it, and `null` clears it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::transport::Transport;

/// Key that replaces the whole `spec.logging` subtree.
pub const REPLACE_LOGGING_KEY: &str = "$replace/logging";

/// An organization as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Org {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Organization name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource kind, always `org`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Document version, bumped on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, Value>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Last modification timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Desired configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<OrgSpec>,
    /// Server-maintained status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrgStatus>,
}

impl Org {
    /// The logging subtree, if the document carries one.
    pub fn logging(&self) -> Option<&LoggingSpec> {
        self.spec.as_ref().and_then(|spec| spec.logging.as_ref())
    }
}

/// The organization spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgSpec {
    /// Logging destination, absent when logging is off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingSpec>,
    /// Tracing configuration. Opaque here and never written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracing: Option<Value>,
}

/// The organization status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgStatus {
    /// Link to the owning account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_link: Option<String>,
    /// Whether the organization is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Logging as it appears on the wire.
///
/// Every backend is an independent optional field; the API keeps at most
/// one of them populated. Fields inside a backend are optional because a
/// document read back from the API is not guaranteed to be complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSpec {
    /// Amazon S3 backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3LoggingSpec>,
    /// Coralogix backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coralogix: Option<CoralogixLoggingSpec>,
    /// Datadog backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datadog: Option<DatadogLoggingSpec>,
    /// Logz.io backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logzio: Option<LogzioLoggingSpec>,
}

/// S3 logging on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3LoggingSpec {
    /// Bucket name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Bucket region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Object key prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Link to the AWS credentials secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Coralogix logging on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoralogixLoggingSpec {
    /// Coralogix cluster host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    /// Link to the Coralogix key secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    /// Application name attached to log lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Subsystem name attached to log lines.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
}

/// Datadog logging on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatadogLoggingSpec {
    /// Intake host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Link to the Datadog API key secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Logz.io logging on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogzioLoggingSpec {
    /// Listener host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listener_host: Option<String>,
    /// Link to the Logz.io token secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Build the partial-update envelope that replaces `spec.logging`.
///
/// `None` produces an explicit `null`, which clears logging on the server.
pub fn replace_logging_envelope(logging: Option<&LoggingSpec>) -> Value {
    json!({ "spec": { REPLACE_LOGGING_KEY: logging } })
}

/// Client for a single organization.
///
/// The organization is fixed at construction; every request targets
/// `/org/{org}`.
#[derive(Clone)]
pub struct OrgClient {
    transport: Arc<dyn Transport>,
    org: String,
}

impl OrgClient {
    /// Create a client for `org` over `transport`.
    pub fn new(transport: Arc<dyn Transport>, org: impl Into<String>) -> Self {
        Self {
            transport,
            org: org.into(),
        }
    }

    /// The organization name this client targets.
    pub fn org(&self) -> &str {
        &self.org
    }

    fn path(&self) -> String {
        format!("/org/{}", self.org)
    }

    /// Fetch the organization document.
    ///
    /// Returns `Ok(None)` on 404. Any other non-2xx status is an error.
    #[instrument(skip(self), fields(org = %self.org))]
    pub async fn get_org(&self) -> Result<Option<Org>, ProviderError> {
        let response = self.transport.get(&self.path()).await?;

        if response.is_not_found() {
            debug!("Organization not found");
            return Ok(None);
        }
        if !response.is_success() {
            return Err(response.into_error());
        }

        let org: Org = serde_json::from_slice(&response.body)?;
        Ok(Some(org))
    }

    /// Replace `spec.logging` wholesale, or clear it when `logging` is `None`.
    ///
    /// The write acknowledgement carries no usable document; callers that
    /// need the resulting state must read it back.
    #[instrument(skip(self, logging), fields(org = %self.org, clear = logging.is_none()))]
    pub async fn replace_logging(&self, logging: Option<&LoggingSpec>) -> Result<(), ProviderError> {
        let envelope = replace_logging_envelope(logging);
        let response = self.transport.patch(&self.path(), &envelope).await?;

        if !response.is_success() {
            return Err(response.into_error());
        }
        debug!(status = response.status, "Logging replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    #[test]
    fn test_org_deserialize() {
        let org: Org = serde_json::from_value(json!({
            "id": "8c5b1a0e",
            "name": "acme",
            "kind": "org",
            "version": 7,
            "description": "Acme Corp",
            "tags": {"team": "platform"},
            "lastModified": "2024-01-01T00:00:00Z",
            "spec": {
                "logging": {
                    "logzio": {"listenerHost": "listener.logz.io", "credentials": "/org/acme/secret/logzio"}
                },
                "tracing": {"sampling": 10}
            },
            "status": {"accountLink": "/console/account/1", "active": true}
        }))
        .unwrap();

        assert_eq!(org.name.as_deref(), Some("acme"));
        assert_eq!(org.version, Some(7));
        assert_eq!(org.last_modified.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(org.tags["team"], "platform");
        let logzio = org.logging().unwrap().logzio.as_ref().unwrap();
        assert_eq!(logzio.listener_host.as_deref(), Some("listener.logz.io"));
        assert_eq!(org.status.unwrap().active, Some(true));
    }

    #[test]
    fn test_org_without_spec() {
        let org: Org = serde_json::from_value(json!({"name": "acme"})).unwrap();
        assert!(org.logging().is_none());
        assert!(org.tags.is_empty());
    }

    #[test]
    fn test_envelope_with_logging() {
        let logging = LoggingSpec {
            datadog: Some(DatadogLoggingSpec {
                host: Some("http-intake.logs.datadoghq.com".to_string()),
                credentials: Some("/org/acme/secret/dd".to_string()),
            }),
            ..Default::default()
        };

        assert_eq!(
            replace_logging_envelope(Some(&logging)),
            json!({"spec": {"$replace/logging": {"datadog": {
                "host": "http-intake.logs.datadoghq.com",
                "credentials": "/org/acme/secret/dd"
            }}}})
        );
    }

    #[test]
    fn test_envelope_clear() {
        assert_eq!(
            replace_logging_envelope(None),
            json!({"spec": {"$replace/logging": null}})
        );
    }

    #[tokio::test]
    async fn test_get_org_not_found() {
        let transport = Arc::new(MockTransport::absent("acme"));
        let client = OrgClient::new(transport, "acme");
        assert!(client.get_org().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_org_server_error() {
        let transport = Arc::new(MockTransport::new("acme"));
        transport.fail_next_get(500, "internal error");
        let client = OrgClient::new(transport, "acme");

        let err = client.get_org().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_get_org_malformed_body() {
        let transport = Arc::new(MockTransport::new("acme"));
        transport.respond_next_get(200, "{\"name\": ");
        let client = OrgClient::new(transport, "acme");

        let err = client.get_org().await.unwrap_err();
        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_replace_logging_targets_org_path() {
        let transport = Arc::new(MockTransport::new("acme"));
        let client = OrgClient::new(transport.clone(), "acme");

        client.replace_logging(None).await.unwrap();

        let patches = transport.patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].0, "/org/acme");
        assert_eq!(patches[0].1, json!({"spec": {"$replace/logging": null}}));
    }

    #[tokio::test]
    async fn test_replace_logging_rejected() {
        let transport = Arc::new(MockTransport::new("acme"));
        transport.fail_next_patch(403, "forbidden");
        let client = OrgClient::new(transport, "acme");

        let err = client.replace_logging(None).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport { status: 403, .. }));
    }
}
