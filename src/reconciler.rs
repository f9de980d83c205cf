//! Reconciliation of an organization's logging configuration.
//!
//! The organization itself always exists and is never created or destroyed
//! here; only its `spec.logging` subtree is managed. Every write replaces the
//! subtree wholesale and is followed by a read, because the write
//! acknowledgement does not carry the resulting document and the server may
//! normalize what was sent.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::ProviderError;
use crate::org::{Org, OrgClient};
use crate::transport::Transport;
use crate::variant::{build_variant, DesiredConfiguration, LoggingVariant};

/// An organization as seen after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledOrg {
    /// Server-assigned id.
    pub id: Option<String>,
    /// Organization name, the resource identity.
    pub name: String,
    /// Description, if any.
    pub description: Option<String>,
    /// Tags, with non-string values rendered as JSON.
    pub tags: BTreeMap<String, String>,
    /// The active logging backend.
    pub logging: LoggingVariant,
}

impl ReconciledOrg {
    /// Build from an API document.
    pub fn from_org(org: Org) -> Result<Self, ProviderError> {
        let logging = LoggingVariant::from_wire(org.logging())?;
        let name = org.name.ok_or(ProviderError::IncompleteRemoteData {
            object: "org",
            field: "name",
        })?;

        let tags = org
            .tags
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect();

        Ok(Self {
            id: org.id,
            name,
            description: org.description,
            tags,
            logging,
        })
    }
}

/// Drives create/read/update/delete of an organization's logging.
///
/// Holds no state besides the client; each call builds its own values.
#[derive(Clone)]
pub struct OrgLoggingReconciler {
    client: OrgClient,
}

impl OrgLoggingReconciler {
    /// Create a reconciler for `org` over the given transport.
    pub fn new(transport: Arc<dyn Transport>, org: impl Into<String>) -> Self {
        Self {
            client: OrgClient::new(transport, org),
        }
    }

    /// The organization name being reconciled.
    pub fn org(&self) -> &str {
        self.client.org()
    }

    /// Apply `desired` and return the state read back afterwards.
    #[instrument(skip(self, desired), fields(org = %self.org()))]
    pub async fn create(
        &self,
        desired: &DesiredConfiguration,
    ) -> Result<Option<ReconciledOrg>, ProviderError> {
        self.write_then_read(desired).await
    }

    /// Read the organization.
    ///
    /// Returns `Ok(None)` if the API reports the organization as not found.
    #[instrument(skip(self), fields(org = %self.org()))]
    pub async fn read(&self) -> Result<Option<ReconciledOrg>, ProviderError> {
        match self.client.get_org().await? {
            Some(org) => {
                let reconciled = ReconciledOrg::from_org(org)?;
                debug!(backend = ?reconciled.logging.block_name(), "Organization read");
                Ok(Some(reconciled))
            }
            None => {
                info!("Organization not found, reporting absent");
                Ok(None)
            }
        }
    }

    /// Replace logging with `desired` and return the state read back.
    ///
    /// No diffing happens here: the whole subtree is replaced. When
    /// `desired` has no block set, logging is cleared.
    #[instrument(skip(self, desired), fields(org = %self.org()))]
    pub async fn update(
        &self,
        desired: &DesiredConfiguration,
    ) -> Result<Option<ReconciledOrg>, ProviderError> {
        self.write_then_read(desired).await
    }

    /// Clear logging. Succeeds if logging was already absent.
    #[instrument(skip(self), fields(org = %self.org()))]
    pub async fn delete(&self) -> Result<(), ProviderError> {
        self.client.replace_logging(None).await?;
        info!("Logging cleared");
        Ok(())
    }

    async fn write_then_read(
        &self,
        desired: &DesiredConfiguration,
    ) -> Result<Option<ReconciledOrg>, ProviderError> {
        let variant = build_variant(desired);
        info!(backend = ?variant.block_name(), "Replacing logging");

        self.client.replace_logging(variant.to_wire().as_ref()).await?;
        self.read().await
    }
}
