//! The `cpln_org_logging` resource.
//!
//! [`OrgLoggingProvider`] implements [`ResourceService`] by parsing the flat
//! attribute tree into a [`DesiredConfiguration`], reconciling it with
//! [`OrgLoggingReconciler`] and projecting the result back with
//! [`projector::project`].

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::projector::{self, COMPUTED_ATTRIBUTES};
use crate::reconciler::OrgLoggingReconciler;
use crate::schema::{Attribute, Block, Diagnostic, NestedBlock, ProviderSchema, Schema};
use crate::service::ResourceService;
use crate::transport::{HttpTransport, Transport, TransportOptions};
use crate::types::{AttributeChange, ImportedResource, PlanResult};
use crate::validation::apply_defaults;
use crate::variant::{
    DesiredConfiguration, CORALOGIX_LOGGING, DATADOG_LOGGING, DEFAULT_S3_PREFIX, LOGGING_BLOCKS,
    LOGZIO_LOGGING, S3_LOGGING,
};

/// Resource type name of organization logging.
pub const ORG_LOGGING: &str = "cpln_org_logging";

fn credentials() -> Attribute {
    Attribute::required_string()
        .sensitive()
        .with_description("Link to the secret holding the credentials")
}

/// Schema of the `cpln_org_logging` resource.
pub fn org_logging_schema() -> Schema {
    Schema::v0()
        .with_attribute(projector::ID, Attribute::computed_string())
        .with_attribute(projector::CPLN_ID, Attribute::computed_string())
        .with_attribute(projector::NAME, Attribute::computed_string())
        .with_attribute(projector::DESCRIPTION, Attribute::computed_string())
        .with_attribute(projector::TAGS, Attribute::computed_string_map())
        .with_block(
            S3_LOGGING,
            NestedBlock::single(
                Block::new()
                    .with_attribute("bucket", Attribute::required_string())
                    .with_attribute("region", Attribute::required_string())
                    .with_attribute(
                        "prefix",
                        Attribute::optional_string().with_default(json!(DEFAULT_S3_PREFIX)),
                    )
                    .with_attribute("credentials", credentials())
                    .with_description("Ship logs to an S3 bucket"),
            ),
        )
        .with_block(
            CORALOGIX_LOGGING,
            NestedBlock::single(
                Block::new()
                    .with_attribute("cluster", Attribute::required_string())
                    .with_attribute("credentials", credentials())
                    .with_attribute("app", Attribute::required_string())
                    .with_attribute("subsystem", Attribute::required_string())
                    .with_description("Ship logs to Coralogix"),
            ),
        )
        .with_block(
            DATADOG_LOGGING,
            NestedBlock::single(
                Block::new()
                    .with_attribute("host", Attribute::required_string())
                    .with_attribute("credentials", credentials())
                    .with_description("Ship logs to Datadog"),
            ),
        )
        .with_block(
            LOGZIO_LOGGING,
            NestedBlock::single(
                Block::new()
                    .with_attribute("listener_host", Attribute::required_string())
                    .with_attribute("credentials", credentials())
                    .with_description("Ship logs to Logz.io"),
            ),
        )
        .with_exactly_one_of(LOGGING_BLOCKS)
}

/// Logging blocks that differ between two attribute trees.
pub fn changed_blocks(prior: &Value, planned: &Value) -> Vec<AttributeChange> {
    LOGGING_BLOCKS
        .iter()
        .filter_map(|block| AttributeChange::between(block, prior, planned))
        .collect()
}

/// Provider managing the logging of one organization.
pub struct OrgLoggingProvider {
    reconciler: RwLock<Option<OrgLoggingReconciler>>,
    transport_options: TransportOptions,
}

impl Default for OrgLoggingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OrgLoggingProvider {
    /// Create an unconfigured provider. [`ResourceService::configure`] must
    /// be called before any resource operation.
    pub fn new() -> Self {
        Self::with_transport_options(TransportOptions::default())
    }

    /// Create an unconfigured provider whose HTTP transport uses `options`.
    pub fn with_transport_options(options: TransportOptions) -> Self {
        Self {
            reconciler: RwLock::new(None),
            transport_options: options,
        }
    }

    /// Create a provider already bound to `org` over `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>, org: impl Into<String>) -> Self {
        Self {
            reconciler: RwLock::new(Some(OrgLoggingReconciler::new(transport, org))),
            transport_options: TransportOptions::default(),
        }
    }

    async fn reconciler(&self) -> Result<OrgLoggingReconciler, ProviderError> {
        self.reconciler.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("provider is not configured".to_string())
        })
    }

    fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
        if resource_type == ORG_LOGGING {
            Ok(())
        } else {
            Err(ProviderError::UnknownResource(resource_type.to_string()))
        }
    }

    fn desired(state: &Value) -> Result<DesiredConfiguration, ProviderError> {
        let state = apply_defaults(&org_logging_schema(), state.clone());
        DesiredConfiguration::from_attributes(&state)
    }
}

#[async_trait::async_trait]
impl ResourceService for OrgLoggingProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(ORG_LOGGING, org_logging_schema())
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = match ProviderConfig::resolve(&config) {
            Ok(config) => config,
            Err(diagnostics) => {
                error!(
                    diagnostics = diagnostics.len(),
                    "Provider configuration rejected"
                );
                return Ok(diagnostics);
            }
        };

        let diagnostics = config.warnings();
        let transport = HttpTransport::new(
            config.endpoint.clone(),
            config.token.clone(),
            self.transport_options.clone(),
        )?;
        *self.reconciler.write().await =
            Some(OrgLoggingReconciler::new(Arc::new(transport), config.org.clone()));

        info!(org = %config.org, endpoint = %config.endpoint, "Provider configured");
        Ok(diagnostics)
    }

    #[instrument(skip(self, prior_state, proposed_state))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let prior = prior_state.unwrap_or_else(|| json!({}));

        if proposed_state.is_null() {
            let changes = changed_blocks(&prior, &json!({}));
            debug!(changes = changes.len(), "Planned delete");
            return Ok(PlanResult::with_changes(Value::Null, changes, false));
        }

        let mut planned = apply_defaults(&org_logging_schema(), proposed_state);
        if let (Value::Object(planned), Value::Object(prior)) = (&mut planned, &prior) {
            for key in COMPUTED_ATTRIBUTES {
                if let Some(value) = prior.get(key) {
                    planned.insert(key.to_string(), value.clone());
                }
            }
        }

        let changes = changed_blocks(&prior, &planned);
        debug!(changes = changes.len(), "Planned");
        Ok(PlanResult::with_changes(planned, changes, false))
    }

    #[instrument(skip(self, planned_state))]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let desired = Self::desired(&planned_state)?;

        let org = self.reconciler().await?.create(&desired).await?;
        info!(tracked = org.is_some(), "Create completed");
        Ok(projector::project(org.as_ref()))
    }

    #[instrument(skip(self, _current_state))]
    async fn read(&self, resource_type: &str, _current_state: Value) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;

        let org = self.reconciler().await?.read().await?;
        debug!(tracked = org.is_some(), "Read completed");
        Ok(projector::project(org.as_ref()))
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let planned_state = apply_defaults(&org_logging_schema(), planned_state);

        let changes = changed_blocks(&prior_state, &planned_state);
        if changes.is_empty() {
            debug!("No logging block changed, skipping update");
            return Ok(prior_state);
        }

        let desired = DesiredConfiguration::from_attributes(&planned_state)?;
        let org = self.reconciler().await?.update(&desired).await?;
        info!(changes = changes.len(), tracked = org.is_some(), "Update completed");
        Ok(projector::project(org.as_ref()))
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        Self::check_resource_type(resource_type)?;

        self.reconciler().await?.delete().await?;
        info!("Delete completed");
        Ok(projector::clear_identity(current_state))
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Self::check_resource_type(resource_type)?;
        let reconciler = self.reconciler().await?;

        if id != reconciler.org() {
            return Err(ProviderError::InvalidRequest(format!(
                "cannot import org '{}': provider is configured for '{}'",
                id,
                reconciler.org()
            )));
        }

        let org = reconciler
            .read()
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("org/{}", id)))?;

        info!(id, "Import completed");
        Ok(vec![ImportedResource::new(
            ORG_LOGGING,
            projector::project(Some(&org)),
        )])
    }
}
