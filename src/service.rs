//! The lifecycle interface exposed to the configuration front-end.
//!
//! A front-end holds one [`ResourceService`] per provider and drives it with
//! flat attribute trees. Operations on one resource are expected to be
//! serialized by the caller.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Trait that provider implementations must implement.
///
/// # Example
///
/// ```ignore
/// use cpln_org_logging::{OrgLoggingProvider, ResourceService};
/// use serde_json::json;
///
/// let provider = OrgLoggingProvider::new();
/// provider.configure(json!({"org": "acme"})).await?;
/// let state = provider.read("cpln_org_logging", json!({"id": "acme"})).await?;
/// ```
#[async_trait::async_trait]
pub trait ResourceService: Send + Sync + 'static {
    // =========================================================================
    // Schema
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Names of the resource types this provider manages.
    fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.schema().resources.keys().cloned().collect();
        types.sort();
        types
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    ///
    /// By default this checks `config` against the resource's schema.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validation::validate(resource, &config))
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    ///
    /// Returns the state to record afterwards, with identity cleared.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Sdk(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use serde_json::json;

    // Minimal service relying on every default method
    struct Echo;

    #[async_trait::async_trait]
    impl ResourceService for Echo {
        fn schema(&self) -> ProviderSchema {
            ProviderSchema::new()
                .with_resource("zeta", Schema::v0())
                .with_resource(
                    "alpha",
                    Schema::v0().with_attribute("name", Attribute::required_string()),
                )
        }

        async fn configure(&self, _config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
            Ok(vec![])
        }

        async fn plan(
            &self,
            _resource_type: &str,
            _prior_state: Option<Value>,
            proposed_state: Value,
        ) -> Result<PlanResult, ProviderError> {
            Ok(PlanResult::no_change(proposed_state))
        }

        async fn create(&self, _rt: &str, planned_state: Value) -> Result<Value, ProviderError> {
            Ok(planned_state)
        }

        async fn read(&self, _rt: &str, current_state: Value) -> Result<Value, ProviderError> {
            Ok(current_state)
        }

        async fn update(&self, _rt: &str, _prior: Value, planned: Value) -> Result<Value, ProviderError> {
            Ok(planned)
        }

        async fn delete(&self, _rt: &str, _current: Value) -> Result<Value, ProviderError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn test_resource_types_sorted() {
        assert_eq!(Echo.resource_types(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_default_validation() {
        let diagnostics =
            tokio_test::block_on(Echo.validate_resource_config("alpha", json!({}))).unwrap();
        assert_eq!(diagnostics.len(), 1);

        let err = tokio_test::block_on(Echo.validate_resource_config("beta", json!({})))
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[test]
    fn test_import_unsupported_by_default() {
        let err = tokio_test::block_on(Echo.import_resource("alpha", "x")).unwrap_err();
        assert!(matches!(err, ProviderError::Sdk(_)));
    }
}
