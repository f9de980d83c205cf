//! Testing utilities.
//!
//! [`MockTransport`] is an in-memory stand-in for the Control Plane API that
//! holds a single organization document and applies `$replace/` patches to
//! it. [`ProviderTester`] drives a [`ResourceService`] the way a front-end
//! would, without any wire protocol in between.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cpln_org_logging::testing::{MockTransport, ProviderTester};
//! use cpln_org_logging::OrgLoggingProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_datadog() {
//!     let transport = Arc::new(MockTransport::new("acme"));
//!     let tester = ProviderTester::new(OrgLoggingProvider::with_transport(transport, "acme"));
//!
//!     let state = tester.lifecycle_create("cpln_org_logging", json!({
//!         "datadog_logging": [{"host": "http-intake.logs.datadoghq.com", "credentials": "/org/acme/secret/dd"}]
//!     })).await.unwrap();
//!
//!     assert_eq!(state["id"], "acme");
//! }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ResourceService;
use crate::transport::{Transport, TransportResponse};
use crate::types::{ImportedResource, PlanResult};

// =========================================================================
// Mock Transport
// =========================================================================

#[derive(Debug, Default)]
struct MockState {
    org: String,
    document: Option<Value>,
    get_count: usize,
    patches: Vec<(String, Value)>,
    next_get: Option<TransportResponse>,
    next_patch: Option<TransportResponse>,
}

/// In-memory transport serving one organization at `/org/{name}`.
///
/// GET returns the stored document, or 404 when the organization is absent
/// or the path names another one. PATCH records the body and applies each
/// `spec` key to the document: `$replace/<field>` replaces `<field>`
/// wholesale and `null` removes it.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// An organization named `org` with no logging configured.
    pub fn new(org: &str) -> Self {
        Self::with_org(json!({
            "id": "d1f4c2a7-5b0e-4c1f-9a3d-0c6e2b8f7a41",
            "name": org,
            "kind": "org",
            "version": 1,
            "description": org,
            "tags": {},
            "spec": {}
        }))
    }

    /// Serve `document` as the organization. Its `name` fixes the path.
    pub fn with_org(document: Value) -> Self {
        let org = document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            state: Mutex::new(MockState {
                org,
                document: Some(document),
                ..Default::default()
            }),
        }
    }

    /// An organization named `org` that does not exist.
    pub fn absent(org: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                org: org.to_string(),
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next GET with `status` and `message`.
    pub fn fail_next_get(&self, status: u16, message: &str) {
        self.respond_next_get(status, json!({ "message": message }).to_string());
    }

    /// Answer the next GET with a raw `status` and `body`.
    pub fn respond_next_get(&self, status: u16, body: impl Into<Vec<u8>>) {
        self.state().next_get = Some(TransportResponse::new(status, body));
    }

    /// Fail the next PATCH with `status` and `message`. The body is still
    /// recorded but not applied.
    pub fn fail_next_patch(&self, status: u16, message: &str) {
        self.state().next_patch = Some(TransportResponse::json(
            status,
            &json!({ "message": message }),
        ));
    }

    /// Every PATCH received, as `(path, body)`.
    pub fn patches(&self) -> Vec<(String, Value)> {
        self.state().patches.clone()
    }

    /// Number of GET requests received.
    pub fn get_count(&self) -> usize {
        self.state().get_count
    }

    /// The stored organization document.
    pub fn document(&self) -> Option<Value> {
        self.state().document.clone()
    }
}

fn not_found(path: &str) -> TransportResponse {
    TransportResponse::json(404, &json!({ "message": format!("{} not found", path) }))
}

fn apply_patch(document: &mut Value, body: &Value) {
    let Some(spec_patch) = body.get("spec").and_then(Value::as_object) else {
        return;
    };
    if !document["spec"].is_object() {
        document["spec"] = json!({});
    }
    if let Some(spec) = document["spec"].as_object_mut() {
        for (key, value) in spec_patch {
            let field = key.strip_prefix("$replace/").unwrap_or(key);
            if value.is_null() {
                spec.remove(field);
            } else {
                spec.insert(field.to_string(), value.clone());
            }
        }
    }
    if let Some(version) = document["version"].as_u64() {
        document["version"] = json!(version + 1);
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str) -> Result<TransportResponse, ProviderError> {
        let mut state = self.state();
        state.get_count += 1;

        if let Some(response) = state.next_get.take() {
            return Ok(response);
        }
        if path != format!("/org/{}", state.org) {
            return Ok(not_found(path));
        }
        Ok(match &state.document {
            Some(document) => TransportResponse::json(200, document),
            None => not_found(path),
        })
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<TransportResponse, ProviderError> {
        let mut state = self.state();
        state.patches.push((path.to_string(), body.clone()));

        if let Some(response) = state.next_patch.take() {
            return Ok(response);
        }
        if path != format!("/org/{}", state.org) {
            return Ok(not_found(path));
        }
        Ok(match state.document.as_mut() {
            Some(document) => {
                apply_patch(document, body);
                TransportResponse::json(200, document)
            }
            None => not_found(path),
        })
    }
}

// =========================================================================
// Provider Tester
// =========================================================================

/// A test harness for [`ResourceService`] implementations.
pub struct ProviderTester<P: ResourceService> {
    provider: P,
}

impl<P: ResourceService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.resource_types()
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the diagnostics if any of them is an error.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider.plan(resource_type, None, proposed_state).await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), proposed_state)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;

        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;

        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;

        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;

        self.read(resource_type, updated_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    ///
    /// Returns the state recorded after delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;

        self.delete(resource_type, current_state).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{OrgLoggingProvider, ORG_LOGGING};
    use crate::projector;
    use std::sync::Arc;

    fn tester() -> (Arc<MockTransport>, ProviderTester<OrgLoggingProvider>) {
        let transport = Arc::new(MockTransport::new("acme"));
        let provider = OrgLoggingProvider::with_transport(transport.clone(), "acme");
        (transport, ProviderTester::new(provider))
    }

    fn coralogix_config() -> Value {
        json!({
            "coralogix_logging": [{
                "cluster": "coralogix.com",
                "credentials": "/org/acme/secret/cx",
                "app": "web",
                "subsystem": "api"
            }]
        })
    }

    fn logzio_config() -> Value {
        json!({
            "logzio_logging": [{
                "listener_host": "listener.logz.io",
                "credentials": "/org/acme/secret/logzio"
            }]
        })
    }

    #[tokio::test]
    async fn test_mock_applies_replace_patch() {
        let transport = MockTransport::new("acme");

        transport
            .patch("/org/acme", &json!({"spec": {"$replace/logging": {"datadog": {"host": "h"}}}}))
            .await
            .unwrap();
        let document = transport.document().unwrap();
        assert_eq!(document["spec"]["logging"], json!({"datadog": {"host": "h"}}));
        assert_eq!(document["version"], 2);

        transport
            .patch("/org/acme", &json!({"spec": {"$replace/logging": null}}))
            .await
            .unwrap();
        assert!(transport.document().unwrap()["spec"].get("logging").is_none());
    }

    #[tokio::test]
    async fn test_mock_other_org_not_found() {
        let transport = MockTransport::new("acme");
        let response = transport.get("/org/other").await.unwrap();
        assert!(response.is_not_found());
        assert_eq!(transport.get_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_absent_org() {
        let transport = MockTransport::absent("acme");
        assert!(transport.get("/org/acme").await.unwrap().is_not_found());
        assert!(transport
            .patch("/org/acme", &json!({"spec": {}}))
            .await
            .unwrap()
            .is_not_found());
        assert_eq!(transport.patches().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_injected_failure_is_one_shot() {
        let transport = MockTransport::new("acme");
        transport.fail_next_get(503, "unavailable");

        assert_eq!(transport.get("/org/acme").await.unwrap().status, 503);
        assert!(transport.get("/org/acme").await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_tester_schema() {
        let (_transport, tester) = tester();
        assert_eq!(tester.resource_types(), vec![ORG_LOGGING.to_string()]);
        assert!(tester.schema().provider.block.attributes.contains_key("org"));
    }

    #[tokio::test]
    async fn test_tester_configure() {
        let (_transport, tester) = tester();
        let result = tester
            .configure(json!({"org": "acme", "endpoint": "http://127.0.0.1:1", "token": "t"}))
            .await;
        assert!(result.is_ok());
        assert_eq!(tester.provider().resource_types().len(), 1);
    }

    #[tokio::test]
    async fn test_tester_validate_errors() {
        let (_transport, tester) = tester();

        let err = tester
            .validate_resource_config(ORG_LOGGING, json!({}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diagnostics) => {
                assert_error_contains(&diagnostics, "must be set");
            }
            TestError::Provider(e) => panic!("unexpected provider error: {}", e),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_create_update_delete() {
        let (transport, tester) = tester();

        let created = tester
            .lifecycle_create(ORG_LOGGING, coralogix_config())
            .await
            .unwrap();
        assert_eq!(created["id"], "acme");
        assert_eq!(created["coralogix_logging"], coralogix_config()["coralogix_logging"]);

        let updated = tester
            .lifecycle_update(ORG_LOGGING, created, logzio_config())
            .await
            .unwrap();
        assert_eq!(updated["coralogix_logging"], json!([]));
        assert_eq!(updated["logzio_logging"], logzio_config()["logzio_logging"]);

        let deleted = tester
            .lifecycle_delete(ORG_LOGGING, updated)
            .await
            .unwrap();
        assert!(!projector::is_tracked(&deleted));
        assert!(transport.document().unwrap()["spec"].get("logging").is_none());
    }

    #[tokio::test]
    async fn test_plan_switch_backend() {
        let (_transport, tester) = tester();
        let created = tester
            .lifecycle_create(ORG_LOGGING, coralogix_config())
            .await
            .unwrap();

        let plan = tester
            .plan_update(ORG_LOGGING, created.clone(), logzio_config())
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "coralogix_logging");
        assert_plan_changes_attribute(&plan, "logzio_logging");

        let plan = tester
            .plan_update(ORG_LOGGING, created.clone(), created)
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_tester_import() {
        let (_transport, tester) = tester();
        tester
            .lifecycle_create(ORG_LOGGING, logzio_config())
            .await
            .unwrap();

        let imported = tester.import_resource(ORG_LOGGING, "acme").await.unwrap();
        assert_eq!(imported[0].state["logzio_logging"], logzio_config()["logzio_logging"]);
    }

    #[test]
    fn test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Missing organization").with_attribute("org")
        ]);
        let display = format!("{}", err);
        assert!(display.contains("1 diagnostic(s)"));
        assert!(display.contains("(at org)"));
    }
}
