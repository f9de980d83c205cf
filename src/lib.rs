//! Control Plane organization logging
//!
//! This crate manages the logging destination of a Control Plane
//! organization as a declarative resource, `cpln_org_logging`. An
//! organization ships its logs to at most one backend at a time: S3,
//! Coralogix, Datadog or Logz.io.
//!
//! # Overview
//!
//! - **Transport**: [`Transport`] abstracts the HTTP boundary; [`HttpTransport`]
//!   talks to the API with `reqwest`
//! - **Org client**: [`org::OrgClient`] reads `/org/{name}` and replaces
//!   `spec.logging` with a `$replace/logging` patch
//! - **Variants**: [`variant::LoggingVariant`] is the typed configuration,
//!   converted to and from the flat attribute tree and the wire format
//! - **Reconciler**: [`OrgLoggingReconciler`] writes the desired variant and
//!   reads the result back
//! - **Projector**: [`projector::project`] renders a reconciled org as the
//!   flat attribute tree
//! - **Provider**: [`OrgLoggingProvider`] implements [`ResourceService`], the
//!   plan/create/read/update/delete/import lifecycle a front-end drives
//!
//! # Quick Start
//!
//! ```ignore
//! use cpln_org_logging::{OrgLoggingProvider, ResourceService, ORG_LOGGING};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     cpln_org_logging::init_logging();
//!
//!     let provider = OrgLoggingProvider::new();
//!     provider.configure(json!({"org": "acme"})).await?;
//!
//!     let state = provider
//!         .create(ORG_LOGGING, json!({
//!             "datadog_logging": [{
//!                 "host": "http-intake.logs.datadoghq.com",
//!                 "credentials": "/org/acme/secret/datadog"
//!             }]
//!         }))
//!         .await?;
//!     println!("{}", state);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;
pub mod org;
pub mod projector;
pub mod provider;
pub mod reconciler;
pub mod schema;
pub mod service;
pub mod testing;
pub mod transport;
pub mod types;
pub mod validation;
pub mod variant;

// Re-export main types at crate root
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{OrgLoggingProvider, ORG_LOGGING};
pub use reconciler::{OrgLoggingReconciler, ReconciledOrg};
pub use schema::ProviderSchema;
pub use service::ResourceService;
pub use transport::{HttpTransport, Transport, TransportOptions, TransportResponse};
pub use types::{AttributeChange, ImportedResource, PlanResult};
pub use validation::{is_valid, validate, validate_result};
pub use variant::{DesiredConfiguration, LoggingVariant};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
