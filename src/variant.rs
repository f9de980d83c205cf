//! Transcoding between flat logging blocks and the logging variant.
//!
//! Configuration describes logging as four optional single-element blocks
//! (`s3_logging`, `coralogix_logging`, `datadog_logging`, `logzio_logging`),
//! of which at most one may be set. Internally that is a [`LoggingVariant`],
//! a sum type with one arm per backend plus [`LoggingVariant::Unset`], so two
//! active backends cannot be represented.
//!
//! ```
//! use cpln_org_logging::variant::{build_variant, flatten_variant, DesiredConfiguration, LoggingVariant};
//! use serde_json::json;
//!
//! let desired = DesiredConfiguration::from_attributes(&json!({
//!     "datadog_logging": [{"host": "http-intake.logs.datadoghq.com", "credentials": "/org/acme/secret/dd"}]
//! })).unwrap();
//!
//! let variant = build_variant(&desired);
//! assert!(matches!(variant, LoggingVariant::Datadog(_)));
//! assert_eq!(flatten_variant(&variant), desired);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ProviderError;
use crate::org::{
    CoralogixLoggingSpec, DatadogLoggingSpec, LoggingSpec, LogzioLoggingSpec, S3LoggingSpec,
};

/// Attribute name of the S3 block.
pub const S3_LOGGING: &str = "s3_logging";
/// Attribute name of the Coralogix block.
pub const CORALOGIX_LOGGING: &str = "coralogix_logging";
/// Attribute name of the Datadog block.
pub const DATADOG_LOGGING: &str = "datadog_logging";
/// Attribute name of the Logz.io block.
pub const LOGZIO_LOGGING: &str = "logzio_logging";

/// All logging block names, in priority order.
pub const LOGGING_BLOCKS: [&str; 4] = [S3_LOGGING, CORALOGIX_LOGGING, DATADOG_LOGGING, LOGZIO_LOGGING];

/// Default S3 key prefix.
pub const DEFAULT_S3_PREFIX: &str = "/";

fn default_prefix() -> String {
    DEFAULT_S3_PREFIX.to_string()
}

// An explicit null prefix gets the same default as an omitted one.
fn prefix_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_prefix))
}

/// Ship logs to an S3 bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Logging {
    /// Bucket name.
    pub bucket: String,
    /// AWS region of the bucket.
    pub region: String,
    /// Key prefix, `/` by default.
    #[serde(default = "default_prefix", deserialize_with = "prefix_or_default")]
    pub prefix: String,
    /// Link to the secret holding AWS credentials.
    pub credentials: String,
}

/// Ship logs to Coralogix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoralogixLogging {
    /// Coralogix cluster URI.
    pub cluster: String,
    /// Link to the secret holding the private key.
    pub credentials: String,
    /// Application name.
    pub app: String,
    /// Subsystem name.
    pub subsystem: String,
}

/// Ship logs to Datadog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatadogLogging {
    /// Datadog intake host.
    pub host: String,
    /// Link to the secret holding the API key.
    pub credentials: String,
}

/// Ship logs to Logz.io.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogzioLogging {
    /// Logz.io listener host.
    pub listener_host: String,
    /// Link to the secret holding the shipping token.
    pub credentials: String,
}

/// The logging backend of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoggingVariant {
    /// No backend configured.
    #[default]
    Unset,
    /// Amazon S3.
    S3(S3Logging),
    /// Coralogix.
    Coralogix(CoralogixLogging),
    /// Datadog.
    Datadog(DatadogLogging),
    /// Logz.io.
    Logzio(LogzioLogging),
}

impl LoggingVariant {
    /// Whether this is [`LoggingVariant::Unset`].
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// The attribute block name of the active arm.
    pub fn block_name(&self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::S3(_) => Some(S3_LOGGING),
            Self::Coralogix(_) => Some(CORALOGIX_LOGGING),
            Self::Datadog(_) => Some(DATADOG_LOGGING),
            Self::Logzio(_) => Some(LOGZIO_LOGGING),
        }
    }

    /// Encode for the wire. `Unset` encodes as `None`, which clears logging.
    pub fn to_wire(&self) -> Option<LoggingSpec> {
        let mut spec = LoggingSpec::default();
        match self {
            Self::Unset => return None,
            Self::S3(log) => {
                spec.s3 = Some(S3LoggingSpec {
                    bucket: Some(log.bucket.clone()),
                    region: Some(log.region.clone()),
                    prefix: Some(log.prefix.clone()),
                    credentials: Some(log.credentials.clone()),
                })
            }
            Self::Coralogix(log) => {
                spec.coralogix = Some(CoralogixLoggingSpec {
                    cluster: Some(log.cluster.clone()),
                    credentials: Some(log.credentials.clone()),
                    app: Some(log.app.clone()),
                    subsystem: Some(log.subsystem.clone()),
                })
            }
            Self::Datadog(log) => {
                spec.datadog = Some(DatadogLoggingSpec {
                    host: Some(log.host.clone()),
                    credentials: Some(log.credentials.clone()),
                })
            }
            Self::Logzio(log) => {
                spec.logzio = Some(LogzioLoggingSpec {
                    listener_host: Some(log.listener_host.clone()),
                    credentials: Some(log.credentials.clone()),
                })
            }
        }
        Some(spec)
    }

    /// Decode from the wire.
    ///
    /// A backend that is present but lacks a required field fails with
    /// [`ProviderError::IncompleteRemoteData`]. If the document reports more
    /// than one backend, the first in priority order wins.
    pub fn from_wire(spec: Option<&LoggingSpec>) -> Result<Self, ProviderError> {
        let Some(spec) = spec else {
            return Ok(Self::Unset);
        };

        let present = [
            spec.s3.is_some(),
            spec.coralogix.is_some(),
            spec.datadog.is_some(),
            spec.logzio.is_some(),
        ];
        warn_if_ambiguous("remote", &present);

        if let Some(log) = &spec.s3 {
            return Ok(Self::S3(S3Logging {
                bucket: remote_field(&log.bucket, "s3 logging", "bucket")?,
                region: remote_field(&log.region, "s3 logging", "region")?,
                prefix: remote_field(&log.prefix, "s3 logging", "prefix")?,
                credentials: remote_field(&log.credentials, "s3 logging", "credentials")?,
            }));
        }
        if let Some(log) = &spec.coralogix {
            return Ok(Self::Coralogix(CoralogixLogging {
                cluster: remote_field(&log.cluster, "coralogix logging", "cluster")?,
                credentials: remote_field(&log.credentials, "coralogix logging", "credentials")?,
                app: remote_field(&log.app, "coralogix logging", "app")?,
                subsystem: remote_field(&log.subsystem, "coralogix logging", "subsystem")?,
            }));
        }
        if let Some(log) = &spec.datadog {
            return Ok(Self::Datadog(DatadogLogging {
                host: remote_field(&log.host, "datadog logging", "host")?,
                credentials: remote_field(&log.credentials, "datadog logging", "credentials")?,
            }));
        }
        if let Some(log) = &spec.logzio {
            return Ok(Self::Logzio(LogzioLogging {
                listener_host: remote_field(&log.listener_host, "logzio logging", "listenerHost")?,
                credentials: remote_field(&log.credentials, "logzio logging", "credentials")?,
            }));
        }

        Ok(Self::Unset)
    }
}

fn remote_field(
    value: &Option<String>,
    object: &'static str,
    field: &'static str,
) -> Result<String, ProviderError> {
    value
        .clone()
        .ok_or(ProviderError::IncompleteRemoteData { object, field })
}

fn warn_if_ambiguous(source: &str, present: &[bool; 4]) {
    let set: Vec<&str> = LOGGING_BLOCKS
        .iter()
        .zip(present)
        .filter(|(_, set)| **set)
        .map(|(name, _)| *name)
        .collect();

    if set.len() > 1 {
        warn!(
            source,
            used = set[0],
            ignored = ?&set[1..],
            "More than one logging backend set, using the first"
        );
    }
}

/// Logging as declared in configuration: four optional blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesiredConfiguration {
    /// The `s3_logging` block.
    pub s3: Option<S3Logging>,
    /// The `coralogix_logging` block.
    pub coralogix: Option<CoralogixLogging>,
    /// The `datadog_logging` block.
    pub datadog: Option<DatadogLogging>,
    /// The `logzio_logging` block.
    pub logzio: Option<LogzioLogging>,
}

impl DesiredConfiguration {
    /// Read the logging blocks out of a flat attribute tree.
    ///
    /// Each block is a list holding at most one object. A missing key,
    /// `null` and `[]` all mean the block is not set. Other attributes in the
    /// tree are ignored.
    pub fn from_attributes(attributes: &Value) -> Result<Self, ProviderError> {
        let attributes = match attributes {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(ProviderError::Validation(format!(
                    "expected an object of attributes, got {}",
                    other
                )))
            }
        };

        Ok(Self {
            s3: parse_block(attributes, S3_LOGGING)?,
            coralogix: parse_block(attributes, CORALOGIX_LOGGING)?,
            datadog: parse_block(attributes, DATADOG_LOGGING)?,
            logzio: parse_block(attributes, LOGZIO_LOGGING)?,
        })
    }

    /// Write the logging blocks as attributes. Unset blocks become `[]`.
    pub fn to_attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert(S3_LOGGING.to_string(), block_value(&self.s3));
        attributes.insert(CORALOGIX_LOGGING.to_string(), block_value(&self.coralogix));
        attributes.insert(DATADOG_LOGGING.to_string(), block_value(&self.datadog));
        attributes.insert(LOGZIO_LOGGING.to_string(), block_value(&self.logzio));
        attributes
    }

    /// Names of the blocks that are set, in priority order.
    pub fn populated_blocks(&self) -> Vec<&'static str> {
        LOGGING_BLOCKS
            .iter()
            .zip(self.presence())
            .filter(|(_, set)| *set)
            .map(|(name, _)| *name)
            .collect()
    }

    fn presence(&self) -> [bool; 4] {
        [
            self.s3.is_some(),
            self.coralogix.is_some(),
            self.datadog.is_some(),
            self.logzio.is_some(),
        ]
    }
}

fn parse_block<T>(attributes: &Map<String, Value>, name: &str) -> Result<Option<T>, ProviderError>
where
    T: for<'de> Deserialize<'de>,
{
    let items = match attributes.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ProviderError::Validation(format!(
                "{}: expected a list with at most one block, got {}",
                name, other
            )))
        }
    };

    match items.as_slice() {
        [] => Ok(None),
        [item] => serde_json::from_value(item.clone())
            .map(Some)
            .map_err(|e| ProviderError::Validation(format!("{}: {}", name, e))),
        _ => Err(ProviderError::Validation(format!(
            "{}: at most 1 block allowed, got {}",
            name,
            items.len()
        ))),
    }
}

fn block_value<T: Serialize>(block: &Option<T>) -> Value {
    match block.as_ref().map(serde_json::to_value) {
        Some(Ok(value)) => Value::Array(vec![value]),
        _ => Value::Array(Vec::new()),
    }
}

/// Build the logging variant from declared blocks.
///
/// Blocks are checked in priority order (S3, Coralogix, Datadog, Logz.io)
/// and the first one set wins. Schema validation normally guarantees at most
/// one is set; if not, the rest are ignored with a warning.
pub fn build_variant(desired: &DesiredConfiguration) -> LoggingVariant {
    warn_if_ambiguous("configuration", &desired.presence());

    if let Some(log) = &desired.s3 {
        return LoggingVariant::S3(log.clone());
    }
    if let Some(log) = &desired.coralogix {
        return LoggingVariant::Coralogix(log.clone());
    }
    if let Some(log) = &desired.datadog {
        return LoggingVariant::Datadog(log.clone());
    }
    if let Some(log) = &desired.logzio {
        return LoggingVariant::Logzio(log.clone());
    }
    LoggingVariant::Unset
}

/// Flatten a logging variant back into blocks. At most one block is set.
pub fn flatten_variant(variant: &LoggingVariant) -> DesiredConfiguration {
    let mut desired = DesiredConfiguration::default();
    match variant {
        LoggingVariant::Unset => {}
        LoggingVariant::S3(log) => desired.s3 = Some(log.clone()),
        LoggingVariant::Coralogix(log) => desired.coralogix = Some(log.clone()),
        LoggingVariant::Datadog(log) => desired.datadog = Some(log.clone()),
        LoggingVariant::Logzio(log) => desired.logzio = Some(log.clone()),
    }
    desired
}
