//! Projection of reconciled state onto the flat attribute tree.
//!
//! The attribute tree is the shape stored by the configuration front-end:
//!
//! | key                 | value                                 |
//! |---------------------|---------------------------------------|
//! | `id`                | organization name, the tracked id     |
//! | `cpln_id`           | server-assigned id                    |
//! | `name`              | organization name                     |
//! | `description`       | organization description              |
//! | `tags`              | map of string to string               |
//! | `*_logging`         | list of zero or one block             |
//!
//! A tree whose `id` is null is no longer tracked; the front-end drops it
//! from state.

use serde_json::{json, Map, Value};

use crate::reconciler::ReconciledOrg;
use crate::variant::{flatten_variant, DesiredConfiguration};

/// Front-end identity key.
pub const ID: &str = "id";
/// Server-assigned id key.
pub const CPLN_ID: &str = "cpln_id";
/// Name key.
pub const NAME: &str = "name";
/// Description key.
pub const DESCRIPTION: &str = "description";
/// Tags key.
pub const TAGS: &str = "tags";

/// Keys the provider computes from remote state.
pub const COMPUTED_ATTRIBUTES: [&str; 5] = [ID, CPLN_ID, NAME, DESCRIPTION, TAGS];

/// Project a reconciled organization, or its absence, into attributes.
///
/// A present organization gets its identity, metadata and exactly the
/// logging block the remote reports. An absent one gets a cleared tree with
/// a null identity and no blocks.
pub fn project(org: Option<&ReconciledOrg>) -> Value {
    let Some(org) = org else {
        return cleared();
    };

    let mut attributes = Map::new();
    attributes.insert(ID.to_string(), json!(org.name));
    attributes.insert(CPLN_ID.to_string(), json!(org.id));
    attributes.insert(NAME.to_string(), json!(org.name));
    attributes.insert(DESCRIPTION.to_string(), json!(org.description));
    attributes.insert(TAGS.to_string(), json!(org.tags));
    attributes.extend(flatten_variant(&org.logging).to_attributes());
    Value::Object(attributes)
}

/// Whether a projected tree still carries an identity.
pub fn is_tracked(state: &Value) -> bool {
    matches!(state.get(ID), Some(Value::String(id)) if !id.is_empty())
}

/// Drop identity from a tree, leaving every other attribute as it was.
///
/// Used after delete: logging is cleared remotely, and the front-end only
/// needs to learn that the resource is gone.
pub fn clear_identity(state: Value) -> Value {
    match state {
        Value::Object(mut attributes) => {
            attributes.insert(ID.to_string(), Value::Null);
            attributes.insert(CPLN_ID.to_string(), Value::Null);
            Value::Object(attributes)
        }
        _ => cleared(),
    }
}

fn cleared() -> Value {
    let mut attributes = Map::new();
    attributes.insert(ID.to_string(), Value::Null);
    attributes.insert(CPLN_ID.to_string(), Value::Null);
    attributes.insert(NAME.to_string(), Value::Null);
    attributes.insert(DESCRIPTION.to_string(), Value::Null);
    attributes.insert(TAGS.to_string(), json!({}));
    attributes.extend(DesiredConfiguration::default().to_attributes());
    Value::Object(attributes)
}
