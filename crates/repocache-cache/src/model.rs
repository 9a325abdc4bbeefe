//! Model identifier extraction and prompt version digests.

use std::collections::BTreeMap;

use repocache_core::constants::MODEL_ID_FIELDS;
use repocache_fingerprint::digest::sha256_fields;

/// A language-model handle, as far as cache invalidation cares.
pub trait ModelDescriptor {
    /// Value of a named configuration field, if the model has one.
    fn field(&self, name: &str) -> Option<String>;

    /// Name of the model client type, used when no field identifies the model.
    fn type_name(&self) -> &str;
}

/// Identifier for `model`: the first non-blank field from
/// [`MODEL_ID_FIELDS`], else the client's type name.
pub fn model_id(model: &dyn ModelDescriptor) -> String {
    MODEL_ID_FIELDS
        .iter()
        .filter_map(|name| model.field(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| model.type_name().to_string())
}

/// Digest over every prompt template in use, in the order given.
pub fn prompt_version_digest<S: AsRef<str>>(templates: &[S]) -> String {
    sha256_fields(templates.iter().map(|t| t.as_ref()))
}

/// A plain field map describing a model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelInfo {
    type_name: String,
    fields: BTreeMap<String, String>,
}

impl ModelInfo {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl ModelDescriptor for ModelInfo {
    fn field(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }
}
