//! Configuration surface for the translator core.
//!
//! Unlike the interactive shell this crate is descended from, there is no
//! session to persist settings for, so configuration here is just two
//! plain value types passed explicitly by the caller: a [`FieldTypeMap`]
//! that drives literal coercion (§4.1) and [`RenderOptions`] that drives
//! shell-syntax rendering (§9). Neither is read from a file or an
//! environment variable — the embedding application owns that decision.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The declared type of a column, used by the Value Coercer (§4.1) to
/// decide how to parse a literal compared against that column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Number,
    Date,
    Boolean,
    Unknown,
}

impl Default for FieldType {
    fn default() -> Self {
        FieldType::Unknown
    }
}

/// A read-only mapping from dotted column name to [`FieldType`], consulted
/// by the Value Coercer. A missing key falls back to `default_type`
/// (itself defaulting to `FieldType::Unknown`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldTypeMap {
    types: HashMap<String, FieldType>,
    #[serde(default)]
    default_type: FieldType,
}

impl FieldTypeMap {
    /// An empty map: every column resolves to `FieldType::Unknown`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map with an explicit fallback for unlisted columns.
    pub fn with_default(default_type: FieldType) -> Self {
        Self {
            types: HashMap::new(),
            default_type,
        }
    }

    /// Declare the type of a dotted column name.
    pub fn set(&mut self, column: impl Into<String>, field_type: FieldType) -> &mut Self {
        self.types.insert(column.into(), field_type);
        self
    }

    /// Builder-style variant of [`FieldTypeMap::set`].
    pub fn with(mut self, column: impl Into<String>, field_type: FieldType) -> Self {
        self.set(column, field_type);
        self
    }

    /// Resolve a column's type, falling back to the configured default.
    pub fn get(&self, column: &str) -> FieldType {
        self.types.get(column).copied().unwrap_or(self.default_type)
    }
}

/// Rendering knobs for the shell-syntax formatter (§9: always an explicit
/// parameter, never process-wide state).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderOptions {
    /// Mirrors `aggregate`'s `allowDiskUse` option. Only emitted on the
    /// rendered `.aggregate(...)` call when `Some`.
    pub aggregation_allow_disk_use: Option<bool>,
    /// Mirrors the aggregation cursor's `batchSize`. Only emitted when
    /// `Some`.
    pub aggregation_batch_size: Option<u32>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_disk_use(mut self, value: bool) -> Self {
        self.aggregation_allow_disk_use = Some(value);
        self
    }

    pub fn batch_size(mut self, value: u32) -> Self {
        self.aggregation_batch_size = Some(value);
        self
    }
}
