//! Form schema wire model and JSON translation helpers.
//!
//! Responsibilities:
//! - Define the root [`Schema`] and its ordered [`Section`]s
//! - Parse schema JSON strictly, surfacing the path of any mismatch
//! - Render schema JSON in the pretty-printed form the editor writes back

use crate::{from_json_str, Question, SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};

/// Root of a form definition.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Schema {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Ordered sections; a section is addressed by its index.
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A titled group of questions.
///
/// Questions are addressed by position: index `i` is the identity of a question for the
/// duration of an edit, not its `id`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Section {
    pub label: String,

    #[serde(default, deserialize_with = "crate::lenient::flag")]
    pub is_expanded: bool,

    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Section {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            is_expanded: false,
            questions: Vec::new(),
        }
    }
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a form schema from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Translation`] naming the failing path if the JSON does not match
    /// the schema shape (including unknown keys), or [`SchemaError::InvalidJson`] for trailing
    /// input.
    pub fn parse(json_text: &str) -> SchemaResult<Schema> {
        from_json_str(json_text, "Form schema")
    }

    /// Render a form schema as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Translation`] if serialisation fails.
    pub fn render(&self) -> SchemaResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SchemaError::Translation(format!("Failed to serialize form schema: {e}")))
    }

    /// Look up a section by index.
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// Total number of top-level questions across all sections.
    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}
