//! Concept dictionary entries as returned by a concept search.
//!
//! Concepts are owned by an external dictionary and are immutable once fetched. The shape
//! follows the dictionary's REST representation: answers carry `{uuid, display}` and mappings
//! carry a single `display` string of the form `"<type>: <value>"`.

use crate::{from_json_str, SchemaResult};
use serde::{Deserialize, Serialize};

/// A coded dictionary entry a question can be bound to.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Concept {
    pub uuid: String,
    pub display: String,
    #[serde(default)]
    pub answers: Vec<ConceptAnswer>,
    #[serde(default)]
    pub mappings: Vec<ConceptMappingRef>,
}

/// A candidate answer concept.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ConceptAnswer {
    pub uuid: String,
    pub display: String,
}

/// A mapping reference; `display` reads `"<type>: <value>"`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ConceptMappingRef {
    pub display: String,
}

impl Concept {
    pub fn new(uuid: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            display: display.into(),
            answers: Vec::new(),
            mappings: Vec::new(),
        }
    }

    pub fn with_answer(mut self, uuid: impl Into<String>, display: impl Into<String>) -> Self {
        self.answers.push(ConceptAnswer {
            uuid: uuid.into(),
            display: display.into(),
        });
        self
    }

    pub fn with_mapping(mut self, display: impl Into<String>) -> Self {
        self.mappings.push(ConceptMappingRef {
            display: display.into(),
        });
        self
    }

    /// Parse a JSON array of concepts (a local concept catalogue).
    pub fn parse_catalogue(json_text: &str) -> SchemaResult<Vec<Concept>> {
        from_json_str(json_text, "Concept catalogue")
    }
}
