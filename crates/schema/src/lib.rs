//! Form schema wire/boundary support.
//!
//! This crate provides the **data model** of a clinical form definition and the strict JSON
//! translation helpers used to read and write it:
//! - [`Schema`] → [`Section`] → [`Question`] → [`QuestionOptions`]
//! - [`Concept`], the external dictionary entry a question can be bound to
//!
//! Editing rules (which options a question may carry, how drafts are committed) live in
//! `formbuilder-core`. This crate handles shape and serialisation only.

pub mod concept;
mod lenient;
pub mod question;
pub mod schema;

pub use concept::{Concept, ConceptAnswer, ConceptMappingRef};
pub use question::{Answer, ConceptMapping, OrderType, Question, QuestionOptions};
pub use schema::{Schema, Section};

use serde::de::DeserializeOwned;

/// Question type of a group container; its record carries a nested `questions` list.
pub const GROUP_QUESTION_TYPE: &str = "obsGroup";

/// Errors returned by the `form-schema` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`SchemaError`].
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Deserialise JSON text, reporting the path of the first mismatching element.
///
/// `what` names the document kind in the error message (e.g. `"Form schema"`).
pub(crate) fn from_json_str<T: DeserializeOwned>(json_text: &str, what: &str) -> SchemaResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(json_text);

    let parsed = match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => parsed,
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            return Err(SchemaError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )));
        }
    };

    deserializer.end()?;
    Ok(parsed)
}
