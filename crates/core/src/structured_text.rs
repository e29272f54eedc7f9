//! Editable text representation of structured option values.
//!
//! Answer lists, concept mappings, selectable orders and week lists are edited as JSON text.
//! A [`StructuredTextField`] holds that text verbatim while the user types and only parses
//! it when the draft is committed, so half-typed input never reaches the document.
//!
//! Round-trip law: for any value `v` produced by [`serialize`], `parse(serialize(v)) == v`.

use crate::{EditorError, EditorResult, ParseError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Parse JSON text into `T`, naming `field` and the failing path on error.
pub fn parse<T: DeserializeOwned>(field: &str, text: &str) -> Result<T, ParseError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);

    let value = serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        ParseError {
            field: field.to_string(),
            path: if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            },
            cause: err.into_inner().to_string(),
        }
    })?;

    deserializer.end().map_err(|err| ParseError {
        field: field.to_string(),
        path: "<root>".to_string(),
        cause: err.to_string(),
    })?;

    Ok(value)
}

/// Render a value as pretty-printed JSON (two-space indentation).
pub fn serialize<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// A typed value edited as JSON text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredTextField<T> {
    field: &'static str,
    text: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> StructuredTextField<T> {
    /// A field with no text. Parsing it fails until text is supplied.
    pub fn empty(field: &'static str) -> Self {
        Self::with_text(field, String::new())
    }

    pub fn with_text(field: &'static str, text: impl Into<String>) -> Self {
        Self {
            field,
            text: text.into(),
            _value: PhantomData,
        }
    }

    /// Wire name of the option this field edits.
    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl<T: Serialize + DeserializeOwned> StructuredTextField<T> {
    /// A field pre-filled with the serialised form of `value`.
    pub fn from_value(field: &'static str, value: &T) -> EditorResult<Self> {
        let text = serialize(value).map_err(|source| EditorError::Serialization { field, source })?;
        Ok(Self::with_text(field, text))
    }

    /// Parse the current text.
    pub fn parse(&self) -> Result<T, ParseError> {
        parse(self.field, &self.text)
    }
}
