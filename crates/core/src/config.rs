//! Editor runtime configuration.
//!
//! The sets of valid question types and renderings are owned by the host application, not by
//! the editor. They are resolved once at startup and passed into drafts as
//! `Arc<EditorConfig>`, so a draft never reads files or environment variables while the user
//! is editing.

use crate::constants::{DEFAULT_QUESTION_TYPES, DEFAULT_RENDERING_TYPES};
use crate::{EditorError, EditorResult};
use formbuilder_types::PLACEHOLDER_VALUE;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Editor configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorConfig {
    question_types: Vec<String>,
    rendering_types: Vec<String>,
}

/// On-disk YAML shape. Either list may be omitted to keep the built-in default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct EditorConfigFile {
    #[serde(default)]
    question_types: Option<Vec<String>>,
    #[serde(default)]
    render_elements: Option<Vec<String>>,
}

impl EditorConfig {
    /// Create a new `EditorConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidConfig`] if either list is empty, contains a blank or
    /// duplicate entry, or contains the reserved select placeholder value.
    pub fn new(question_types: Vec<String>, rendering_types: Vec<String>) -> EditorResult<Self> {
        validate_options("questionTypes", &question_types)?;
        validate_options("renderElements", &rendering_types)?;

        Ok(Self {
            question_types,
            rendering_types,
        })
    }

    /// Parse configuration from YAML text.
    ///
    /// Uses `serde_path_to_error` so a mistyped entry is reported with its path
    /// (e.g. `questionTypes[2]`).
    pub fn from_yaml(yaml_text: &str) -> EditorResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

        let file = match serde_path_to_error::deserialize::<_, EditorConfigFile>(deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(EditorError::InvalidConfig(format!(
                    "configuration mismatch at {path}: {source}"
                )));
            }
        };

        let defaults = Self::default();
        Self::new(
            file.question_types.unwrap_or(defaults.question_types),
            file.render_elements.unwrap_or(defaults.rendering_types),
        )
    }

    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> EditorResult<Self> {
        let text = std::fs::read_to_string(path).map_err(EditorError::ConfigRead)?;
        let config = Self::from_yaml(&text)?;
        tracing::debug!(
            path = %path.display(),
            question_types = config.question_types.len(),
            rendering_types = config.rendering_types.len(),
            "loaded editor configuration"
        );
        Ok(config)
    }

    pub fn question_types(&self) -> &[String] {
        &self.question_types
    }

    pub fn rendering_types(&self) -> &[String] {
        &self.rendering_types
    }

    pub fn is_question_type(&self, value: &str) -> bool {
        self.question_types.iter().any(|t| t == value)
    }

    pub fn is_rendering_type(&self, value: &str) -> bool {
        self.rendering_types.iter().any(|r| r == value)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            question_types: DEFAULT_QUESTION_TYPES.iter().map(|s| s.to_string()).collect(),
            rendering_types: DEFAULT_RENDERING_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Resolve the editor configuration from an optional file path.
///
/// `None` (or a blank path) yields the built-in defaults.
pub fn resolve_editor_config(path: Option<PathBuf>) -> EditorResult<EditorConfig> {
    match path.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => EditorConfig::load(&path),
        None => Ok(EditorConfig::default()),
    }
}

fn validate_options(name: &str, values: &[String]) -> EditorResult<()> {
    if values.is_empty() {
        return Err(EditorError::InvalidConfig(format!("{name} cannot be empty")));
    }

    let mut seen = HashSet::new();
    for value in values {
        if value.trim().is_empty() {
            return Err(EditorError::InvalidConfig(format!(
                "{name} contains a blank entry"
            )));
        }
        if value == PLACEHOLDER_VALUE {
            return Err(EditorError::InvalidConfig(format!(
                "{name} cannot contain the reserved value {PLACEHOLDER_VALUE:?}"
            )));
        }
        if !seen.insert(value.as_str()) {
            return Err(EditorError::InvalidConfig(format!(
                "{name} contains duplicate entry {value:?}"
            )));
        }
    }

    Ok(())
}
