use crate::properties::OptionalProperty;

/// A structured-text field could not be parsed.
///
/// `path` locates the failing element inside the field's JSON (`<root>` when the text as a
/// whole is unusable, e.g. empty).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} is invalid at {path}: {cause}")]
pub struct ParseError {
    pub field: String,
    pub path: String,
    pub cause: String,
}

/// Non-fatal: an optional property was activated while already active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Property Already in use: {property}")]
pub struct AlreadyActiveWarning {
    pub property: OptionalProperty,
}

/// A concept mapping display string lacks the `": "` separator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("concept mapping {display:?} is not of the form \"<type>: <value>\"")]
pub struct MalformedMapping {
    pub display: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{field} is required")]
    MissingRequiredField { field: &'static str },

    #[error("{value:?} is not a configured {field}")]
    InvalidSelection { field: &'static str, value: String },

    #[error("unknown optional property: {0}")]
    UnknownProperty(String),

    #[error("property {0} is not active")]
    PropertyInactive(OptionalProperty),

    #[error("section {section} does not exist")]
    SectionNotFound { section: usize },

    #[error("section {section} has no question at index {index}")]
    QuestionNotFound { section: usize, index: usize },

    #[error(
        "question {index} of section {section} was opened before the section changed; reopen it"
    )]
    StaleQuestionRef { section: usize, index: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),

    #[error("schema error: {0}")]
    Schema(#[from] form_schema::SchemaError),

    #[error("failed to serialize {field}: {source}")]
    Serialization {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;
