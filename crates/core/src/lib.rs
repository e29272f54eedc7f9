//! # Form Builder Core
//!
//! Question editing engine for clinical form schemas.
//!
//! A question is edited through a [`QuestionDraft`]: field state is held as typed, optional
//! properties are switched on and off through an [`OptionalPropertySet`], and structured
//! options are edited as JSON text via [`StructuredTextField`]. A successful submit writes a
//! validated [`form_schema::Question`] into the [`SchemaStore`], which publishes a new
//! immutable [`SchemaDocument`] version to its consumers.
//!
//! **No presentation concerns**: notifications go through the [`Notifier`] trait and concept
//! lookup through [`ConceptSearch`]; hosts supply both.

pub mod concept;
pub mod config;
pub mod constants;
pub mod document;
pub mod draft;
pub mod error;
pub mod notify;
pub mod properties;
pub mod structured_text;

#[cfg(test)]
mod test_support;

pub use concept::{
    ConceptBinding, ConceptBindingResolver, ConceptCatalogue, ConceptSearch, ConceptSearchError,
    ConceptSuggestions,
};
pub use config::{resolve_editor_config, EditorConfig};
pub use document::{QuestionRef, SchemaConsumer, SchemaDocument, SchemaStore};
pub use draft::{Creating, Editing, QuestionDraft, Rejected};
pub use error::{AlreadyActiveWarning, EditorError, EditorResult, MalformedMapping, ParseError};
pub use notify::{Notification, NotificationKind, Notifier, TracingNotifier};
pub use properties::{OptionalProperty, OptionalPropertySet};
pub use structured_text::StructuredTextField;
