//! Question drafts.
//!
//! A [`QuestionDraft`] is the working copy of one question while an edit or create session is
//! open. Every field is held as the user typed it; nothing is validated until [`build`] or
//! `submit`, and nothing reaches the document until a submit succeeds.
//!
//! The session mode is a type parameter:
//! - [`QuestionDraft<Editing>`] holds the [`QuestionRef`] it was opened at and replaces that
//!   question on submit. A successful submit consumes the draft.
//! - [`QuestionDraft<Creating>`] holds a target section and appends to it. A successful submit
//!   resets the draft to a blank template for the same section.
//!
//! Every submit emits exactly one notification: `success` when the document was republished,
//! `error` otherwise.
//!
//! [`build`]: QuestionDraft::build

use crate::concept::{ConceptBinding, ConceptBindingResolver, ConceptSearch, ConceptSuggestions};
use crate::config::EditorConfig;
use crate::constants::{
    DATE_RENDERING, NUMBER_RENDERING, OBS_QUESTION_TYPE, PROPERTY_IN_USE_MESSAGE,
    QUESTION_CREATED_MESSAGE, QUESTION_UPDATED_MESSAGE, TEXTAREA_RENDERING,
};
use crate::document::{QuestionRef, SchemaDocument, SchemaStore};
use crate::notify::{Notification, Notifier};
use crate::properties::{OptionalProperty, OptionalPropertySet};
use crate::structured_text::StructuredTextField;
use crate::{EditorError, EditorResult};
use form_schema::{Concept, Question, QuestionOptions, GROUP_QUESTION_TYPE};
use formbuilder_types::{NonEmptyText, Selection, PLACEHOLDER_VALUE};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Session modes
// ============================================================================

/// Marker for a draft editing an existing question.
#[derive(Clone, Copy, Debug)]
pub struct Editing {
    target: QuestionRef,
}

/// Marker for a draft creating a new question.
#[derive(Clone, Copy, Debug)]
pub struct Creating {
    section: usize,
}

/// A rejected edit-mode submit. The draft is handed back unchanged.
#[derive(Debug)]
pub struct Rejected<M> {
    pub draft: QuestionDraft<M>,
    pub error: EditorError,
}

impl<M> fmt::Display for Rejected<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<M: fmt::Debug> std::error::Error for Rejected<M> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ============================================================================
// Draft
// ============================================================================

/// The editable working copy of a question.
#[derive(Debug)]
pub struct QuestionDraft<M> {
    mode: M,
    config: Arc<EditorConfig>,
    label: String,
    question_type: Selection<String>,
    id: String,
    rendering: Selection<String>,
    properties: OptionalPropertySet,
    min: String,
    max: String,
    rows: String,
    week_list: StructuredTextField<Vec<Value>>,
    suggestions: ConceptSuggestions,
}

impl<M> QuestionDraft<M> {
    fn blank(mode: M, config: Arc<EditorConfig>) -> Self {
        Self {
            mode,
            config,
            label: String::new(),
            question_type: Selection::Unset,
            id: String::new(),
            rendering: Selection::Unset,
            properties: OptionalPropertySet::new(),
            min: String::new(),
            max: String::new(),
            rows: String::new(),
            week_list: StructuredTextField::empty("weekList"),
            suggestions: ConceptSuggestions::default(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn question_type(&self) -> &Selection<String> {
        &self.question_type
    }

    /// Select the question type from its select value.
    ///
    /// Choosing `obs` switches `concept` on if it is off. The coupling is one-way: choosing a
    /// different type later leaves `concept` as it is.
    pub fn select_type(&mut self, value: &str) -> EditorResult<()> {
        let config = &self.config;
        let selection = Selection::from_select_value(value, |v| {
            if config.is_question_type(v) {
                Ok(v.to_string())
            } else {
                Err(EditorError::InvalidSelection {
                    field: "type",
                    value: v.to_string(),
                })
            }
        })?;

        if selection.chosen().map(String::as_str) == Some(OBS_QUESTION_TYPE) {
            self.properties.ensure_active(OptionalProperty::Concept);
        }
        tracing::debug!(question_type = %selection, "selected question type");
        self.question_type = selection;
        Ok(())
    }

    pub fn rendering(&self) -> &Selection<String> {
        &self.rendering
    }

    /// Select the rendering from its select value.
    ///
    /// Rendering-specific text (`min`, `max`, `rows`, `weekList`) is kept across switches and
    /// only read on commit when it matches the rendering in force.
    pub fn select_rendering(&mut self, value: &str) -> EditorResult<()> {
        let config = &self.config;
        let selection = Selection::from_select_value(value, |v| {
            if config.is_rendering_type(v) {
                Ok(v.to_string())
            } else {
                Err(EditorError::InvalidSelection {
                    field: "rendering",
                    value: v.to_string(),
                })
            }
        })?;

        tracing::debug!(rendering = %selection, "selected rendering");
        self.rendering = selection;
        Ok(())
    }

    pub fn min(&self) -> &str {
        &self.min
    }

    pub fn set_min(&mut self, min: impl Into<String>) {
        self.min = min.into();
    }

    pub fn max(&self) -> &str {
        &self.max
    }

    pub fn set_max(&mut self, max: impl Into<String>) {
        self.max = max.into();
    }

    pub fn rows(&self) -> &str {
        &self.rows
    }

    pub fn set_rows(&mut self, rows: impl Into<String>) {
        self.rows = rows.into();
    }

    pub fn week_list(&self) -> &str {
        self.week_list.text()
    }

    pub fn set_week_list(&mut self, text: impl Into<String>) {
        self.week_list.set_text(text);
    }

    pub fn properties(&self) -> &OptionalPropertySet {
        &self.properties
    }

    /// Switch an optional property on.
    ///
    /// Returns `false` and sends a warning through `notifier` if it was already on; its value
    /// is left untouched.
    pub fn activate(&mut self, property: OptionalProperty, notifier: &dyn Notifier) -> bool {
        match self.properties.activate(property) {
            Ok(()) => {
                tracing::debug!(%property, "activated optional property");
                true
            }
            Err(warning) => {
                tracing::debug!("{warning}");
                notifier.notify(Notification::warning(PROPERTY_IN_USE_MESSAGE));
                false
            }
        }
    }

    /// Switch an optional property off, discarding its value.
    pub fn deactivate(&mut self, property: OptionalProperty) -> bool {
        let was_active = self.properties.deactivate(property);
        if was_active {
            tracing::debug!(%property, "deactivated optional property");
        }
        was_active
    }

    pub fn set_property_text(&mut self, property: OptionalProperty, text: &str) -> EditorResult<()> {
        self.properties.set_text(property, text)
    }

    /// Set the order type from its select value. `orderType` must be active.
    pub fn select_order_type(&mut self, value: &str) -> EditorResult<()> {
        self.properties.set_text(OptionalProperty::OrderType, value)
    }

    pub fn search_term(&self) -> &str {
        self.suggestions.term()
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.suggestions.set_term(term);
    }

    /// Refresh the suggestion list if the search term changed since the last query.
    pub fn refresh_suggestions(&mut self, search: &dyn ConceptSearch) -> bool {
        self.suggestions.refresh(search)
    }

    pub fn suggestions(&self) -> &[Concept] {
        self.suggestions.items()
    }

    /// Bind `concept`: sets the concept UUID, answers and concept mappings together.
    ///
    /// The returned binding lists any mappings that were dropped as malformed.
    pub fn select_concept(&mut self, concept: &Concept) -> EditorResult<ConceptBinding> {
        let binding = ConceptBindingResolver::bind(concept);
        self.properties.apply_binding(&binding)?;
        tracing::debug!(concept = %binding.concept_uuid, "bound concept");
        Ok(binding)
    }

    /// Remove the bound concept together with its answers and mappings.
    pub fn remove_concept(&mut self) {
        self.properties.clear_binding();
        tracing::debug!("removed concept binding");
    }

    /// Validate the draft and build the question it describes. No side effects.
    ///
    /// # Errors
    ///
    /// - [`EditorError::MissingRequiredField`] for a blank label or id, an unset type or
    ///   rendering, or an active property without a value
    /// - [`EditorError::InvalidSelection`] for a type or rendering outside the configuration
    /// - [`EditorError::Parse`] for unparsable structured text
    pub fn build(&self) -> EditorResult<Question> {
        let label = required_text("label", &self.label)?;
        let question_type = self.configured(
            "type",
            &self.question_type,
            self.config.is_question_type(self.question_type.chosen().map_or("", String::as_str)),
        )?;
        let id = required_text("id", &self.id)?;
        let rendering = self.configured(
            "rendering",
            &self.rendering,
            self.config.is_rendering_type(self.rendering.chosen().map_or("", String::as_str)),
        )?;

        let mut options = QuestionOptions::new(rendering.as_str());
        self.properties.attach_to(&mut options)?;

        let questions = (question_type == GROUP_QUESTION_TYPE).then(Vec::new);

        match rendering.as_str() {
            NUMBER_RENDERING => {
                options.min = Some(entered_text("min", &self.min)?);
                options.max = Some(entered_text("max", &self.max)?);
            }
            DATE_RENDERING => options.week_list = Some(self.week_list.parse()?),
            TEXTAREA_RENDERING => options.rows = Some(entered_text("rows", &self.rows)?),
            _ => {}
        }

        Ok(Question {
            label,
            question_type,
            id,
            question_options: options,
            questions,
        })
    }

    /// Close the draft without touching the document.
    pub fn discard(self) {
        tracing::debug!("discarded question draft");
    }

    fn configured(
        &self,
        field: &'static str,
        selection: &Selection<String>,
        is_configured: bool,
    ) -> EditorResult<String> {
        let value = selection
            .chosen()
            .ok_or(EditorError::MissingRequiredField { field })?;
        if !is_configured {
            return Err(EditorError::InvalidSelection {
                field,
                value: value.clone(),
            });
        }
        Ok(value.clone())
    }
}

// ============================================================================
// Edit mode
// ============================================================================

impl QuestionDraft<Editing> {
    /// Open the question at `(section, index)` of `document` for editing.
    pub fn open(
        config: Arc<EditorConfig>,
        document: &SchemaDocument,
        section: usize,
        index: usize,
    ) -> EditorResult<Self> {
        let target = document.question_ref(section, index)?;
        Self::from_question(config, target, document.resolve(&target)?)
    }

    /// Load `question` into a draft that will write back to `target`.
    ///
    /// Optional properties are active exactly when present on `question`. Rendering-specific
    /// fields are loaded for the question's current rendering only.
    pub fn from_question(
        config: Arc<EditorConfig>,
        target: QuestionRef,
        question: &Question,
    ) -> EditorResult<Self> {
        let options = &question.question_options;
        let mut draft = Self::blank(Editing { target }, config);

        draft.label = question.label.clone();
        draft.id = question.id.clone();
        draft.question_type = stored_selection(&question.question_type);
        draft.rendering = stored_selection(&options.rendering);
        draft.properties = OptionalPropertySet::from_options(options)?;

        match options.rendering.as_str() {
            NUMBER_RENDERING => {
                draft.min = options.min.clone().unwrap_or_default();
                draft.max = options.max.clone().unwrap_or_default();
            }
            DATE_RENDERING => {
                if let Some(week_list) = &options.week_list {
                    draft.week_list = StructuredTextField::from_value("weekList", week_list)?;
                }
            }
            TEXTAREA_RENDERING => draft.rows = options.rows.clone().unwrap_or_default(),
            _ => {}
        }

        tracing::debug!(question = %target, "opened question for editing");
        Ok(draft)
    }

    pub fn target(&self) -> QuestionRef {
        self.mode.target
    }

    /// Point the draft at `index` of its section in `document`, keeping every edit.
    ///
    /// Used to recover a draft rejected with [`EditorError::StaleQuestionRef`] once the
    /// question's new position is known.
    pub fn retarget(&mut self, document: &SchemaDocument, index: usize) -> EditorResult<()> {
        let target = document.question_ref(self.mode.target.section(), index)?;
        tracing::debug!(from = %self.mode.target, to = %target, "retargeted draft");
        self.mode.target = target;
        Ok(())
    }

    /// Replace the target question and publish.
    ///
    /// On failure the document is untouched and the draft comes back inside [`Rejected`].
    pub fn submit(
        self,
        store: &mut SchemaStore,
        notifier: &dyn Notifier,
    ) -> Result<Arc<SchemaDocument>, Rejected<Editing>> {
        let target = self.mode.target;
        let outcome = self
            .build()
            .and_then(|question| store.replace_question(&target, question));

        match report(outcome, notifier, QUESTION_UPDATED_MESSAGE) {
            Ok(document) => Ok(document),
            Err(error) => Err(Rejected { draft: self, error }),
        }
    }
}

// ============================================================================
// Create mode
// ============================================================================

impl QuestionDraft<Creating> {
    /// A blank draft that appends to `section` of `document`.
    pub fn new(
        config: Arc<EditorConfig>,
        document: &SchemaDocument,
        section: usize,
    ) -> EditorResult<Self> {
        document.section(section)?;
        Ok(Self::blank(Creating { section }, config))
    }

    pub fn section(&self) -> usize {
        self.mode.section
    }

    /// Append the question to the target section and publish.
    ///
    /// Returns the published document and the new question's index. On success the draft is
    /// reset for another question; on failure it is left as it was.
    pub fn submit(
        &mut self,
        store: &mut SchemaStore,
        notifier: &dyn Notifier,
    ) -> EditorResult<(Arc<SchemaDocument>, usize)> {
        let section = self.mode.section;
        let outcome = self
            .build()
            .and_then(|question| store.append_question(section, question));

        let (document, index) = report(outcome, notifier, QUESTION_CREATED_MESSAGE)?;
        *self = Self::blank(Creating { section }, Arc::clone(&self.config));
        Ok((document, index))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Send the single notification a submit owes and pass the outcome through.
fn report<T>(
    outcome: EditorResult<T>,
    notifier: &dyn Notifier,
    success_message: &str,
) -> EditorResult<T> {
    match &outcome {
        Ok(_) => notifier.notify(Notification::success(success_message)),
        Err(err) => {
            tracing::debug!("question submit rejected: {err}");
            notifier.notify(Notification::error(err.to_string()));
        }
    }
    outcome
}

fn required_text(field: &'static str, text: &str) -> EditorResult<String> {
    NonEmptyText::new(text)
        .map(NonEmptyText::into_inner)
        .map_err(|_| EditorError::MissingRequiredField { field })
}

/// Like [`required_text`] but keeps `text` exactly as typed.
fn entered_text(field: &'static str, text: &str) -> EditorResult<String> {
    NonEmptyText::new(text)
        .map(|_| text.to_string())
        .map_err(|_| EditorError::MissingRequiredField { field })
}

fn stored_selection(value: &str) -> Selection<String> {
    let value = value.trim();
    if value.is_empty() || value == PLACEHOLDER_VALUE {
        Selection::Unset
    } else {
        Selection::Chosen(value.to_string())
    }
}
