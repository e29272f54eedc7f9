//! Concept binding and concept search.
//!
//! Binding a concept to a question derives its answer list and concept mappings from the
//! dictionary entry. The derivation is deterministic and order-preserving so the same concept
//! always yields the same option text.
//!
//! Search is an external collaborator. Results only ever feed a read-only suggestion list;
//! nothing is bound until the user picks one explicitly.

use crate::constants::MAPPING_SEPARATOR;
use crate::MalformedMapping;
use form_schema::{Answer, Concept, ConceptMapping};

// ============================================================================
// Binding
// ============================================================================

/// The option values derived from a concept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConceptBinding {
    /// UUID of the bound concept; empty when unbound.
    pub concept_uuid: String,
    pub answers: Vec<Answer>,
    pub concept_mappings: Vec<ConceptMapping>,
    /// Mapping entries that were left out because they could not be split.
    pub malformed: Vec<MalformedMapping>,
}

impl ConceptBinding {
    /// Whether this is the unbound state.
    pub fn is_empty(&self) -> bool {
        self.concept_uuid.is_empty() && self.answers.is_empty() && self.concept_mappings.is_empty()
    }
}

/// Concept binding operations.
///
/// This is a zero-sized type used for namespacing binding operations.
pub struct ConceptBindingResolver;

impl ConceptBindingResolver {
    /// Derive answers and mappings from `concept`.
    ///
    /// Mapping displays are split on the first `": "`. Entries without the separator are
    /// excluded and reported in [`ConceptBinding::malformed`]; the rest of the binding still
    /// applies.
    pub fn bind(concept: &Concept) -> ConceptBinding {
        let answers = concept
            .answers
            .iter()
            .map(|answer| Answer {
                label: answer.display.clone(),
                concept: answer.uuid.clone(),
            })
            .collect();

        let mut concept_mappings = Vec::with_capacity(concept.mappings.len());
        let mut malformed = Vec::new();
        for mapping in &concept.mappings {
            match Self::split_mapping(&mapping.display) {
                Ok(parsed) => concept_mappings.push(parsed),
                Err(err) => {
                    tracing::warn!(concept = %concept.uuid, "skipping concept mapping: {err}");
                    malformed.push(err);
                }
            }
        }

        ConceptBinding {
            concept_uuid: concept.uuid.clone(),
            answers,
            concept_mappings,
            malformed,
        }
    }

    /// The unbound state: no concept, answers or mappings.
    pub fn unbind() -> ConceptBinding {
        ConceptBinding::default()
    }

    /// Split a `"<type>: <value>"` display string.
    pub fn split_mapping(display: &str) -> Result<ConceptMapping, MalformedMapping> {
        display
            .split_once(MAPPING_SEPARATOR)
            .map(|(mapping_type, value)| ConceptMapping {
                mapping_type: mapping_type.to_string(),
                value: value.to_string(),
            })
            .ok_or_else(|| MalformedMapping {
                display: display.to_string(),
            })
    }
}

// ============================================================================
// Search
// ============================================================================

/// Errors a concept search backend may report. Drafts swallow these into empty results.
#[derive(Debug, thiserror::Error)]
pub enum ConceptSearchError {
    #[error("concept search unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a search term to matching concepts.
pub trait ConceptSearch {
    fn search(&self, term: &str) -> Result<Vec<Concept>, ConceptSearchError>;
}

/// An in-memory concept list searched by case-insensitive display substring.
#[derive(Clone, Debug, Default)]
pub struct ConceptCatalogue {
    concepts: Vec<Concept>,
}

impl ConceptCatalogue {
    pub fn new(concepts: Vec<Concept>) -> Self {
        Self { concepts }
    }

    /// Parse a JSON array of concepts.
    pub fn from_json(json_text: &str) -> crate::EditorResult<Self> {
        Ok(Self::new(Concept::parse_catalogue(json_text)?))
    }

    /// Look up a concept by UUID.
    pub fn get(&self, uuid: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.uuid == uuid)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

impl ConceptSearch for ConceptCatalogue {
    fn search(&self, term: &str) -> Result<Vec<Concept>, ConceptSearchError> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .concepts
            .iter()
            .filter(|c| c.display.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

/// The read-only suggestion list behind a concept search box.
///
/// The backend is only queried when the term differs from the last one queried.
#[derive(Clone, Debug, Default)]
pub struct ConceptSuggestions {
    term: String,
    queried: Option<String>,
    items: Vec<Concept>,
}

impl ConceptSuggestions {
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn set_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
    }

    pub fn items(&self) -> &[Concept] {
        &self.items
    }

    /// Bring the suggestion list up to date with the current term.
    ///
    /// Returns `true` if the backend was queried.
    pub fn refresh(&mut self, search: &dyn ConceptSearch) -> bool {
        if self.queried.as_deref() == Some(self.term.as_str()) {
            return false;
        }
        self.queried = Some(self.term.clone());

        if self.term.trim().is_empty() {
            self.items.clear();
            return false;
        }

        self.items = match search.search(&self.term) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(term = %self.term, "concept search failed: {err}");
                Vec::new()
            }
        };
        true
    }
}
