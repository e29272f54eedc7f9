//! Question wire model.
//!
//! A [`Question`] is one entry in a section's ordered question list. Its
//! [`QuestionOptions`] are a closed set: unknown option names are rejected at parse time
//! instead of being carried along as an untyped property bag.
//!
//! Notes:
//! - `min`, `max` and `rows` are stored as text; no numeric contract is enforced
//! - `weekList` and `selectableOrders` are free-form JSON lists

use crate::{SchemaError, GROUP_QUESTION_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Question
// ============================================================================

/// A single question of a form section.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Question {
    /// Text shown to the person filling in the form.
    pub label: String,

    /// Question type, one of the configured question types (e.g. `obs`, `obsGroup`).
    #[serde(rename = "type")]
    pub question_type: String,

    /// Author-supplied identifier, expected to be unique within the document.
    pub id: String,

    /// Rendering and binding options.
    pub question_options: QuestionOptions,

    /// Nested questions; present only on group containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
}

impl Question {
    /// Create a question with only its required fields set.
    pub fn new(
        label: impl Into<String>,
        question_type: impl Into<String>,
        id: impl Into<String>,
        rendering: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            question_type: question_type.into(),
            id: id.into(),
            question_options: QuestionOptions::new(rendering),
            questions: None,
        }
    }

    /// Whether this question is a group container.
    pub fn is_group(&self) -> bool {
        self.question_type == GROUP_QUESTION_TYPE
    }
}

// ============================================================================
// Question options
// ============================================================================

/// The `questionOptions` object of a question.
///
/// Every field except `rendering` is optional; presence (not truthiness) is what decides
/// whether an editor treats the property as in use. A property written as `null` counts as
/// present with an empty value, except `orderType`, which has no empty value and reads
/// `null` as absent.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct QuestionOptions {
    /// Input widget kind, one of the configured rendering types.
    pub rendering: String,

    /// UUID of the bound concept.
    #[serde(
        default,
        deserialize_with = "crate::lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub concept: Option<String>,

    /// Selectable answers, usually derived from the bound concept.
    #[serde(
        default,
        deserialize_with = "crate::lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub answers: Option<Vec<Answer>>,

    /// External-system codes for the bound concept.
    #[serde(
        default,
        deserialize_with = "crate::lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub concept_mappings: Option<Vec<ConceptMapping>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,

    #[serde(
        default,
        deserialize_with = "crate::lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub order_setting_uuid: Option<String>,

    #[serde(
        default,
        deserialize_with = "crate::lenient::present",
        skip_serializing_if = "Option::is_none"
    )]
    pub selectable_orders: Option<Vec<Value>>,

    /// Lower bound, `number` rendering only.
    #[serde(
        default,
        deserialize_with = "crate::lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<String>,

    /// Upper bound, `number` rendering only.
    #[serde(
        default,
        deserialize_with = "crate::lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<String>,

    /// Visible line count, `textarea` rendering only.
    #[serde(
        default,
        deserialize_with = "crate::lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub rows: Option<String>,

    /// Week list, `date` rendering only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week_list: Option<Vec<Value>>,
}

impl QuestionOptions {
    /// Options carrying only a rendering.
    pub fn new(rendering: impl Into<String>) -> Self {
        Self {
            rendering: rendering.into(),
            ..Self::default()
        }
    }
}

/// One selectable answer: a label and the concept it codes to.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Answer {
    pub label: String,
    pub concept: String,
}

/// A concept's code in an external terminology (e.g. `ICD10` / `A00`).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConceptMapping {
    #[serde(rename = "type")]
    pub mapping_type: String,
    pub value: String,
}

// ============================================================================
// Order type
// ============================================================================

/// Kind of order a question places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    DrugOrder,
    TestOrder,
}

impl OrderType {
    pub const ALL: [OrderType; 2] = [OrderType::DrugOrder, OrderType::TestOrder];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DrugOrder => "drugorder",
            Self::TestOrder => "testorder",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drugorder" => Ok(Self::DrugOrder),
            "testorder" => Ok(Self::TestOrder),
            other => Err(SchemaError::InvalidInput(format!(
                "order type must be drugorder or testorder, got '{other}'"
            ))),
        }
    }
}
