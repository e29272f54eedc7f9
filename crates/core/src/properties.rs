//! Optional question properties and their activation state.
//!
//! Each optional property is a slot holding `Option<backing value>`: `None` is inactive,
//! `Some` is active. The flag is therefore always the presence of the value and cannot drift
//! out of sync with it.
//!
//! Activation rules:
//! - [`OptionalPropertySet::activate`] moves a slot from inactive to active with an empty
//!   value; activating an active slot is refused with an [`AlreadyActiveWarning`]
//! - [`OptionalPropertySet::deactivate`] discards the value immediately
//! - concept binding writes `concept`, `answers` and `conceptMappings` directly without going
//!   through `activate`

use crate::concept::ConceptBinding;
use crate::structured_text::StructuredTextField;
use crate::{AlreadyActiveWarning, EditorError, EditorResult};
use form_schema::{Answer, ConceptMapping, OrderType, QuestionOptions};
use formbuilder_types::Selection;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Names of the optional question properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionalProperty {
    Concept,
    Answers,
    ConceptMappings,
    OrderType,
    OrderSettingUuid,
    SelectableOrders,
}

impl OptionalProperty {
    /// All properties, in the order they are attached on commit.
    pub const ALL: [OptionalProperty; 6] = [
        Self::Concept,
        Self::Answers,
        Self::ConceptMappings,
        Self::OrderType,
        Self::OrderSettingUuid,
        Self::SelectableOrders,
    ];

    /// Wire name inside `questionOptions`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Answers => "answers",
            Self::ConceptMappings => "conceptMappings",
            Self::OrderType => "orderType",
            Self::OrderSettingUuid => "orderSettingUuid",
            Self::SelectableOrders => "selectableOrders",
        }
    }

    /// Human-readable name for menus.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Concept => "Concept",
            Self::Answers => "Answers",
            Self::ConceptMappings => "Concept Mapping",
            Self::OrderType => "Order Type",
            Self::OrderSettingUuid => "Order Setting Uuid",
            Self::SelectableOrders => "Selectable Orders",
        }
    }

    /// Whether the property is edited as JSON text.
    pub const fn is_structured(self) -> bool {
        matches!(
            self,
            Self::Answers | Self::ConceptMappings | Self::SelectableOrders
        )
    }
}

impl fmt::Display for OptionalProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionalProperty {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| EditorError::UnknownProperty(s.to_string()))
    }
}

/// The optional properties of the question being edited.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionalPropertySet {
    concept: Option<String>,
    answers: Option<StructuredTextField<Vec<Answer>>>,
    concept_mappings: Option<StructuredTextField<Vec<ConceptMapping>>>,
    order_type: Option<Selection<OrderType>>,
    order_setting_uuid: Option<String>,
    selectable_orders: Option<StructuredTextField<Vec<Value>>>,
}

impl OptionalPropertySet {
    /// A set with every property inactive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the set from stored options.
    ///
    /// A property is active exactly when its field is present, even if the stored value is
    /// empty.
    pub fn from_options(options: &QuestionOptions) -> EditorResult<Self> {
        Ok(Self {
            concept: options.concept.clone(),
            answers: options
                .answers
                .as_ref()
                .map(|v| StructuredTextField::from_value("answers", v))
                .transpose()?,
            concept_mappings: options
                .concept_mappings
                .as_ref()
                .map(|v| StructuredTextField::from_value("conceptMappings", v))
                .transpose()?,
            order_type: options.order_type.map(Selection::Chosen),
            order_setting_uuid: options.order_setting_uuid.clone(),
            selectable_orders: options
                .selectable_orders
                .as_ref()
                .map(|v| StructuredTextField::from_value("selectableOrders", v))
                .transpose()?,
        })
    }

    pub fn is_active(&self, property: OptionalProperty) -> bool {
        match property {
            OptionalProperty::Concept => self.concept.is_some(),
            OptionalProperty::Answers => self.answers.is_some(),
            OptionalProperty::ConceptMappings => self.concept_mappings.is_some(),
            OptionalProperty::OrderType => self.order_type.is_some(),
            OptionalProperty::OrderSettingUuid => self.order_setting_uuid.is_some(),
            OptionalProperty::SelectableOrders => self.selectable_orders.is_some(),
        }
    }

    /// Active properties in canonical order.
    pub fn active(&self) -> Vec<OptionalProperty> {
        OptionalProperty::ALL
            .into_iter()
            .filter(|p| self.is_active(*p))
            .collect()
    }

    /// Activate `property` with an empty value.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyActiveWarning`] without touching the current value if the property is
    /// already active.
    pub fn activate(&mut self, property: OptionalProperty) -> Result<(), AlreadyActiveWarning> {
        if self.is_active(property) {
            return Err(AlreadyActiveWarning { property });
        }
        self.set_active_empty(property);
        Ok(())
    }

    /// Activate `property` if it is inactive; otherwise leave it alone.
    ///
    /// Used by couplings that are allowed to switch a property on silently.
    pub fn ensure_active(&mut self, property: OptionalProperty) {
        if !self.is_active(property) {
            self.set_active_empty(property);
        }
    }

    /// Deactivate `property`, discarding its value. Returns whether it was active.
    pub fn deactivate(&mut self, property: OptionalProperty) -> bool {
        let was_active = self.is_active(property);
        match property {
            OptionalProperty::Concept => self.concept = None,
            OptionalProperty::Answers => self.answers = None,
            OptionalProperty::ConceptMappings => self.concept_mappings = None,
            OptionalProperty::OrderType => self.order_type = None,
            OptionalProperty::OrderSettingUuid => self.order_setting_uuid = None,
            OptionalProperty::SelectableOrders => self.selectable_orders = None,
        }
        was_active
    }

    /// Current editable text of an active property.
    ///
    /// `orderType` reports its select value (the placeholder value while unset).
    pub fn text(&self, property: OptionalProperty) -> Option<String> {
        match property {
            OptionalProperty::Concept => self.concept.clone(),
            OptionalProperty::Answers => self.answers.as_ref().map(|f| f.text().to_string()),
            OptionalProperty::ConceptMappings => {
                self.concept_mappings.as_ref().map(|f| f.text().to_string())
            }
            OptionalProperty::OrderType => self.order_type.as_ref().map(|s| s.to_string()),
            OptionalProperty::OrderSettingUuid => self.order_setting_uuid.clone(),
            OptionalProperty::SelectableOrders => {
                self.selectable_orders.as_ref().map(|f| f.text().to_string())
            }
        }
    }

    /// Replace the text of an active property.
    ///
    /// For `orderType`, `text` is the select value: the placeholder or blank input unsets it.
    ///
    /// # Errors
    ///
    /// - [`EditorError::PropertyInactive`] if the property is not active
    /// - [`EditorError::InvalidSelection`] for an unknown order type
    pub fn set_text(&mut self, property: OptionalProperty, text: &str) -> EditorResult<()> {
        if !self.is_active(property) {
            return Err(EditorError::PropertyInactive(property));
        }

        match property {
            OptionalProperty::Concept => self.concept = Some(text.to_string()),
            OptionalProperty::Answers => self.answers = Some(field_with("answers", text)),
            OptionalProperty::ConceptMappings => {
                self.concept_mappings = Some(field_with("conceptMappings", text))
            }
            OptionalProperty::OrderType => {
                let selection = Selection::from_select_value(text, |v| {
                    v.parse::<OrderType>()
                        .map_err(|_| EditorError::InvalidSelection {
                            field: "orderType",
                            value: v.to_string(),
                        })
                })?;
                self.order_type = Some(selection);
            }
            OptionalProperty::OrderSettingUuid => self.order_setting_uuid = Some(text.to_string()),
            OptionalProperty::SelectableOrders => {
                self.selectable_orders = Some(field_with("selectableOrders", text))
            }
        }
        Ok(())
    }

    /// The bound concept UUID; `Some("")` while concept is active but unbound.
    pub fn concept(&self) -> Option<&str> {
        self.concept.as_deref()
    }

    pub fn order_type(&self) -> Option<&Selection<OrderType>> {
        self.order_type.as_ref()
    }

    /// Write a concept binding, activating the three bound properties as needed.
    pub(crate) fn apply_binding(&mut self, binding: &ConceptBinding) -> EditorResult<()> {
        let answers = StructuredTextField::from_value("answers", &binding.answers)?;
        let mappings =
            StructuredTextField::from_value("conceptMappings", &binding.concept_mappings)?;

        self.concept = Some(binding.concept_uuid.clone());
        self.answers = Some(answers);
        self.concept_mappings = Some(mappings);
        Ok(())
    }

    /// Clear a concept binding.
    ///
    /// The concept stays active with an empty value so a new one can be searched for; the
    /// answers and mappings that came with the binding are dropped together.
    pub(crate) fn clear_binding(&mut self) {
        if self.concept.is_some() {
            self.concept = Some(String::new());
        }
        self.answers = None;
        self.concept_mappings = None;
    }

    /// Validate every active property and attach it to `options`.
    ///
    /// Nothing is written to `options` unless all active properties are valid. Values are
    /// written as entered; the blank checks look at the trimmed text.
    ///
    /// # Errors
    ///
    /// - [`EditorError::Parse`] if a structured field holds invalid JSON
    /// - [`EditorError::MissingRequiredField`] for an unbound concept, an unset order type or
    ///   a blank order setting UUID
    pub fn attach_to(&self, options: &mut QuestionOptions) -> EditorResult<()> {
        let concept = match &self.concept {
            Some(uuid) if uuid.trim().is_empty() => {
                return Err(EditorError::MissingRequiredField { field: "concept" })
            }
            Some(uuid) => Some(uuid.clone()),
            None => None,
        };

        let answers = self.answers.as_ref().map(|f| f.parse()).transpose()?;
        let concept_mappings = self.concept_mappings.as_ref().map(|f| f.parse()).transpose()?;

        let order_type = match &self.order_type {
            Some(Selection::Unset) => {
                return Err(EditorError::MissingRequiredField { field: "orderType" })
            }
            Some(Selection::Chosen(order_type)) => Some(*order_type),
            None => None,
        };

        let order_setting_uuid = match &self.order_setting_uuid {
            Some(uuid) if uuid.trim().is_empty() => {
                return Err(EditorError::MissingRequiredField {
                    field: "orderSettingUuid",
                })
            }
            Some(uuid) => Some(uuid.clone()),
            None => None,
        };

        let selectable_orders = self
            .selectable_orders
            .as_ref()
            .map(|f| f.parse())
            .transpose()?;

        options.concept = concept;
        options.answers = answers;
        options.concept_mappings = concept_mappings;
        options.order_type = order_type;
        options.order_setting_uuid = order_setting_uuid;
        options.selectable_orders = selectable_orders;
        Ok(())
    }

    fn set_active_empty(&mut self, property: OptionalProperty) {
        match property {
            OptionalProperty::Concept => self.concept = Some(String::new()),
            OptionalProperty::Answers => self.answers = Some(StructuredTextField::empty("answers")),
            OptionalProperty::ConceptMappings => {
                self.concept_mappings = Some(StructuredTextField::empty("conceptMappings"))
            }
            OptionalProperty::OrderType => self.order_type = Some(Selection::Unset),
            OptionalProperty::OrderSettingUuid => self.order_setting_uuid = Some(String::new()),
            OptionalProperty::SelectableOrders => {
                self.selectable_orders = Some(StructuredTextField::empty("selectableOrders"))
            }
        }
    }
}

fn field_with<T>(field: &'static str, text: &str) -> StructuredTextField<T> {
    StructuredTextField::with_text(field, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_schema::Question;
    use formbuilder_types::PLACEHOLDER_VALUE;
    use serde_json::json;

    fn options_with_everything() -> QuestionOptions {
        let mut options = QuestionOptions::new("select");
        options.concept = Some("1643AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into());
        options.answers = Some(vec![Answer {
            label: "Positive".into(),
            concept: "703AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".into(),
        }]);
        options.concept_mappings = Some(vec![]);
        options.order_type = Some(OrderType::TestOrder);
        options.order_setting_uuid = Some("6f0c9a92".into());
        options.selectable_orders = Some(vec![json!({"concept": "x", "label": "Smear"})]);
        options
    }

    #[test]
    fn property_names_round_trip_through_wire_spelling() {
        for property in OptionalProperty::ALL {
            assert_eq!(property.as_str().parse::<OptionalProperty>().unwrap(), property);
        }
        let err = "weekList".parse::<OptionalProperty>().expect_err("not optional");
        assert!(matches!(err, EditorError::UnknownProperty(name) if name == "weekList"));
    }

    #[test]
    fn presence_not_truthiness_activates() {
        let mut options = QuestionOptions::new("text");
        options.concept = Some(String::new());
        options.concept_mappings = Some(vec![]);

        let set = OptionalPropertySet::from_options(&options).expect("build set");
        assert_eq!(
            set.active(),
            [OptionalProperty::Concept, OptionalProperty::ConceptMappings]
        );
    }

    #[test]
    fn null_in_stored_json_activates() {
        let question: Question = serde_json::from_str(
            r#"{"label":"Notes","type":"obs","id":"notes","questionOptions":{"rendering":"text","answers":null}}"#,
        )
        .expect("parse question");

        let set = OptionalPropertySet::from_options(&question.question_options).expect("build set");
        assert_eq!(set.active(), [OptionalProperty::Answers]);
        assert_eq!(set.text(OptionalProperty::Answers).as_deref(), Some("[]"));
    }

    #[test]
    fn from_options_round_trips_through_attach() {
        let options = options_with_everything();
        let set = OptionalPropertySet::from_options(&options).expect("build set");
        assert_eq!(set.active(), OptionalProperty::ALL);

        let mut rebuilt = QuestionOptions::new("select");
        set.attach_to(&mut rebuilt).expect("attach");
        assert_eq!(rebuilt, options);
    }

    #[test]
    fn activate_twice_warns_and_keeps_value() {
        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::Answers).expect("first activation");
        set.set_text(OptionalProperty::Answers, "[]").expect("edit answers");

        let warning = set
            .activate(OptionalProperty::Answers)
            .expect_err("second activation should warn");
        assert_eq!(warning.property, OptionalProperty::Answers);
        assert_eq!(set.text(OptionalProperty::Answers).as_deref(), Some("[]"));
    }

    #[test]
    fn activation_starts_empty_or_unset() {
        let mut set = OptionalPropertySet::new();
        for property in OptionalProperty::ALL {
            set.activate(property).expect("activate");
        }
        assert_eq!(set.concept(), Some(""));
        assert_eq!(set.order_type(), Some(&Selection::Unset));
        assert_eq!(
            set.text(OptionalProperty::OrderType).as_deref(),
            Some(PLACEHOLDER_VALUE)
        );
        assert_eq!(set.text(OptionalProperty::SelectableOrders).as_deref(), Some(""));
    }

    #[test]
    fn deactivate_discards_value() {
        let mut set = OptionalPropertySet::from_options(&options_with_everything()).unwrap();
        assert!(set.deactivate(OptionalProperty::SelectableOrders));
        assert!(!set.deactivate(OptionalProperty::SelectableOrders));

        set.activate(OptionalProperty::SelectableOrders).expect("reactivate");
        assert_eq!(set.text(OptionalProperty::SelectableOrders).as_deref(), Some(""));
    }

    #[test]
    fn set_text_requires_active_property() {
        let mut set = OptionalPropertySet::new();
        let err = set
            .set_text(OptionalProperty::OrderSettingUuid, "abc")
            .expect_err("inactive");
        assert!(matches!(
            err,
            EditorError::PropertyInactive(OptionalProperty::OrderSettingUuid)
        ));
    }

    #[test]
    fn order_type_text_is_a_select_value() {
        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::OrderType).unwrap();

        set.set_text(OptionalProperty::OrderType, "drugorder").unwrap();
        assert_eq!(set.order_type(), Some(&Selection::Chosen(OrderType::DrugOrder)));

        set.set_text(OptionalProperty::OrderType, PLACEHOLDER_VALUE).unwrap();
        assert_eq!(set.order_type(), Some(&Selection::Unset));

        let err = set
            .set_text(OptionalProperty::OrderType, "labOrder")
            .expect_err("unknown order type");
        assert!(matches!(
            err,
            EditorError::InvalidSelection { field: "orderType", value } if value == "labOrder"
        ));
    }

    #[test]
    fn attach_fails_without_partial_write() {
        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::OrderSettingUuid).unwrap();
        set.set_text(OptionalProperty::OrderSettingUuid, "abc").unwrap();
        set.activate(OptionalProperty::SelectableOrders).unwrap();
        set.set_text(OptionalProperty::SelectableOrders, "[{").unwrap();

        let mut options = QuestionOptions::new("text");
        let err = set.attach_to(&mut options).expect_err("invalid JSON");
        assert!(matches!(err, EditorError::Parse(e) if e.field == "selectableOrders"));
        assert_eq!(options, QuestionOptions::new("text"));
    }

    #[test]
    fn attach_requires_values_for_required_properties() {
        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::Concept).unwrap();
        let err = set
            .attach_to(&mut QuestionOptions::new("text"))
            .expect_err("unbound concept");
        assert!(matches!(err, EditorError::MissingRequiredField { field: "concept" }));

        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::OrderType).unwrap();
        let err = set
            .attach_to(&mut QuestionOptions::new("text"))
            .expect_err("unset order type");
        assert!(matches!(err, EditorError::MissingRequiredField { field: "orderType" }));

        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::OrderSettingUuid).unwrap();
        let err = set
            .attach_to(&mut QuestionOptions::new("text"))
            .expect_err("blank uuid");
        assert!(matches!(
            err,
            EditorError::MissingRequiredField { field: "orderSettingUuid" }
        ));
    }

    #[test]
    fn attach_writes_uuids_as_entered() {
        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::OrderSettingUuid).unwrap();
        set.set_text(OptionalProperty::OrderSettingUuid, " os-1 ").unwrap();

        let mut options = QuestionOptions::new("text");
        set.attach_to(&mut options).expect("attach");
        assert_eq!(options.order_setting_uuid.as_deref(), Some(" os-1 "));
    }

    #[test]
    fn binding_sets_and_clears_all_three() {
        let binding = ConceptBinding {
            concept_uuid: "c1".into(),
            answers: vec![Answer {
                label: "Yes".into(),
                concept: "a1".into(),
            }],
            concept_mappings: vec![],
            malformed: vec![],
        };

        let mut set = OptionalPropertySet::new();
        set.activate(OptionalProperty::Answers).unwrap();
        set.apply_binding(&binding).expect("apply binding");
        assert_eq!(set.concept(), Some("c1"));
        assert!(set.is_active(OptionalProperty::ConceptMappings));

        set.clear_binding();
        assert_eq!(set.concept(), Some(""));
        assert!(!set.is_active(OptionalProperty::Answers));
        assert!(!set.is_active(OptionalProperty::ConceptMappings));
    }

    #[test]
    fn loads_from_real_question_json() {
        let question: Question = serde_json::from_str(
            r#"{"label":"Drug","type":"obs","id":"drug","questionOptions":{"rendering":"drug","orderType":"drugorder"}}"#,
        )
        .unwrap();
        let set = OptionalPropertySet::from_options(&question.question_options).unwrap();
        assert_eq!(set.active(), [OptionalProperty::OrderType]);
    }
}
