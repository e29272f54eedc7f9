//! Constants used throughout the form builder core crate.

/// Question type that binds a single observation; selecting it forces a concept.
pub const OBS_QUESTION_TYPE: &str = "obs";

/// Rendering that carries `min` and `max`.
pub const NUMBER_RENDERING: &str = "number";

/// Rendering that carries a `weekList`.
pub const DATE_RENDERING: &str = "date";

/// Rendering that carries `rows`.
pub const TEXTAREA_RENDERING: &str = "textarea";

/// Separator between the source and code of a concept mapping display string.
pub const MAPPING_SEPARATOR: &str = ": ";

/// Environment variable naming a YAML configuration file.
pub const CONFIG_ENV_VAR: &str = "FORMBUILDER_CONFIG";

/// Question types offered when no configuration file is supplied.
pub const DEFAULT_QUESTION_TYPES: &[&str] = &[
    "complex-obs",
    "control",
    "encounterDatetime",
    "encounterLocation",
    "encounterProvider",
    "encounterRole",
    "obs",
    "obsGroup",
    "patientIdentifier",
    "personAttribute",
    "testOrder",
];

/// Renderings offered when no configuration file is supplied.
pub const DEFAULT_RENDERING_TYPES: &[&str] = &[
    "checkbox",
    "content-switcher",
    "date",
    "datetime",
    "drug",
    "encounter-location",
    "encounter-provider",
    "encounter-role",
    "file",
    "fixed-value",
    "group",
    "markdown",
    "number",
    "problem",
    "radio",
    "repeating",
    "select",
    "text",
    "textarea",
    "toggle",
    "ui-select-extended",
];

pub const SUCCESS_TITLE: &str = "Success!";
pub const ERROR_TITLE: &str = "Error";
pub const WARNING_TITLE: &str = "Warning";

pub const QUESTION_UPDATED_MESSAGE: &str = "Question Updated";
pub const QUESTION_CREATED_MESSAGE: &str = "Question Created";
pub const PROPERTY_IN_USE_MESSAGE: &str = "Property Already in use";
