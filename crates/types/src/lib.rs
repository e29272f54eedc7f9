//! Validated primitive types shared across the form builder crates.
//!
//! - [`NonEmptyText`]: trimmed text that is guaranteed to contain something.
//! - [`Selection`]: the value of a required select input, including its explicit
//!   "nothing chosen yet" placeholder state.

/// Value a select input reports while its placeholder option is shown.
pub const PLACEHOLDER_VALUE: &str = "placeholder-item";

#[derive(Debug, thiserror::Error)]
pub enum TextError {
    #[error("text cannot be empty")]
    Empty,
}

/// Trimmed text with at least one non-whitespace character.
///
/// Required free-text fields (label, id, numeric bounds) go through this on commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Trim `input` and wrap it.
    ///
    /// # Errors
    ///
    /// [`TextError::Empty`] if nothing is left after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The state of a required select input.
///
/// Select inputs start on a hidden placeholder option. `Unset` models that placeholder
/// explicitly so a commit can tell "never chosen" apart from any real value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection<T> {
    /// The placeholder option is still shown.
    #[default]
    Unset,
    /// A real option has been chosen.
    Chosen(T),
}

impl<T> Selection<T> {
    /// Parses the raw value reported by a select input.
    ///
    /// The placeholder value and blank input map to [`Selection::Unset`]; anything else is
    /// handed to `parse`.
    pub fn from_select_value<E>(
        value: &str,
        parse: impl FnOnce(&str) -> Result<T, E>,
    ) -> Result<Self, E> {
        let value = value.trim();
        if value.is_empty() || value == PLACEHOLDER_VALUE {
            return Ok(Self::Unset);
        }
        parse(value).map(Self::Chosen)
    }

    /// Returns the chosen value, if any.
    pub fn chosen(&self) -> Option<&T> {
        match self {
            Self::Unset => None,
            Self::Chosen(value) => Some(value),
        }
    }

    /// Returns `true` while the placeholder is shown.
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Converts into an `Option`, dropping the placeholder.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Unset => None,
            Self::Chosen(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Selection<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Chosen(value),
            None => Self::Unset,
        }
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Selection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => f.write_str(PLACEHOLDER_VALUE),
            Self::Chosen(value) => write!(f, "{value}"),
        }
    }
}
