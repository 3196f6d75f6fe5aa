//! Field validators.
//!
//! Validators only see values that coerced successfully. They run in
//! declaration order; a `Stop` outcome ends the chain without recording an
//! error.

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::field::Field;
use super::instance::FormContext;
use super::types::FieldValue;

/// Result of running one validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Pass,
    Fail(String),
    Stop,
}

/// Custom per-field check.
pub trait FieldCheck: Send + Sync + fmt::Debug {
    /// Inspect `value` (already coerced) for `field`, with read access to the rest of the form.
    fn check(&self, value: &FieldValue, field: &Field, form: &FormContext<'_>) -> ValidationOutcome;
}

// One `@`, no whitespace, a dot in the domain.
static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").ok());

/// Built-in validators. Every variant carries an optional message override.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Value must be present: not blank, not an empty list, not an unchecked box.
    Required { message: Option<String> },

    /// Stop the chain when the raw input is blank.
    Optional,

    /// Text length in characters, or list length in items.
    Length {
        min: Option<usize>,
        max: Option<usize>,
        message: Option<String>,
    },

    /// Numeric bounds, inclusive.
    NumberRange {
        min: Option<f64>,
        max: Option<f64>,
        message: Option<String>,
    },

    /// Stricter address check than the binder's.
    Email { message: Option<String> },

    /// Text must match the pattern.
    Regexp {
        pattern: Regex,
        message: Option<String>,
    },

    /// Value must equal another field's value.
    EqualTo {
        other: String,
        message: Option<String>,
    },

    /// Value (or every list item) must be one of `values`.
    AnyOf {
        values: Vec<String>,
        message: Option<String>,
    },

    /// Value (or every list item) must not be one of `values`.
    NoneOf {
        values: Vec<String>,
        message: Option<String>,
    },

    /// Application-defined check.
    Custom(Arc<dyn FieldCheck>),
}

impl Validator {
    /// [`Validator::Required`] with the default message.
    pub fn required() -> Self {
        Validator::Required { message: None }
    }

    /// [`Validator::Length`] with only a lower bound.
    pub fn min_length(min: usize) -> Self {
        Validator::Length {
            min: Some(min),
            max: None,
            message: None,
        }
    }

    /// [`Validator::Length`] with only an upper bound.
    pub fn max_length(max: usize) -> Self {
        Validator::Length {
            min: None,
            max: Some(max),
            message: None,
        }
    }

    /// [`Validator::Length`] with both bounds.
    pub fn length(min: usize, max: usize) -> Self {
        Validator::Length {
            min: Some(min),
            max: Some(max),
            message: None,
        }
    }

    /// [`Validator::NumberRange`] with both bounds.
    pub fn number_range(min: f64, max: f64) -> Self {
        Validator::NumberRange {
            min: Some(min),
            max: Some(max),
            message: None,
        }
    }

    /// [`Validator::Email`] with the default message.
    pub fn email() -> Self {
        Validator::Email { message: None }
    }

    /// [`Validator::Regexp`]. Fails if `pattern` does not compile.
    pub fn regexp(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Validator::Regexp {
            pattern: Regex::new(pattern)?,
            message: None,
        })
    }

    /// [`Validator::EqualTo`] against another field.
    pub fn equal_to(other: impl Into<String>) -> Self {
        Validator::EqualTo {
            other: other.into(),
            message: None,
        }
    }

    /// [`Validator::AnyOf`].
    pub fn any_of<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Validator::AnyOf {
            values: values.into_iter().map(Into::into).collect(),
            message: None,
        }
    }

    /// [`Validator::NoneOf`].
    pub fn none_of<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Validator::NoneOf {
            values: values.into_iter().map(Into::into).collect(),
            message: None,
        }
    }

    /// Wrap an application-defined check.
    pub fn custom(check: impl FieldCheck + 'static) -> Self {
        Validator::Custom(Arc::new(check))
    }

    /// Override the failure message. No effect on `Optional` and `Custom`.
    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        match &mut self {
            Validator::Required { message }
            | Validator::Length { message, .. }
            | Validator::NumberRange { message, .. }
            | Validator::Email { message }
            | Validator::Regexp { message, .. }
            | Validator::EqualTo { message, .. }
            | Validator::AnyOf { message, .. }
            | Validator::NoneOf { message, .. } => *message = Some(text.into()),
            Validator::Optional | Validator::Custom(_) => {}
        }
        self
    }

    /// Run the validator against a coerced value.
    pub fn check(&self, value: &FieldValue, field: &Field, form: &FormContext<'_>) -> ValidationOutcome {
        match self {
            Validator::Required { message } => {
                if value.is_empty() {
                    fail(message, || "This field is required.".to_string())
                } else {
                    ValidationOutcome::Pass
                }
            }

            Validator::Optional => {
                if field.raw_value().is_blank() {
                    ValidationOutcome::Stop
                } else {
                    ValidationOutcome::Pass
                }
            }

            Validator::Length { min, max, message } => {
                let len = match value {
                    FieldValue::Text(s) => s.chars().count(),
                    FieldValue::List(items) => items.len(),
                    FieldValue::Empty => 0,
                    _ => return ValidationOutcome::Pass,
                };
                let too_short = min.is_some_and(|m| len < m);
                let too_long = max.is_some_and(|m| len > m);
                if too_short || too_long {
                    fail(message, || length_message(*min, *max))
                } else {
                    ValidationOutcome::Pass
                }
            }

            Validator::NumberRange { min, max, message } => {
                let in_range = value.as_f64().is_some_and(|n| {
                    min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m)
                });
                if in_range {
                    ValidationOutcome::Pass
                } else {
                    fail(message, || range_message(*min, *max))
                }
            }

            Validator::Email { message } => {
                let valid = match (value.as_text(), EMAIL_RE.as_ref()) {
                    (Some(text), Some(re)) => re.is_match(text),
                    _ => false,
                };
                if valid {
                    ValidationOutcome::Pass
                } else {
                    fail(message, || "Invalid email address.".to_string())
                }
            }

            Validator::Regexp { pattern, message } => {
                if value.as_text().is_some_and(|text| pattern.is_match(text)) {
                    ValidationOutcome::Pass
                } else {
                    fail(message, || "Invalid input.".to_string())
                }
            }

            Validator::EqualTo { other, message } => match form.field(other) {
                None => fail(message, || format!("Invalid field name '{other}'.")),
                Some(other_field) if other_field.bound_value() == Some(value) => {
                    ValidationOutcome::Pass
                }
                Some(_) => fail(message, || format!("Field must be equal to {other}.")),
            },

            Validator::AnyOf { values, message } => {
                if candidates(value).all(|c| values.iter().any(|v| v == c)) {
                    ValidationOutcome::Pass
                } else {
                    fail(message, || {
                        format!("Invalid value, must be one of: {}.", values.join(", "))
                    })
                }
            }

            Validator::NoneOf { values, message } => {
                if candidates(value).any(|c| values.iter().any(|v| v == c)) {
                    fail(message, || {
                        format!("Invalid value, can't be any of: {}.", values.join(", "))
                    })
                } else {
                    ValidationOutcome::Pass
                }
            }

            Validator::Custom(check) => check.check(value, field, form),
        }
    }
}

fn fail(message: &Option<String>, default: impl FnOnce() -> String) -> ValidationOutcome {
    ValidationOutcome::Fail(message.clone().unwrap_or_else(default))
}

/// Text values compared by membership validators.
fn candidates(value: &FieldValue) -> Box<dyn Iterator<Item = &str> + '_> {
    match value {
        FieldValue::Text(s) => Box::new(std::iter::once(s.as_str())),
        FieldValue::List(items) => Box::new(items.iter().map(String::as_str)),
        _ => Box::new(std::iter::empty()),
    }
}

fn length_message(min: Option<usize>, max: Option<usize>) -> String {
    match (min, max) {
        (Some(min), None) => format!("Field must be at least {min} characters long."),
        (None, Some(max)) => format!("Field cannot be longer than {max} characters."),
        (Some(min), Some(max)) if min == max => {
            format!("Field must be exactly {min} characters long.")
        }
        (Some(min), Some(max)) => {
            format!("Field must be between {min} and {max} characters long.")
        }
        (None, None) => "Invalid length.".to_string(),
    }
}

fn range_message(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), None) => format!("Number must be at least {min}."),
        (None, Some(max)) => format!("Number must be at most {max}."),
        (Some(min), Some(max)) => format!("Number must be between {min} and {max}."),
        (None, None) => "Not a valid number.".to_string(),
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::form::types::{FieldType, RawValue};

    fn text_field(name: &str, raw: &str) -> Field {
        let mut field = Field::new(name, FieldType::String { trim: false });
        field.bind(RawValue::Single(raw.to_string()));
        field
    }

    fn check(validator: &Validator, field: &Field, others: &[Field]) -> ValidationOutcome {
        let ctx = FormContext::new("test", others);
        let value = field.bound_value().unwrap();
        validator.check(value, field, &ctx)
    }

    #[test]
    fn test_required() {
        let v = Validator::required();
        assert_eq!(
            check(&v, &text_field("a", "  "), &[]),
            ValidationOutcome::Fail("This field is required.".to_string())
        );
        assert_eq!(check(&v, &text_field("a", "x"), &[]), ValidationOutcome::Pass);
    }

    #[test]
    fn test_optional_stops_on_blank() {
        assert_eq!(
            check(&Validator::Optional, &text_field("a", ""), &[]),
            ValidationOutcome::Stop
        );
        assert_eq!(
            check(&Validator::Optional, &text_field("a", "x"), &[]),
            ValidationOutcome::Pass
        );
    }

    #[test]
    fn test_length_counts_characters() {
        let v = Validator::length(2, 3);
        assert_eq!(check(&v, &text_field("a", "héé"), &[]), ValidationOutcome::Pass);
        assert_eq!(
            check(&v, &text_field("a", "h"), &[]),
            ValidationOutcome::Fail("Field must be between 2 and 3 characters long.".to_string())
        );
        assert_eq!(
            check(&Validator::min_length(3), &text_field("a", "al"), &[]),
            ValidationOutcome::Fail("Field must be at least 3 characters long.".to_string())
        );
    }

    #[test]
    fn test_number_range_uses_coerced_value() {
        let mut field = Field::new("n", FieldType::Integer { min: i64::MIN, max: i64::MAX });
        field.bind(RawValue::Single("007".to_string()));
        let v = Validator::number_range(1.0, 10.0);
        assert_eq!(check(&v, &field, &[]), ValidationOutcome::Pass);

        let mut field = Field::new("n", FieldType::Integer { min: i64::MIN, max: i64::MAX });
        field.bind(RawValue::Single("11".to_string()));
        assert!(matches!(check(&v, &field, &[]), ValidationOutcome::Fail(_)));
    }

    #[test]
    fn test_email_regex() {
        let v = Validator::email();
        assert_eq!(check(&v, &text_field("e", "a@b.com"), &[]), ValidationOutcome::Pass);
        assert!(matches!(
            check(&v, &text_field("e", "a@b"), &[]),
            ValidationOutcome::Fail(_)
        ));
        assert!(matches!(
            check(&v, &text_field("e", "a b@c.de"), &[]),
            ValidationOutcome::Fail(_)
        ));
    }

    #[test]
    fn test_regexp_and_custom_message() {
        let v = Validator::regexp(r"^[a-z]+$")
            .unwrap()
            .with_message("Lowercase letters only.");
        assert_eq!(check(&v, &text_field("a", "abc"), &[]), ValidationOutcome::Pass);
        assert_eq!(
            check(&v, &text_field("a", "Abc"), &[]),
            ValidationOutcome::Fail("Lowercase letters only.".to_string())
        );
    }

    #[test]
    fn test_equal_to() {
        let password = text_field("password", "hunter22");
        let others = vec![password];
        let v = Validator::equal_to("password");

        assert_eq!(
            check(&v, &text_field("confirm", "hunter22"), &others),
            ValidationOutcome::Pass
        );
        assert_eq!(
            check(&v, &text_field("confirm", "hunter23"), &others),
            ValidationOutcome::Fail("Field must be equal to password.".to_string())
        );
        assert!(matches!(
            check(&Validator::equal_to("nope"), &text_field("c", "x"), &others),
            ValidationOutcome::Fail(_)
        ));
    }

    #[test]
    fn test_any_of_none_of() {
        let any = Validator::any_of(["red", "green"]);
        let none = Validator::none_of(["admin", "root"]);
        assert_eq!(check(&any, &text_field("c", "red"), &[]), ValidationOutcome::Pass);
        assert!(matches!(
            check(&any, &text_field("c", "blue"), &[]),
            ValidationOutcome::Fail(_)
        ));
        assert_eq!(check(&none, &text_field("u", "alice"), &[]), ValidationOutcome::Pass);
        assert_eq!(
            check(&none, &text_field("u", "root"), &[]),
            ValidationOutcome::Fail("Invalid value, can't be any of: admin, root.".to_string())
        );
    }
}
