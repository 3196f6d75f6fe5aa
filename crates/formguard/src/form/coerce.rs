//! Type coercion from raw strings to declared field types.

use super::types::{FieldType, FieldValue, RawValue};
use crate::error::CoercionError;

/// Values that leave a checkbox unchecked.
const FALSE_VALUES: &[&str] = &["", "false", "0", "off", "n", "no"];

/// Shape the submitted values for a field: a single string (first value,
/// `""` when absent) or the full list for multi-valued fields.
pub fn raw_from(field_type: &FieldType, values: &[String]) -> RawValue {
    if field_type.is_multi_valued() {
        RawValue::Multi(values.to_vec())
    } else {
        RawValue::Single(values.first().cloned().unwrap_or_default())
    }
}

/// Convert raw input to the field's declared type.
///
/// Blank input for non-text types coerces to [`FieldValue::Empty`]; whether
/// that is acceptable is up to the validators.
pub fn coerce(field_type: &FieldType, raw: &RawValue) -> Result<FieldValue, CoercionError> {
    let text = raw.first();

    match field_type {
        FieldType::String { trim: true } => Ok(FieldValue::Text(text.trim().to_string())),
        FieldType::String { trim: false } | FieldType::Password | FieldType::Hidden => {
            Ok(FieldValue::Text(text.to_string()))
        }

        FieldType::Email => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(FieldValue::Empty);
            }
            match text.rsplit_once('@') {
                Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                    Ok(FieldValue::Text(text.to_string()))
                }
                _ => Err(CoercionError::InvalidEmail),
            }
        }

        FieldType::Integer { min, max } => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(FieldValue::Empty);
            }
            let n: i64 = text.parse().map_err(|_| CoercionError::InvalidInteger)?;
            if n < *min || n > *max {
                return Err(CoercionError::IntegerOutOfRange {
                    min: *min,
                    max: *max,
                });
            }
            Ok(FieldValue::Integer(n))
        }

        FieldType::Float => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(FieldValue::Empty);
            }
            match text.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(FieldValue::Float(x)),
                _ => Err(CoercionError::InvalidFloat),
            }
        }

        FieldType::Boolean => {
            let lowered = text.trim().to_lowercase();
            Ok(FieldValue::Boolean(!FALSE_VALUES.contains(&lowered.as_str())))
        }

        FieldType::Select { choices } => {
            if text.is_empty() {
                return Ok(FieldValue::Empty);
            }
            if choices.iter().any(|(value, _)| value == text) {
                Ok(FieldValue::Text(text.to_string()))
            } else {
                Err(CoercionError::InvalidChoice)
            }
        }

        FieldType::MultiSelect { choices } => {
            let selected = match raw {
                RawValue::Multi(values) => values.clone(),
                RawValue::Single(s) if s.is_empty() => Vec::new(),
                RawValue::Single(s) => vec![s.clone()],
            };
            if let Some(bad) = selected
                .iter()
                .find(|s| !choices.iter().any(|(value, _)| value == *s))
            {
                return Err(CoercionError::InvalidChoices(bad.clone()));
            }
            Ok(FieldValue::List(selected))
        }
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn single(s: &str) -> RawValue {
        RawValue::Single(s.to_string())
    }

    fn choices() -> Vec<(String, String)> {
        vec![
            ("rust".to_string(), "Rust".to_string()),
            ("go".to_string(), "Go".to_string()),
        ]
    }

    #[test]
    fn test_raw_from_shapes() {
        let values = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            raw_from(&FieldType::String { trim: false }, &values),
            single("a")
        );
        assert_eq!(raw_from(&FieldType::Email, &[]), single(""));
        assert_eq!(
            raw_from(&FieldType::MultiSelect { choices: choices() }, &[]),
            RawValue::Multi(vec![])
        );
    }

    #[test]
    fn test_integer() {
        let ty = FieldType::Integer {
            min: i64::MIN,
            max: i64::MAX,
        };
        assert_eq!(coerce(&ty, &single("42")).unwrap(), FieldValue::Integer(42));
        assert_eq!(coerce(&ty, &single(" -7 ")).unwrap(), FieldValue::Integer(-7));
        assert_eq!(coerce(&ty, &single("")).unwrap(), FieldValue::Empty);
        assert_eq!(
            coerce(&ty, &single("abc")).unwrap_err(),
            CoercionError::InvalidInteger
        );
        assert_eq!(
            coerce(&ty, &single("99999999999999999999")).unwrap_err(),
            CoercionError::InvalidInteger
        );

        let bounded = FieldType::Integer { min: 0, max: 120 };
        assert_eq!(
            coerce(&bounded, &single("121")).unwrap_err(),
            CoercionError::IntegerOutOfRange { min: 0, max: 120 }
        );
    }

    #[test]
    fn test_string_trim() {
        assert_eq!(
            coerce(&FieldType::String { trim: true }, &single("  hi  ")).unwrap(),
            FieldValue::Text("hi".to_string())
        );
        assert_eq!(
            coerce(&FieldType::String { trim: false }, &single("  hi  ")).unwrap(),
            FieldValue::Text("  hi  ".to_string())
        );
        assert_eq!(
            coerce(&FieldType::Password, &single(" pw ")).unwrap(),
            FieldValue::Text(" pw ".to_string())
        );
    }

    #[test]
    fn test_email_syntax_only() {
        assert_eq!(
            coerce(&FieldType::Email, &single("a@b")).unwrap(),
            FieldValue::Text("a@b".to_string())
        );
        assert_eq!(
            coerce(&FieldType::Email, &single("@b.com")).unwrap_err(),
            CoercionError::InvalidEmail
        );
        assert_eq!(
            coerce(&FieldType::Email, &single("a@")).unwrap_err(),
            CoercionError::InvalidEmail
        );
        assert_eq!(
            coerce(&FieldType::Email, &single("plain")).unwrap_err(),
            CoercionError::InvalidEmail
        );
    }

    #[test]
    fn test_float() {
        assert_eq!(
            coerce(&FieldType::Float, &single("2.5")).unwrap(),
            FieldValue::Float(2.5)
        );
        assert_eq!(
            coerce(&FieldType::Float, &single("NaN")).unwrap_err(),
            CoercionError::InvalidFloat
        );
    }

    #[test]
    fn test_boolean() {
        for off in ["", "false", "0", "OFF", "no"] {
            assert_eq!(
                coerce(&FieldType::Boolean, &single(off)).unwrap(),
                FieldValue::Boolean(false)
            );
        }
        for on in ["y", "on", "true", "1", "anything"] {
            assert_eq!(
                coerce(&FieldType::Boolean, &single(on)).unwrap(),
                FieldValue::Boolean(true)
            );
        }
    }

    #[test]
    fn test_select_choices() {
        let ty = FieldType::Select { choices: choices() };
        assert_eq!(
            coerce(&ty, &single("go")).unwrap(),
            FieldValue::Text("go".to_string())
        );
        assert_eq!(coerce(&ty, &single("")).unwrap(), FieldValue::Empty);
        assert_eq!(
            coerce(&ty, &single("cobol")).unwrap_err(),
            CoercionError::InvalidChoice
        );

        let multi = FieldType::MultiSelect { choices: choices() };
        let raw = RawValue::Multi(vec!["rust".to_string(), "go".to_string()]);
        assert_eq!(
            coerce(&multi, &raw).unwrap(),
            FieldValue::List(vec!["rust".to_string(), "go".to_string()])
        );
        let raw = RawValue::Multi(vec!["rust".to_string(), "perl".to_string()]);
        assert_eq!(
            coerce(&multi, &raw).unwrap_err(),
            CoercionError::InvalidChoices("perl".to_string())
        );
    }
}
