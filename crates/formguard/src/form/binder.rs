//! Moves payload values into fields.
//!
//! Structural extraction and coercion only; semantic checks belong to
//! validators.

use tracing::debug;

use super::coerce::raw_from;
use super::field::Field;
use crate::payload::Payload;

/// Bind every field from `payload`. Missing keys bind as empty input.
pub fn bind(fields: &mut [Field], payload: &Payload) {
    for field in fields.iter_mut() {
        let raw = raw_from(field.field_type(), payload.get_all(field.name()));
        field.bind(raw);

        if !field.is_valid() {
            debug!(field = %field.name(), "field failed coercion");
        }
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::form::types::{FieldType, FieldValue, RawValue};

    #[test]
    fn test_missing_keys_bind_empty() {
        let mut fields = vec![
            Field::new("name", FieldType::String { trim: false }),
            Field::new(
                "tags",
                FieldType::MultiSelect {
                    choices: vec![("a".to_string(), "A".to_string())],
                },
            ),
            Field::new("agree", FieldType::Boolean),
        ];

        bind(&mut fields, &Payload::new());

        assert_eq!(fields[0].raw_value(), &RawValue::Single(String::new()));
        assert_eq!(
            fields[0].bound_value(),
            Some(&FieldValue::Text(String::new()))
        );
        assert_eq!(fields[1].raw_value(), &RawValue::Multi(vec![]));
        assert_eq!(fields[1].bound_value(), Some(&FieldValue::List(vec![])));
        assert_eq!(fields[2].bound_value(), Some(&FieldValue::Boolean(false)));
        assert!(fields.iter().all(Field::is_valid));
    }

    #[test]
    fn test_single_valued_takes_first() {
        let mut fields = vec![Field::new("n", FieldType::Integer { min: 0, max: 10 })];
        bind(&mut fields, &Payload::from_pairs([("n", "3"), ("n", "4")]));
        assert_eq!(fields[0].bound_value(), Some(&FieldValue::Integer(3)));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut fields = vec![Field::new("a", FieldType::Hidden)];
        bind(
            &mut fields,
            &Payload::from_pairs([("a", "1"), ("is_admin", "true")]),
        );
        assert_eq!(
            fields[0].bound_value(),
            Some(&FieldValue::Text("1".to_string()))
        );
    }
}
