//! Per-submission field state.

use serde::Serialize;

use super::coerce;
use super::instance::FormContext;
use super::types::{FieldType, FieldValue, RawValue};
use super::validator::{ValidationOutcome, Validator};

/// A named, typed slot holding raw input, the coerced value and errors.
///
/// `bound_value` is present iff coercion succeeded, whatever the validators
/// later decide, so invalid input can be re-displayed.
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    name: String,
    #[serde(rename = "type")]
    type_name: &'static str,
    #[serde(skip)]
    field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    raw_value: RawValue,
    bound_value: Option<FieldValue>,
    errors: Vec<String>,
}

impl Field {
    pub(crate) fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let raw_value = if field_type.is_multi_valued() {
            RawValue::Multi(Vec::new())
        } else {
            RawValue::Single(String::new())
        };
        Self {
            name: name.into(),
            type_name: field_type.type_name(),
            field_type,
            label: None,
            raw_value,
            bound_value: None,
            errors: Vec::new(),
        }
    }

    pub(crate) fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type.
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Label, if the descriptor set one.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Input as received.
    pub fn raw_value(&self) -> &RawValue {
        &self.raw_value
    }

    /// Coerced value, if coercion succeeded.
    pub fn bound_value(&self) -> Option<&FieldValue> {
        self.bound_value.as_ref()
    }

    /// Errors in the order they were recorded.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Whether the field has no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Text to put back into the input when re-displaying the form.
    pub fn display_value(&self) -> String {
        match &self.bound_value {
            Some(FieldValue::Text(s)) => s.clone(),
            Some(FieldValue::Integer(n)) => n.to_string(),
            Some(FieldValue::Float(x)) => x.to_string(),
            Some(FieldValue::Boolean(b)) => b.to_string(),
            Some(FieldValue::List(items)) => items.join(", "),
            Some(FieldValue::Empty) | None => self.raw_value.first().to_string(),
        }
    }

    /// Store raw input and coerce it. A coercion failure records one error.
    pub(crate) fn bind(&mut self, raw: RawValue) {
        match coerce::coerce(&self.field_type, &raw) {
            Ok(value) => self.bound_value = Some(value),
            Err(e) => {
                self.bound_value = None;
                self.errors.push(e.to_string());
            }
        }
        self.raw_value = raw;
    }

    /// Run `validators` in order and collect failure messages.
    ///
    /// Nothing runs when coercion failed. `Stop` ends the chain.
    pub(crate) fn run_validators(
        &self,
        validators: &[Validator],
        form: &FormContext<'_>,
    ) -> Vec<String> {
        let Some(value) = &self.bound_value else {
            return Vec::new();
        };

        let mut failures = Vec::new();
        for validator in validators {
            match validator.check(value, self, form) {
                ValidationOutcome::Pass => {}
                ValidationOutcome::Fail(message) => failures.push(message),
                ValidationOutcome::Stop => break,
            }
        }
        failures
    }

    pub(crate) fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub(crate) fn extend_errors(&mut self, messages: impl IntoIterator<Item = String>) {
        self.errors.extend(messages);
    }
}
