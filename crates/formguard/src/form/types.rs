//! Form schema and field types.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::instance::{CrossFieldValidator, Form};
use super::validator::Validator;
use crate::error::ProtocolError;

/// Immutable form definition shared by every submission of that form.
///
/// Build with [`FormSchema::builder`], then call [`FormSchema::instantiate`]
/// once per request.
pub struct FormSchema {
    form_id: String,
    fields: Vec<FieldDescriptor>,
    cross_field: Vec<Arc<dyn CrossFieldValidator>>,
    csrf: bool,
}

impl FormSchema {
    /// Start a schema with the given form ID (e.g., "user_register_form").
    pub fn builder(form_id: impl Into<String>) -> FormSchemaBuilder {
        FormSchemaBuilder {
            form_id: form_id.into(),
            fields: Vec::new(),
            cross_field: Vec::new(),
            csrf: true,
        }
    }

    /// Form identifier.
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Field descriptors in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Cross-field validators in declaration order.
    pub fn cross_field_validators(&self) -> &[Arc<dyn CrossFieldValidator>] {
        &self.cross_field
    }

    /// Whether submissions must carry a valid CSRF token.
    pub fn csrf_enabled(&self) -> bool {
        self.csrf
    }

    /// Create a fresh, unbound form for one submission.
    pub fn instantiate(self: &Arc<Self>) -> Form {
        Form::new(Arc::clone(self))
    }
}

impl fmt::Debug for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSchema")
            .field("form_id", &self.form_id)
            .field("fields", &self.fields)
            .field("cross_field", &self.cross_field.len())
            .field("csrf", &self.csrf)
            .finish()
    }
}

/// Builder for [`FormSchema`].
pub struct FormSchemaBuilder {
    form_id: String,
    fields: Vec<FieldDescriptor>,
    cross_field: Vec<Arc<dyn CrossFieldValidator>>,
    csrf: bool,
}

impl FormSchemaBuilder {
    /// Declare a field. Declaration order is rendering order.
    pub fn field(mut self, name: impl Into<String>, mut descriptor: FieldDescriptor) -> Self {
        descriptor.name = name.into();
        self.fields.push(descriptor);
        self
    }

    /// Add a form-level validator that runs after every field is validated.
    pub fn cross_field(mut self, validator: impl CrossFieldValidator + 'static) -> Self {
        self.cross_field.push(Arc::new(validator));
        self
    }

    /// Disable CSRF verification for this form (e.g., idempotent search forms).
    pub fn without_csrf(mut self) -> Self {
        self.csrf = false;
        self
    }

    /// Finish the schema. Field names must be unique and non-empty.
    pub fn build(self) -> Result<Arc<FormSchema>, ProtocolError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() || !seen.insert(field.name.as_str()) {
                return Err(ProtocolError::DuplicateField {
                    form_id: self.form_id,
                    field: field.name.clone(),
                });
            }
        }

        Ok(Arc::new(FormSchema {
            form_id: self.form_id,
            fields: self.fields,
            cross_field: self.cross_field,
            csrf: self.csrf,
        }))
    }
}

/// A field definition: type, label and validator chain.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescriptor {
    /// Field name, unique within the form. Set by [`FormSchemaBuilder::field`].
    pub name: String,

    /// Declared type with type-specific configuration.
    #[serde(flatten)]
    pub field_type: FieldType,

    /// Field label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Validators, run in order.
    #[serde(skip)]
    pub validators: Vec<Validator>,
}

impl FieldDescriptor {
    /// Single-line text, stored as received.
    pub fn string() -> Self {
        Self::new(FieldType::String { trim: false })
    }

    /// Single-line text with surrounding whitespace removed before storage.
    pub fn trimmed_string() -> Self {
        Self::new(FieldType::String { trim: true })
    }

    /// Password input. Never trimmed.
    pub fn password() -> Self {
        Self::new(FieldType::Password)
    }

    /// Hidden input.
    pub fn hidden() -> Self {
        Self::new(FieldType::Hidden)
    }

    /// Email address with a syntactic `local@domain` check at bind time.
    pub fn email() -> Self {
        Self::new(FieldType::Email)
    }

    /// Base-10 integer over the full `i64` range.
    pub fn integer() -> Self {
        Self::integer_in(i64::MIN, i64::MAX)
    }

    /// Base-10 integer restricted to `min..=max` at bind time.
    pub fn integer_in(min: i64, max: i64) -> Self {
        Self::new(FieldType::Integer { min, max })
    }

    /// Finite floating-point number.
    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    /// Checkbox.
    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    /// Single choice from `(value, label)` pairs.
    pub fn select(choices: Vec<(String, String)>) -> Self {
        Self::new(FieldType::Select { choices })
    }

    /// Any number of choices from `(value, label)` pairs.
    pub fn multi_select(choices: Vec<(String, String)>) -> Self {
        Self::new(FieldType::MultiSelect { choices })
    }

    fn new(field_type: FieldType) -> Self {
        Self {
            name: String::new(),
            field_type,
            label: None,
            description: None,
            validators: Vec::new(),
        }
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the help text.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a validator to the chain.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Append several validators.
    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators.extend(validators);
        self
    }
}

/// Closed set of field types with type-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    /// Text input.
    String { trim: bool },

    /// Password input.
    Password,

    /// Hidden input.
    Hidden,

    /// Email address.
    Email,

    /// Integer within a configured range.
    Integer { min: i64, max: i64 },

    /// Floating-point number.
    Float,

    /// Checkbox.
    Boolean,

    /// Dropdown select.
    Select { choices: Vec<(String, String)> },

    /// Multi-select.
    MultiSelect { choices: Vec<(String, String)> },
}

impl FieldType {
    /// Get the type name as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String { .. } => "string",
            FieldType::Password => "password",
            FieldType::Hidden => "hidden",
            FieldType::Email => "email",
            FieldType::Integer { .. } => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Select { .. } => "select",
            FieldType::MultiSelect { .. } => "multi_select",
        }
    }

    /// Whether the field accepts several values under one key.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, FieldType::MultiSelect { .. })
    }
}

/// Input exactly as received, before coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Single(String),
    Multi(Vec<String>),
}

impl RawValue {
    /// Whether nothing meaningful was submitted (blank text or no values).
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Single(s) => s.trim().is_empty(),
            RawValue::Multi(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }

    /// The single value, or the first of several.
    pub fn first(&self) -> &str {
        match self {
            RawValue::Single(s) => s,
            RawValue::Multi(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }
}

/// A successfully coerced value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Blank input for a non-text type.
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    List(Vec<String>),
}

impl FieldValue {
    /// Borrow the text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of integer and float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Whether the value counts as "no data" for required-ness.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Boolean(b) => !b,
            FieldValue::Integer(_) | FieldValue::Float(_) => false,
        }
    }
}
