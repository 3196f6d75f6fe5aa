//! A form bound to one submission.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::binder;
use super::csrf::{CsrfTokenManager, Verification};
use super::field::Field;
use super::report::ErrorReport;
use super::types::{FieldValue, FormSchema};
use crate::error::{CsrfFailure, FormError, ProtocolError};
use crate::payload::Payload;

/// Lifecycle of a form instance. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    /// Fresh instance; nothing bound yet.
    Unbound,
    /// Payload bound and coerced; validators not yet run.
    Bound,
    /// Field and cross-field validators have run.
    Validated,
    /// CSRF verification failed; nothing was bound.
    Rejected,
}

/// The CSRF token attached to a rendered form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrfField {
    /// Name of the hidden input.
    pub name: String,
    /// Token value.
    pub token: String,
}

/// One submission of a [`FormSchema`].
///
/// Single-use: field state is mutated in place, so create a new instance
/// with [`FormSchema::instantiate`] for every request.
#[derive(Debug, Serialize)]
pub struct Form {
    #[serde(skip)]
    schema: Arc<FormSchema>,
    form_id: String,
    build_id: Uuid,
    phase: FormPhase,
    fields: Vec<Field>,
    form_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    csrf: Option<CsrfField>,
}

impl Form {
    pub(crate) fn new(schema: Arc<FormSchema>) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|d| Field::new(d.name.clone(), d.field_type.clone()).with_label(d.label.clone()))
            .collect();

        Self {
            form_id: schema.form_id().to_string(),
            build_id: Uuid::now_v7(),
            phase: FormPhase::Unbound,
            fields,
            form_errors: Vec::new(),
            csrf: None,
            schema,
        }
    }

    /// Form identifier from the schema.
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    /// Unique ID of this instance, for log correlation.
    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    /// The schema this form was created from.
    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Coerced value of a field.
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).and_then(Field::bound_value)
    }

    /// Form-level errors in the order they were recorded.
    pub fn form_errors(&self) -> &[String] {
        &self.form_errors
    }

    /// The CSRF token to embed as a hidden input, once issued.
    pub fn csrf_token(&self) -> Option<&CsrfField> {
        self.csrf.as_ref()
    }

    /// Read-only view used by validators.
    pub fn context(&self) -> FormContext<'_> {
        FormContext::new(&self.form_id, &self.fields)
    }

    /// Fetch (or create) the session's CSRF token and attach it for rendering.
    pub fn issue_csrf_token(
        &mut self,
        manager: &CsrfTokenManager,
        session_id: &str,
    ) -> Result<&CsrfField, FormError> {
        let token = manager.issue(session_id)?;
        Ok(self.csrf.insert(CsrfField {
            name: manager.field_name().to_string(),
            token,
        }))
    }

    /// Process a submission: CSRF gate, bind, validate.
    ///
    /// Returns whether the form is valid. A CSRF failure is not an `Err`: it
    /// leaves the form `Rejected` with one generic form-level error and no
    /// field bound. Forms whose schema disables CSRF skip the gate.
    pub fn submit(
        &mut self,
        payload: &Payload,
        manager: &CsrfTokenManager,
        session_id: &str,
    ) -> Result<bool, FormError> {
        self.ensure_unbound()?;

        if self.schema.csrf_enabled() {
            let submitted = payload.first(manager.field_name()).unwrap_or("");
            if let Verification::Rejected(failure) = manager.verify(session_id, submitted)? {
                self.reject(failure);
                return Ok(false);
            }
        }

        self.bind(payload)?;
        self.validate()
    }

    /// Bind and coerce every field from `payload`.
    ///
    /// This does not check CSRF; use [`submit`](Self::submit) for untrusted
    /// submissions to forms that require it.
    pub fn bind(&mut self, payload: &Payload) -> Result<(), FormError> {
        self.ensure_unbound()?;
        binder::bind(&mut self.fields, payload);
        self.phase = FormPhase::Bound;

        debug!(form_id = %self.form_id, build_id = %self.build_id, "form bound");
        Ok(())
    }

    /// Run field validators, then cross-field validators. Returns validity.
    pub fn validate(&mut self) -> Result<bool, FormError> {
        match self.phase {
            FormPhase::Bound => {}
            FormPhase::Unbound => {
                return Err(ProtocolError::NotBound {
                    form_id: self.form_id.clone(),
                }
                .into());
            }
            FormPhase::Validated | FormPhase::Rejected => {
                return Err(ProtocolError::AlreadyValidated {
                    form_id: self.form_id.clone(),
                }
                .into());
            }
        }

        let schema = Arc::clone(&self.schema);

        for (index, descriptor) in schema.fields().iter().enumerate() {
            let failures = self.fields[index].run_validators(&descriptor.validators, &self.context());
            self.fields[index].extend_errors(failures);
        }

        for validator in schema.cross_field_validators() {
            let errors = validator.validate(&self.context());
            for error in errors {
                self.record(error);
            }
        }

        self.phase = FormPhase::Validated;
        let valid = self.is_clean();

        debug!(
            form_id = %self.form_id,
            build_id = %self.build_id,
            valid,
            "form validated"
        );
        Ok(valid)
    }

    /// Whether the submission is valid. Only defined after evaluation.
    pub fn is_valid(&self) -> Result<bool, FormError> {
        match self.phase {
            FormPhase::Validated => Ok(self.is_clean()),
            FormPhase::Rejected => Ok(false),
            FormPhase::Unbound | FormPhase::Bound => Err(ProtocolError::NotEvaluated {
                form_id: self.form_id.clone(),
            }
            .into()),
        }
    }

    /// Collected errors for presentation.
    pub fn errors(&self) -> ErrorReport {
        ErrorReport::collect(self)
    }

    fn is_clean(&self) -> bool {
        self.form_errors.is_empty() && self.fields.iter().all(Field::is_valid)
    }

    fn ensure_unbound(&self) -> Result<(), ProtocolError> {
        if self.phase == FormPhase::Unbound {
            Ok(())
        } else {
            Err(ProtocolError::AlreadyBound {
                form_id: self.form_id.clone(),
            })
        }
    }

    fn reject(&mut self, failure: CsrfFailure) {
        warn!(
            form_id = %self.form_id,
            build_id = %self.build_id,
            reason = failure.reason(),
            "form submission rejected"
        );
        self.form_errors.push(CsrfFailure::USER_MESSAGE.to_string());
        self.phase = FormPhase::Rejected;
    }

    fn record(&mut self, error: ValidationError) {
        let Some(name) = error.field else {
            self.form_errors.push(error.message);
            return;
        };

        match self.fields.iter_mut().find(|f| f.name() == name) {
            Some(field) => field.push_error(error.message),
            None => {
                warn!(
                    form_id = %self.form_id,
                    field = %name,
                    "cross-field error names an unknown field"
                );
                self.form_errors.push(error.message);
            }
        }
    }
}

/// Read-only view of a form's fields, handed to validators.
#[derive(Debug, Clone, Copy)]
pub struct FormContext<'a> {
    form_id: &'a str,
    fields: &'a [Field],
}

impl<'a> FormContext<'a> {
    pub(crate) fn new(form_id: &'a str, fields: &'a [Field]) -> Self {
        Self { form_id, fields }
    }

    /// Form identifier.
    pub fn form_id(&self) -> &'a str {
        self.form_id
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &'a [Field] {
        self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&'a Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Coerced value of a field.
    pub fn value(&self, name: &str) -> Option<&'a FieldValue> {
        self.field(name).and_then(Field::bound_value)
    }
}

/// Validator over the whole bound form.
///
/// Runs after every field's own chain. Errors naming a field are attached to
/// it; the rest become form-level errors.
pub trait CrossFieldValidator: Send + Sync {
    fn validate(&self, form: &FormContext<'_>) -> Vec<ValidationError>;
}

impl<F> CrossFieldValidator for F
where
    F: Fn(&FormContext<'_>) -> Vec<ValidationError> + Send + Sync,
{
    fn validate(&self, form: &FormContext<'_>) -> Vec<ValidationError> {
        self(form)
    }
}

/// Two fields must hold the same value (e.g., password confirmation).
///
/// The error is attached to the confirmation field. Skipped when either
/// field failed coercion, since that field already carries an error.
#[derive(Debug, Clone)]
pub struct FieldsMatch {
    field: String,
    confirm: String,
    message: String,
}

impl FieldsMatch {
    /// Require `confirm` to equal `field`.
    pub fn new(field: impl Into<String>, confirm: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Must match {field}."),
            field,
            confirm: confirm.into(),
        }
    }

    /// Override the error message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl CrossFieldValidator for FieldsMatch {
    fn validate(&self, form: &FormContext<'_>) -> Vec<ValidationError> {
        match (form.value(&self.field), form.value(&self.confirm)) {
            (Some(a), Some(b)) if a != b => {
                vec![ValidationError::field(&self.confirm, &self.message)]
            }
            _ => Vec::new(),
        }
    }
}

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field name (None for form-level errors).
    pub field: Option<String>,

    /// Error message.
    pub message: String,
}

impl ValidationError {
    /// Create a field-level error.
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(name.into()),
            message: message.into(),
        }
    }

    /// Create a form-level error.
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::form::types::FieldDescriptor;
    use crate::form::validator::Validator;

    fn schema() -> Arc<FormSchema> {
        FormSchema::builder("profile")
            .field(
                "name",
                FieldDescriptor::trimmed_string().validator(Validator::required()),
            )
            .field("age", FieldDescriptor::integer_in(0, 150))
            .field("password", FieldDescriptor::password())
            .field("confirm", FieldDescriptor::password())
            .cross_field(FieldsMatch::new("password", "confirm"))
            .cross_field(|form: &FormContext<'_>| {
                if form.value("name") == Some(&FieldValue::Text("root".to_string())) {
                    vec![ValidationError::form("Reserved name.")]
                } else {
                    Vec::new()
                }
            })
            .without_csrf()
            .build()
            .unwrap()
    }

    #[test]
    fn test_validate_before_bind_is_protocol_error() {
        let mut form = schema().instantiate();
        let err = form.validate().unwrap_err();
        assert!(matches!(
            err,
            FormError::Protocol(ProtocolError::NotBound { .. })
        ));
        assert!(matches!(
            form.is_valid().unwrap_err(),
            FormError::Protocol(ProtocolError::NotEvaluated { .. })
        ));
    }

    #[test]
    fn test_lifecycle_moves_forward_only() {
        let mut form = schema().instantiate();
        form.bind(&Payload::from_pairs([("name", "Ada")])).unwrap();
        assert_eq!(form.phase(), FormPhase::Bound);
        assert!(form.is_valid().is_err());

        assert!(matches!(
            form.bind(&Payload::new()).unwrap_err(),
            FormError::Protocol(ProtocolError::AlreadyBound { .. })
        ));

        assert!(form.validate().unwrap());
        assert_eq!(form.phase(), FormPhase::Validated);
        assert!(matches!(
            form.validate().unwrap_err(),
            FormError::Protocol(ProtocolError::AlreadyValidated { .. })
        ));
    }

    #[test]
    fn test_cross_field_errors() {
        let mut form = schema().instantiate();
        form.bind(&Payload::from_pairs([
            ("name", " root "),
            ("password", "a"),
            ("confirm", "b"),
        ]))
        .unwrap();

        assert!(!form.validate().unwrap());
        assert_eq!(form.field("confirm").unwrap().errors(), ["Must match password."]);
        assert!(form.field("password").unwrap().is_valid());
        assert_eq!(form.form_errors(), ["Reserved name."]);
    }

    #[test]
    fn test_unknown_field_error_becomes_form_error() {
        let schema = FormSchema::builder("x")
            .field("a", FieldDescriptor::string())
            .cross_field(|_: &FormContext<'_>| vec![ValidationError::field("ghost", "boo")])
            .without_csrf()
            .build()
            .unwrap();

        let mut form = schema.instantiate();
        form.bind(&Payload::new()).unwrap();
        assert!(!form.validate().unwrap());
        assert_eq!(form.form_errors(), ["boo"]);
    }

    #[test]
    fn test_coerced_but_invalid_value_is_kept() {
        let mut form = schema().instantiate();
        form.bind(&Payload::from_pairs([("name", "   "), ("age", "42")]))
            .unwrap();
        assert!(!form.validate().unwrap());
        assert_eq!(form.value("name"), Some(&FieldValue::Text(String::new())));
        assert_eq!(form.value("age"), Some(&FieldValue::Integer(42)));
    }

    #[test]
    fn test_validation_error() {
        let field_error = ValidationError::field("email", "Invalid email");
        assert_eq!(field_error.field, Some("email".to_string()));

        let form_error = ValidationError::form("Form expired");
        assert!(form_error.field.is_none());
    }

    #[test]
    fn test_build_ids_are_unique() {
        let schema = schema();
        assert_ne!(schema.instantiate().build_id(), schema.instantiate().build_id());
    }
}
