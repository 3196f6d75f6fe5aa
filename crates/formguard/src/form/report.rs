//! Error collection for renderers.

use serde::Serialize;

use super::instance::{Form, FormPhase};

/// Errors of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub field: String,
    pub errors: Vec<String>,
}

/// Errors of a form, in declaration order.
///
/// `NotEvaluated` is distinct from an evaluated report with no errors, so a
/// renderer cannot show a success state for a form that was never checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ErrorReport {
    /// Validation has not run yet.
    NotEvaluated,

    /// The CSRF gate refused the submission; fields were never bound.
    Rejected { form_errors: Vec<String> },

    /// Validation ran.
    Evaluated {
        fields: Vec<FieldErrors>,
        form_errors: Vec<String>,
    },
}

impl ErrorReport {
    /// Snapshot the errors of `form`.
    pub fn collect(form: &Form) -> Self {
        match form.phase() {
            FormPhase::Unbound | FormPhase::Bound => ErrorReport::NotEvaluated,
            FormPhase::Rejected => ErrorReport::Rejected {
                form_errors: form.form_errors().to_vec(),
            },
            FormPhase::Validated => ErrorReport::Evaluated {
                fields: form
                    .fields()
                    .iter()
                    .map(|f| FieldErrors {
                        field: f.name().to_string(),
                        errors: f.errors().to_vec(),
                    })
                    .collect(),
                form_errors: form.form_errors().to_vec(),
            },
        }
    }

    /// Whether validation has produced a verdict.
    pub fn is_evaluated(&self) -> bool {
        !matches!(self, ErrorReport::NotEvaluated)
    }

    /// `Some(true)` when evaluated without errors, `None` before evaluation.
    pub fn is_clean(&self) -> Option<bool> {
        match self {
            ErrorReport::NotEvaluated => None,
            ErrorReport::Rejected { .. } => Some(false),
            ErrorReport::Evaluated {
                fields,
                form_errors,
            } => Some(form_errors.is_empty() && fields.iter().all(|f| f.errors.is_empty())),
        }
    }

    /// Errors of one field. `None` before evaluation, after a rejection, or
    /// for an unknown field.
    pub fn field_errors(&self, name: &str) -> Option<&[String]> {
        match self {
            ErrorReport::Evaluated { fields, .. } => fields
                .iter()
                .find(|f| f.field == name)
                .map(|f| f.errors.as_slice()),
            _ => None,
        }
    }

    /// Form-level errors; empty before evaluation.
    pub fn form_errors(&self) -> &[String] {
        match self {
            ErrorReport::NotEvaluated => &[],
            ErrorReport::Rejected { form_errors } | ErrorReport::Evaluated { form_errors, .. } => {
                form_errors
            }
        }
    }

    /// Total number of messages.
    pub fn error_count(&self) -> usize {
        let field_count = match self {
            ErrorReport::Evaluated { fields, .. } => fields.iter().map(|f| f.errors.len()).sum(),
            _ => 0,
        };
        field_count + self.form_errors().len()
    }
}
