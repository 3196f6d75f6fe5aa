//! Error types for binding, validation and CSRF verification.
//!
//! Field-level problems (coercion and validator failures) never surface as
//! `Err`: they are recorded on the field and reported through
//! [`ErrorReport`](crate::form::ErrorReport). Only API misuse, store failures
//! and bad configuration are returned to the caller.

use thiserror::Error;

/// Errors returned to the caller of the form API.
#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Misuse of the form lifecycle. These are programming errors, not user errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("form '{form_id}' must be bound before it is validated")]
    NotBound { form_id: String },

    #[error("form '{form_id}' was already bound; form instances are single-use")]
    AlreadyBound { form_id: String },

    #[error("form '{form_id}' was already validated")]
    AlreadyValidated { form_id: String },

    #[error("form '{form_id}' has not been evaluated yet")]
    NotEvaluated { form_id: String },

    #[error("form schema '{form_id}' declares field '{field}' more than once")]
    DuplicateField { form_id: String, field: String },
}

/// Failure reported by a [`SessionStore`](crate::session::SessionStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("CSRF tokens need at least {min} random bytes, got {actual}")]
    TokenTooShort { min: usize, actual: usize },

    #[error("CSRF token lifetime must be greater than zero")]
    ZeroLifetime,

    #[error("CSRF field name must not be empty")]
    EmptyFieldName,
}

/// Raw input that could not be converted to a field's declared type.
///
/// The `Display` text is the fixed message recorded on the field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("Not a valid integer value.")]
    InvalidInteger,

    #[error("Number must be between {min} and {max}.")]
    IntegerOutOfRange { min: i64, max: i64 },

    #[error("Not a valid float value.")]
    InvalidFloat,

    #[error("Not a valid email address.")]
    InvalidEmail,

    #[error("Not a valid choice.")]
    InvalidChoice,

    #[error("'{0}' is not a valid choice for this field.")]
    InvalidChoices(String),
}

/// Why a CSRF token was rejected.
///
/// Used for logging and tests only. Users always see
/// [`CsrfFailure::USER_MESSAGE`] regardless of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CsrfFailure {
    #[error("CSRF token missing")]
    Missing,

    #[error("CSRF token expired")]
    Expired,

    #[error("CSRF token mismatch")]
    Mismatch,
}

impl CsrfFailure {
    /// The single message shown to users for any CSRF rejection.
    pub const USER_MESSAGE: &'static str = "Invalid or expired form token. Please try again.";

    /// Short machine-readable reason, for structured logs.
    pub fn reason(self) -> &'static str {
        match self {
            CsrfFailure::Missing => "missing",
            CsrfFailure::Expired => "expired",
            CsrfFailure::Mismatch => "mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csrf_reasons_share_user_message() {
        for failure in [CsrfFailure::Missing, CsrfFailure::Expired, CsrfFailure::Mismatch] {
            assert_ne!(failure.to_string(), CsrfFailure::USER_MESSAGE);
        }
        assert_eq!(CsrfFailure::Expired.reason(), "expired");
    }

    #[test]
    fn coercion_messages() {
        assert_eq!(
            CoercionError::InvalidInteger.to_string(),
            "Not a valid integer value."
        );
        assert_eq!(
            CoercionError::IntegerOutOfRange { min: 0, max: 10 }.to_string(),
            "Number must be between 0 and 10."
        );
    }

    #[test]
    fn protocol_error_wraps() {
        let err: FormError = ProtocolError::NotBound {
            form_id: "signup".to_string(),
        }
        .into();
        assert!(err.to_string().contains("must be bound"));
    }
}
