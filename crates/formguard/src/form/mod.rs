//! Declarative forms: schema, binding, validation and CSRF protection.
//!
//! A submission flows through:
//! - CSRF verification as a mandatory first gate
//! - binding and type coercion of every declared field
//! - each field's validator chain, in declaration order
//! - cross-field validators over the bound form
//! - an [`ErrorReport`] for the renderer

mod binder;
mod coerce;
pub mod csrf;
mod field;
mod instance;
mod report;
mod types;
mod validator;

pub use csrf::{CsrfTokenManager, ThreadRngSource, TokenSource, Verification};
pub use field::Field;
pub use instance::{
    CrossFieldValidator, CsrfField, FieldsMatch, Form, FormContext, FormPhase, ValidationError,
};
pub use report::{ErrorReport, FieldErrors};
pub use types::{FieldDescriptor, FieldType, FieldValue, FormSchema, FormSchemaBuilder, RawValue};
pub use validator::{FieldCheck, ValidationOutcome, Validator};
