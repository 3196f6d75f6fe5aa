//! formguard
//!
//! Binds untrusted request data to typed form fields, validates it, and
//! guards submissions with per-session CSRF tokens.
//!
//! ```
//! use std::sync::Arc;
//!
//! use formguard::{
//!     CsrfConfig, CsrfTokenManager, FieldDescriptor, FormSchema, MemorySessionStore, Payload,
//!     Validator,
//! };
//!
//! let schema = FormSchema::builder("signup")
//!     .field("username", FieldDescriptor::string().validator(Validator::min_length(3)))
//!     .field("email", FieldDescriptor::email().validator(Validator::email()))
//!     .build()?;
//!
//! let csrf = CsrfTokenManager::new(Arc::new(MemorySessionStore::new()), CsrfConfig::default())?;
//!
//! // Render: attach the session's token.
//! let mut page = schema.instantiate();
//! let token = page.issue_csrf_token(&csrf, "session-1")?.token.clone();
//!
//! // Submit: a fresh instance per request.
//! let payload = Payload::from_pairs([
//!     ("username", "alice"),
//!     ("email", "a@b.com"),
//!     ("csrf_token", token.as_str()),
//! ]);
//! let mut form = schema.instantiate();
//! assert!(form.submit(&payload, &csrf, "session-1")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod form;
pub mod payload;
pub mod session;

pub use config::CsrfConfig;
pub use error::{
    CoercionError, ConfigError, CsrfFailure, FormError, ProtocolError, SessionError,
};
pub use form::{
    CrossFieldValidator, CsrfTokenManager, ErrorReport, Field, FieldDescriptor, FieldType,
    FieldValue, FieldsMatch, Form, FormContext, FormPhase, FormSchema, ValidationError, Validator,
    Verification,
};
pub use payload::Payload;
pub use session::{MemorySessionStore, SessionEntry, SessionStore};
