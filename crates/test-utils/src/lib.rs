//! formguard test utilities.
//!
//! Fixtures for integration testing: schemas, payload builders, CSRF
//! managers over an in-memory store, and assertion helpers for reports.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formguard::form::{FieldCheck, ValidationOutcome};
use formguard::{
    CsrfConfig, CsrfTokenManager, Field, FieldDescriptor, FieldValue, FormContext, FormSchema,
    MemorySessionStore, Payload, Validator,
};

/// The canonical sign-up schema: `username` (min length 3) and `email`
/// (address check), CSRF enabled.
pub fn signup_schema() -> Arc<FormSchema> {
    FormSchema::builder("signup")
        .field(
            "username",
            FieldDescriptor::string().validator(Validator::min_length(3)),
        )
        .field(
            "email",
            FieldDescriptor::string().validator(Validator::email()),
        )
        .build()
        .unwrap_or_else(|e| panic!("signup schema is valid: {e}"))
}

/// Build a payload from string pairs.
pub fn payload(pairs: &[(&str, &str)]) -> Payload {
    Payload::from_pairs(pairs.iter().copied())
}

/// A CSRF manager over a fresh in-memory store.
pub fn csrf_manager(config: CsrfConfig) -> TestCsrf {
    let store = Arc::new(MemorySessionStore::new());
    let manager = CsrfTokenManager::new(store.clone(), config)
        .unwrap_or_else(|e| panic!("test CSRF config is valid: {e}"));
    TestCsrf { store, manager }
}

/// CSRF manager plus direct access to its backing store.
#[derive(Debug)]
pub struct TestCsrf {
    pub store: Arc<MemorySessionStore>,
    pub manager: CsrfTokenManager,
}

impl TestCsrf {
    /// Issue a token for `session`, panicking on store errors.
    pub fn token(&self, session: &str) -> String {
        self.manager
            .issue(session)
            .unwrap_or_else(|e| panic!("issue failed: {e}"))
    }

    /// `pairs` plus the session's token under the configured field name.
    pub fn signed_payload(&self, session: &str, pairs: &[(&str, &str)]) -> Payload {
        let mut payload = payload(pairs);
        payload.append(self.manager.field_name(), self.token(session));
        payload
    }
}

/// Field check that counts its invocations and returns a fixed outcome.
#[derive(Debug, Clone)]
pub struct CountingCheck {
    calls: Arc<AtomicUsize>,
    outcome: ValidationOutcome,
}

impl CountingCheck {
    /// A check that always returns `outcome`.
    pub fn new(outcome: ValidationOutcome) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome,
        }
    }

    /// A check that always passes.
    pub fn passing() -> Self {
        Self::new(ValidationOutcome::Pass)
    }

    /// How many times the check ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wrap a clone as a validator; the clone shares the counter.
    pub fn validator(&self) -> Validator {
        Validator::custom(self.clone())
    }
}

impl FieldCheck for CountingCheck {
    fn check(&self, _: &FieldValue, _: &Field, _: &FormContext<'_>) -> ValidationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Assertion helpers for error reports.
pub mod assert {
    use formguard::ErrorReport;
    use serde_json::Value;

    /// Assert that a field has exactly `expected` errors, in order.
    pub fn field_errors(report: &ErrorReport, field: &str, expected: &[&str]) {
        let actual = report
            .field_errors(field)
            .unwrap_or_else(|| panic!("no evaluated errors for field '{field}' in {report:?}"));
        assert_eq!(actual, expected, "errors for field '{field}'");
    }

    /// Assert that the report was evaluated and is clean.
    pub fn clean(report: &ErrorReport) {
        assert_eq!(report.is_clean(), Some(true), "expected a clean report, got {report:?}");
    }

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }
}
