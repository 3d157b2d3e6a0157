//! Input validation.
//!
//! [`Rules`] attach [`Checker`]s to parameter keys; [`validate`] runs every
//! checker and reports all failures at once as a 400 [`StackError`].
//!
//! ```rust,ignore
//! let rules = Rules::new()
//!     .with("name", Require)
//!     .with("admin", Not(Require));
//!
//! validate(&params, &rules)?;
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::StackError;
use lapis_core::codes;
use lapis_core::foundation::ParamBag;

/// A single check on one value.
pub trait Checker: Send + Sync {
    /// Returns `true` when `value` passes. A missing key is `None`.
    fn check(&self, value: Option<&Value>) -> bool;

    /// The failure message for `key`.
    fn message(&self, key: &str) -> String;

    /// Checkers returning `true` are not run.
    fn skip(&self) -> bool {
        false
    }
}

/// Fails on missing keys and `null` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Require;

impl Checker for Require {
    fn check(&self, value: Option<&Value>) -> bool {
        value.is_some_and(|v| !v.is_null())
    }

    fn message(&self, key: &str) -> String {
        format!("{key} is required")
    }
}

/// Inverts another checker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Not<C>(pub C);

impl<C: Checker> Checker for Not<C> {
    fn check(&self, value: Option<&Value>) -> bool {
        !self.0.check(value)
    }

    fn message(&self, key: &str) -> String {
        format!("MUST NOT ({})", self.0.message(key))
    }

    fn skip(&self) -> bool {
        self.0.skip()
    }
}

/// Checkers per key, kept in insertion order.
#[derive(Clone, Default)]
pub struct Rules {
    entries: Vec<(String, Vec<Arc<dyn Checker>>)>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `checker` for `key`.
    pub fn add<C: Checker + 'static>(&mut self, key: impl Into<String>, checker: C) {
        let key = key.into();
        let checker: Arc<dyn Checker> = Arc::new(checker);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, checkers)) => checkers.push(checker),
            None => self.entries.push((key, vec![checker])),
        }
    }

    /// Queues `checker` for `key` (builder pattern).
    pub fn with<C: Checker + 'static>(mut self, key: impl Into<String>, checker: C) -> Self {
        self.add(key, checker);
        self
    }

    /// Removes every checker of `key`.
    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    pub fn get(&self, key: &str) -> &[Arc<dyn Checker>] {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, checkers)| checkers.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arc<dyn Checker>])> {
        self.entries
            .iter()
            .map(|(key, checkers)| (key.as_str(), checkers.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, c)| (k, c.len())))
            .finish()
    }
}

/// Runs `rules` against `input`.
///
/// # Errors
///
/// A [`StackError`] with status 400 holding one entry per failed check.
pub fn validate(input: &ParamBag, rules: &Rules) -> Result<(), StackError> {
    let mut stack = StackError::new().with_status(400);
    for (key, checkers) in rules.iter() {
        let value = input.get(key);
        for checker in checkers.iter().filter(|c| !c.skip()) {
            if !checker.check(value) {
                stack.push(codes::HTTP_BAD_REQUEST, checker.message(key));
            }
        }
    }

    if stack.is_empty() { Ok(()) } else { Err(stack) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Slow;

    impl Checker for Slow {
        fn check(&self, _: Option<&Value>) -> bool {
            false
        }

        fn message(&self, key: &str) -> String {
            format!("{key} was checked")
        }

        fn skip(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_messages() {
        assert_eq!(Require.message("name"), "name is required");
        assert_eq!(Not(Require).message("name"), "MUST NOT (name is required)");
    }

    #[test]
    fn test_require() {
        assert!(Require.check(Some(&json!("ada"))));
        assert!(!Require.check(Some(&Value::Null)));
        assert!(!Require.check(None));
        assert!(Not(Require).check(None));
    }

    #[test]
    fn test_validate_reports_every_failure() {
        let mut input = ParamBag::new();
        input.set("admin", true);

        let rules = Rules::new()
            .with("name", Require)
            .with("email", Require)
            .with("admin", Not(Require))
            .with("name", Slow);

        let stack = validate(&input, &rules).unwrap_err();
        assert_eq!(stack.status, Some(400));
        let messages: Vec<_> = stack.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            ["name is required", "email is required", "MUST NOT (admin is required)"]
        );
    }

    #[test]
    fn test_rules_management() {
        let mut rules = Rules::new().with("name", Require).with("name", Not(Require));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.get("name").len(), 2);
        rules.remove("name");
        assert!(rules.is_empty());
        assert!(validate(&ParamBag::new(), &rules).is_ok());
    }
}
