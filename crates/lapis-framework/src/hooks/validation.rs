use async_trait::async_trait;
use serde_json::Value;

use super::VALIDATION_PRIORITY;
use crate::error::DispatchResult;
use crate::hook::{Hook, SetUp};
use crate::validation::{Rules, validate};
use lapis_core::foundation::{Connection, ParamBag};
use lapis_core::scheduler::Prioritized;

/// Rejects requests whose parameters and input break the rules.
///
/// Keys are looked up in the request parameters, overlaid with the fields
/// of the decoded input when it is an object. Install a
/// [`BodyHook`](super::BodyHook) to have the input decoded first.
#[derive(Debug, Clone)]
pub struct ValidationHook {
    rules: Rules,
    priority: i32,
}

impl ValidationHook {
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            priority: VALIDATION_PRIORITY,
        }
    }

    /// Overrides the tier (builder pattern).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }
}

#[async_trait]
impl SetUp for ValidationHook {
    async fn set_up(&self, conn: &Connection) -> DispatchResult<()> {
        let subject = {
            let request = conn.request();
            let mut subject: ParamBag = request.params().clone();
            if let Some(Value::Object(fields)) = request.input() {
                subject.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            subject
        };

        validate(&subject, &self.rules)?;
        Ok(())
    }
}

impl Prioritized for ValidationHook {
    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Hook for ValidationHook {
    fn name(&self) -> &str {
        "validation"
    }

    fn as_set_up(&self) -> Option<&dyn SetUp> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::validation::Require;
    use lapis_core::foundation::{BufferedWriter, Request};
    use serde_json::json;
    use std::sync::Arc;

    fn conn(request: Request) -> Connection {
        Connection::new(request, Arc::new(BufferedWriter::new()))
    }

    #[tokio::test]
    async fn test_reads_params_and_input() {
        let hook = ValidationHook::new(Rules::new().with("page", Require).with("name", Require));

        let conn = conn(Request::new("POST", "/users?page=1"));
        conn.request_mut().set_input(json!({"name": "ada"}));
        hook.set_up(&conn).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_is_stack_error() {
        let hook = ValidationHook::new(Rules::new().with("name", Require));
        let err = hook
            .set_up(&conn(Request::new("POST", "/users")))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        let DispatchError::Stack(stack) = err else {
            panic!("expected a stack error");
        };
        assert_eq!(stack.errors[0].message, "name is required");
    }
}
