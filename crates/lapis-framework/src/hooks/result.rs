use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{DispatchError, DispatchResult, ErrorItem};
use crate::hook::{HandlerResult, Hook, TearDown};
use crate::rescuer::status_for_code;
use lapis_core::foundation::Connection;
use lapis_core::scheduler::{DEFAULT_PRIORITY, Prioritized};

/// Writes the handler outcome into the response.
///
/// A successful, non-null result becomes the response content. Coded errors
/// ([`HttpError`](crate::error::HttpError) and
/// [`StackError`](crate::error::StackError)) become an
/// `{"errors": [...]}` payload with the error status, or the status derived
/// from the first code. Every other error is left for the rescuer.
#[derive(Debug, Clone)]
pub struct ResultHook {
    priority: i32,
}

impl Default for ResultHook {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
        }
    }
}

impl ResultHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the tier (builder pattern).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

fn coded_items(err: &DispatchError) -> Option<Vec<ErrorItem>> {
    match err {
        DispatchError::Http(e) => Some(vec![ErrorItem::new(&e.code, &e.message)]),
        DispatchError::Stack(e) if !e.is_empty() => Some(e.errors.clone()),
        _ => None,
    }
}

#[async_trait]
impl TearDown for ResultHook {
    async fn tear_down(&self, conn: &Connection, result: &HandlerResult) -> DispatchResult<()> {
        match result {
            Ok(Value::Null) => {}
            Ok(value) => conn.response().set_content(value.clone()),
            Err(err) => {
                if let Some(items) = coded_items(err) {
                    let status = err.status().unwrap_or_else(|| status_for_code(err.code()));
                    let mut response = conn.response();
                    response.set_status(status);
                    response.set_content(json!({ "errors": items }));
                }
            }
        }
        Ok(())
    }
}

impl Prioritized for ResultHook {
    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Hook for ResultHook {
    fn name(&self) -> &str {
        "result"
    }

    fn as_tear_down(&self) -> Option<&dyn TearDown> {
        Some(self)
    }
}
