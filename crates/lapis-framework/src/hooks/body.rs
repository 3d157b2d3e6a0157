use async_trait::async_trait;

use super::BODY_PRIORITY;
use crate::error::{DispatchError, DispatchResult, HttpError};
use crate::hook::{Hook, SetUp};
use lapis_core::error::CodecError;
use lapis_core::foundation::Connection;
use lapis_core::scheduler::Prioritized;

/// Decodes the request body with the codec for its content type and stores
/// the result as the request input.
///
/// An empty body leaves the input unset. A body the codec rejects is a bad
/// request; a content type without a codec is not.
#[derive(Debug, Clone)]
pub struct BodyHook {
    priority: i32,
}

impl Default for BodyHook {
    fn default() -> Self {
        Self {
            priority: BODY_PRIORITY,
        }
    }
}

impl BodyHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the tier (builder pattern).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[async_trait]
impl SetUp for BodyHook {
    async fn set_up(&self, conn: &Connection) -> DispatchResult<()> {
        if conn.request().input().is_some() {
            return Ok(());
        }

        let input = conn.read_input().map_err(|e| match e {
            CodecError::NotFound(_) => DispatchError::from(e),
            _ => HttpError::bad_request(e.to_string()).into(),
        })?;

        if let Some(input) = input {
            conn.request_mut().set_input(input);
        }
        Ok(())
    }
}

impl Prioritized for BodyHook {
    fn priority(&self) -> i32 {
        self.priority
    }
}

impl Hook for BodyHook {
    fn name(&self) -> &str {
        "body"
    }

    fn as_set_up(&self) -> Option<&dyn SetUp> {
        Some(self)
    }
}
