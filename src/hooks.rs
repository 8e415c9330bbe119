//! Callbacks invoked around every diff.
//!
//! Hooks observe each diff before the provider is asked to plan and after the
//! action is decided. Returning an error aborts the diff; nothing is recorded.

use tracing::{debug, info};

use crate::error::HookError;
use crate::planner::Action;
use crate::state::{Generation, ResourceInstanceAddr};
use crate::value::Value;

/// Observer of diff computations.
pub trait DiffHook: Send + Sync {
    /// Called before planning, with the prior value and the proposed value.
    ///
    /// # Errors
    ///
    /// An error aborts the diff.
    fn pre_diff(
        &self,
        addr: &ResourceInstanceAddr,
        generation: &Generation,
        before: &Value,
        proposed: &Value,
    ) -> Result<(), HookError>;

    /// Called once the action is decided.
    ///
    /// # Errors
    ///
    /// An error aborts the diff.
    fn post_diff(
        &self,
        addr: &ResourceInstanceAddr,
        generation: &Generation,
        action: Action,
        before: &Value,
        after: &Value,
    ) -> Result<(), HookError>;
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl DiffHook for NoopHook {
    fn pre_diff(
        &self,
        _addr: &ResourceInstanceAddr,
        _generation: &Generation,
        _before: &Value,
        _proposed: &Value,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn post_diff(
        &self,
        _addr: &ResourceInstanceAddr,
        _generation: &Generation,
        _action: Action,
        _before: &Value,
        _after: &Value,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hook that logs every diff.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHook;

impl DiffHook for LoggingHook {
    fn pre_diff(
        &self,
        addr: &ResourceInstanceAddr,
        generation: &Generation,
        _before: &Value,
        _proposed: &Value,
    ) -> Result<(), HookError> {
        debug!("Planning {addr} ({generation})");
        Ok(())
    }

    fn post_diff(
        &self,
        addr: &ResourceInstanceAddr,
        generation: &Generation,
        action: Action,
        _before: &Value,
        _after: &Value,
    ) -> Result<(), HookError> {
        match generation {
            Generation::Current => info!("{} {addr}: {action}", action.symbol()),
            Generation::Deposed(key) => {
                info!("{} {addr} (deposed {key}): {action}", action.symbol());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording hook shared by engine tests.

    use std::sync::Mutex;

    use super::{Action, DiffHook, Generation, HookError, ResourceInstanceAddr, Value};

    /// One observed hook call.
    #[derive(Debug, Clone, PartialEq)]
    pub enum HookCall {
        Pre {
            generation: Generation,
            before: Value,
            proposed: Value,
        },
        Post {
            generation: Generation,
            action: Action,
            before: Value,
            after: Value,
        },
    }

    /// Records calls; optionally fails the pre-diff callback.
    #[derive(Debug, Default)]
    pub struct RecordingHook {
        pub calls: Mutex<Vec<HookCall>>,
        pub fail_pre: bool,
    }

    impl RecordingHook {
        pub fn calls(&self) -> Vec<HookCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl DiffHook for RecordingHook {
        fn pre_diff(
            &self,
            _addr: &ResourceInstanceAddr,
            generation: &Generation,
            before: &Value,
            proposed: &Value,
        ) -> Result<(), HookError> {
            if self.fail_pre {
                return Err(HookError::new("stopped by hook"));
            }
            self.calls.lock().unwrap().push(HookCall::Pre {
                generation: generation.clone(),
                before: before.clone(),
                proposed: proposed.clone(),
            });
            Ok(())
        }

        fn post_diff(
            &self,
            _addr: &ResourceInstanceAddr,
            generation: &Generation,
            action: Action,
            before: &Value,
            after: &Value,
        ) -> Result<(), HookError> {
            self.calls.lock().unwrap().push(HookCall::Post {
                generation: generation.clone(),
                action,
                before: before.clone(),
                after: after.clone(),
            });
            Ok(())
        }
    }
}
