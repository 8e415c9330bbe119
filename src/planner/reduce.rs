//! Reduction of changes to the half an execution node performs.

use std::borrow::Cow;
use std::fmt;
use tracing::trace;

use super::change::{Action, ResourceInstanceChange};
use crate::value::{Marks, Value};

/// Role of the execution node a change is reduced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// The node destroys objects.
    Destroy,
    /// The node creates or updates objects.
    Apply,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Destroy => "destroy",
            Self::Apply => "apply",
        };
        write!(f, "{s}")
    }
}

/// Reduces `change` to the single action `role` performs.
///
/// The input is never modified; it is returned borrowed when there is
/// nothing to reduce.
#[must_use]
pub fn reduce(change: &ResourceInstanceChange, role: NodeRole) -> Cow<'_, ResourceInstanceChange> {
    let reduced = match (role, change.action) {
        (NodeRole::Destroy, Action::Delete) => None,
        (NodeRole::Destroy, Action::CreateThenDelete | Action::DeleteThenCreate) => Some(
            with_action(
                change,
                Action::Delete,
                change.before.clone(),
                Value::null(change.before.ty()),
                (change.before_marks.clone(), Marks::new()),
            ),
        ),
        (NodeRole::Destroy, _) | (NodeRole::Apply, Action::Delete) => Some(with_action(
            change,
            Action::NoOp,
            change.before.clone(),
            change.before.clone(),
            (change.before_marks.clone(), change.before_marks.clone()),
        )),
        (NodeRole::Apply, Action::CreateThenDelete | Action::DeleteThenCreate) => {
            Some(with_action(
                change,
                Action::Create,
                Value::null(change.after.ty()),
                change.after.clone(),
                (Marks::new(), change.after_marks.clone()),
            ))
        }
        (NodeRole::Apply, _) => None,
    };

    match reduced {
        Some(reduced) => {
            if reduced.action != change.action {
                trace!(
                    "{} change simplified from {} to {} for {role} node",
                    change.display_addr(),
                    change.action,
                    reduced.action
                );
            }
            Cow::Owned(reduced)
        }
        None => Cow::Borrowed(change),
    }
}

fn with_action(
    change: &ResourceInstanceChange,
    action: Action,
    before: Value,
    after: Value,
    (before_marks, after_marks): (Marks, Marks),
) -> ResourceInstanceChange {
    ResourceInstanceChange {
        addr: change.addr.clone(),
        deposed_key: change.deposed_key.clone(),
        provider_addr: change.provider_addr.clone(),
        action,
        before,
        after,
        before_marks,
        after_marks,
        private: change.private.clone(),
        required_replace: change.required_replace.clone(),
    }
}
