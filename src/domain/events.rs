//! Identity notifications.
//!
//! Every terminal transition in the identity cache is published on the
//! cache's event bus so a front end can re-render the affected rows.

use serde::Serialize;

use super::UserId;

/// Terminal outcome of one identity lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum IdentityEvent {
    Resolved {
        id: UserId,
        name: String,
        username: Option<String>,
    },
    Failed {
        id: UserId,
        reason: String,
    },
}

impl IdentityEvent {
    #[must_use]
    pub const fn id(&self) -> UserId {
        match self {
            Self::Resolved { id, .. } | Self::Failed { id, .. } => *id,
        }
    }
}
