mod avatar;
mod search;
mod users;

pub use avatar::cmd_avatar;
pub use search::cmd_search;
pub use users::cmd_users;

use crate::services::{IdentityRecord, IdentityState};

fn describe_identity(record: &IdentityRecord) -> String {
    match &record.state {
        IdentityState::Resolved {
            name,
            username: Some(username),
        } => format!("{name} (@{username}) [{}]", record.id),
        IdentityState::Resolved {
            name,
            username: None,
        } => format!("{name} [{}]", record.id),
        IdentityState::Pending => format!("{} (name loading)", record.id),
        IdentityState::Failed { reason } => {
            format!("{} (name unavailable: {reason})", record.id)
        }
    }
}
