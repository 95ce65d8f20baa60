use crate::domain::UserId;
use crate::session::Session;

use super::describe_identity;

pub async fn cmd_users(session: &Session, ids: &[i64]) -> anyhow::Result<()> {
    let handles = session
        .search
        .lookup(ids.iter().copied().map(UserId::from))
        .await;

    if handles.is_empty() {
        println!("No valid user ids given");
        return Ok(());
    }

    for handle in handles {
        println!("• {}", describe_identity(&handle.current()));
    }

    Ok(())
}
