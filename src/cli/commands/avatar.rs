use std::path::Path;

use anyhow::Context;

use crate::domain::UserId;
use crate::session::Session;

pub async fn cmd_avatar(session: &Session, id: i64, output: Option<&Path>) -> anyhow::Result<()> {
    let user_id = UserId::new(id);

    let Some(path) = output else {
        println!("{}", session.avatars.avatar_url(user_id)?);
        return Ok(());
    };

    let bytes = session.avatars.fetch(user_id).await?;
    tokio::fs::write(path, &bytes)
        .await
        .with_context(|| format!("Failed to write avatar to {}", path.display()))?;
    println!("Saved avatar of {user_id} to {} ({} bytes)", path.display(), bytes.len());

    Ok(())
}
