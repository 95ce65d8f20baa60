use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;

use crate::models::{MessageHit, SearchQuery};
use crate::services::IdentityHandle;
use crate::session::Session;

use super::describe_identity;

const PREVIEW_CHARS: usize = 80;

/// Prints hits right away, then the sender names once their lookups settle
/// (or `wait` runs out).
pub async fn cmd_search(
    session: &Session,
    query: SearchQuery,
    wait: Duration,
) -> anyhow::Result<()> {
    println!("Searching for: {}", query.q);

    let result = session
        .search
        .search(&query)
        .await
        .context("Search failed")?;

    if result.hits.is_empty() {
        println!("No messages found matching '{}'", result.query);
        return Ok(());
    }

    println!();
    println!(
        "~{} messages ({} ms), showing {} from offset {}:",
        result.estimated_total_hits,
        result.processing_time_ms,
        result.hits.len(),
        result.offset
    );
    println!("{:-<60}", "");
    for hit in &result.hits {
        print_hit(session, hit);
    }

    let senders: BTreeSet<_> = result.hits.iter().filter_map(MessageHit::sender).collect();
    let waiting: Vec<IdentityHandle> = senders
        .iter()
        .filter_map(|id| session.search.identity(*id))
        .filter(|handle| !handle.current().state.is_terminal())
        .collect();
    if waiting.is_empty() {
        return Ok(());
    }

    let settled = join_all(waiting.into_iter().map(IdentityHandle::settled));
    if tokio::time::timeout(wait, settled).await.is_err() {
        println!();
        println!("Sender names are still loading; ids are shown instead");
        return Ok(());
    }

    println!();
    println!("Senders:");
    for id in senders {
        if let Some(record) = session.cache().get(id) {
            println!("• {}", describe_identity(&record));
        }
    }

    Ok(())
}

fn print_hit(session: &Session, hit: &MessageHit) {
    let sender = hit
        .sender()
        .and_then(|id| session.cache().get(id))
        .map_or_else(|| "unknown sender".to_string(), |record| record.display_name());
    let when = hit
        .timestamp()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let text: String = hit
        .text()
        .unwrap_or("(no text)")
        .chars()
        .take(PREVIEW_CHARS)
        .collect();

    println!("• [{when}] {sender}: {text}");
    println!("  Chat: {} | Message: {}", hit.peer_id, hit.msg_id);
}
