use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// Body of `POST /search`. Sent verbatim, never rewritten by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    /// Web id of the chat/group to search in.
    pub ins_id: i64,
    /// 1-based page number.
    pub page: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

impl SearchQuery {
    #[must_use]
    pub fn new(q: impl Into<String>, ins_id: i64, page: i64) -> Self {
        Self {
            q: q.into(),
            ins_id,
            page,
            limit: None,
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Epoch values below this are seconds, anything above is milliseconds.
const SECONDS_CUTOFF: i64 = 2_000_000_000;

/// One indexed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHit {
    pub mongo_id: String,
    pub peer_id: i64,
    #[serde(default)]
    pub from_id: UserId,
    pub msg_id: i64,
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_result: Option<String>,
}

impl MessageHit {
    /// Sender id, unless the message has none.
    #[must_use]
    pub fn sender(&self) -> Option<UserId> {
        self.from_id.is_present().then_some(self.from_id)
    }

    /// Best text to show for the hit: the message itself, then OCR text, then a decoded QR code.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        [&self.message, &self.image_text, &self.qr_result]
            .into_iter()
            .filter_map(Option::as_deref)
            .find(|text| !text.is_empty())
    }

    /// Message time; the index stores either epoch seconds or milliseconds.
    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.date <= 0 {
            return None;
        }
        let millis = if self.date < SECONDS_CUTOFF {
            self.date.checked_mul(1000)?
        } else {
            self.date
        };
        DateTime::from_timestamp_millis(millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub hits: Vec<MessageHit>,
    pub query: String,
    #[serde(rename = "processingTimeMs", default)]
    pub processing_time_ms: i64,
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(rename = "estimatedTotalHits", default)]
    pub estimated_total_hits: i64,
}
