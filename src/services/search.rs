//! Search with deferred sender enrichment.
//!
//! A search returns its hits as soon as the backend answers. Sender ids that
//! the identity cache has never seen are reserved and fetched in one batched
//! `/users/info` call on a background task; each id then settles on its own.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Method;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::identity_cache::{IdentityCache, IdentityHandle};
use crate::clients::{RequestError, RequestGateway};
use crate::domain::UserId;
use crate::models::{
    MessageHit, SearchQuery, SearchResult, UserInfo, UserInfoRequest, UserInfoResponse,
    UserLookup,
};

pub const SEARCH_ENDPOINT: &str = "/search";
pub const USERS_INFO_ENDPOINT: &str = "/users/info";

const MISSING_FROM_RESPONSE: &str = "missing from identity response";

/// One finished search plus the identity batch it may have started.
#[must_use]
pub struct SearchCycle {
    pub result: SearchResult,
    requested: Vec<UserId>,
    batch: Option<JoinHandle<()>>,
}

impl SearchCycle {
    /// Ids this search sent to the identity batch, in first-seen order.
    #[must_use]
    pub fn requested(&self) -> &[UserId] {
        &self.requested
    }

    /// Waits for the identity batch (if any) and hands back the result.
    pub async fn settled(self) -> SearchResult {
        if let Some(batch) = self.batch {
            if let Err(err) = batch.await {
                warn!(error = %err, "Identity batch task did not complete");
            }
        }
        self.result
    }
}

#[derive(Clone)]
pub struct SearchOrchestrator {
    gateway: RequestGateway,
    cache: Arc<IdentityCache>,
}

impl SearchOrchestrator {
    #[must_use]
    pub const fn new(gateway: RequestGateway, cache: Arc<IdentityCache>) -> Self {
        Self { gateway, cache }
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<IdentityCache> {
        &self.cache
    }

    /// Runs a search; sender names arrive later through the cache.
    ///
    /// # Errors
    ///
    /// Returns the gateway error unchanged when the search call fails. No
    /// identity work is started in that case.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResult, RequestError> {
        Ok(self.search_cycle(query).await?.result)
    }

    /// Like [`SearchOrchestrator::search`], but keeps hold of the identity batch.
    pub async fn search_cycle(&self, query: &SearchQuery) -> Result<SearchCycle, RequestError> {
        info!(query = %query.q, ins_id = query.ins_id, page = query.page, "Searching messages");

        let result: SearchResult = self
            .gateway
            .send_json(SEARCH_ENDPOINT, Method::POST, query)
            .await?;

        debug!(
            hits = result.hits.len(),
            estimated_total = result.estimated_total_hits,
            processing_ms = result.processing_time_ms,
            "Search returned"
        );

        let requested = self.reserve_unseen(result.hits.iter().filter_map(MessageHit::sender));
        let batch = if requested.is_empty() {
            None
        } else {
            let this = self.clone();
            let ids = requested.clone();
            Some(tokio::spawn(async move { this.settle_batch(&ids).await }))
        };

        Ok(SearchCycle {
            result,
            requested,
            batch,
        })
    }

    /// Looks up arbitrary ids through the same batch path, waiting for it.
    pub async fn lookup(&self, ids: impl IntoIterator<Item = UserId>) -> Vec<IdentityHandle> {
        let ids: Vec<UserId> = ids.into_iter().filter(UserId::is_present).collect();
        let requested = self.reserve_unseen(ids.iter().copied());
        if !requested.is_empty() {
            self.settle_batch(&requested).await;
        }
        ids.into_iter()
            .filter_map(|id| self.cache.subscribe(id))
            .collect()
    }

    /// Handle for a sender id, if the cache knows it.
    #[must_use]
    pub fn identity(&self, id: UserId) -> Option<IdentityHandle> {
        self.cache.subscribe(id)
    }

    /// Deduplicates `senders`, drops ids the cache already knows and reserves
    /// the rest. Only ids this call actually reserved are returned.
    fn reserve_unseen(&self, senders: impl IntoIterator<Item = UserId>) -> Vec<UserId> {
        let mut seen = HashSet::new();
        let mut unseen: Vec<UserId> = senders
            .into_iter()
            .filter(|id| seen.insert(*id) && !self.cache.has(*id))
            .collect();
        unseen.retain(|id| self.cache.reserve(*id));
        unseen
    }

    /// Issues the batch for reserved `ids` and settles every one of them.
    async fn settle_batch(&self, ids: &[UserId]) {
        debug!(count = ids.len(), "Requesting identity batch");
        let request = UserInfoRequest {
            user_ids: ids.to_vec(),
        };

        match self
            .gateway
            .send_json::<_, UserInfoResponse>(USERS_INFO_ENDPOINT, Method::POST, &request)
            .await
        {
            Ok(response) => self.apply_batch(ids, response.users),
            Err(err) => {
                warn!(count = ids.len(), error = %err, "Identity batch failed");
                let reason = err.to_string();
                for id in ids {
                    self.cache.reject(*id, reason.as_str());
                }
            }
        }
    }

    /// Entries are matched by their `id` key, never by position.
    fn apply_batch(&self, ids: &[UserId], users: Vec<UserInfo>) {
        let requested: HashSet<UserId> = ids.iter().copied().collect();
        let mut answered = HashSet::new();
        let (mut resolved, mut failed) = (0usize, 0usize);

        for user in users {
            let id = user.id;
            if !requested.contains(&id) {
                debug!(%id, "Ignoring unrequested identity in batch response");
                continue;
            }
            if !answered.insert(id) {
                continue;
            }
            match user.into_lookup() {
                UserLookup::Found { name, username } => {
                    self.cache.resolve(id, name, username);
                    resolved += 1;
                }
                UserLookup::Failed(reason) => {
                    debug!(%id, %reason, "Identity lookup failed");
                    self.cache.reject(id, reason);
                    failed += 1;
                }
            }
        }

        for id in ids.iter().filter(|id| !answered.contains(*id)) {
            self.cache.reject(*id, MISSING_FROM_RESPONSE);
            failed += 1;
        }

        info!(resolved, failed, "Identity batch settled");
    }
}
