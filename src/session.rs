//! Wiring for one client session: host signal, auth, gateway, identity cache.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::auth::{AuthResolver, AuthToken, HostBridge};
use crate::clients::{AvatarClient, RequestGateway};
use crate::config::Config;
use crate::services::{IdentityCache, SearchOrchestrator};

/// Everything a front end needs, created once per session. The identity
/// cache lives exactly as long as the session unless cleared explicitly.
#[derive(Clone)]
pub struct Session {
    pub host: Arc<HostBridge>,
    pub search: SearchOrchestrator,
    pub avatars: AvatarClient,
}

impl Session {
    pub fn from_config(config: &Config) -> Result<Self> {
        let host = Arc::new(HostBridge::new());
        let auth = AuthResolver::new(host.clone(), AuthToken::new(config.host.init_data.as_str()));
        let gateway = RequestGateway::from_config(&config.api, auth)?;
        debug!(base_url = %config.api.base_url, "Session created");
        Ok(Self::with_gateway(host, gateway))
    }

    #[must_use]
    pub fn with_gateway(host: Arc<HostBridge>, gateway: RequestGateway) -> Self {
        let cache = Arc::new(IdentityCache::new());
        Self {
            host,
            avatars: AvatarClient::new(gateway.clone()),
            search: SearchOrchestrator::new(gateway, cache),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<IdentityCache> {
        self.search.cache()
    }
}
