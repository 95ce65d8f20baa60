use tracing::debug;
use url::Url;

use super::error::RequestError;
use super::gateway::RequestGateway;
use crate::domain::UserId;

/// Per-user avatar images. Independent of the identity batch: each avatar is
/// its own request, keyed by user id and carrying the host token as `tgauth`.
#[derive(Clone)]
pub struct AvatarClient {
    gateway: RequestGateway,
}

impl AvatarClient {
    #[must_use]
    pub const fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// URL usable directly as an image source.
    pub fn avatar_url(&self, user_id: UserId) -> Result<Url, RequestError> {
        let mut url = self
            .gateway
            .endpoint_url(&format!("/users/{user_id}/avatar"))?;
        let token = self.gateway.auth().resolve();
        if !token.is_empty() {
            url.query_pairs_mut().append_pair("tgauth", token.as_str());
        }
        Ok(url)
    }

    /// Downloads the avatar (webp) bytes.
    pub async fn fetch(&self, user_id: UserId) -> Result<Vec<u8>, RequestError> {
        let url = self.avatar_url(user_id)?;
        let bytes = self.gateway.fetch_bytes(url).await?;
        debug!(%user_id, size = bytes.len(), "Fetched avatar");
        Ok(bytes)
    }
}
