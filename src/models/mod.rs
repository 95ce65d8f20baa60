pub mod search;
pub mod user;

pub use search::{MessageHit, SearchQuery, SearchResult};
pub use user::{UserInfo, UserInfoRequest, UserInfoResponse, UserLookup};
