pub mod identity_cache;
pub use identity_cache::{IdentityCache, IdentityHandle, IdentityRecord, IdentityState};

pub mod search;
pub use search::{SearchCycle, SearchOrchestrator};
