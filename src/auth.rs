//! Host-issued authentication.
//!
//! The mini-app host hands the client a raw init-data string once it is ready.
//! The core never talks to the host directly: it pulls the current value
//! through [`HostSignal::current_token`] and gets pushed refreshes through
//! [`HostSignal::on_token_changed`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

/// Raw init-data string. Empty means anonymous.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("AuthToken(anonymous)")
        } else {
            write!(f, "AuthToken(<{} bytes>)", self.0.len())
        }
    }
}

pub type TokenHandler = Box<dyn Fn(&AuthToken) + Send + Sync>;

/// What the core needs from the host environment.
pub trait HostSignal: Send + Sync {
    /// The host's init data, or `None` while the host has not delivered it yet.
    fn current_token(&self) -> Option<AuthToken>;

    /// Registers a handler invoked every time the host publishes fresh init data.
    fn on_token_changed(&self, handler: TokenHandler);
}

/// In-process host: whoever embeds the client publishes init data here.
///
/// Handlers run synchronously inside [`HostBridge::publish`] and must not
/// register further handlers.
#[derive(Default)]
pub struct HostBridge {
    token: RwLock<Option<AuthToken>>,
    handlers: Mutex<Vec<TokenHandler>>,
}

impl HostBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers init data. Empty data leaves the host unavailable.
    pub fn publish(&self, init_data: impl Into<String>) {
        let token = AuthToken::new(init_data);
        if token.is_empty() {
            debug!("Host published empty init data; staying anonymous");
            return;
        }

        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());

        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(handlers = handlers.len(), "Host init data published");
        for handler in handlers.iter() {
            handler(&token);
        }
    }

    /// Mirrors the host's `available` flag.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl HostSignal for HostBridge {
    fn current_token(&self) -> Option<AuthToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn on_token_changed(&self, handler: TokenHandler) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }
}

/// Session-scoped token cache in front of a [`HostSignal`].
///
/// Never fails: when the host has not spoken yet, the last cached value
/// (initially the configured fallback, possibly empty) is returned.
#[derive(Clone)]
pub struct AuthResolver {
    host: Arc<dyn HostSignal>,
    cached: Arc<RwLock<AuthToken>>,
}

impl AuthResolver {
    pub fn new(host: Arc<dyn HostSignal>, fallback: AuthToken) -> Self {
        let initial = host
            .current_token()
            .filter(|token| !token.is_empty())
            .unwrap_or(fallback);
        let cached = Arc::new(RwLock::new(initial));

        let sink = Arc::clone(&cached);
        host.on_token_changed(Box::new(move |token| {
            if !token.is_empty() {
                *sink.write().unwrap_or_else(PoisonError::into_inner) = token.clone();
            }
        }));

        Self { host, cached }
    }

    /// Resolver with no host and no fallback: every request goes out anonymously.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(Arc::new(HostBridge::new()), AuthToken::anonymous())
    }

    pub fn resolve(&self) -> AuthToken {
        if let Some(fresh) = self.host.current_token().filter(|t| !t.is_empty()) {
            let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
            if *cached != fresh {
                debug!("Picked up fresher host init data");
                *cached = fresh;
            }
            return cached.clone();
        }

        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Host that never delivers anything on pull, only pushes.
    #[derive(Default)]
    struct PushOnlyHost {
        handlers: Mutex<Vec<TokenHandler>>,
    }

    impl PushOnlyHost {
        fn push(&self, raw: &str) {
            let token = AuthToken::new(raw);
            for handler in self.handlers.lock().unwrap().iter() {
                handler(&token);
            }
        }
    }

    impl HostSignal for PushOnlyHost {
        fn current_token(&self) -> Option<AuthToken> {
            None
        }

        fn on_token_changed(&self, handler: TokenHandler) {
            self.handlers.lock().unwrap().push(handler);
        }
    }

    #[test]
    fn no_host_signal_resolves_to_empty_token() {
        let resolver = AuthResolver::anonymous();
        assert!(resolver.resolve().is_empty());
    }

    #[test]
    fn fallback_is_used_until_host_arrives() {
        let host = Arc::new(HostBridge::new());
        let resolver = AuthResolver::new(host.clone(), AuthToken::new("fallback"));
        assert_eq!(resolver.resolve().as_str(), "fallback");
        assert!(!host.is_available());

        host.publish("query_id=1&hash=abc");
        assert!(host.is_available());
        assert_eq!(resolver.resolve().as_str(), "query_id=1&hash=abc");
    }

    #[test]
    fn empty_publish_keeps_cached_value() {
        let host = Arc::new(HostBridge::new());
        let resolver = AuthResolver::new(host.clone(), AuthToken::anonymous());
        host.publish("first");
        host.publish("");

        assert_eq!(resolver.resolve().as_str(), "first");
    }

    #[test]
    fn pushed_refresh_updates_cache() {
        let host = Arc::new(PushOnlyHost::default());
        let resolver = AuthResolver::new(host.clone(), AuthToken::anonymous());
        assert!(resolver.resolve().is_empty());

        host.push("refreshed");
        assert_eq!(resolver.resolve().as_str(), "refreshed");
    }

    #[test]
    fn empty_push_keeps_fallback() {
        let host = Arc::new(PushOnlyHost::default());
        let resolver = AuthResolver::new(host.clone(), AuthToken::new("fallback"));

        host.push("");
        assert_eq!(resolver.resolve().as_str(), "fallback");

        host.push("refreshed");
        host.push("");
        assert_eq!(resolver.resolve().as_str(), "refreshed");
    }

    #[test]
    fn debug_does_not_leak_token() {
        let token = AuthToken::new("hash=secret");
        let printed = format!("{token:?}");
        assert!(!printed.contains("secret"));
        assert_eq!(format!("{:?}", AuthToken::anonymous()), "AuthToken(anonymous)");
    }
}
