//! Client configuration.
//!
//! [`ClientOptions`] is the partial configuration returned by a provider's
//! factory. [`ClientConfig`] is the complete configuration the client runs
//! with: mode-dependent defaults from [`ClientConfig::defaults_for`], with
//! every option the factory set taking precedence.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::link::Link;
use crate::mode::ExecutionMode;

/// How long after construction network-only queries are served from the
/// cache, so restored data is used instead of being refetched.
pub const DEFAULT_FORCED_FETCH_DELAY: Duration = Duration::from_millis(100);

/// Where a query looks for its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FetchPolicy {
    /// Use cached data when present, otherwise go to the network.
    #[default]
    CacheFirst,
    /// Always go to the network, then update the cache.
    NetworkOnly,
    /// Never go to the network.
    CacheOnly,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server rendering: network-only queries are served cache-first.
    pub ssr_mode: bool,

    /// Window after construction during which network-only queries are
    /// served cache-first.
    pub forced_fetch_delay: Duration,

    /// Log every operation at `debug`.
    pub dev_tools: bool,

    /// Policy for queries that do not pick one.
    pub default_fetch_policy: FetchPolicy,

    /// Client name sent with every operation.
    pub name: Option<String>,

    /// Client version sent with every operation.
    pub version: Option<String>,
}

impl ClientConfig {
    /// Defaults for a client running in `mode`.
    #[must_use]
    pub const fn defaults_for(mode: ExecutionMode) -> Self {
        Self {
            ssr_mode: mode.is_server(),
            forced_fetch_delay: DEFAULT_FORCED_FETCH_DELAY,
            dev_tools: !mode.is_server(),
            default_fetch_policy: FetchPolicy::CacheFirst,
            name: None,
            version: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::defaults_for(ExecutionMode::Client)
    }
}

/// Partial configuration returned by a provider's factory.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use universal_query::mode::ExecutionMode;
/// use universal_query::options::{ClientConfig, ClientOptions};
///
/// let options = ClientOptions::new()
///     .with_ssr_mode(false)
///     .with_forced_fetch_delay(Duration::from_millis(250));
///
/// let config = options.resolve(ClientConfig::defaults_for(ExecutionMode::Server));
/// assert!(!config.ssr_mode);
/// assert!(!config.dev_tools);
/// assert_eq!(config.forced_fetch_delay, Duration::from_millis(250));
/// ```
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub ssr_mode: Option<bool>,
    pub forced_fetch_delay: Option<Duration>,
    pub dev_tools: Option<bool>,
    pub default_fetch_policy: Option<FetchPolicy>,
    pub name: Option<String>,
    pub version: Option<String>,
    /// Replaces the default [`InMemoryCache`](crate::cache::InMemoryCache).
    pub cache: Option<Arc<dyn Cache>>,
    /// Appended as the last link of the chain.
    pub link: Option<Arc<dyn Link>>,
}

impl ClientOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ssr_mode(mut self, ssr_mode: bool) -> Self {
        self.ssr_mode = Some(ssr_mode);
        self
    }

    #[must_use]
    pub fn with_forced_fetch_delay(mut self, delay: Duration) -> Self {
        self.forced_fetch_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_dev_tools(mut self, enabled: bool) -> Self {
        self.dev_tools = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_default_fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.default_fetch_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &impl ToString) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: &impl ToString) -> Self {
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_link(mut self, link: Arc<dyn Link>) -> Self {
        self.link = Some(link);
        self
    }

    /// Overlays the options that are set onto `defaults`.
    #[must_use]
    pub fn resolve(&self, defaults: ClientConfig) -> ClientConfig {
        ClientConfig {
            ssr_mode: self.ssr_mode.unwrap_or(defaults.ssr_mode),
            forced_fetch_delay: self
                .forced_fetch_delay
                .unwrap_or(defaults.forced_fetch_delay),
            dev_tools: self.dev_tools.unwrap_or(defaults.dev_tools),
            default_fetch_policy: self
                .default_fetch_policy
                .unwrap_or(defaults.default_fetch_policy),
            name: self.name.clone().or(defaults.name),
            version: self.version.clone().or(defaults.version),
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("ssr_mode", &self.ssr_mode)
            .field("forced_fetch_delay", &self.forced_fetch_delay)
            .field("dev_tools", &self.dev_tools)
            .field("default_fetch_policy", &self.default_fetch_policy)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("cache", &self.cache)
            .field("link", &self.link.as_ref().map(|link| link.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    #[test]
    fn test_server_defaults() {
        let config = ClientConfig::defaults_for(ExecutionMode::Server);
        assert!(config.ssr_mode);
        assert!(!config.dev_tools);
        assert_eq!(config.forced_fetch_delay, Duration::from_millis(100));
        assert_eq!(config.default_fetch_policy, FetchPolicy::CacheFirst);
    }

    #[test]
    fn test_client_defaults() {
        let config = ClientConfig::defaults_for(ExecutionMode::Client);
        assert!(!config.ssr_mode);
        assert!(config.dev_tools);
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_empty_options_keep_defaults() {
        let defaults = ClientConfig::defaults_for(ExecutionMode::Server);
        assert_eq!(ClientOptions::new().resolve(defaults.clone()), defaults);
    }

    #[test]
    fn test_every_option_overrides() {
        let options = ClientOptions::new()
            .with_ssr_mode(false)
            .with_forced_fetch_delay(Duration::ZERO)
            .with_dev_tools(true)
            .with_default_fetch_policy(FetchPolicy::NetworkOnly)
            .with_name(&"storefront")
            .with_version(&"1.2.3");

        let config = options.resolve(ClientConfig::defaults_for(ExecutionMode::Server));
        assert_eq!(
            config,
            ClientConfig {
                ssr_mode: false,
                forced_fetch_delay: Duration::ZERO,
                dev_tools: true,
                default_fetch_policy: FetchPolicy::NetworkOnly,
                name: Some("storefront".to_string()),
                version: Some("1.2.3".to_string()),
            }
        );
    }

    #[test]
    fn test_debug_does_not_require_debug_link() {
        let options = ClientOptions::new().with_cache(Arc::new(InMemoryCache::new()));
        let rendered = format!("{options:?}");
        assert!(rendered.contains("ClientOptions"));
        assert!(rendered.contains("InMemoryCache"));
    }
}
