//! Construction settings

use std::time::Duration;

use quarry_css::Namespaces;
use quarry_html::ParserMode;
use quarry_net::{ClientConfig, DEFAULT_USER_AGENT};
use url::Url;

/// Default network timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings every selection built by a [`Quarry`](crate::Quarry) inherits
#[derive(Debug, Clone)]
pub struct Config {
    /// Parser for documents and markup values
    pub parser: ParserMode,
    /// Prefixes usable as `prefix|tag` in selectors
    pub namespaces: Namespaces,
    /// Base URL for documents not fetched from a URL
    pub base_url: Option<Url>,
    /// Upper bound on a blocking fetch
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parser: ParserMode::Auto,
            namespaces: Namespaces::default(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    pub fn parser(mut self, parser: ParserMode) -> Self {
        self.parser = parser;
        self
    }

    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix, uri);
        self
    }

    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// XML documents and namespaced queries compare names exactly
    pub fn case_sensitive(&self) -> bool {
        self.parser.is_xml() || !self.namespaces.is_empty()
    }

    pub(crate) fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout_secs: self.timeout.as_secs().max(1),
            user_agent: self.user_agent.clone(),
        }
    }
}
