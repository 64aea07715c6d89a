//! Document providers
//!
//! A [`DocumentProvider`] fetches markup for a URL and parses it. Pages
//! only ever talk to the provider owned by their [`Session`](crate::Session).

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use scraper::Html;
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;

/// Request headers, name to value. Names are compared case-insensitively
/// by [`set_header`], [`get_header`] and [`merge_headers`].
pub type Headers = BTreeMap<String, String>;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; lazyscrape)";

/// Set `name` to `value`, replacing a header of the same name in any case.
/// The spelling of the latest insert is kept.
pub fn set_header(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
    headers.insert(name, value.into());
}

pub fn get_header<'h>(headers: &'h Headers, name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// `overrides` applied on top of `base`
pub fn merge_headers(base: &Headers, overrides: &Headers) -> Headers {
    let mut merged = Headers::new();
    for (name, value) in base.iter().chain(overrides) {
        set_header(&mut merged, name.as_str(), value.as_str());
    }
    merged
}

pub trait DocumentProvider {
    /// Fetch the markup at `url`, sending `headers`
    fn fetch(&self, url: &str, headers: &Headers) -> Result<String, FetchError>;

    fn parse(&self, markup: &str) -> Html {
        Html::parse_document(markup)
    }
}

/// Settings for [`HttpProvider`]
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Whole-request timeout; `None` waits forever
    pub timeout_secs: Option<u64>,
    /// Sent with every request, below per-schema headers
    pub headers: Headers,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: Some(30),
            headers: Headers::new(),
        }
    }
}

/// Blocking HTTP provider on a single shared `ureq` agent.
///
/// Response bodies are returned for every status code; only transport and
/// read failures are errors.
pub struct HttpProvider {
    agent: ureq::Agent,
    headers: Headers,
}

impl HttpProvider {
    pub fn new(config: HttpConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(config.timeout_secs.map(Duration::from_secs))
                .user_agent(config.user_agent.as_str())
                .http_status_as_error(false)
                .build(),
        );

        Self {
            agent,
            headers: merge_headers(&Headers::new(), &config.headers),
        }
    }
}

impl Default for HttpProvider {
    fn default() -> Self {
        Self::new(HttpConfig::default())
    }
}

impl DocumentProvider for HttpProvider {
    fn fetch(&self, url: &str, headers: &Headers) -> Result<String, FetchError> {
        let merged = merge_headers(&self.headers, headers);

        let mut request = self.agent.get(url);
        for (name, value) in &merged {
            request = request.header(name.as_str(), value.as_str());
        }

        debug!(url, "GET");
        let response = request.call()?;
        debug!(url, status = %response.status(), "response");

        Ok(response.into_body().read_to_string()?)
    }
}

/// One request seen by a [`MemoryProvider`]
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRecord {
    pub url: String,
    pub headers: Headers,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<String, String>,
    requests: Vec<FetchRecord>,
    parses: usize,
}

/// In-memory provider serving fixed markup per URL.
///
/// Clones share state, so a clone kept outside a session can inspect the
/// requests the session made. Unknown URLs fail the fetch.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.insert(url, markup);
        self
    }

    pub fn insert(&self, url: impl Into<String>, markup: impl Into<String>) {
        self.state
            .borrow_mut()
            .documents
            .insert(url.into(), markup.into());
    }

    /// Every fetch so far, in order
    pub fn requests(&self) -> Vec<FetchRecord> {
        self.state.borrow().requests.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.borrow().requests.len()
    }

    pub fn parse_count(&self) -> usize {
        self.state.borrow().parses
    }
}

impl DocumentProvider for MemoryProvider {
    fn fetch(&self, url: &str, headers: &Headers) -> Result<String, FetchError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(FetchRecord {
            url: url.to_string(),
            headers: headers.clone(),
        });

        let markup = state.documents.get(url).cloned();
        markup.ok_or_else(|| format!("no document registered for {}", url).into())
    }

    fn parse(&self, markup: &str) -> Html {
        self.state.borrow_mut().parses += 1;
        Html::parse_document(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_defaults() {
        let config: HttpConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.timeout_secs, Some(30));
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_http_config_overrides() {
        let config: HttpConfig = serde_json::from_str(
            r#"{"user_agent": "bot/1.0", "timeout_secs": null, "headers": {"Accept-Language": "nl"}}"#,
        )
        .unwrap();
        assert_eq!(config.user_agent, "bot/1.0");
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.headers["Accept-Language"], "nl");
    }

    #[test]
    fn test_header_names_ignore_case() {
        let mut headers = Headers::new();
        set_header(&mut headers, "referer", "http://static/");
        set_header(&mut headers, "Referer", "http://h/");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers["Referer"], "http://h/");
        assert_eq!(get_header(&headers, "REFERER"), Some("http://h/"));
        assert_eq!(get_header(&headers, "Accept"), None);
    }

    #[test]
    fn test_merge_headers_overrides_regardless_of_case() {
        let mut base = Headers::new();
        base.insert("x-token".to_string(), "from-config".to_string());
        base.insert("Accept".to_string(), "text/html".to_string());
        let mut overrides = Headers::new();
        overrides.insert("X-Token".to_string(), "from-schema".to_string());

        let merged = merge_headers(&base, &overrides);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["X-Token"], "from-schema");
        assert_eq!(merged["Accept"], "text/html");
    }

    #[test]
    fn test_memory_provider_records_requests() {
        let provider = MemoryProvider::new().with_document("http://h/a", "<p>a</p>");
        let observer = provider.clone();

        let mut headers = Headers::new();
        headers.insert("Referer".to_string(), "http://h/".to_string());

        assert_eq!(provider.fetch("http://h/a", &headers).unwrap(), "<p>a</p>");
        assert!(provider.fetch("http://h/missing", &Headers::new()).is_err());

        let requests = observer.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "http://h/a");
        assert_eq!(requests[0].headers["Referer"], "http://h/");
        assert_eq!(requests[1].url, "http://h/missing");
    }

    #[test]
    fn test_memory_provider_counts_parses() {
        let provider = MemoryProvider::new();
        let doc = provider.parse("<h1>x</h1>");
        assert_eq!(provider.parse_count(), 1);
        assert_eq!(doc.root_element().value().name(), "html");
    }
}
