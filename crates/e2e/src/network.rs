//! Network request interception.
//!
//! Rules substitute a mock response for matching outbound requests. The
//! interceptor is shared between the scenario task (which registers rules
//! and waits on aliases) and the driver's request handler (which calls
//! [`NetworkInterceptor::handle`]). Waiters are woken through a
//! `tokio::sync::Notify`.

use crate::config::DEFAULT_REQUEST_TIMEOUT_MS;
use crate::result::{HarnessError, HarnessResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use url::Url;

/// Endpoint the css-adapt form posts to
pub const ADAPT_CSS_PATH: &str = "/api/adapt-css";

/// HTTP methods for request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET request
    Get,
    /// POST request
    Post,
    /// PUT request
    Put,
    /// DELETE request
    Delete,
    /// PATCH request
    Patch,
    /// OPTIONS request
    Options,
    /// Any method
    Any,
}

impl HttpMethod {
    /// Parse from string; unknown methods map to `Any`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "PATCH" => Self::Patch,
            "OPTIONS" => Self::Options,
            _ => Self::Any,
        }
    }

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Any => "*",
        }
    }

    /// Check if this method matches another
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        *self == Self::Any || *other == Self::Any || *self == *other
    }
}

/// A mocked HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
    /// Content type
    pub content_type: String,
    /// Artificial delay before the page sees the response
    pub delay_ms: u64,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: Vec::new(),
            content_type: "text/plain".to_string(),
            delay_ms: 0,
        }
    }
}

impl MockResponse {
    /// Create a text response
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self {
            body: content.as_bytes().to_vec(),
            ..Self::default()
        }
    }

    /// Create a JSON response
    pub fn json<T: Serialize>(data: &T) -> HarnessResult<Self> {
        Ok(Self {
            body: serde_json::to_vec(data)?,
            content_type: "application/json".to_string(),
            ..Self::default()
        })
    }

    /// Create an error response with a JSON `{"error": ...}` body
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string().into_bytes(),
            content_type: "application/json".to_string(),
            ..Self::default()
        }
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Set content type
    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    /// Set delay
    #[must_use]
    pub const fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Check for a 2xx status
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Get body as string
    #[must_use]
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Pattern for matching request URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Regex match
    Regex(String),
    /// Glob pattern (e.g., "*/api/*")
    Glob(String),
    /// The URL path ends with this path (`/api/adapt-css`)
    Path(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Path-suffix pattern
    #[must_use]
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern),
            Self::Contains(pattern) => url.contains(pattern),
            Self::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(url))
                .unwrap_or(false),
            Self::Glob(pattern) => Self::glob_matches(pattern, url),
            Self::Path(path) => url_path(url).is_some_and(|p| p.ends_with(path.as_str())),
            Self::Any => true,
        }
    }

    fn glob_matches(pattern: &str, url: &str) -> bool {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        regex::Regex::new(&format!("^{body}$"))
            .map(|re| re.is_match(url))
            .unwrap_or(false)
    }
}

impl From<&str> for UrlPattern {
    /// Plain strings are path patterns
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "={p}"),
            Self::Prefix(p) => write!(f, "{p}*"),
            Self::Contains(p) => write!(f, "*{p}*"),
            Self::Regex(p) => write!(f, "/{p}/"),
            Self::Glob(p) | Self::Path(p) => f.write_str(p),
            Self::Any => f.write_str("*"),
        }
    }
}

/// Path component of a URL without query or fragment; relative URLs resolve against a dummy origin
fn url_path(url: &str) -> Option<String> {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost/").and_then(|base| base.join(url)).ok()?
        }
        Err(_) => return None,
    };
    Some(parsed.path().to_string())
}

/// `scheme://host[:port]` of `url`, or `None` for opaque origins such as `about:blank`
pub(crate) fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin
        .is_tuple()
        .then(|| origin.ascii_serialization())
}

/// An outbound request seen by the interceptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterceptedRequest {
    /// Request URL
    pub url: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Request headers
    pub headers: BTreeMap<String, String>,
    /// Request body
    pub body: Option<Vec<u8>>,
}

impl InterceptedRequest {
    /// Create a request without body
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Body as string
    #[must_use]
    pub fn body_string(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Decode the body as JSON
    pub fn body_json<T: DeserializeOwned>(&self) -> HarnessResult<T> {
        let body = self.body.as_deref().ok_or_else(|| HarnessError::AssertionFailed {
            role: self.url.clone(),
            matcher: "request.body".to_string(),
            expected: "a JSON body".to_string(),
            actual: "no body".to_string(),
        })?;
        Ok(serde_json::from_slice(body)?)
    }
}

/// Request body the css-adapt form sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptCssRequest {
    /// CSS source
    pub code: String,
    /// Width the CSS was written for
    pub current_width: String,
    /// Width to rescale to
    pub target_width: String,
}

/// Function computing a response from the intercepted request
pub type ResponseFn = Arc<dyn Fn(&InterceptedRequest) -> MockResponse + Send + Sync>;

/// What a rule answers with
#[derive(Clone)]
pub enum ResponseSpec {
    /// Fixed response
    Static(MockResponse),
    /// Request-aware response
    Handler(ResponseFn),
}

impl ResponseSpec {
    /// Wrap a request-aware function
    pub fn handler(f: impl Fn(&InterceptedRequest) -> MockResponse + Send + Sync + 'static) -> Self {
        Self::Handler(Arc::new(f))
    }

    fn produce(&self, request: &InterceptedRequest) -> MockResponse {
        match self {
            Self::Static(response) => response.clone(),
            Self::Handler(f) => f(request),
        }
    }
}

impl fmt::Debug for ResponseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(response) => f.debug_tuple("Static").field(response).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl From<MockResponse> for ResponseSpec {
    fn from(response: MockResponse) -> Self {
        Self::Static(response)
    }
}

/// A request substitution rule
#[derive(Debug, Clone)]
pub struct InterceptionRule {
    method: HttpMethod,
    pattern: UrlPattern,
    response: ResponseSpec,
    alias: Option<String>,
    times: Option<usize>,
}

impl InterceptionRule {
    /// Create a rule that fires once
    #[must_use]
    pub fn new(
        method: HttpMethod,
        pattern: impl Into<UrlPattern>,
        response: impl Into<ResponseSpec>,
    ) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            response: response.into(),
            alias: None,
            times: Some(1),
        }
    }

    /// Name the rule so scenarios can wait on it
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Fire at most `n` times
    #[must_use]
    pub const fn with_times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Fire on every matching request
    #[must_use]
    pub const fn persistent(mut self) -> Self {
        self.times = None;
        self
    }

    /// Alias, if any
    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Method matched
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    /// URL pattern matched
    #[must_use]
    pub const fn pattern(&self) -> &UrlPattern {
        &self.pattern
    }

    fn matches(&self, request: &InterceptedRequest) -> bool {
        self.method.matches(&request.method) && self.pattern.matches(&request.url)
    }
}

/// A fired rule: request, substituted response and the rule's alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// Request as the page sent it
    pub request: InterceptedRequest,
    /// Response substituted for it
    pub response: MockResponse,
    /// Alias of the rule that fired
    pub alias: Option<String>,
}

#[derive(Debug)]
struct RuleEntry {
    rule: InterceptionRule,
    remaining: Option<usize>,
}

impl RuleEntry {
    fn is_active(&self) -> bool {
        self.remaining != Some(0)
    }
}

#[derive(Debug, Default)]
struct State {
    rules: Vec<RuleEntry>,
    exchanges: Vec<Exchange>,
    unmatched: Vec<InterceptedRequest>,
    /// Per alias, number of exchanges already handed out by `wait_for`
    consumed: HashMap<String, usize>,
}

impl State {
    fn has_alias(&self, alias: &str) -> bool {
        self.rules
            .iter()
            .any(|e| e.rule.alias.as_deref() == Some(alias))
    }

    fn take_next(&mut self, alias: &str) -> Option<Exchange> {
        let seen = self.consumed.get(alias).copied().unwrap_or(0);
        let next = self
            .exchanges
            .iter()
            .filter(|x| x.alias.as_deref() == Some(alias))
            .nth(seen)
            .cloned()?;
        self.consumed.insert(alias.to_string(), seen + 1);
        Some(next)
    }
}

/// Shared interception state
#[derive(Debug, Clone)]
pub struct NetworkInterceptor {
    state: Arc<Mutex<State>>,
    notify: Arc<Notify>,
    request_timeout: Duration,
}

impl Default for NetworkInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkInterceptor {
    /// Create an interceptor with no rules
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            notify: Arc::new(Notify::new()),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    /// Set the bound used by [`NetworkInterceptor::wait_for`]
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking handler must not wedge every later scenario.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Install a rule; later rules take precedence
    pub fn intercept(&self, rule: InterceptionRule) {
        tracing::debug!(
            method = rule.method.as_str(),
            pattern = %rule.pattern,
            alias = rule.alias.as_deref().unwrap_or("-"),
            "intercept registered"
        );
        let remaining = rule.times;
        self.lock().rules.push(RuleEntry { rule, remaining });
    }

    /// Route one outbound request.
    ///
    /// Returns the substituted response, or `None` when no active rule
    /// matches and the request should go to the network.
    pub fn handle(&self, request: InterceptedRequest) -> Option<MockResponse> {
        let fired = {
            let mut state = self.lock();
            let position = state
                .rules
                .iter()
                .rposition(|e| e.is_active() && e.rule.matches(&request));
            match position {
                Some(idx) => {
                    let entry = &mut state.rules[idx];
                    if let Some(n) = entry.remaining.as_mut() {
                        *n -= 1;
                    }
                    Some((entry.rule.response.clone(), entry.rule.alias.clone()))
                }
                None => {
                    state.unmatched.push(request.clone());
                    None
                }
            }
        };

        let Some((spec, alias)) = fired else {
            tracing::warn!(method = request.method.as_str(), url = %request.url, "no interception rule matched");
            return None;
        };

        // Handlers run outside the lock so they may inspect the interceptor.
        let response = spec.produce(&request);
        tracing::debug!(
            url = %request.url,
            status = response.status,
            alias = alias.as_deref().unwrap_or("-"),
            "request intercepted"
        );
        self.lock().exchanges.push(Exchange {
            request,
            response: response.clone(),
            alias,
        });
        self.notify.notify_waiters();
        Some(response)
    }

    /// Wait for the next unconsumed exchange of `alias`
    pub async fn wait_for(&self, alias: &str) -> HarnessResult<Exchange> {
        self.wait_for_with_timeout(alias, self.request_timeout).await
    }

    /// Wait for the next unconsumed exchange of `alias` with an explicit bound
    pub async fn wait_for_with_timeout(
        &self,
        alias: &str,
        timeout: Duration,
    ) -> HarnessResult<Exchange> {
        let start = Instant::now();
        let deadline = start + timeout;
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if !state.has_alias(alias) {
                    return Err(HarnessError::UnknownAlias {
                        alias: alias.to_string(),
                    });
                }
                if let Some(exchange) = state.take_next(alias) {
                    tracing::debug!(alias, "interception resolved");
                    return Ok(exchange);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let waited_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(alias, waited_ms, "interception wait timed out");
                return Err(HarnessError::InterceptionTimeout {
                    alias: alias.to_string(),
                    waited_ms,
                });
            }
        }
    }

    /// Restore the use count of every rule carrying `alias`
    pub fn rearm(&self, alias: &str) -> HarnessResult<()> {
        let mut state = self.lock();
        let mut found = false;
        for entry in state
            .rules
            .iter_mut()
            .filter(|e| e.rule.alias.as_deref() == Some(alias))
        {
            entry.remaining = entry.rule.times;
            found = true;
        }
        if found {
            Ok(())
        } else {
            Err(HarnessError::UnknownAlias {
                alias: alias.to_string(),
            })
        }
    }

    /// Drop all rules, exchanges and unmatched requests
    pub fn reset(&self) {
        let mut state = self.lock();
        let dropped = state.rules.len();
        *state = State::default();
        tracing::debug!(dropped, "interceptor reset");
    }

    /// Requests that fired a rule with `alias`
    #[must_use]
    pub fn requests_for(&self, alias: &str) -> Vec<InterceptedRequest> {
        self.lock()
            .exchanges
            .iter()
            .filter(|x| x.alias.as_deref() == Some(alias))
            .map(|x| x.request.clone())
            .collect()
    }

    /// Every recorded exchange
    #[must_use]
    pub fn exchanges(&self) -> Vec<Exchange> {
        self.lock().exchanges.clone()
    }

    /// Requests no rule matched
    #[must_use]
    pub fn unmatched_requests(&self) -> Vec<InterceptedRequest> {
        self.lock().unmatched.clone()
    }

    /// Number of installed rules (consumed ones included)
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.lock().rules.len()
    }

    /// Number of rules that can still fire
    #[must_use]
    pub fn active_rule_count(&self) -> usize {
        self.lock().rules.iter().filter(|e| e.is_active()).count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn adapt_request(body: &str) -> InterceptedRequest {
        InterceptedRequest::new(
            HttpMethod::Post,
            "https://css-adapt.ai.devgfnl.com/api/adapt-css",
        )
        .with_body(body)
    }

    mod pattern_tests {
        use super::*;

        #[test]
        fn test_path_suffix() {
            let p = UrlPattern::from(ADAPT_CSS_PATH);
            assert!(p.matches("https://host/api/adapt-css"));
            assert!(p.matches("https://host/api/adapt-css?x=1"));
            assert!(p.matches("/api/adapt-css"));
            assert!(!p.matches("https://host/api/adapt-css/extra"));
            assert!(!p.matches("https://host/"));
        }

        #[test]
        fn test_origin_of() {
            assert_eq!(
                origin_of("https://css-adapt.ai.devgfnl.com/").as_deref(),
                Some("https://css-adapt.ai.devgfnl.com")
            );
            assert_eq!(
                origin_of("http://localhost:5173?next=/a/b").as_deref(),
                Some("http://localhost:5173")
            );
            assert_eq!(origin_of("about:blank"), None);
            assert_eq!(origin_of("not a url"), None);
        }

        #[test]
        fn test_path_ignores_query_string() {
            let p = UrlPattern::from(ADAPT_CSS_PATH);
            assert!(!p.matches("https://css-adapt.test?next=/api/adapt-css"));
            assert!(!p.matches("https://css-adapt.test/login?next=/api/adapt-css"));
            assert!(!p.matches("/login#/api/adapt-css"));
        }

        #[test]
        fn test_glob_and_regex() {
            assert!(UrlPattern::Glob("https://*/api/*".into()).matches("https://h/api/adapt-css"));
            assert!(!UrlPattern::Glob("http://*".into()).matches("https://h/"));
            assert!(UrlPattern::Glob("*/adapt-css".into()).matches("https://h/adapt-css/v1/adapt-css"));
            assert!(!UrlPattern::Glob("*/adapt-css".into()).matches("https://h/adapt-css/v1"));
            assert!(UrlPattern::Glob("https://h/a.b?*".into()).matches("https://h/a.b?x=1"));
            assert!(!UrlPattern::Glob("https://h/a.b".into()).matches("https://h/aXb"));
            assert!(UrlPattern::Regex(r"adapt-css$".into()).matches("https://h/api/adapt-css"));
            assert!(!UrlPattern::Regex("(".into()).matches("anything"));
        }

        #[test]
        fn test_method_matching() {
            assert!(HttpMethod::Post.matches(&HttpMethod::Post));
            assert!(HttpMethod::Any.matches(&HttpMethod::Get));
            assert!(!HttpMethod::Get.matches(&HttpMethod::Post));
            assert_eq!(HttpMethod::parse("post"), HttpMethod::Post);
        }
    }

    mod handle_tests {
        use super::*;

        #[test]
        fn test_static_rule_fires_once() {
            let net = NetworkInterceptor::new();
            net.intercept(
                InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("ok"))
                    .alias("convert"),
            );
            assert_eq!(net.handle(adapt_request("{}")).unwrap().body_string(), "ok");
            assert!(net.handle(adapt_request("{}")).is_none());
            assert_eq!(net.unmatched_requests().len(), 1);
            assert_eq!(net.active_rule_count(), 0);
        }

        #[test]
        fn test_latest_rule_wins() {
            let net = NetworkInterceptor::new();
            net.intercept(InterceptionRule::new(
                HttpMethod::Post,
                ADAPT_CSS_PATH,
                MockResponse::text("old"),
            ));
            net.intercept(InterceptionRule::new(
                HttpMethod::Post,
                ADAPT_CSS_PATH,
                MockResponse::text("new"),
            ));
            assert_eq!(net.handle(adapt_request("{}")).unwrap().body_string(), "new");
            assert_eq!(net.handle(adapt_request("{}")).unwrap().body_string(), "old");
        }

        #[test]
        fn test_method_mismatch_passes_through() {
            let net = NetworkInterceptor::new();
            net.intercept(InterceptionRule::new(
                HttpMethod::Post,
                ADAPT_CSS_PATH,
                MockResponse::text("x"),
            ));
            let get = InterceptedRequest::new(HttpMethod::Get, "https://h/api/adapt-css");
            assert!(net.handle(get).is_none());
        }

        #[test]
        fn test_handler_sees_request() {
            let net = NetworkInterceptor::new();
            net.intercept(
                InterceptionRule::new(
                    HttpMethod::Post,
                    ADAPT_CSS_PATH,
                    ResponseSpec::handler(|req| {
                        let body: AdaptCssRequest = req.body_json().unwrap();
                        MockResponse::text(&format!("{}->{}", body.current_width, body.target_width))
                    }),
                )
                .persistent(),
            );
            let body = r#"{"code":".a{}","currentWidth":"1440px","targetWidth":"769px"}"#;
            let response = net.handle(adapt_request(body)).unwrap();
            assert_eq!(response.body_string(), "1440px->769px");
            assert!(net.handle(adapt_request(body)).is_some());
        }

        #[test]
        fn test_rearm_and_reset() {
            let net = NetworkInterceptor::new();
            net.intercept(
                InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("x"))
                    .alias("a"),
            );
            assert!(net.handle(adapt_request("{}")).is_some());
            assert!(net.handle(adapt_request("{}")).is_none());
            net.rearm("a").unwrap();
            assert!(net.handle(adapt_request("{}")).is_some());
            assert!(matches!(net.rearm("b"), Err(HarnessError::UnknownAlias { .. })));

            net.reset();
            assert_eq!(net.rule_count(), 0);
            assert!(net.exchanges().is_empty());
            assert!(net.handle(adapt_request("{}")).is_none());
        }

        #[test]
        fn test_request_body_decodes() {
            let req = adapt_request(r#"{"code":"c","currentWidth":"1px","targetWidth":"2px"}"#);
            let decoded: AdaptCssRequest = req.body_json().unwrap();
            assert_eq!(decoded.code, "c");
            let empty = InterceptedRequest::new(HttpMethod::Post, "/api/adapt-css");
            assert!(empty.body_json::<AdaptCssRequest>().is_err());
        }
    }

    mod wait_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_wait_returns_already_recorded_exchange() {
            let net = NetworkInterceptor::new();
            net.intercept(
                InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("x"))
                    .alias("convert"),
            );
            net.handle(adapt_request("{}"));
            let exchange = net.wait_for("convert").await.unwrap();
            assert_eq!(exchange.alias.as_deref(), Some("convert"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_wakes_on_later_request() {
            let net = NetworkInterceptor::new();
            net.intercept(
                InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("x"))
                    .alias("convert"),
            );
            let page = net.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                page.handle(adapt_request("{}"));
            });
            let exchange = net.wait_for("convert").await.unwrap();
            assert_eq!(exchange.response.body_string(), "x");
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_consumes_one_exchange_at_a_time() {
            let net = NetworkInterceptor::new();
            net.intercept(
                InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("x"))
                    .alias("convert"),
            );
            net.handle(adapt_request("{}"));
            net.wait_for("convert").await.unwrap();
            let err = net
                .wait_for_with_timeout("convert", Duration::from_millis(100))
                .await
                .unwrap_err();
            match err {
                HarnessError::InterceptionTimeout { alias, waited_ms } => {
                    assert_eq!(alias, "convert");
                    assert_eq!(waited_ms, 100);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_unknown_alias() {
            let net = NetworkInterceptor::new();
            let err = net.wait_for("nope").await.unwrap_err();
            assert!(matches!(err, HarnessError::UnknownAlias { .. }));
        }
    }
}
