//! One browser session and lazily resolved element handles.
//!
//! An [`Element`] stores only its role and locator. Every action resolves
//! the locator again, waiting until exactly one element matches, so a handle
//! never goes stale across re-renders.

use crate::config::HarnessConfig;
use crate::driver::{DomEvent, ElementSnapshot, PageDriver};
use crate::keyboard::{parse_sequence, TypeOptions};
use crate::locator::Locator;
use crate::matcher::Matcher;
use crate::network::{Exchange, InterceptionRule, NetworkInterceptor};
use crate::result::{HarnessError, HarnessResult};
use crate::retry::{poll_until, Attempt, RetryPolicy};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Driver, interceptor and configuration for one run
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn PageDriver>,
    network: NetworkInterceptor,
    config: Arc<HarnessConfig>,
    policy: RetryPolicy,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("policy", &self.policy)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start a session: wire a fresh interceptor into the driver
    pub async fn start(driver: Arc<dyn PageDriver>, config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let network = NetworkInterceptor::new().with_request_timeout(config.request_timeout());
        driver.attach_interceptor(network.clone()).await?;
        let policy = RetryPolicy::from_config(&config);
        tracing::info!(base_url = %config.base_url, "session started");
        Ok(Self {
            driver,
            network,
            config: Arc::new(config),
            policy,
        })
    }

    /// Configuration in effect
    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Polling policy for lookups and assertions
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Shared network interceptor
    #[must_use]
    pub const fn network(&self) -> &NetworkInterceptor {
        &self.network
    }

    /// Navigate to `path` relative to the base URL
    pub async fn visit(&self, path: &str) -> HarnessResult<()> {
        let url = self.config.url_for(path);
        tracing::debug!(%url, "visit");
        self.driver.navigate(&url).await
    }

    /// Clear local storage for the application origin
    pub async fn clear_local_storage(&self) -> HarnessResult<()> {
        tracing::debug!("clear local storage");
        self.driver.clear_local_storage().await
    }

    /// Install an interception rule
    pub fn intercept(&self, rule: InterceptionRule) {
        self.network.intercept(rule);
    }

    /// Wait for the next exchange of `alias`
    pub async fn wait_for(&self, alias: &str) -> HarnessResult<Exchange> {
        self.network.wait_for(alias).await
    }

    /// Read the clipboard once
    pub async fn read_clipboard(&self) -> HarnessResult<String> {
        self.driver.read_clipboard().await
    }

    /// Handle for `role`, resolved on each use
    #[must_use]
    pub fn element(&self, role: impl Into<String>, locator: Locator) -> Element {
        Element {
            session: self.clone(),
            role: role.into(),
            locator,
        }
    }

    fn policy_for(&self, locator: &Locator) -> RetryPolicy {
        locator
            .options()
            .timeout
            .map_or(self.policy, |t| self.policy.with_timeout(t))
    }

    /// Wait until `locator` matches exactly one element
    pub async fn resolve(&self, role: &str, locator: &Locator) -> HarnessResult<ElementSnapshot> {
        let css = locator.css();
        let last_count = AtomicUsize::new(0);
        let (driver, selector, counter) = (&self.driver, css.as_str(), &last_count);
        let outcome = poll_until(&self.policy_for(locator), move || async move {
            let mut found = driver.query_all(selector).await?;
            counter.store(found.len(), Ordering::Relaxed);
            let attempt = match found.len() {
                1 => Attempt::Ready(found.remove(0)),
                n => Attempt::Pending(format!("{n} elements")),
            };
            Ok::<_, HarnessError>(attempt)
        })
        .await?;
        outcome.map_err(|exhausted| HarnessError::LookupFailed {
            role: role.to_string(),
            selector: css.clone(),
            matched: last_count.load(Ordering::Relaxed),
            waited_ms: exhausted.waited_ms(),
        })
    }

    /// Close the driver
    pub async fn close(&self) -> HarnessResult<()> {
        self.driver.close().await
    }
}

/// Lazily resolved handle for one semantic role
#[derive(Debug, Clone)]
pub struct Element {
    session: Session,
    role: String,
    locator: Locator,
}

impl Element {
    /// Role name
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Session the handle acts through
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Handle for a descendant of this element
    #[must_use]
    pub fn find(&self, child_role: impl Into<String>, child: Locator) -> Self {
        self.session
            .element(child_role, child.within(&self.locator))
    }

    /// Resolve now and return the element state
    pub async fn snapshot(&self) -> HarnessResult<ElementSnapshot> {
        self.session.resolve(&self.role, &self.locator).await
    }

    async fn resolved_css(&self) -> HarnessResult<String> {
        self.snapshot().await?;
        Ok(self.locator.css())
    }

    /// Empty the field
    pub async fn clear(&self) -> HarnessResult<()> {
        let css = self.resolved_css().await?;
        tracing::debug!(role = %self.role, "clear");
        self.session.driver.clear(&css).await
    }

    /// Type `text` into the field
    pub async fn type_text(&self, text: &str, options: TypeOptions) -> HarnessResult<()> {
        let keys = parse_sequence(text, options)?;
        let css = self.resolved_css().await?;
        tracing::debug!(role = %self.role, keys = keys.len(), "type");
        self.session.driver.type_keys(&css, &keys).await
    }

    /// Set the field value without keystrokes
    pub async fn set_value(&self, value: &str) -> HarnessResult<()> {
        let css = self.resolved_css().await?;
        tracing::debug!(role = %self.role, len = value.len(), "set value");
        self.session.driver.set_value(&css, value).await
    }

    /// Dispatch a synthetic event
    pub async fn trigger(&self, event: DomEvent) -> HarnessResult<()> {
        let css = self.resolved_css().await?;
        tracing::debug!(role = %self.role, %event, "trigger");
        self.session.driver.dispatch_event(&css, event).await
    }

    /// Click
    pub async fn click(&self) -> HarnessResult<()> {
        let css = self.resolved_css().await?;
        tracing::debug!(role = %self.role, "click");
        self.session.driver.click(&css).await
    }

    /// Submit (the element must be a form)
    pub async fn submit(&self) -> HarnessResult<()> {
        let css = self.resolved_css().await?;
        tracing::debug!(role = %self.role, "submit");
        self.session.driver.submit(&css).await
    }

    /// Focus
    pub async fn focus(&self) -> HarnessResult<()> {
        let css = self.resolved_css().await?;
        tracing::debug!(role = %self.role, "focus");
        self.session.driver.focus(&css).await
    }

    /// Current form value (empty when the element has none)
    pub async fn value(&self) -> HarnessResult<String> {
        Ok(self.snapshot().await?.value.unwrap_or_default())
    }

    /// Current text content
    pub async fn text(&self) -> HarnessResult<String> {
        Ok(self.snapshot().await?.text)
    }

    /// Whether exactly one element matches right now, without waiting
    pub async fn is_present(&self) -> HarnessResult<bool> {
        let found = self.session.driver.query_all(&self.locator.css()).await?;
        Ok(found.len() == 1)
    }

    /// Poll until `matcher` holds
    pub async fn should(&self, matcher: impl Into<Matcher>) -> HarnessResult<()> {
        let matcher = matcher.into();
        let css = self.locator.css();
        let (driver, selector, m) = (&self.session.driver, css.as_str(), &matcher);
        let outcome = poll_until(&self.session.policy_for(&self.locator), move || async move {
            let found = driver.query_all(selector).await?;
            Ok::<_, HarnessError>(m.check(&found))
        })
        .await?;
        match outcome {
            Ok(()) => {
                tracing::debug!(role = %self.role, matcher = %matcher, "assertion passed");
                Ok(())
            }
            Err(exhausted) => Err(HarnessError::AssertionFailed {
                role: self.role.clone(),
                matcher: matcher.chainer().to_string(),
                expected: matcher.expected(),
                actual: exhausted.last_observed,
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::MockApp;
    use std::time::Duration;
    use tokio::time::Instant;

    async fn session() -> (Arc<MockApp>, Session) {
        let app = Arc::new(MockApp::new());
        let session = Session::start(app.clone(), HarnessConfig::default())
            .await
            .unwrap();
        session.visit("/").await.unwrap();
        (app, session)
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_single_element() {
        let (_app, session) = session().await;
        let submit = session.element("submit_button", Locator::component("MainPage", "submit"));
        let snap = submit.snapshot().await.unwrap();
        assert_eq!(snap.attribute("data-cy"), Some("MainPage-submit"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_failure_after_timeout() {
        let (_app, session) = session().await;
        let missing = session.element("reset_button", Locator::component("MainPage", "reset"));
        let start = Instant::now();
        let err = missing.click().await.unwrap_err();
        match err {
            HarnessError::LookupFailed {
                role,
                matched,
                waited_ms,
                ..
            } => {
                assert_eq!(role, "reset_button");
                assert_eq!(matched, 0);
                assert_eq!(waited_ms, 4000);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_locator_timeout_override() {
        let (_app, session) = session().await;
        let missing = session.element(
            "reset_button",
            Locator::component("MainPage", "reset").with_timeout(Duration::from_millis(100)),
        );
        let start = Instant::now();
        assert!(missing.snapshot().await.is_err());
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_reports_last_observed() {
        let (_app, session) = session().await;
        let width = session.element(
            "input_current_width",
            Locator::component("MainPage", "inputCurrentWidth"),
        );
        width.type_text("1440px", TypeOptions::default()).await.unwrap();
        width.should(Matcher::HaveValue("1440px".into())).await.unwrap();

        let err = width
            .should(Matcher::HaveValue("769px".into()))
            .await
            .unwrap_err();
        match err {
            HarnessError::AssertionFailed {
                role,
                matcher,
                actual,
                ..
            } => {
                assert_eq!(role, "input_current_width");
                assert_eq!(matcher, "have.value");
                assert_eq!(actual, "value \"1440px\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_find_descendant() {
        let (_app, session) = session().await;
        let button = session.element(
            "toggle_theme_button",
            Locator::component("ToggleTheme", "button"),
        );
        let moon = button.find("icon_moon", Locator::component("ToggleTheme", "iconMoon"));
        moon.should(Matcher::Exist).await.unwrap();
        assert!(moon.is_present().await.unwrap());
    }
}
