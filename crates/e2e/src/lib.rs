//! css-adapt-e2e: end-to-end harness for the css-adapt form
//!
//! Drives the css-adapt web application (a form that rescales CSS from a
//! current viewport width to a target width) through a real browser or an
//! in-memory stand-in, and checks theme toggling, conversion, input
//! validation and the copy-to-clipboard flow.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ Scenarios    │──►│ Page objects │──►│ Locator map  │──►│ PageDriver   │
//! │ (suite)      │   │ Form, Toasts │   │ data-cy      │   │ CDP or mock  │
//! └──────┬───────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!        │                                                        │
//!        ├────────────► NetworkInterceptor ◄──────────────────────┘
//!        ├────────────► FixtureStore
//!        └────────────► CssValidator (oracle)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use css_adapt_e2e::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> HarnessResult<()> {
//! let ctx = ScenarioContext::start(
//!     Arc::new(MockApp::new()),
//!     HarnessConfig::default(),
//!     Arc::new(SyntaxValidator::new()),
//! )
//! .await?;
//! let report = SuiteRunner::new().run(&css_adapt_suite(), &ctx).await;
//! assert!(report.all_passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_frames))]

#[allow(clippy::missing_errors_doc)]
mod clipboard;
#[allow(clippy::missing_errors_doc)]
mod config;
mod driver;
#[allow(clippy::missing_errors_doc)]
mod fixture;
#[allow(clippy::missing_errors_doc)]
mod keyboard;
#[allow(clippy::missing_errors_doc)]
mod locator;
#[allow(clippy::missing_errors_doc)]
mod matcher;
#[allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
mod network;
#[allow(clippy::missing_errors_doc)]
mod oracle;
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
mod page_object;
mod result;
#[allow(clippy::missing_errors_doc)]
mod retry;
#[allow(clippy::missing_errors_doc)]
mod scenario;
#[allow(clippy::missing_errors_doc)]
mod session;
#[allow(clippy::missing_errors_doc)]
mod suite;

/// Chromium driver (requires the `browser` feature)
#[cfg(feature = "browser")]
pub mod browser;

/// In-memory css-adapt page
#[allow(clippy::missing_errors_doc)]
pub mod mock;

#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use clipboard::{assert_clipboard_equals, clipboard_diff};
pub use config::{
    BrowserOptions, HarnessConfig, DEFAULT_BACKOFF_FACTOR, DEFAULT_BASE_URL,
    DEFAULT_MAX_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_SCENARIO_TIMEOUT_MS, DEFAULT_TIMEOUT_MS, ENV_BASE_URL, ENV_FIXTURES, MAX_BACKOFF_FACTOR,
};
pub use driver::{DomEvent, ElementSnapshot, PageDriver};
pub use fixture::{ApiResponses, CssSamples, Dataset, FixtureStore, API_RESPONSES, CSS_SAMPLES};
pub use keyboard::{parse_sequence, printable_text, Keystroke, SpecialKey, TypeOptions};
pub use locator::{Locator, LocatorMap, LocatorOptions, Selector, TEST_ATTRIBUTE};
pub use matcher::Matcher;
pub use network::{
    AdaptCssRequest, Exchange, HttpMethod, InterceptedRequest, InterceptionRule, MockResponse,
    NetworkInterceptor, ResponseFn, ResponseSpec, UrlPattern, ADAPT_CSS_PATH,
};
pub use oracle::{expect_invalid, expect_valid, CssSyntaxError, CssValidator, SyntaxValidator};
pub use page_object::{
    form_roles, messages, toast_roles, FormPage, PageObject, ThemeIcon, ToastsPage,
};
pub use result::{HarnessError, HarnessResult};
pub use retry::{poll_until, Attempt, RetryExhausted, RetryPolicy};
pub use scenario::{
    GroupReport, Outcome, Scenario, ScenarioContext, ScenarioGroup, ScenarioReport, Suite,
    SuiteReport, SuiteRunner,
};
pub use session::{Element, Session};
pub use suite::{css_adapt_suite, echo_rescaled, rescale_px, CURRENT_WIDTH, TARGET_WIDTH};

/// Everything a scenario author needs
pub mod prelude {
    #[cfg(feature = "browser")]
    pub use super::browser::ChromiumDriver;
    pub use super::mock::MockApp;
    pub use super::{
        assert_clipboard_equals, css_adapt_suite, expect_invalid, expect_valid, form_roles,
        messages, toast_roles, CssValidator, DomEvent, Element, FixtureStore, FormPage,
        HarnessConfig, HarnessError, HarnessResult, HttpMethod, InterceptionRule, Locator,
        Matcher, MockResponse, PageDriver, PageObject, Scenario, ScenarioContext, ScenarioGroup,
        Session, Suite, SuiteReport, SuiteRunner, SyntaxValidator, ThemeIcon, ToastsPage,
        TypeOptions, ADAPT_CSS_PATH,
    };
}
