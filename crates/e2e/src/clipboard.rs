//! Clipboard assertion.
//!
//! Browsers gate clipboard reads behind permission and document focus, so
//! the target element is focused before each read. A refused read fails at
//! once with [`HarnessError::ClipboardUnavailable`]; differing content is
//! polled until the timeout and then reported with a line diff.

use crate::result::{HarnessError, HarnessResult};
use crate::retry::{poll_until, Attempt};
use crate::session::Element;
use similar::TextDiff;

/// Unified line diff between expected and actual clipboard text
#[must_use]
pub fn clipboard_diff(expected: &str, actual: &str) -> String {
    TextDiff::from_lines(expected, actual)
        .unified_diff()
        .context_radius(2)
        .header("expected", "clipboard")
        .to_string()
}

/// Focus `focus_target`, then poll the clipboard until it equals `expected`
pub async fn assert_clipboard_equals(focus_target: &Element, expected: &str) -> HarnessResult<()> {
    focus_target.focus().await?;
    let session = focus_target.session();
    let last = std::sync::Mutex::new(String::new());
    let (driver, last_seen) = (session.driver(), &last);

    let outcome = poll_until(session.policy(), move || async move {
        let actual = driver.read_clipboard().await?;
        if actual == expected {
            return Ok::<_, HarnessError>(Attempt::Ready(()));
        }
        let observed = format!("{} bytes", actual.len());
        if let Ok(mut slot) = last_seen.lock() {
            *slot = actual;
        }
        Ok(Attempt::Pending(observed))
    })
    .await?;

    match outcome {
        Ok(()) => {
            tracing::debug!(role = focus_target.role(), bytes = expected.len(), "clipboard matched");
            Ok(())
        }
        Err(_) => {
            let actual = last
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Err(HarnessError::ClipboardMismatch {
                expected_len: expected.len(),
                actual_len: actual.len(),
                diff: clipboard_diff(expected, &actual),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::locator::Locator;
    use crate::mock::MockApp;
    use crate::session::Session;
    use std::sync::Arc;

    async fn copy_button(app: MockApp) -> (Arc<MockApp>, Element) {
        let app = Arc::new(app);
        let session = Session::start(app.clone(), HarnessConfig::default())
            .await
            .unwrap();
        session.visit("/").await.unwrap();
        let button = session.element("submit_button", Locator::component("MainPage", "submit"));
        (app, button)
    }

    #[test]
    fn test_diff_shows_changed_line() {
        let diff = clipboard_diff("a{b:1px}\n", "a{b:2px}\n");
        assert!(diff.contains("-a{b:1px}"));
        assert!(diff.contains("+a{b:2px}"));
        assert!(diff.contains("--- expected"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_clipboard() {
        let (app, button) = copy_button(MockApp::new()).await;
        app.write_clipboard(".a{b:c}");
        assert_clipboard_equals(&button, ".a{b:c}").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_mismatch_carries_diff() {
        let (app, button) = copy_button(MockApp::new()).await;
        app.write_clipboard(".a{b:d}");
        let err = assert_clipboard_equals(&button, ".a{b:c}").await.unwrap_err();
        match err {
            HarnessError::ClipboardMismatch {
                expected_len,
                actual_len,
                diff,
            } => {
                assert_eq!(expected_len, 7);
                assert_eq!(actual_len, 7);
                assert!(diff.contains("+.a{b:d}"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_is_not_a_mismatch() {
        let (app, button) = copy_button(MockApp::new().with_clipboard_permission(false)).await;
        app.write_clipboard(".a{b:c}");
        let start = tokio::time::Instant::now();
        let err = assert_clipboard_equals(&button, ".a{b:c}").await.unwrap_err();
        assert!(matches!(err, HarnessError::ClipboardUnavailable { .. }));
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }
}
