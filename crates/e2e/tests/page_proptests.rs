//! Property tests for theme toggling and form validation on the in-memory page

#![allow(clippy::expect_used, clippy::unwrap_used)]

use css_adapt_e2e::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("runtime")
}

async fn pages() -> (FormPage, ToastsPage) {
    let session = Session::start(Arc::new(MockApp::new()), HarnessConfig::default())
        .await
        .unwrap();
    let form = FormPage::new(session.clone());
    form.visit().await.unwrap();
    (form, ToastsPage::new(session))
}

// ===== Strategy definitions =====

/// Widths the page accepts
fn width_strategy() -> impl Strategy<Value = String> {
    (1u32..4000, prop_oneof![Just("px"), Just("rem"), Just("em")])
        .prop_map(|(n, unit)| format!("{n}{unit}"))
}

/// Bare numbers the page rejects
fn unitless_strategy() -> impl Strategy<Value = String> {
    (1u32..4000).prop_map(|n| n.to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// One toggle flips exactly one icon; pairs of toggles cancel out
    #[test]
    fn prop_theme_toggle_parity(toggles in 0usize..6) {
        runtime().block_on(async {
            let (form, _toasts) = pages().await;
            for _ in 0..toggles {
                form.toggle_theme().await.unwrap();
            }
            let sun = form.theme_icon_visible(ThemeIcon::Sun).await.unwrap();
            let moon = form.theme_icon_visible(ThemeIcon::Moon).await.unwrap();
            assert_ne!(sun, moon, "exactly one icon must be shown");
            assert_eq!(sun, toggles % 2 == 1);
        });
    }

    /// Leaving one field empty yields that field's notification only
    #[test]
    fn prop_single_empty_field(
        empty in 0usize..3,
        current in width_strategy(),
        target in width_strategy(),
    ) {
        runtime().block_on(async {
            let (form, toasts) = pages().await;
            if empty != 0 {
                form.enter_current_width(&current).await.unwrap();
            }
            if empty != 1 {
                form.enter_target_width(&target).await.unwrap();
            }
            if empty != 2 {
                form.enter_css_code(".a{b:1px}").await.unwrap();
            }
            form.submit_button().unwrap().click().await.unwrap();

            let expected = [
                toast_roles::TOAST_CURRENT_WIDTH_IS_REQUIRED,
                toast_roles::TOAST_TARGET_WIDTH_IS_REQUIRED,
                toast_roles::TOAST_CSS_CODE_MISSING,
            ][empty];
            toasts.only_visible(expected).await.unwrap();
        });
    }

    /// The invalid-width notification embeds the literal value
    #[test]
    fn prop_unitless_current_width(current in unitless_strategy()) {
        runtime().block_on(async {
            let (form, toasts) = pages().await;
            form.enter_css_code(".a{b:1px}").await.unwrap();
            form.enter_current_width(&current).await.unwrap();
            form.enter_target_width("769px").await.unwrap();
            form.submit().await.unwrap();
            toasts
                .toast_invalid_current_width_should_have(&messages::invalid_width(&current))
                .await
                .unwrap();
        });
    }
}
