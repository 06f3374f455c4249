//! The css-adapt scenarios.
//!
//! Four groups, each an ordered list of scenarios that start from `visit`:
//! theme toggling, conversion through a mocked backend, input validation and
//! the copy-to-clipboard button. Fixtures come from the `data` and `response`
//! datasets.

use crate::clipboard::assert_clipboard_equals;
use crate::matcher::Matcher;
use crate::network::{
    AdaptCssRequest, HttpMethod, InterceptedRequest, InterceptionRule, MockResponse, ResponseSpec,
    ADAPT_CSS_PATH,
};
use crate::oracle::{expect_invalid, expect_valid};
use crate::page_object::{messages, toast_roles, ThemeIcon};
use crate::result::{HarnessError, HarnessResult};
use crate::scenario::{Scenario, ScenarioContext, ScenarioGroup, Suite};
use async_trait::async_trait;
use regex::{Captures, Regex};

/// Width typed as the current viewport
pub const CURRENT_WIDTH: &str = "1440px";

/// Width typed as the target viewport
pub const TARGET_WIDTH: &str = "769px";

const PX_VALUE: &str = r"(\d+(?:\.\d+)?)px";

/// Build the full css-adapt suite
#[must_use]
pub fn css_adapt_suite() -> Suite {
    Suite::new("css-adapt")
        .with_group(ScenarioGroup::new("Toggle between dark and light theme").with(ToggleTheme))
        .with_group(
            ScenarioGroup::new("Responsive css code")
                .with(ConvertValidCss)
                .with(ConvertInvalidCss)
                .with(ConvertPastedCss)
                .with(EchoRescaledCss),
        )
        .with_group(
            ScenarioGroup::new("Validation all inputs")
                .with(InvalidCurrentWidth)
                .with(InvalidTargetWidth)
                .with(CurrentWidthRequired)
                .with(TargetWidthRequired)
                .with(CssCodeRequired),
        )
        .with_group(ScenarioGroup::new("Validate copy to clipboard button").with(CopyToClipboard))
}

/// Scale every `px` length in `css` by `target / current`.
///
/// Values keep at most two decimals with trailing zeros dropped.
pub fn rescale_px(css: &str, current: f64, target: f64) -> HarnessResult<String> {
    if current <= 0.0 || target <= 0.0 {
        return Err(HarnessError::InputError {
            message: format!("widths must be positive, got {current} and {target}"),
        });
    }
    let px = Regex::new(PX_VALUE).map_err(|e| HarnessError::config(e.to_string()))?;
    let factor = target / current;
    Ok(px
        .replace_all(css, |caps: &Captures<'_>| {
            caps[1]
                .parse::<f64>()
                .map_or_else(|_| caps[0].to_string(), |v| format_px(v * factor))
        })
        .into_owned())
}

fn format_px(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}px")
}

fn parse_px(width: &str) -> Option<f64> {
    width.trim().strip_suffix("px")?.parse().ok()
}

/// Backend stand-in that rescales the posted CSS to the posted target width
#[must_use]
pub fn echo_rescaled() -> ResponseSpec {
    ResponseSpec::handler(|request: &InterceptedRequest| {
        let Ok(body) = request.body_json::<AdaptCssRequest>() else {
            return MockResponse::error(400, "request body is not an adapt-css payload");
        };
        let (Some(current), Some(target)) = (parse_px(&body.current_width), parse_px(&body.target_width))
        else {
            return MockResponse::error(422, "only px widths are supported");
        };
        match rescale_px(&body.code, current, target) {
            Ok(css) => MockResponse::text(&css),
            Err(e) => MockResponse::error(422, &e.to_string()),
        }
    })
}

/// Enter code and both widths through the keyboard
async fn fill_form(ctx: &ScenarioContext, code: &str, current: &str, target: &str) -> HarnessResult<()> {
    ctx.step("enter the css code");
    ctx.form().enter_css_code(code).await?;
    ctx.step(&format!("enter \"{current}\" at current width"));
    ctx.form().enter_current_width(current).await?;
    ctx.step(&format!("enter \"{target}\" at target width"));
    ctx.form().enter_target_width(target).await
}

/// Submit through the form and wait for the aliased conversion call
async fn submit_with_mock(ctx: &ScenarioContext, alias: &str, response: MockResponse) -> HarnessResult<()> {
    ctx.step("submit the form");
    ctx.session()
        .intercept(InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, response).alias(alias));
    ctx.form().submit().await?;
    ctx.step(&format!("wait for @{alias}"));
    ctx.session().wait_for(alias).await?;
    Ok(())
}

/// Dark theme shows the sun; toggling back shows the moon
pub struct ToggleTheme;

#[async_trait]
impl Scenario for ToggleTheme {
    fn name(&self) -> &str {
        "toggle to the dark theme and back to the light theme"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let form = ctx.form();
        ctx.step("visit the application");
        form.visit().await?;
        ctx.step("check the moon icon is shown");
        form.expect_theme_icon(ThemeIcon::Moon).await?;

        ctx.step("click on the theme toggle button");
        form.toggle_theme().await?;
        ctx.step("check the sun icon is shown, dark theme active");
        form.expect_theme_icon(ThemeIcon::Sun).await?;

        ctx.step("click on the theme toggle button again");
        form.toggle_theme_button()?.click().await?;
        ctx.step("check the moon icon is shown, light theme active");
        form.expect_theme_icon(ThemeIcon::Moon).await
    }
}

/// Valid mocked response validates clean
pub struct ConvertValidCss;

#[async_trait]
impl Scenario for ConvertValidCss {
    fn name(&self) -> &str {
        "convert a valid css code to responsive target"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        let responses = ctx.fixtures().api_responses()?;

        ctx.step("visit the application");
        ctx.form().visit().await?;
        fill_form(ctx, &samples.css_valid, CURRENT_WIDTH, TARGET_WIDTH).await?;
        submit_with_mock(
            ctx,
            "convertValidCss",
            MockResponse::text(&responses.response_valid_css),
        )
        .await?;

        ctx.step("check the success toast appears");
        ctx.toasts().toast_success_should_exist().await?;
        ctx.step("validate the result css, expecting no errors");
        ctx.form()
            .result()?
            .should(Matcher::HaveValue(responses.response_valid_css.clone()))
            .await?;
        let result = ctx.form().result_value().await?;
        expect_valid(ctx.validator(), &result)
    }
}

/// Malformed mocked response still shows the copy toast but fails validation
pub struct ConvertInvalidCss;

#[async_trait]
impl Scenario for ConvertInvalidCss {
    fn name(&self) -> &str {
        "convert a css code whose response is malformed"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        let responses = ctx.fixtures().api_responses()?;

        ctx.step("visit the application");
        ctx.form().visit().await?;
        fill_form(ctx, &samples.css_valid, CURRENT_WIDTH, TARGET_WIDTH).await?;
        submit_with_mock(
            ctx,
            "convertInvalidCss",
            MockResponse::text(&responses.response_invalid_css),
        )
        .await?;

        // Delivery succeeded even though the content is broken
        ctx.step("check the copy to clipboard toast appears");
        ctx.toasts().toast_success_should_exist().await?;
        ctx.step("validate the result css, expecting errors");
        ctx.form()
            .result()?
            .should(Matcher::HaveValue(responses.response_invalid_css.clone()))
            .await?;
        let result = ctx.form().result_value().await?;
        let errors = expect_invalid(ctx.validator(), &result)?;
        tracing::debug!(errors = errors.len(), "malformed response rejected");
        Ok(())
    }
}

/// Pasting the code behaves like typing it
pub struct ConvertPastedCss;

#[async_trait]
impl Scenario for ConvertPastedCss {
    fn name(&self) -> &str {
        "convert a pasted css code to responsive target"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        let responses = ctx.fixtures().api_responses()?;
        let form = ctx.form();

        ctx.step("visit the application");
        form.visit().await?;
        ctx.step("paste a valid css code");
        form.paste_css_code(&samples.css_valid).await?;
        form.input_code()?
            .should(Matcher::HaveValue(samples.css_valid.clone()))
            .await?;
        ctx.step("enter both widths");
        form.enter_current_width(CURRENT_WIDTH).await?;
        form.enter_target_width(TARGET_WIDTH).await?;
        submit_with_mock(
            ctx,
            "convertPastedCss",
            MockResponse::text(&responses.response_valid_css),
        )
        .await?;

        ctx.step("validate the result css, expecting no errors");
        form.result()?
            .should(Matcher::HaveValue(responses.response_valid_css.clone()))
            .await?;
        expect_valid(ctx.validator(), &form.result_value().await?)
    }
}

/// Request-aware backend: the posted widths drive the rescaling
pub struct EchoRescaledCss;

#[async_trait]
impl Scenario for EchoRescaledCss {
    fn name(&self) -> &str {
        "convert through a backend that rescales the posted css"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        let responses = ctx.fixtures().api_responses()?;

        ctx.step("visit the application");
        ctx.form().visit().await?;
        fill_form(ctx, &samples.css_valid, CURRENT_WIDTH, TARGET_WIDTH).await?;

        ctx.step("submit the form");
        ctx.session().intercept(
            InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, echo_rescaled())
                .alias("echoRescaledCss"),
        );
        ctx.form().submit().await?;
        ctx.step("wait for @echoRescaledCss");
        let exchange = ctx.session().wait_for("echoRescaledCss").await?;

        ctx.step("check the request carries the entered widths");
        let sent: AdaptCssRequest = exchange.request.body_json()?;
        if sent.current_width != CURRENT_WIDTH || sent.target_width != TARGET_WIDTH {
            return Err(HarnessError::AssertionFailed {
                role: "request".to_string(),
                matcher: "have.body".to_string(),
                expected: format!("{CURRENT_WIDTH} -> {TARGET_WIDTH}"),
                actual: format!("{} -> {}", sent.current_width, sent.target_width),
            });
        }

        ctx.step("check the rescaled css reaches the result field");
        ctx.toasts().toast_success_should_exist().await?;
        ctx.form()
            .result()?
            .should(Matcher::HaveValue(responses.response_valid_css.clone()))
            .await?;
        expect_valid(ctx.validator(), &ctx.form().result_value().await?)
    }
}

/// Current width without a unit
pub struct InvalidCurrentWidth;

#[async_trait]
impl Scenario for InvalidCurrentWidth {
    fn name(&self) -> &str {
        "verify the input current width is invalid"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        ctx.step("visit the application");
        ctx.form().visit().await?;
        fill_form(ctx, &samples.css_valid, "1440", TARGET_WIDTH).await?;
        ctx.step("submit form");
        ctx.form().submit().await?;
        ctx.step("verify the error toast has \"1440 is invalid width.\"");
        ctx.toasts()
            .toast_invalid_current_width_should_have(&messages::invalid_width("1440"))
            .await?;
        ctx.toasts()
            .only_visible(toast_roles::TOAST_INVALID_CURRENT_WIDTH)
            .await
    }
}

/// Target width without a unit
pub struct InvalidTargetWidth;

#[async_trait]
impl Scenario for InvalidTargetWidth {
    fn name(&self) -> &str {
        "verify the input target width is invalid"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        ctx.step("visit the application");
        ctx.form().visit().await?;
        fill_form(ctx, &samples.css_valid, CURRENT_WIDTH, "769").await?;
        ctx.step("submit form");
        ctx.form().submit().await?;
        ctx.step("verify the error toast has \"769 is invalid width.\"");
        ctx.toasts()
            .toast_invalid_target_width_should_have(&messages::invalid_width("769"))
            .await?;
        ctx.toasts()
            .only_visible(toast_roles::TOAST_INVALID_TARGET_WIDTH)
            .await
    }
}

/// Nothing entered
pub struct CurrentWidthRequired;

#[async_trait]
impl Scenario for CurrentWidthRequired {
    fn name(&self) -> &str {
        "validate input current width is required"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let form = ctx.form();
        ctx.step("visit the application");
        form.visit().await?;
        ctx.step("check current width input is empty");
        form.input_current_width()?
            .should(Matcher::HaveValue(String::new()))
            .await?;
        ctx.step("submit form");
        form.submit_button()?.click().await?;
        ctx.step("check the error toast has \"Current width is require.\"");
        ctx.toasts()
            .toast_current_width_is_required_should_have(messages::CURRENT_WIDTH_REQUIRED)
            .await?;
        ctx.toasts()
            .only_visible(toast_roles::TOAST_CURRENT_WIDTH_IS_REQUIRED)
            .await
    }
}

/// Only the current width entered
pub struct TargetWidthRequired;

#[async_trait]
impl Scenario for TargetWidthRequired {
    fn name(&self) -> &str {
        "validate input target width is required"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let form = ctx.form();
        ctx.step("visit the application");
        form.visit().await?;
        ctx.step("enter \"1440px\" at current width");
        form.enter_current_width(CURRENT_WIDTH).await?;
        ctx.step("check target width input is empty");
        form.input_target_width()?
            .should(Matcher::HaveValue(String::new()))
            .await?;
        ctx.step("submit form");
        form.submit_button()?.click().await?;
        ctx.step("check the error toast has \"Target width is require.\"");
        ctx.toasts()
            .toast_target_width_is_required_should_have(messages::TARGET_WIDTH_REQUIRED)
            .await?;
        ctx.toasts()
            .only_visible(toast_roles::TOAST_TARGET_WIDTH_IS_REQUIRED)
            .await
    }
}

/// Both widths entered, no code
pub struct CssCodeRequired;

#[async_trait]
impl Scenario for CssCodeRequired {
    fn name(&self) -> &str {
        "validate input css code is required"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let form = ctx.form();
        ctx.step("visit the application");
        form.visit().await?;
        ctx.step("enter both widths");
        form.enter_current_width(CURRENT_WIDTH).await?;
        form.enter_target_width(TARGET_WIDTH).await?;
        ctx.step("check input code is empty");
        form.input_code()?
            .should(Matcher::HaveValue(String::new()))
            .await?;
        ctx.step("submit form");
        form.submit_button()?.click().await?;
        ctx.step("check the error toast has \"CSS code is require.\"");
        ctx.toasts()
            .toast_css_code_missing_should_have(messages::CSS_CODE_REQUIRED)
            .await?;
        ctx.toasts()
            .only_visible(toast_roles::TOAST_CSS_CODE_MISSING)
            .await
    }
}

/// Copy button puts the response body on the clipboard
pub struct CopyToClipboard;

#[async_trait]
impl Scenario for CopyToClipboard {
    fn name(&self) -> &str {
        "copy the converted css to the clipboard"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        let responses = ctx.fixtures().api_responses()?;
        let form = ctx.form();

        ctx.step("visit the application");
        form.visit().await?;
        fill_form(ctx, &samples.css_valid, CURRENT_WIDTH, TARGET_WIDTH).await?;
        submit_with_mock(
            ctx,
            "cssClipBoard",
            MockResponse::text(&responses.response_valid_css),
        )
        .await?;

        ctx.step("click \"copy to clipboard\" button");
        form.copy_result().await?;
        ctx.step("check the toast has \"Copy to clipboard\"");
        ctx.toasts()
            .toast_success_should_have(messages::COPY_TO_CLIPBOARD)
            .await?;
        ctx.step("check the clipboard holds the api response");
        assert_clipboard_equals(&form.copy_to_clipboard_button()?, &responses.response_valid_css).await
    }
}
