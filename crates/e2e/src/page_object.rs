//! Page objects for the css-adapt page.
//!
//! [`FormPage`] covers the theme toggle, the conversion form and the copy
//! button; [`ToastsPage`] covers the notification area. Both wrap a
//! [`LocatorMap`] and a [`Session`] and expose intention-revealing actions.

use crate::driver::DomEvent;
use crate::keyboard::TypeOptions;
use crate::locator::{Locator, LocatorMap};
use crate::matcher::Matcher;
use crate::result::HarnessResult;
use crate::session::{Element, Session};

/// Role names of the form page
pub mod form_roles {
    /// Theme toggle button
    pub const TOGGLE_THEME_BUTTON: &str = "toggle_theme_button";
    /// Sun icon inside the toggle (dark theme active)
    pub const ICON_SUN: &str = "icon_sun";
    /// Moon icon inside the toggle (light theme active)
    pub const ICON_MOON: &str = "icon_moon";
    /// CSS source textarea
    pub const INPUT_CODE: &str = "input_code";
    /// Current width input
    pub const INPUT_CURRENT_WIDTH: &str = "input_current_width";
    /// Target width input
    pub const INPUT_TARGET_WIDTH: &str = "input_target_width";
    /// Submit button
    pub const SUBMIT_BUTTON: &str = "submit_button";
    /// The form element
    pub const FORM: &str = "form";
    /// Result textarea
    pub const RESULT: &str = "result";
    /// Copy-to-clipboard button
    pub const COPY_TO_CLIPBOARD_BUTTON: &str = "copy_to_clipboard_button";
}

/// Role names of the toast area
pub mod toast_roles {
    /// Copy-to-clipboard confirmation
    pub const TOAST_SUCCESS: &str = "toast_success";
    /// Current width has no valid unit
    pub const TOAST_INVALID_CURRENT_WIDTH: &str = "toast_invalid_current_width";
    /// Target width has no valid unit
    pub const TOAST_INVALID_TARGET_WIDTH: &str = "toast_invalid_target_width";
    /// Current width left empty
    pub const TOAST_CURRENT_WIDTH_IS_REQUIRED: &str = "toast_current_width_is_required";
    /// Target width left empty
    pub const TOAST_TARGET_WIDTH_IS_REQUIRED: &str = "toast_target_width_is_required";
    /// CSS code left empty
    pub const TOAST_CSS_CODE_MISSING: &str = "toast_css_code_missing";

    /// Every toast role
    pub const ALL: [&str; 6] = [
        TOAST_SUCCESS,
        TOAST_INVALID_CURRENT_WIDTH,
        TOAST_INVALID_TARGET_WIDTH,
        TOAST_CURRENT_WIDTH_IS_REQUIRED,
        TOAST_TARGET_WIDTH_IS_REQUIRED,
        TOAST_CSS_CODE_MISSING,
    ];
}

/// Notification texts the application renders
pub mod messages {
    /// Shown after the result is copied
    pub const COPY_TO_CLIPBOARD: &str = "Copy to clipboard";
    /// Current width left empty
    pub const CURRENT_WIDTH_REQUIRED: &str = "Current width is require.";
    /// Target width left empty
    pub const TARGET_WIDTH_REQUIRED: &str = "Target width is require.";
    /// CSS code left empty
    pub const CSS_CODE_REQUIRED: &str = "CSS code is require.";

    /// Width without a valid unit
    #[must_use]
    pub fn invalid_width(value: &str) -> String {
        format!("{value} is invalid width.")
    }
}

/// A UI region with named roles
pub trait PageObject {
    /// Name used in diagnostics
    fn page_name(&self) -> &str;

    /// Role map
    fn locators(&self) -> &LocatorMap;

    /// Session the page acts through
    fn session(&self) -> &Session;

    /// Path the page lives at
    fn url_pattern(&self) -> &str {
        "/"
    }

    /// Handle for a registered role
    fn element(&self, role: &str) -> HarnessResult<Element> {
        let locator = self.locators().get(role)?.clone();
        Ok(self.session().element(role, locator))
    }

    /// Registered role names
    fn roles(&self) -> Vec<&str> {
        self.locators().roles().collect()
    }
}

/// Which theme icon the toggle shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeIcon {
    /// Sun (dark theme active)
    Sun,
    /// Moon (light theme active)
    Moon,
}

impl ThemeIcon {
    /// Role of this icon
    #[must_use]
    pub const fn role(self) -> &'static str {
        match self {
            Self::Sun => form_roles::ICON_SUN,
            Self::Moon => form_roles::ICON_MOON,
        }
    }

    /// The other icon
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Sun => Self::Moon,
            Self::Moon => Self::Sun,
        }
    }
}

/// Theme toggle, conversion form and copy button
#[derive(Debug, Clone)]
pub struct FormPage {
    session: Session,
    locators: LocatorMap,
}

impl FormPage {
    /// Build the page with its role map
    #[must_use]
    pub fn new(session: Session) -> Self {
        use form_roles::*;

        let toggle = Locator::component("ToggleTheme", "button");
        let locators = LocatorMap::new("FormPage")
            .with_role(
                ICON_SUN,
                Locator::component("ToggleTheme", "iconSun").within(&toggle),
            )
            .with_role(
                ICON_MOON,
                Locator::component("ToggleTheme", "iconMoon").within(&toggle),
            )
            .with_role(TOGGLE_THEME_BUTTON, toggle)
            .with_role(INPUT_CODE, Locator::component("MainPage", "inputCode"))
            .with_role(
                INPUT_CURRENT_WIDTH,
                Locator::component("MainPage", "inputCurrentWidth"),
            )
            .with_role(
                INPUT_TARGET_WIDTH,
                Locator::component("MainPage", "inputTargetWidth"),
            )
            .with_role(SUBMIT_BUTTON, Locator::component("MainPage", "submit"))
            .with_role(FORM, Locator::component("MainPage", "form"))
            .with_role(RESULT, Locator::component("MainPage", "result"))
            .with_role(
                COPY_TO_CLIPBOARD_BUTTON,
                Locator::component("CopyToClipboard", "button"),
            );
        Self { session, locators }
    }

    /// Navigate to the page
    pub async fn visit(&self) -> HarnessResult<()> {
        self.session.visit(self.url_pattern()).await
    }

    /// Theme toggle button
    pub fn toggle_theme_button(&self) -> HarnessResult<Element> {
        self.element(form_roles::TOGGLE_THEME_BUTTON)
    }

    /// Icon inside the toggle
    pub fn theme_icon(&self, icon: ThemeIcon) -> HarnessResult<Element> {
        self.element(icon.role())
    }

    /// CSS source field
    pub fn input_code(&self) -> HarnessResult<Element> {
        self.element(form_roles::INPUT_CODE)
    }

    /// Current width field
    pub fn input_current_width(&self) -> HarnessResult<Element> {
        self.element(form_roles::INPUT_CURRENT_WIDTH)
    }

    /// Target width field
    pub fn input_target_width(&self) -> HarnessResult<Element> {
        self.element(form_roles::INPUT_TARGET_WIDTH)
    }

    /// Submit button
    pub fn submit_button(&self) -> HarnessResult<Element> {
        self.element(form_roles::SUBMIT_BUTTON)
    }

    /// Form element
    pub fn form(&self) -> HarnessResult<Element> {
        self.element(form_roles::FORM)
    }

    /// Result field
    pub fn result(&self) -> HarnessResult<Element> {
        self.element(form_roles::RESULT)
    }

    /// Copy button
    pub fn copy_to_clipboard_button(&self) -> HarnessResult<Element> {
        self.element(form_roles::COPY_TO_CLIPBOARD_BUTTON)
    }

    /// Clear `role` then type `value`
    pub async fn enter_value(&self, role: &str, value: &str, options: TypeOptions) -> HarnessResult<()> {
        let field = self.element(role)?;
        field.clear().await?;
        field.type_text(value, options).await
    }

    /// Type CSS source verbatim
    pub async fn enter_css_code(&self, code: &str) -> HarnessResult<()> {
        self.enter_value(form_roles::INPUT_CODE, code, TypeOptions::literal())
            .await
    }

    /// Type the current width
    pub async fn enter_current_width(&self, width: &str) -> HarnessResult<()> {
        self.enter_value(form_roles::INPUT_CURRENT_WIDTH, width, TypeOptions::default())
            .await
    }

    /// Type the target width
    pub async fn enter_target_width(&self, width: &str) -> HarnessResult<()> {
        self.enter_value(form_roles::INPUT_TARGET_WIDTH, width, TypeOptions::default())
            .await
    }

    /// Set `role` directly and fire a `paste` event
    pub async fn paste_value(&self, role: &str, value: &str) -> HarnessResult<()> {
        let field = self.element(role)?;
        field.set_value(value).await?;
        field.trigger(DomEvent::Paste).await
    }

    /// Paste CSS source
    pub async fn paste_css_code(&self, code: &str) -> HarnessResult<()> {
        self.paste_value(form_roles::INPUT_CODE, code).await
    }

    /// Pointer-down trigger followed by a click
    pub async fn toggle_control(&self, role: &str) -> HarnessResult<()> {
        let control = self.element(role)?;
        control.trigger(DomEvent::PointerDown).await?;
        control.click().await
    }

    /// Flip the theme
    pub async fn toggle_theme(&self) -> HarnessResult<()> {
        self.toggle_control(form_roles::TOGGLE_THEME_BUTTON).await
    }

    /// Dispatch `submit` on the form itself
    pub async fn submit(&self) -> HarnessResult<()> {
        self.form()?.submit().await
    }

    /// Click the copy button
    pub async fn copy_result(&self) -> HarnessResult<()> {
        self.copy_to_clipboard_button()?.click().await
    }

    /// Current content of the result field
    pub async fn result_value(&self) -> HarnessResult<String> {
        self.result()?.value().await
    }

    /// Whether `icon` is rendered right now
    pub async fn theme_icon_visible(&self, icon: ThemeIcon) -> HarnessResult<bool> {
        self.theme_icon(icon)?.is_present().await
    }

    /// Wait until `icon` is shown and the other one is not
    pub async fn expect_theme_icon(&self, icon: ThemeIcon) -> HarnessResult<()> {
        self.theme_icon(icon)?.should(Matcher::Exist).await?;
        self.theme_icon(icon.other())?
            .should(Matcher::NotExist)
            .await
    }
}

impl PageObject for FormPage {
    fn page_name(&self) -> &str {
        self.locators.region()
    }

    fn locators(&self) -> &LocatorMap {
        &self.locators
    }

    fn session(&self) -> &Session {
        &self.session
    }
}

/// Notification area
#[derive(Debug, Clone)]
pub struct ToastsPage {
    session: Session,
    locators: LocatorMap,
}

impl ToastsPage {
    /// Build the page with its role map
    #[must_use]
    pub fn new(session: Session) -> Self {
        use toast_roles::*;

        let locators = LocatorMap::new("ToastsPage")
            .with_role(
                TOAST_SUCCESS,
                Locator::component("CopyToClipboard", "toastSuccess"),
            )
            .with_role(
                TOAST_INVALID_CURRENT_WIDTH,
                Locator::component("Toast", "invalidCurrentWidth"),
            )
            .with_role(
                TOAST_INVALID_TARGET_WIDTH,
                Locator::component("Toast", "invalidTargetWidth"),
            )
            .with_role(
                TOAST_CURRENT_WIDTH_IS_REQUIRED,
                Locator::component("Toast", "currentWidthIsRequired"),
            )
            .with_role(
                TOAST_TARGET_WIDTH_IS_REQUIRED,
                Locator::component("Toast", "targetWidthIsRequired"),
            )
            .with_role(
                TOAST_CSS_CODE_MISSING,
                Locator::component("Toast", "cssCodeMissing"),
            );
        Self { session, locators }
    }

    /// Poll until `role` satisfies `matcher` (bare strings compare text)
    pub async fn should_have(&self, role: &str, matcher: impl Into<Matcher>) -> HarnessResult<()> {
        self.element(role)?.should(matcher).await
    }

    /// Success toast text
    pub async fn toast_success_should_have(&self, text: &str) -> HarnessResult<()> {
        self.should_have(toast_roles::TOAST_SUCCESS, text).await
    }

    /// Success toast is shown
    pub async fn toast_success_should_exist(&self) -> HarnessResult<()> {
        self.should_have(toast_roles::TOAST_SUCCESS, Matcher::Exist)
            .await
    }

    /// Invalid current width toast text
    pub async fn toast_invalid_current_width_should_have(&self, text: &str) -> HarnessResult<()> {
        self.should_have(toast_roles::TOAST_INVALID_CURRENT_WIDTH, text)
            .await
    }

    /// Invalid target width toast text
    pub async fn toast_invalid_target_width_should_have(&self, text: &str) -> HarnessResult<()> {
        self.should_have(toast_roles::TOAST_INVALID_TARGET_WIDTH, text)
            .await
    }

    /// Missing current width toast text
    pub async fn toast_current_width_is_required_should_have(&self, text: &str) -> HarnessResult<()> {
        self.should_have(toast_roles::TOAST_CURRENT_WIDTH_IS_REQUIRED, text)
            .await
    }

    /// Missing target width toast text
    pub async fn toast_target_width_is_required_should_have(&self, text: &str) -> HarnessResult<()> {
        self.should_have(toast_roles::TOAST_TARGET_WIDTH_IS_REQUIRED, text)
            .await
    }

    /// Missing CSS toast text
    pub async fn toast_css_code_missing_should_have(&self, text: &str) -> HarnessResult<()> {
        self.should_have(toast_roles::TOAST_CSS_CODE_MISSING, text)
            .await
    }

    /// `role` is shown and every other toast is absent
    pub async fn only_visible(&self, role: &str) -> HarnessResult<()> {
        self.should_have(role, Matcher::Exist).await?;
        for other in toast_roles::ALL.iter().filter(|r| **r != role) {
            self.should_have(other, Matcher::NotExist).await?;
        }
        Ok(())
    }

    /// Toast roles rendered right now
    pub async fn visible(&self) -> HarnessResult<Vec<&'static str>> {
        let mut shown = Vec::new();
        for role in toast_roles::ALL {
            if self.element(role)?.is_present().await? {
                shown.push(role);
            }
        }
        Ok(shown)
    }
}

impl PageObject for ToastsPage {
    fn page_name(&self) -> &str {
        self.locators.region()
    }

    fn locators(&self) -> &LocatorMap {
        &self.locators
    }

    fn session(&self) -> &Session {
        &self.session
    }
}
