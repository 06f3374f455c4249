//! Element model of the simulated page.

use crate::driver::ElementSnapshot;
use crate::locator::TEST_ATTRIBUTE;
use crate::page_object::messages;

/// Notification kinds the page can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    /// Result copied
    CopySuccess,
    /// Current width without unit
    InvalidCurrentWidth,
    /// Target width without unit
    InvalidTargetWidth,
    /// Current width empty
    CurrentWidthRequired,
    /// Target width empty
    TargetWidthRequired,
    /// CSS empty
    CssCodeMissing,
    /// Backend unreachable or non-2xx
    RequestFailed,
}

impl ToastKind {
    pub(crate) const fn data_cy(self) -> &'static str {
        match self {
            Self::CopySuccess => "CopyToClipboard-toastSuccess",
            Self::InvalidCurrentWidth => "Toast-invalidCurrentWidth",
            Self::InvalidTargetWidth => "Toast-invalidTargetWidth",
            Self::CurrentWidthRequired => "Toast-currentWidthIsRequired",
            Self::TargetWidthRequired => "Toast-targetWidthIsRequired",
            Self::CssCodeMissing => "Toast-cssCodeMissing",
            Self::RequestFailed => "Toast-requestFailed",
        }
    }
}

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Kind
    pub kind: ToastKind,
    /// Rendered text
    pub text: String,
}

impl Toast {
    pub(crate) fn new(kind: ToastKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub(crate) fn copied() -> Self {
        Self::new(ToastKind::CopySuccess, messages::COPY_TO_CLIPBOARD)
    }
}

/// Editable fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// CSS source textarea
    Code,
    /// Current width input
    CurrentWidth,
    /// Target width input
    TargetWidth,
    /// Result textarea (read-only)
    Result,
}

impl Field {
    /// Multi-line fields take Enter as a newline
    pub(crate) const fn is_multiline(self) -> bool {
        matches!(self, Self::Code | Self::Result)
    }

    pub(crate) const fn is_readonly(self) -> bool {
        matches!(self, Self::Result)
    }
}

/// Addressable elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// Theme toggle button
    ToggleButton,
    /// Sun icon (dark theme)
    IconSun,
    /// Moon icon (light theme)
    IconMoon,
    /// Conversion form
    Form,
    /// An editable field
    Field(Field),
    /// Submit button
    Submit,
    /// Copy button
    CopyButton,
    /// A notification
    Toast(ToastKind),
}

impl Node {
    pub(crate) const fn data_cy(self) -> &'static str {
        match self {
            Self::ToggleButton => "ToggleTheme-button",
            Self::IconSun => "ToggleTheme-iconSun",
            Self::IconMoon => "ToggleTheme-iconMoon",
            Self::Form => "MainPage-form",
            Self::Field(Field::Code) => "MainPage-inputCode",
            Self::Field(Field::CurrentWidth) => "MainPage-inputCurrentWidth",
            Self::Field(Field::TargetWidth) => "MainPage-inputTargetWidth",
            Self::Field(Field::Result) => "MainPage-result",
            Self::Submit => "MainPage-submit",
            Self::CopyButton => "CopyToClipboard-button",
            Self::Toast(kind) => kind.data_cy(),
        }
    }

    const fn tag_name(self) -> &'static str {
        match self {
            Self::ToggleButton | Self::Submit | Self::CopyButton => "button",
            Self::IconSun | Self::IconMoon => "svg",
            Self::Form => "form",
            Self::Field(Field::Code | Field::Result) => "textarea",
            Self::Field(_) => "input",
            Self::Toast(_) => "div",
        }
    }

    /// Enclosing addressable elements, innermost first
    pub(crate) const fn ancestors(self) -> &'static [Self] {
        match self {
            Self::IconSun | Self::IconMoon => &[Self::ToggleButton],
            Self::Field(Field::Code | Field::CurrentWidth | Field::TargetWidth) | Self::Submit => {
                &[Self::Form]
            }
            _ => &[],
        }
    }

    /// Whether this node matches a descendant chain of `data-cy` values
    pub(crate) fn matches_path(self, path: &[&str]) -> bool {
        let Some((last, outer)) = path.split_last() else {
            return false;
        };
        if *last != self.data_cy() {
            return false;
        }
        let mut ancestors = self.ancestors().iter();
        outer
            .iter()
            .rev()
            .all(|wanted| ancestors.any(|a| a.data_cy() == *wanted))
    }

    pub(crate) fn snapshot(self, text: &str, value: Option<&str>, focused: bool) -> ElementSnapshot {
        let mut snapshot = ElementSnapshot::new(self.tag_name())
            .with_text(text)
            .with_attribute(TEST_ATTRIBUTE, self.data_cy());
        snapshot.value = value.map(str::to_string);
        snapshot.focused = focused;
        match self {
            Self::Submit => snapshot.with_attribute("type", "submit"),
            Self::Field(Field::CurrentWidth | Field::TargetWidth) => {
                snapshot.with_attribute("type", "text")
            }
            Self::Field(Field::Result) => snapshot.with_attribute("readonly", ""),
            Self::Toast(_) => snapshot.with_attribute("role", "alert"),
            _ => snapshot,
        }
    }
}

/// `<number>(px|rem|em)`
pub(crate) fn is_valid_width(value: &str) -> bool {
    let Some(number) = ["px", "rem", "em"]
        .iter()
        .find_map(|unit| value.strip_suffix(unit))
    else {
        return false;
    };
    let (int, frac) = number.split_once('.').unwrap_or((number, "0"));
    !int.is_empty()
        && !frac.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descendant_matching() {
        let path = ["ToggleTheme-button", "ToggleTheme-iconSun"];
        assert!(Node::IconSun.matches_path(&path));
        assert!(!Node::IconMoon.matches_path(&path));
        assert!(Node::IconSun.matches_path(&["ToggleTheme-iconSun"]));
        assert!(!Node::IconSun.matches_path(&["MainPage-form", "ToggleTheme-iconSun"]));
        assert!(!Node::Form.matches_path(&[]));
    }

    #[test]
    fn test_width_units() {
        for ok in ["1440px", "769px", "12.5rem", "3em"] {
            assert!(is_valid_width(ok), "{ok}");
        }
        for bad in ["1440", "769", "px", "12.px", ".5px", "12pt", "1 440px", ""] {
            assert!(!is_valid_width(bad), "{bad}");
        }
    }

    #[test]
    fn test_snapshot_attributes() {
        let snap = Node::Field(Field::CurrentWidth).snapshot("", Some("1440px"), true);
        assert_eq!(snap.tag_name, "input");
        assert_eq!(snap.attribute("data-cy"), Some("MainPage-inputCurrentWidth"));
        assert!(snap.focused);
    }
}
