//! Browser driver abstraction.
//!
//! [`PageDriver`] is the seam between the harness and whatever runs the
//! page: the CDP driver in `browser` or the in-memory [`crate::mock::MockApp`].
//! All methods take `&self`; implementations own their interior mutability
//! so a session can hand out cheap clones.

use crate::keyboard::Keystroke;
use crate::network::NetworkInterceptor;
use crate::result::HarnessResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Observable state of one element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Element tag name (lowercase)
    pub tag_name: String,
    /// Text content
    pub text: String,
    /// Form value, for inputs and textareas
    pub value: Option<String>,
    /// Attributes
    pub attributes: BTreeMap<String, String>,
    /// Whether the element has focus
    pub focused: bool,
}

impl ElementSnapshot {
    /// Create a snapshot with a tag name
    #[must_use]
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            ..Self::default()
        }
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the form value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Attribute value
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Synthetic DOM events a scenario can dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomEvent {
    /// `click`
    Click,
    /// `paste`
    Paste,
    /// `input`
    Input,
    /// `change`
    Change,
    /// `pointerdown`
    PointerDown,
    /// `submit`
    Submit,
    /// `focus`
    Focus,
}

impl DomEvent {
    /// DOM event type name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Paste => "paste",
            Self::Input => "input",
            Self::Change => "change",
            Self::PointerDown => "pointerdown",
            Self::Submit => "submit",
            Self::Focus => "focus",
        }
    }
}

impl fmt::Display for DomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the harness needs from a browser page.
///
/// Element-targeted methods take a CSS selector that the caller has already
/// resolved to exactly one element.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load a URL and wait for the document
    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Snapshot every element matching `selector`
    async fn query_all(&self, selector: &str) -> HarnessResult<Vec<ElementSnapshot>>;

    /// Empty a form field
    async fn clear(&self, selector: &str) -> HarnessResult<()>;

    /// Focus a field and send keystrokes to it
    async fn type_keys(&self, selector: &str, keys: &[Keystroke]) -> HarnessResult<()>;

    /// Set a field value directly, without keystrokes or `input` events
    async fn set_value(&self, selector: &str, value: &str) -> HarnessResult<()>;

    /// Dispatch a synthetic event
    async fn dispatch_event(&self, selector: &str, event: DomEvent) -> HarnessResult<()>;

    /// Real click (pointer sequence plus activation)
    async fn click(&self, selector: &str) -> HarnessResult<()>;

    /// Submit a form, bypassing native validation
    async fn submit(&self, selector: &str) -> HarnessResult<()>;

    /// Give an element focus
    async fn focus(&self, selector: &str) -> HarnessResult<()>;

    /// Read the clipboard text
    async fn read_clipboard(&self) -> HarnessResult<String>;

    /// Clear `localStorage` for the current origin
    async fn clear_local_storage(&self) -> HarnessResult<()>;

    /// Route outbound page requests through `interceptor`
    async fn attach_interceptor(&self, interceptor: NetworkInterceptor) -> HarnessResult<()>;

    /// Release browser resources
    async fn close(&self) -> HarnessResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_builder() {
        let snap = ElementSnapshot::new("input")
            .with_value("1440px")
            .with_attribute("data-cy", "MainPage-inputCurrentWidth");
        assert_eq!(snap.value.as_deref(), Some("1440px"));
        assert_eq!(snap.attribute("data-cy"), Some("MainPage-inputCurrentWidth"));
        assert_eq!(snap.attribute("type"), None);
        assert!(!snap.focused);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(DomEvent::PointerDown.as_str(), "pointerdown");
        assert_eq!(DomEvent::Paste.to_string(), "paste");
    }
}
