//! Element locators and per-region locator maps.
//!
//! Locators address elements only through the `data-cy` test attribute
//! (`[data-cy="<Component>-<role>"]`), optionally scoped under a parent.
//! They are strict: resolution expects exactly one match.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Test attribute every selector is built on
pub const TEST_ATTRIBUTE: &str = "data-cy";

/// Selector for an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// `[data-cy="value"]`
    DataCy(String),
    /// Descendant composition: `child` anywhere below `parent`
    Within {
        /// Scope element
        parent: Box<Selector>,
        /// Element searched inside the scope
        child: Box<Selector>,
    },
}

impl Selector {
    /// Create a `data-cy` selector
    #[must_use]
    pub fn data_cy(value: impl Into<String>) -> Self {
        Self::DataCy(value.into())
    }

    /// Create the conventional `<Component>-<role>` selector
    #[must_use]
    pub fn component(component: &str, role: &str) -> Self {
        Self::DataCy(format!("{component}-{role}"))
    }

    /// Scope `self` under `parent`
    #[must_use]
    pub fn within(self, parent: Self) -> Self {
        Self::Within {
            parent: Box::new(parent),
            child: Box::new(self),
        }
    }

    /// CSS selector string
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::DataCy(value) => format!("[{TEST_ATTRIBUTE}=\"{value}\"]"),
            Self::Within { parent, child } => format!("{} {}", parent.to_css(), child.to_css()),
        }
    }

    /// Chain of `data-cy` values, outermost first
    #[must_use]
    pub fn path(&self) -> Vec<&str> {
        match self {
            Self::DataCy(value) => vec![value.as_str()],
            Self::Within { parent, child } => {
                let mut path = parent.path();
                path.extend(child.path());
                path
            }
        }
    }

    /// Parse a CSS string produced by [`Selector::to_css`]
    pub fn parse(css: &str) -> HarnessResult<Self> {
        let mut parts = Vec::new();
        let mut rest = css.trim();
        let prefix = format!("[{TEST_ATTRIBUTE}=\"");
        while !rest.is_empty() {
            let body = rest.strip_prefix(prefix.as_str()).ok_or_else(|| {
                HarnessError::driver(format!("unsupported selector {css:?}"))
            })?;
            let end = body
                .find("\"]")
                .ok_or_else(|| HarnessError::driver(format!("unterminated selector {css:?}")))?;
            parts.push(Self::DataCy(body[..end].to_string()));
            rest = body[end + 2..].trim_start();
        }
        let mut parts = parts.into_iter();
        let first = parts
            .next()
            .ok_or_else(|| HarnessError::driver("empty selector"))?;
        Ok(parts.fold(first, |scope, next| next.within(scope)))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Options for a locator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocatorOptions {
    /// Override of the session timeout for this locator
    pub timeout: Option<Duration>,
}

/// A strict locator for one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    selector: Selector,
    options: LocatorOptions,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            options: LocatorOptions::default(),
        }
    }

    /// Locator for `[data-cy="<component>-<role>"]`
    #[must_use]
    pub fn component(component: &str, role: &str) -> Self {
        Self::new(Selector::component(component, role))
    }

    /// Scope this locator under another
    #[must_use]
    pub fn within(self, parent: &Self) -> Self {
        Self {
            selector: self.selector.within(parent.selector.clone()),
            options: self.options,
        }
    }

    /// Set a per-locator timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// CSS selector string
    #[must_use]
    pub fn css(&self) -> String {
        self.selector.to_css()
    }
}

/// Role name to locator mapping for one UI region.
///
/// Populated through [`LocatorMap::with_role`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorMap {
    region: String,
    roles: BTreeMap<String, Locator>,
}

impl LocatorMap {
    /// Create an empty map for a region
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            roles: BTreeMap::new(),
        }
    }

    /// Register a role
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, locator: Locator) -> Self {
        self.roles.insert(role.into(), locator);
        self
    }

    /// Region name
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Look up a role
    pub fn get(&self, role: &str) -> HarnessResult<&Locator> {
        self.roles.get(role).ok_or_else(|| HarnessError::UnknownRole {
            role: role.to_string(),
            page: self.region.clone(),
        })
    }

    /// Check whether a role is registered
    #[must_use]
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Registered role names in order
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Number of registered roles
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if no role is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_component_selector() {
            let sel = Selector::component("MainPage", "submit");
            assert_eq!(sel.to_css(), "[data-cy=\"MainPage-submit\"]");
        }

        #[test]
        fn test_descendant_selector() {
            let icon = Selector::component("ToggleTheme", "iconSun")
                .within(Selector::component("ToggleTheme", "button"));
            assert_eq!(
                icon.to_css(),
                "[data-cy=\"ToggleTheme-button\"] [data-cy=\"ToggleTheme-iconSun\"]"
            );
            assert_eq!(icon.path(), vec!["ToggleTheme-button", "ToggleTheme-iconSun"]);
        }

        #[test]
        fn test_parse_inverts_to_css() {
            let nested = Selector::data_cy("c")
                .within(Selector::data_cy("b").within(Selector::data_cy("a")));
            let parsed = Selector::parse(&nested.to_css()).unwrap();
            assert_eq!(parsed.path(), vec!["a", "b", "c"]);
        }

        #[test]
        fn test_parse_rejects_class_selectors() {
            assert!(Selector::parse(".btn-primary").is_err());
            assert!(Selector::parse("").is_err());
        }
    }

    mod map_tests {
        use super::*;

        fn map() -> LocatorMap {
            LocatorMap::new("form")
                .with_role("submit_button", Locator::component("MainPage", "submit"))
                .with_role("form", Locator::component("MainPage", "form"))
        }

        #[test]
        fn test_lookup() {
            let map = map();
            assert_eq!(map.len(), 2);
            assert!(map.contains("form"));
            assert_eq!(
                map.get("submit_button").unwrap().css(),
                "[data-cy=\"MainPage-submit\"]"
            );
        }

        #[test]
        fn test_unknown_role() {
            let err = map().get("reset_button").unwrap_err();
            match err {
                HarnessError::UnknownRole { role, page } => {
                    assert_eq!(role, "reset_button");
                    assert_eq!(page, "form");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_locator_timeout_override() {
            let locator =
                Locator::component("A", "b").with_timeout(Duration::from_millis(10));
            assert_eq!(locator.options().timeout, Some(Duration::from_millis(10)));
        }
    }
}
