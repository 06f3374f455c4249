//! Comparison modes for element assertions.

use crate::driver::ElementSnapshot;
use crate::result::{HarnessError, HarnessResult};
use crate::retry::Attempt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How an element's observed state is compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Matcher {
    /// Text content equals exactly
    HaveText(String),
    /// Text content contains a substring
    ContainText(String),
    /// Exactly one element is present
    Exist,
    /// No element is present
    NotExist,
    /// Form value equals exactly
    HaveValue(String),
    /// Attribute equals exactly
    HaveAttr {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
}

impl Matcher {
    /// Parse a chainer such as `have.text` with its optional argument.
    ///
    /// `have.attr` takes `name=value`.
    pub fn parse(chainer: &str, value: Option<&str>) -> HarnessResult<Self> {
        let require = |value: Option<&str>| {
            value.map(str::to_string).ok_or_else(|| HarnessError::InputError {
                message: format!("matcher `{chainer}` needs a value"),
            })
        };
        match chainer {
            "have.text" => Ok(Self::HaveText(require(value)?)),
            "contain" | "contain.text" => Ok(Self::ContainText(require(value)?)),
            "exist" => Ok(Self::Exist),
            "not.exist" => Ok(Self::NotExist),
            "have.value" => Ok(Self::HaveValue(require(value)?)),
            "have.attr" => {
                let raw = require(value)?;
                let (name, value) = raw.split_once('=').ok_or_else(|| HarnessError::InputError {
                    message: format!("matcher `have.attr` expects name=value, got {raw:?}"),
                })?;
                Ok(Self::HaveAttr {
                    name: name.to_string(),
                    value: value.to_string(),
                })
            }
            other => Err(HarnessError::InputError {
                message: format!("unknown matcher `{other}`"),
            }),
        }
    }

    /// Chainer name
    #[must_use]
    pub const fn chainer(&self) -> &'static str {
        match self {
            Self::HaveText(_) => "have.text",
            Self::ContainText(_) => "contain.text",
            Self::Exist => "exist",
            Self::NotExist => "not.exist",
            Self::HaveValue(_) => "have.value",
            Self::HaveAttr { .. } => "have.attr",
        }
    }

    /// Human-readable expectation
    #[must_use]
    pub fn expected(&self) -> String {
        match self {
            Self::HaveText(text) => format!("text {text:?}"),
            Self::ContainText(text) => format!("text containing {text:?}"),
            Self::Exist => "exactly one element".to_string(),
            Self::NotExist => "no element".to_string(),
            Self::HaveValue(value) => format!("value {value:?}"),
            Self::HaveAttr { name, value } => format!("{name}={value:?}"),
        }
    }

    /// Compare against the elements currently matching the locator
    #[must_use]
    pub fn check(&self, elements: &[ElementSnapshot]) -> Attempt<()> {
        match self {
            Self::Exist => match elements.len() {
                1 => Attempt::Ready(()),
                n => Attempt::Pending(count_observation(n)),
            },
            Self::NotExist => match elements.len() {
                0 => Attempt::Ready(()),
                n => Attempt::Pending(count_observation(n)),
            },
            _ => {
                let [element] = elements else {
                    return Attempt::Pending(count_observation(elements.len()));
                };
                self.check_one(element)
            }
        }
    }

    fn check_one(&self, element: &ElementSnapshot) -> Attempt<()> {
        let (ok, observed) = match self {
            Self::HaveText(text) => (element.text == *text, format!("text {:?}", element.text)),
            Self::ContainText(text) => (
                element.text.contains(text.as_str()),
                format!("text {:?}", element.text),
            ),
            Self::HaveValue(value) => (
                element.value.as_deref() == Some(value.as_str()),
                element
                    .value
                    .as_ref()
                    .map_or_else(|| "no value".to_string(), |v| format!("value {v:?}")),
            ),
            Self::HaveAttr { name, value } => (
                element.attribute(name) == Some(value.as_str()),
                element
                    .attribute(name)
                    .map_or_else(|| format!("no {name} attribute"), |v| format!("{name}={v:?}")),
            ),
            Self::Exist | Self::NotExist => (true, String::new()),
        };
        if ok {
            Attempt::Ready(())
        } else {
            Attempt::Pending(observed)
        }
    }
}

fn count_observation(n: usize) -> String {
    match n {
        0 => "no element".to_string(),
        1 => "one element".to_string(),
        n => format!("{n} elements"),
    }
}

impl From<&str> for Matcher {
    /// Bare strings compare text exactly
    fn from(text: &str) -> Self {
        Self::HaveText(text.to_string())
    }
}

impl From<String> for Matcher {
    fn from(text: String) -> Self {
        Self::HaveText(text)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chainer())
    }
}
