//! Fixture store: named, externally stored test datasets.
//!
//! A dataset `name` lives in `<dir>/<name>.json`, `<name>.yaml` or
//! `<name>.yml`, tried in that order. Datasets are read from disk on every
//! access and never cached.

use crate::result::{HarnessError, HarnessResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Dataset holding CSS inputs
pub const CSS_SAMPLES: &str = "data";

/// Dataset holding canned API responses
pub const API_RESPONSES: &str = "response";

const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// A named bag of string fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name
    pub name: String,
    /// Fields by key
    pub fields: BTreeMap<String, String>,
}

impl Dataset {
    /// Get a field
    pub fn get(&self, key: &str) -> HarnessResult<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| HarnessError::fixture(format!("dataset `{}` has no key `{key}`", self.name)))
    }

    /// Field keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Typed view of the `data` dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssSamples {
    /// Syntactically valid stylesheet
    pub css_valid: String,
    /// Malformed stylesheet
    #[serde(default)]
    pub css_invalid: Option<String>,
}

/// Typed view of the `response` dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponses {
    /// Body the backend returns for valid input
    pub response_valid_css: String,
    /// Malformed body standing in for a broken backend
    pub response_invalid_css: String,
}

/// Loads datasets from a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    /// Create a store rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store over the datasets shipped with this crate
    #[must_use]
    pub fn bundled() -> Self {
        Self::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn locate(&self, name: &str) -> HarnessResult<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
            .ok_or_else(|| {
                HarnessError::fixture(format!(
                    "dataset `{name}` not found in {} (tried .json, .yaml, .yml)",
                    self.dir.display()
                ))
            })
    }

    /// Deserialize dataset `name` into `T`
    pub fn load_as<T: DeserializeOwned>(&self, name: &str) -> HarnessResult<T> {
        let path = self.locate(name)?;
        let raw = std::fs::read_to_string(&path)?;
        let parsed = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&raw).map_err(|e| e.to_string())
        } else {
            serde_yaml_ng::from_str(&raw).map_err(|e| e.to_string())
        };
        tracing::debug!(dataset = name, path = %path.display(), "fixture loaded");
        parsed.map_err(|e| HarnessError::fixture(format!("dataset `{name}` is malformed: {e}")))
    }

    /// Load dataset `name` as string fields
    pub fn load(&self, name: &str) -> HarnessResult<Dataset> {
        Ok(Dataset {
            name: name.to_string(),
            fields: self.load_as(name)?,
        })
    }

    /// CSS input samples
    pub fn css_samples(&self) -> HarnessResult<CssSamples> {
        self.load_as(CSS_SAMPLES)
    }

    /// Canned backend responses
    pub fn api_responses(&self) -> HarnessResult<ApiResponses> {
        self.load_as(API_RESPONSES)
    }

    /// Names of the datasets present, sorted
    pub fn list(&self) -> HarnessResult<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| EXTENSIONS.contains(&e))
            })
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod bundled_tests {
        use super::*;
        use crate::oracle::{CssValidator, SyntaxValidator};

        #[test]
        fn test_bundled_datasets_load() {
            let store = FixtureStore::bundled();
            let samples = store.css_samples().unwrap();
            let responses = store.api_responses().unwrap();
            assert!(!samples.css_valid.is_empty());
            assert!(samples.css_invalid.is_some());
            assert!(!responses.response_valid_css.is_empty());
            assert_eq!(store.list().unwrap(), vec!["data", "response"]);
        }

        #[test]
        fn test_bundled_responses_match_oracle_expectations() {
            let responses = FixtureStore::bundled().api_responses().unwrap();
            let validator = SyntaxValidator::new();
            assert!(validator.validate(&responses.response_valid_css).is_empty());
            assert!(!validator.validate(&responses.response_invalid_css).is_empty());
        }
    }

    mod load_tests {
        use super::*;

        #[test]
        fn test_yaml_dataset() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("widths.yml"), "current: 1440px\ntarget: 769px\n").unwrap();
            let store = FixtureStore::new(dir.path());
            let data = store.load("widths").unwrap();
            assert_eq!(data.get("current").unwrap(), "1440px");
            assert_eq!(data.keys().count(), 2);
        }

        #[test]
        fn test_json_preferred_over_yaml() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("d.json"), r#"{"k":"json"}"#).unwrap();
            std::fs::write(dir.path().join("d.yaml"), "k: yaml\n").unwrap();
            let data = FixtureStore::new(dir.path()).load("d").unwrap();
            assert_eq!(data.get("k").unwrap(), "json");
        }

        #[test]
        fn test_missing_dataset() {
            let dir = tempfile::tempdir().unwrap();
            let err = FixtureStore::new(dir.path()).load("data").unwrap_err();
            assert!(matches!(err, HarnessError::FixtureError { .. }));
            assert!(err.to_string().contains("`data`"));
        }

        #[test]
        fn test_missing_key() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("data.json"), r#"{"cssValid":"a{}"}"#).unwrap();
            let data = FixtureStore::new(dir.path()).load("data").unwrap();
            let err = data.get("cssInvalid").unwrap_err();
            assert!(err.to_string().contains("cssInvalid"));
        }

        #[test]
        fn test_malformed_dataset() {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("response.json"), "{not json").unwrap();
            let err = FixtureStore::new(dir.path()).api_responses().unwrap_err();
            assert!(err.to_string().contains("malformed"));
        }

        #[test]
        fn test_reloads_from_disk() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("d.json");
            std::fs::write(&path, r#"{"k":"one"}"#).unwrap();
            let store = FixtureStore::new(dir.path());
            assert_eq!(store.load("d").unwrap().get("k").unwrap(), "one");
            std::fs::write(&path, r#"{"k":"two"}"#).unwrap();
            assert_eq!(store.load("d").unwrap().get("k").unwrap(), "two");
        }
    }
}
