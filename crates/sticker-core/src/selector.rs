//! Label selectors.
//!
//! A selector is a comma-separated list of requirements, all of which must
//! hold: `key=value`, `key!=value`, `key` (exists) and `!key` (absent).

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::metadata::Metadata;

/// One requirement on a resource's labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelRequirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
}

impl LabelRequirement {
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            LabelRequirement::Equals(k, v) => labels.get(k) == Some(v),
            LabelRequirement::NotEquals(k, v) => labels.get(k) != Some(v),
            LabelRequirement::Exists(k) => labels.contains_key(k),
            LabelRequirement::NotExists(k) => !labels.contains_key(k),
        }
    }
}

/// A conjunction of label requirements. The empty selector matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<LabelRequirement>,
}

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements
            .push(LabelRequirement::Equals(key.into(), value.into()));
        self
    }

    pub fn not_eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements
            .push(LabelRequirement::NotEquals(key.into(), value.into()));
        self
    }

    pub fn exists(mut self, key: impl Into<String>) -> Self {
        self.requirements.push(LabelRequirement::Exists(key.into()));
        self
    }

    pub fn not_exists(mut self, key: impl Into<String>) -> Self {
        self.requirements.push(LabelRequirement::NotExists(key.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[LabelRequirement] {
        &self.requirements
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.requirements
            .iter()
            .all(|r| r.matches(&metadata.labels))
    }

    /// Parse the textual form.
    pub fn parse(selector: &str) -> Result<Self> {
        let mut parsed = Self::new();
        for raw in selector.split(',') {
            let term = raw.trim();
            if term.is_empty() {
                continue;
            }
            let requirement = if let Some((k, v)) = term.split_once("!=") {
                LabelRequirement::NotEquals(key(selector, k)?, v.trim().to_string())
            } else if let Some((k, v)) = term.split_once('=') {
                LabelRequirement::Equals(key(selector, k)?, v.trim().to_string())
            } else if let Some(k) = term.strip_prefix('!') {
                LabelRequirement::NotExists(key(selector, k)?)
            } else {
                LabelRequirement::Exists(key(selector, term)?)
            };
            parsed.requirements.push(requirement);
        }
        Ok(parsed)
    }
}

fn key(selector: &str, raw: &str) -> Result<String> {
    let k = raw.trim();
    if k.is_empty() || k.contains(['=', '!', ' ']) {
        return Err(CoreError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("invalid key {raw:?}"),
        });
    }
    Ok(k.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labelled(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .fold(Metadata::named("x"), |m, (k, v)| m.with_label(*k, *v))
    }

    #[test]
    fn test_parse_all_forms() {
        let selector = LabelSelector::parse("tier=gold, env!=dev,pinned,!hidden").unwrap();
        assert_eq!(
            selector.requirements(),
            &[
                LabelRequirement::Equals("tier".into(), "gold".into()),
                LabelRequirement::NotEquals("env".into(), "dev".into()),
                LabelRequirement::Exists("pinned".into()),
                LabelRequirement::NotExists("hidden".into()),
            ]
        );
    }

    #[test]
    fn test_matches_conjunction() {
        let selector = LabelSelector::new().eq("tier", "gold").not_exists("hidden");
        assert!(selector.matches(&labelled(&[("tier", "gold")])));
        assert!(!selector.matches(&labelled(&[("tier", "gold"), ("hidden", "1")])));
        assert!(!selector.matches(&labelled(&[("tier", "silver")])));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector = LabelSelector::parse(" , ").unwrap();
        assert!(selector.is_empty());
        assert!(selector.matches(&Metadata::named("x")));
    }

    #[test]
    fn test_rejects_bad_keys() {
        assert!(LabelSelector::parse("=v").is_err());
        assert!(LabelSelector::parse("!").is_err());
        assert!(LabelSelector::parse("a b=c").is_err());
    }

    proptest! {
        #[test]
        fn prop_equals_matches_only_that_value(
            key in "[a-z][a-z0-9.-]{0,15}",
            want in "[a-z0-9]{0,8}",
            have in "[a-z0-9]{0,8}",
        ) {
            let selector = LabelSelector::parse(&format!("{key}={want}")).unwrap();
            let meta = Metadata::named("x").with_label(key.clone(), have.clone());
            prop_assert_eq!(selector.matches(&meta), want == have);
        }
    }
}
