//! Detection categories and the swappable rule set that gates them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A detection category that can be switched on or off at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Plain-text HTTP signals (request line, header names).
    Http,
    /// TLS handshake records.
    Https,
}

impl Category {
    /// Name used as the key in a [`RuleSet`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Http => "http",
            Category::Https => "https",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from category name to enabled/disabled.
///
/// A rule set is always replaced as a whole. Categories missing from the map
/// are treated as disabled, so an update that omits a category turns it off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    categories: BTreeMap<String, bool>,
}

impl RuleSet {
    pub fn new(categories: BTreeMap<String, bool>) -> Self {
        Self { categories }
    }

    /// Whether detectors of `category` may contribute to a verdict.
    pub fn is_enabled(&self, category: Category) -> bool {
        self.categories
            .get(category.as_str())
            .copied()
            .unwrap_or(false)
    }

    pub fn categories(&self) -> &BTreeMap<String, bool> {
        &self.categories
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        [(Category::Http, true), (Category::Https, true)]
            .into_iter()
            .map(|(c, on)| (c.as_str().to_string(), on))
            .collect()
    }
}

impl FromIterator<(String, bool)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<HashMap<String, bool>> for RuleSet {
    fn from(map: HashMap<String, bool>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_both_categories() {
        let rules = RuleSet::default();
        assert!(rules.is_enabled(Category::Http));
        assert!(rules.is_enabled(Category::Https));
    }

    #[test]
    fn missing_category_is_disabled() {
        let rules: RuleSet = [("http".to_string(), true)].into_iter().collect();
        assert!(rules.is_enabled(Category::Http));
        assert!(!rules.is_enabled(Category::Https));
    }

    #[test]
    fn deserializes_from_plain_map() {
        let rules: RuleSet = serde_json::from_str(r#"{"http": true, "https": false}"#).unwrap();
        assert!(rules.is_enabled(Category::Http));
        assert!(!rules.is_enabled(Category::Https));
        assert_eq!(rules.categories().len(), 2);
    }
}
