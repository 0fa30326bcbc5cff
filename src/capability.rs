//! Target capability resolution.
//!
//! A capability token names one platform feature, either a language level
//! (`ES2020`, `esnext`) or a compound `namespace.feature` token
//! (`ES2017.Object`, `module:@types/node` is literal-only). Tokens compare
//! case-insensitively.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

static LEVEL_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^es(\d+)").expect("valid regex"));

/// Ordinal of a language level. `Unbounded` is the `esnext` sentinel and
/// sorts above every numbered level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Ordinal(u32),
    Unbounded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityToken(String);

impl CapabilityToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// True for `namespace.feature` tokens.
    pub fn is_compound(&self) -> bool {
        self.0.contains('.')
    }

    /// Level carried by the token, if any. `ES5` is 5, `ES2015` is 6 and
    /// every later year counts up from there; `ES2017.Object` carries the
    /// level of its prefix.
    pub fn level(&self) -> Option<Level> {
        if self.0.eq_ignore_ascii_case("esnext") {
            return Some(Level::Unbounded);
        }
        let caps = LEVEL_PREFIX.captures(&self.0)?;
        let year: u32 = caps[1].parse().ok()?;
        match year {
            0..=6 => Some(Level::Ordinal(year)),
            2015..=2099 => Some(Level::Ordinal(year - 2015 + 6)),
            _ => None,
        }
    }
}

impl PartialEq for CapabilityToken {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CapabilityToken {}

impl fmt::Display for CapabilityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityToken {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// The tokens a target platform declares support for.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    tokens: Vec<CapabilityToken>,
}

impl CapabilitySet {
    pub fn new(tokens: Vec<CapabilityToken>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[CapabilityToken] {
        &self.tokens
    }

    /// Highest level among the bare (non-compound) tokens. Bare tokens that
    /// do not parse as a level contribute nothing.
    pub fn level(&self) -> Option<Level> {
        self.tokens
            .iter()
            .filter(|t| !t.is_compound())
            .filter_map(CapabilityToken::level)
            .max()
    }

    pub fn contains(&self, token: &CapabilityToken) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Bare tokens that look like a language level but do not parse as one.
    /// These silently contribute nothing to [`CapabilitySet::level`].
    pub fn unparseable_levels(&self) -> Vec<&CapabilityToken> {
        self.tokens
            .iter()
            .filter(|t| !t.is_compound() && t.level().is_none())
            .filter(|t| t.normalized().starts_with("es"))
            .collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|s| CapabilityToken::new(s.as_ref())).collect())
    }
}

/// Returns the required tokens the target does not support, in their
/// original order and casing.
pub fn unsupported(target: &CapabilitySet, required: &[CapabilityToken]) -> Vec<CapabilityToken> {
    let target_level = target.level();
    required
        .iter()
        .filter(|req| {
            let level_ok = match (req.level(), target_level) {
                (Some(needed), Some(have)) => needed.cmp(&have) != Ordering::Greater,
                _ => false,
            };
            !level_ok && !target.contains(req)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<CapabilityToken> {
        raw.iter().map(|s| CapabilityToken::new(*s)).collect()
    }

    fn set(raw: &[&str]) -> CapabilitySet {
        raw.iter().collect()
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(CapabilityToken::new("ES5").level(), Some(Level::Ordinal(5)));
        assert_eq!(CapabilityToken::new("es6").level(), Some(Level::Ordinal(6)));
        assert_eq!(CapabilityToken::new("ES2015").level(), Some(Level::Ordinal(6)));
        assert_eq!(CapabilityToken::new("es2020").level(), Some(Level::Ordinal(11)));
        assert_eq!(CapabilityToken::new("ES2017.Object").level(), Some(Level::Ordinal(8)));
        assert_eq!(CapabilityToken::new("ESNext").level(), Some(Level::Unbounded));
        assert_eq!(CapabilityToken::new("node").level(), None);
        assert_eq!(CapabilityToken::new("es2500").level(), None);
        assert_eq!(CapabilityToken::new("es10").level(), None);
    }

    #[test]
    fn test_older_compound_is_supported() {
        let missing = unsupported(&set(&["es2020"]), &tokens(&["es2015.core"]));
        assert!(missing.is_empty());
    }

    #[test]
    fn test_newer_compound_is_unsupported() {
        let missing = unsupported(&set(&["es2020"]), &tokens(&["es2022.object"]));
        assert_eq!(missing, tokens(&["es2022.object"]));
        assert_eq!(missing[0].as_str(), "es2022.object");
    }

    #[test]
    fn test_empty_target_supports_nothing() {
        assert_eq!(unsupported(&set(&[]), &tokens(&["node"])), tokens(&["node"]));
        assert_eq!(unsupported(&set(&[]), &tokens(&["ES5"])), tokens(&["ES5"]));
    }

    #[test]
    fn test_literal_match_is_case_insensitive() {
        let target = set(&["es2020", "ES2022.Object", "node"]);
        let missing = unsupported(&target, &tokens(&["es2022.object", "Node", "DOM"]));
        assert_eq!(missing, tokens(&["DOM"]));
    }

    #[test]
    fn test_preserves_order_and_casing() {
        let missing = unsupported(&set(&["es5"]), &tokens(&["ES2019.Object", "ES5", "ES2016.Array.Include"]));
        let raw: Vec<&str> = missing.iter().map(CapabilityToken::as_str).collect();
        assert_eq!(raw, vec!["ES2019.Object", "ES2016.Array.Include"]);
    }

    #[test]
    fn test_esnext_target_satisfies_every_level() {
        let target = set(&["esnext"]);
        assert!(unsupported(&target, &tokens(&["ES2099.Future", "ESNext"])).is_empty());
        assert_eq!(unsupported(&target, &tokens(&["node"])), tokens(&["node"]));
    }

    #[test]
    fn test_unparseable_target_level_is_ignored() {
        let target = set(&["esnxt", "es2017"]);
        assert_eq!(target.level(), Some(Level::Ordinal(8)));
        assert_eq!(target.unparseable_levels().len(), 1);
        assert!(unsupported(&target, &tokens(&["es2017.object"])).is_empty());
    }

    #[test]
    fn test_compound_target_does_not_raise_level() {
        let target = set(&["es5", "es2022.object"]);
        assert_eq!(target.level(), Some(Level::Ordinal(5)));
        assert_eq!(unsupported(&target, &tokens(&["es2019.object"])), tokens(&["es2019.object"]));
    }
}
