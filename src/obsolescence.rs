//! Deprecation evaluation.
//!
//! Catalog entries carry `@deprecated key=value, ...` tags such as
//! `since=ES2022.Object, replace-with={@link Object.hasOwn}` or
//! `inline=recommend`. Whether an entry counts as obsolete depends on the
//! target: a replacement that the target cannot use yet does not make the
//! entry obsolete.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::capability::{unsupported, CapabilitySet, CapabilityToken};
use crate::catalog::CatalogEntry;
use crate::constants::MDN_GLOBAL_OBJECTS_URL;
use crate::syntax;

static PROPERTY_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,\s*").expect("valid regex"));
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{@link\s+([^}]+)\}").expect("valid regex"));

/// Parsed `@deprecated` properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeprecationReason {
    /// `recommend`, `consider`, or any other text (treated like `consider`).
    pub inline: Option<String>,
    pub since: Option<CapabilityToken>,
    pub replacement: Option<String>,
}

impl DeprecationReason {
    pub fn parse(raw: &str) -> Self {
        let mut reason = Self::default();
        for part in PROPERTY_SEPARATOR.split(raw.trim()) {
            let (key, value) = match part.split_once('=') {
                Some((key, value)) => (key.trim(), unwrap_link(value.trim())),
                None => (part.trim(), String::new()),
            };
            match key {
                "" => {}
                "inline" => reason.inline = Some(value),
                "since" => reason.since = Some(CapabilityToken::new(value)),
                "replace-with" | "replacement" | "replaceWith" | "replace" | "use" => reason.replacement = Some(value),
                other => debug!(key = other, "ignoring unknown @deprecated property"),
            }
        }
        reason
    }

    /// Only an inlining hint; the entry itself is still the right thing to use.
    pub fn is_inline_only(&self) -> bool {
        self.since.is_none() && self.replacement.is_none()
    }

    /// The `inline` value, unless it is absent or a bare flag.
    pub fn inline_hint(&self) -> Option<&str> {
        self.inline.as_deref().filter(|hint| !hint.is_empty())
    }

    pub fn recommends_inline(&self) -> bool {
        self.inline.as_deref() == Some("recommend")
    }
}

fn unwrap_link(value: &str) -> String {
    LINK.captures(value)
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_else(|| value.to_string())
}

/// Decides whether `entry` is obsolete for `target`.
///
/// - no `@deprecated` tag: `None`
/// - `since` names a capability the target lacks: only the inline hint
///   survives (`None` when there is none)
/// - otherwise the full reason
pub fn evaluate(entry: &CatalogEntry, target: &CapabilitySet) -> Option<DeprecationReason> {
    let reason = entry.deprecation()?;
    if let Some(since) = &reason.since {
        if !unsupported(target, std::slice::from_ref(since)).is_empty() {
            return reason.inline_hint().map(|inline| DeprecationReason {
                inline: Some(inline.to_string()),
                ..DeprecationReason::default()
            });
        }
    }
    Some(reason.clone())
}

/// MDN reference page for a global such as `Array.prototype.includes`.
pub fn docs_url(name: &str) -> String {
    let path: Vec<&str> = name.split('.').filter(|part| *part != "prototype").collect();
    format!("{}/{}", MDN_GLOBAL_OBJECTS_URL, path.join("/"))
}

/// The inline replacement for `entry`: its single returned expression with
/// types erased.
pub fn inline_suggestion(entry: &CatalogEntry) -> Option<String> {
    let expression = syntax::single_return_expression(&entry.function)?;
    syntax::erase(&expression).ok()
}

/// One-paragraph explanation of why `entry` should not be added.
pub fn describe(entry: &CatalogEntry, reason: &DeprecationReason) -> String {
    if let Some(replacement) = &reason.replacement {
        return format!(
            "⚠️  Use the native function {}\n    {}",
            replacement,
            docs_url(replacement)
        );
    }
    if reason.inline_hint().is_some() {
        if let Some(inline) = inline_suggestion(entry) {
            if reason.recommends_inline() {
                return format!("⚠️  This should be inlined as {}", inline);
            }
            return format!("❓ Consider inlining this as {}", inline);
        }
    }
    if let Some(since) = &reason.since {
        return format!("⚠️  Deprecated since {}", since);
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, DocTag};

    fn entry_with(deprecated: &str, body: &str) -> CatalogEntry {
        CatalogEntry {
            name: "hasOwn".to_string(),
            description: "Checks own properties.".to_string(),
            tags: vec![
                DocTag::Requires(CapabilityToken::new("ES5")),
                DocTag::Deprecated(DeprecationReason::parse(deprecated)),
            ],
            source_fragment: format!("/**\n * Checks own properties.\n */\n{}", body),
            function: body.to_string(),
        }
    }

    fn target(tokens: &[&str]) -> CapabilitySet {
        tokens.iter().collect()
    }

    const HAS_OWN: &str =
        "export function hasOwn(obj: object, key: PropertyKey): boolean {\n  return Object.prototype.hasOwnProperty.call(obj, key);\n}";

    #[test]
    fn test_parse_properties() {
        let reason = DeprecationReason::parse("since=ES2022.Object, replace-with={@link Object.hasOwn}, inline=consider");
        assert_eq!(reason.since, Some(CapabilityToken::new("es2022.object")));
        assert_eq!(reason.replacement.as_deref(), Some("Object.hasOwn"));
        assert_eq!(reason.inline.as_deref(), Some("consider"));
    }

    #[test]
    fn test_parse_flag_and_aliases() {
        let reason = DeprecationReason::parse("inline");
        assert_eq!(reason.inline.as_deref(), Some(""));
        let reason = DeprecationReason::parse("since=node, use={@link node:utils/types.isDate}");
        assert_eq!(reason.replacement.as_deref(), Some("node:utils/types.isDate"));
        let reason = DeprecationReason::parse("since=ES2015, replaceWith=example.newFunction");
        assert_eq!(reason.replacement.as_deref(), Some("example.newFunction"));
    }

    #[test]
    fn test_not_obsolete_when_replacement_unavailable() {
        let entry = entry_with("since=es2022.object, replace-with={@link Object.hasOwn}", HAS_OWN);
        assert_eq!(evaluate(&entry, &target(&["es2020"])), None);
    }

    #[test]
    fn test_obsolete_when_replacement_available() {
        let entry = entry_with("since=es2022.object, replace-with={@link Object.hasOwn}", HAS_OWN);
        let reason = evaluate(&entry, &target(&["es2022.object"])).unwrap();
        assert_eq!(reason.since, Some(CapabilityToken::new("es2022.object")));
        assert_eq!(reason.replacement.as_deref(), Some("Object.hasOwn"));
        assert_eq!(reason.inline, None);
    }

    #[test]
    fn test_inline_hint_survives_missing_capability() {
        let entry = entry_with("since=ES2022.Object, inline=consider", HAS_OWN);
        let reason = evaluate(&entry, &target(&["es2020"])).unwrap();
        assert_eq!(reason.inline.as_deref(), Some("consider"));
        assert!(reason.is_inline_only());
    }

    #[test]
    fn test_bare_inline_flag_is_not_a_hint() {
        let entry = entry_with("since=ES2022.Object, inline", HAS_OWN);
        assert_eq!(evaluate(&entry, &target(&["es2020"])), None);
        let reason = evaluate(&entry, &target(&["es2022"])).unwrap();
        assert_eq!(reason.inline_hint(), None);
        assert_eq!(describe(&entry, &reason), "⚠️  Deprecated since ES2022.Object");
    }

    #[test]
    fn test_unconditional_deprecation() {
        let entry = entry_with("inline=recommend", HAS_OWN);
        let reason = evaluate(&entry, &target(&[])).unwrap();
        assert!(reason.recommends_inline());
        assert_eq!(
            describe(&entry, &reason),
            "⚠️  This should be inlined as Object.prototype.hasOwnProperty.call(obj, key)"
        );
    }

    #[test]
    fn test_no_deprecation_tag() {
        let mut entry = entry_with("inline", HAS_OWN);
        entry.tags.retain(|t| !matches!(t, DocTag::Deprecated(_)));
        assert_eq!(evaluate(&entry, &target(&["esnext"])), None);
    }

    #[test]
    fn test_describe_replacement() {
        let entry = entry_with("since=ES2016.Array.Include, replace-with={@link Array.prototype.includes}", HAS_OWN);
        let reason = evaluate(&entry, &target(&["es2020"])).unwrap();
        assert_eq!(
            describe(&entry, &reason),
            "⚠️  Use the native function Array.prototype.includes\n    https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/Array/includes"
        );
    }
}
