use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::ports::CatalogFetcher;
use crate::capability::{unsupported, CapabilityToken};
use crate::catalog::{CatalogEntry, CatalogSequence};
use crate::config::UdepsConfig;
use crate::constants::MAX_SEARCH_RESULTS;
use crate::error::Result;
use crate::obsolescence::{describe, evaluate};

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub name: String,
    pub catalog: String,
    pub summary: String,
    pub score: u32,
    /// Capabilities the target lacks; empty for supported hits.
    pub missing: Vec<CapabilityToken>,
    /// Deprecation message for supported hits that are obsolete or have an
    /// inlining hint.
    pub obsolescence: Option<String>,
}

#[derive(Debug, Default)]
pub struct SearchReport {
    /// Best match first.
    pub supported: Vec<SearchHit>,
    pub unsupported: Vec<SearchHit>,
    pub failed_sources: usize,
}

impl SearchReport {
    /// The supported hits worth printing.
    pub fn top(&self) -> &[SearchHit] {
        &self.supported[..self.supported.len().min(MAX_SEARCH_RESULTS)]
    }

    pub fn remaining(&self) -> usize {
        self.supported.len().saturating_sub(MAX_SEARCH_RESULTS)
    }
}

/// Searches every configured catalog by name and description.
pub struct SearchUseCase {
    fetcher: Arc<dyn CatalogFetcher>,
}

impl SearchUseCase {
    pub fn new(fetcher: Arc<dyn CatalogFetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn execute(&self, config: &UdepsConfig, query: &str) -> Result<SearchReport> {
        let target = config.target();
        let mut report = SearchReport::default();
        let mut catalogs = CatalogSequence::new(self.fetcher.as_ref(), &config.project, &config.registry);
        while let Some((source, loaded)) = catalogs.next().await {
            let loaded = match loaded {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!(source = %source, "skipping catalog: {}", e);
                    report.failed_sources += 1;
                    continue;
                }
            };
            loaded.log_diagnostics();
            debug!(source = %source, entries = loaded.catalog.entries.len(), "catalog loaded");
            for entry in &loaded.catalog.entries {
                let Some(score) = match_score(query, entry) else {
                    continue;
                };
                let missing = unsupported(&target, &entry.requires());
                let obsolescence = if missing.is_empty() {
                    evaluate(entry, &target)
                        .map(|reason| describe(entry, &reason))
                        .filter(|message| !message.is_empty())
                } else {
                    None
                };
                let hit = SearchHit {
                    name: entry.name.clone(),
                    catalog: source.clone(),
                    summary: entry.summary().to_string(),
                    score,
                    missing,
                    obsolescence,
                };
                if hit.missing.is_empty() {
                    report.supported.push(hit);
                } else {
                    report.unsupported.push(hit);
                }
            }
        }
        // Stable: equal scores keep catalog order.
        report.supported.sort_by(|a, b| b.score.cmp(&a.score));
        report.unsupported.sort_by(|a, b| b.score.cmp(&a.score));
        info!(
            supported = report.supported.len(),
            unsupported = report.unsupported.len(),
            "search finished"
        );
        Ok(report)
    }
}

/// Relevance of `entry` for `query`, or `None` when it does not match.
///
/// Exact name beats a name substring, which beats every query word
/// appearing in the name or description, which beats the query letters
/// appearing in order in the name.
pub fn match_score(query: &str, entry: &CatalogEntry) -> Option<u32> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }
    let name = entry.name.to_lowercase();
    if name == query {
        return Some(100);
    }
    if name.contains(&query) {
        return Some(80);
    }
    let haystack = format!("{} {}", name, entry.description.to_lowercase());
    if query.split_whitespace().all(|word| haystack.contains(word)) {
        return Some(60);
    }
    let mut letters = name.chars();
    if query
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|c| letters.any(|n| n == c))
    {
        return Some(40);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{parse_catalog, CatalogLocator};
    use async_trait::async_trait;
    use std::path::PathBuf;

    const CATALOG: &str = r#"/** @license 0BSD */

/**
 * Splits an array into chunks of the given size.
 */
export function chunk<T>(input: T[], size: number): T[][] {
  return [];
}

/**
 * Removes falsy values from an array.
 * @deprecated inline=recommend
 */
export function compact<T>(input: T[]) {
  return input.filter(Boolean);
}

/**
 * Reads the clipboard.
 * @requires DOM
 */
export function readClipboard() {
  return navigator.clipboard.readText();
}
"#;

    struct OneCatalog;

    #[async_trait]
    impl CatalogFetcher for OneCatalog {
        async fn fetch(&self, locator: &CatalogLocator) -> Result<String> {
            match locator {
                CatalogLocator::Local(path) if path.ends_with("array.ts") => Ok(CATALOG.to_string()),
                _ => Err(crate::error::UdepsError::SourceUnavailable {
                    locator: locator.to_string(),
                    reason: "missing".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_match_score_ordering() {
        let entries = parse_catalog("array.ts", CATALOG).unwrap().catalog.entries;
        let chunk = &entries[0];
        assert_eq!(match_score("chunk", chunk), Some(100));
        assert_eq!(match_score("CHUN", chunk), Some(80));
        assert_eq!(match_score("array size", chunk), Some(60));
        assert_eq!(match_score("cnk", chunk), Some(40));
        assert_eq!(match_score("zebra", chunk), None);
        assert_eq!(match_score("  ", chunk), None);
    }

    #[tokio::test]
    async fn test_search_splits_supported_and_unsupported() {
        let config = UdepsConfig {
            project: PathBuf::from("/proj"),
            registry: vec!["missing.ts".to_string(), "array.ts".to_string()],
            ..UdepsConfig::default()
        };
        let report = SearchUseCase::new(Arc::new(OneCatalog))
            .execute(&config, "array")
            .await
            .unwrap();
        assert_eq!(report.failed_sources, 1);
        let names: Vec<&str> = report.supported.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["chunk", "compact"]);
        assert_eq!(report.supported[0].summary, "Splits an array into chunks of the given size");
        assert_eq!(
            report.supported[1].obsolescence.as_deref(),
            Some("⚠️  This should be inlined as input.filter(Boolean)")
        );

        let report = SearchUseCase::new(Arc::new(OneCatalog))
            .execute(&config, "clipboard")
            .await
            .unwrap();
        assert!(report.supported.is_empty());
        assert_eq!(report.unsupported.len(), 1);
        assert_eq!(report.unsupported[0].missing, vec![CapabilityToken::new("DOM")]);
    }
}
