use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::app::ports::{ArtifactStore, CatalogFetcher};
use crate::artifact::{Dialect, ManagedArtifact};
use crate::capability::unsupported;
use crate::catalog::{CatalogEntry, CatalogSequence};
use crate::config::UdepsConfig;
use crate::error::{Diagnostic, Result};
use crate::obsolescence::{describe, evaluate};

/// A function that was found but deliberately not added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub name: String,
    pub catalog: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct AddReport {
    /// Names inserted into the output file, in request order.
    pub added: Vec<String>,
    /// Obsolete functions left out because `force` was not set.
    pub obsolete: Vec<SkippedEntry>,
    /// Inlining hints for functions that were added anyway.
    pub hints: Vec<SkippedEntry>,
    /// Catalog implementations the target cannot run.
    pub unsatisfied: Vec<Diagnostic>,
    /// Names already present in the output file.
    pub conflicts: Vec<Diagnostic>,
    /// Names with no supported implementation in any catalog.
    pub unresolved: Vec<String>,
    pub written: bool,
}

/// Copies catalog functions into the managed output file.
pub struct AddUseCase {
    fetcher: Arc<dyn CatalogFetcher>,
    store: Arc<dyn ArtifactStore>,
}

impl AddUseCase {
    pub fn new(fetcher: Arc<dyn CatalogFetcher>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { fetcher, store }
    }

    /// Resolves every name against the configured catalogs in order and
    /// inserts the accepted functions with a single write.
    ///
    /// For each name the first catalog defining it that the target
    /// supports wins. Obsolete functions are only added with `force`.
    pub async fn execute(&self, config: &UdepsConfig, names: &[String], force: bool) -> Result<AddReport> {
        let path = config.output_path();
        Dialect::from_path(&path)?.ensure_insertable(&path)?;

        let target = config.target();
        let mut report = AddReport::default();
        let mut pending: Vec<String> = Vec::new();
        for name in names {
            if !pending.contains(name) {
                pending.push(name.clone());
            }
        }
        let mut accepted: Vec<(String, CatalogEntry)> = Vec::new();

        let mut catalogs = CatalogSequence::new(self.fetcher.as_ref(), &config.project, &config.registry);
        while !pending.is_empty() {
            let Some((source, loaded)) = catalogs.next().await else {
                break;
            };
            let loaded = match loaded {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!(source = %source, "skipping catalog: {}", e);
                    continue;
                }
            };
            loaded.log_diagnostics();
            let catalog = &loaded.catalog;
            pending.retain(|name| {
                let _span = info_span!("add", name = %name).entered();
                let Some(entry) = catalog.find(name) else {
                    debug!(source = %source, "no implementation in catalog");
                    return true;
                };
                let missing = unsupported(&target, &entry.requires());
                if !missing.is_empty() {
                    let diagnostic = Diagnostic::CapabilityUnsatisfied {
                        name: name.clone(),
                        catalog: source.clone(),
                        missing,
                    };
                    info!("{}", diagnostic);
                    report.unsatisfied.push(diagnostic);
                    return true;
                }
                info!(source = %source, "supported implementation found");
                match evaluate(entry, &target) {
                    Some(reason) if !reason.is_inline_only() && !force => {
                        report.obsolete.push(SkippedEntry {
                            name: name.clone(),
                            catalog: source.clone(),
                            reason: describe(entry, &reason),
                        });
                    }
                    Some(reason) => {
                        if !reason.is_inline_only() {
                            warn!("adding obsolete function because --force was given");
                        }
                        let message = describe(entry, &reason);
                        if !message.is_empty() {
                            report.hints.push(SkippedEntry {
                                name: name.clone(),
                                catalog: source.clone(),
                                reason: message,
                            });
                        }
                        accepted.push((name.clone(), entry.clone()));
                    }
                    None => accepted.push((name.clone(), entry.clone())),
                }
                false
            });
        }
        for name in pending {
            error!(name = %name, "no supported implementation was found");
            report.unresolved.push(name);
        }

        if accepted.is_empty() {
            return Ok(report);
        }
        // Keep request order so the insert batch matches what was asked for.
        accepted.sort_by_key(|(name, _)| names.iter().position(|n| n == name));
        let entries: Vec<&CatalogEntry> = accepted.iter().map(|(_, entry)| entry).collect();

        let artifact = match self.store.read(&path).await? {
            Some(text) => ManagedArtifact::parse(&path, &text)?,
            None => ManagedArtifact::empty(&path)?,
        };
        let outcome = artifact.insert(&entries)?;
        for conflict in &outcome.conflicts {
            error!("{}", conflict);
        }
        report.conflicts = outcome.conflicts;
        report.added = outcome.added;
        if !report.added.is_empty() {
            self.store.write(&path, &outcome.artifact.render()).await?;
            report.written = true;
            info!(path = %path.display(), added = report.added.len(), "output file updated");
        }
        Ok(report)
    }
}
