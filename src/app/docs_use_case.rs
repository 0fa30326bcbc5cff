use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::app::ports::{ArtifactStore, CatalogFetcher};
use crate::catalog::{load, Catalog, CatalogLocator, DocTag};
use crate::config::UdepsConfig;
use crate::constants::SPDX_LICENSE_URL;
use crate::error::Result;
use crate::obsolescence::docs_url;

#[derive(Debug, Default)]
pub struct DocsReport {
    pub written: Vec<PathBuf>,
    /// `(source, error)` for catalogs that could not be documented.
    pub failed: Vec<(String, String)>,
}

/// Writes one Markdown page per configured catalog into `out_dir`
/// (relative to the project). A failing catalog is recorded and the rest
/// are still documented.
pub async fn generate_docs(
    config: &UdepsConfig,
    fetcher: &dyn CatalogFetcher,
    store: &dyn ArtifactStore,
    out_dir: &Path,
) -> Result<DocsReport> {
    let out_dir = config.project.join(out_dir);
    let mut report = DocsReport::default();
    for raw in &config.registry {
        let result = async {
            let locator = CatalogLocator::parse(raw, &config.project)?;
            let loaded = load(fetcher, &locator).await?;
            loaded.log_diagnostics();
            let path = out_dir.join(format!("{}.md", locator.stem()));
            store.write(&path, &render_markdown(&locator.stem(), &loaded.catalog)).await?;
            Ok::<_, crate::error::UdepsError>(path)
        }
        .await;
        match result {
            Ok(path) => {
                info!(source = %raw, path = %path.display(), "documentation written");
                report.written.push(path);
            }
            Err(e) => {
                warn!(source = %raw, "skipping catalog: {}", e);
                report.failed.push((raw.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}

/// Markdown page for one catalog.
pub fn render_markdown(title: &str, catalog: &Catalog) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", title));
    if !catalog.description.is_empty() {
        out.push_str(&format!("{}\n\n", catalog.description));
    }
    if let Some(license) = &catalog.license {
        out.push_str(&format!("**License:** [{0}]({1}/{0}.html)\n\n", license, SPDX_LICENSE_URL));
    }

    for entry in &catalog.entries {
        out.push_str(&format!("## {}\n\n", entry.name));
        if !entry.description.is_empty() {
            out.push_str(&format!("{}\n\n", entry.description));
        }

        let requires = entry.requires();
        if requires.iter().any(|t| t.normalized().starts_with("dom")) {
            out.push_str("> [!NOTE]\n> This function requires a browser.\n\n");
        }
        if requires.iter().any(|t| t.normalized().starts_with("node")) {
            out.push_str("> [!NOTE]\n> This function requires Node.js.\n\n");
        }
        let es_version = requires
            .iter()
            .filter_map(|t| {
                let head = t.normalized();
                let head = head.split('.').next().unwrap_or("");
                head.strip_prefix("es")?.parse::<u32>().ok()
            })
            .max();
        if let Some(version) = es_version.filter(|v| *v > 5) {
            out.push_str(&format!("> [!NOTE]\n> This function requires ES{}.\n\n", version));
        }

        for tag in &entry.tags {
            let DocTag::Deprecated(reason) = tag else {
                continue;
            };
            let important = reason.since.is_some() || reason.recommends_inline();
            out.push_str(&format!("> [!{}]\n> ", if important { "IMPORTANT" } else { "NOTE" }));
            if let Some(since) = &reason.since {
                let version = since.as_str().split('.').next().unwrap_or("");
                out.push_str(&format!("**Deprecated since {}.** ", version));
            }
            if let Some(replacement) = &reason.replacement {
                out.push_str(&format!("Use [{}]({}) instead. ", replacement, docs_url(replacement)));
            }
            match reason.inline_hint() {
                Some("recommend") => out.push_str("You should inline this function instead of importing it."),
                Some(_) => out.push_str("Consider inlining this function."),
                None => {}
            }
            let trimmed = out.trim_end_matches(' ').len();
            out.truncate(trimmed);
            out.push_str("\n\n");
        }

        out.push_str(&format!("```ts\n{}\n```\n\n", entry.function));
    }
    out
}
