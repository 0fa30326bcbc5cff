use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, warn, Instrument};

use super::{Catalog, CatalogEntry, CatalogLocator, DocComment};
use crate::app::ports::CatalogFetcher;
use crate::constants::is_public_domain_license;
use crate::error::{Diagnostic, Result, UdepsError};
use crate::syntax::lexer::tokenize;
use crate::syntax::parse_source;

#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadedCatalog {
    pub fn log_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            match diagnostic {
                Diagnostic::MissingLicense { .. } => info!("{}", diagnostic),
                _ => warn!("{}", diagnostic),
            }
        }
    }
}

/// Parses catalog text. `source_name` is only used for reporting.
///
/// Exported functions without a doc comment are skipped with a
/// `MissingDocumentation` diagnostic; a missing or non-public-domain
/// `@license` is reported but never fails the load.
pub fn parse_catalog(source_name: &str, text: &str) -> Result<LoadedCatalog> {
    let unit = parse_source(text).map_err(|e| UdepsError::CatalogParse {
        locator: source_name.to_string(),
        source: e,
    })?;
    let mut diagnostics = Vec::new();

    let module_docs = doc_blocks(&unit.header);
    let description = module_docs
        .iter()
        .map(|doc| doc.description.as_str())
        .find(|d| !d.is_empty())
        .unwrap_or("")
        .to_string();
    let license = module_docs
        .iter()
        .find_map(|doc| doc.license().map(str::to_string))
        .or_else(|| {
            let first_doc = unit.statements.first()?.doc.as_deref()?;
            DocComment::parse(first_doc).license().map(str::to_string)
        });
    match &license {
        None => diagnostics.push(Diagnostic::MissingLicense {
            catalog: source_name.to_string(),
        }),
        Some(license) if !is_public_domain_license(license) => {
            diagnostics.push(Diagnostic::LicenseMismatch {
                catalog: source_name.to_string(),
                license: license.clone(),
            })
        }
        Some(_) => {}
    }

    let mut catalog = Catalog {
        source: source_name.to_string(),
        description,
        license,
        entries: Vec::new(),
    };
    // Overloads carry the doc comment on their first signature.
    let mut signature_doc: Option<(&str, &str)> = None;
    for statement in &unit.statements {
        if let Some(name) = statement.signature_name() {
            match (signature_doc, statement.doc.as_deref()) {
                (Some((pending, _)), _) if pending == name => {}
                (_, Some(doc)) => signature_doc = Some((name, doc)),
                _ => signature_doc = None,
            }
            continue;
        }
        let inherited = signature_doc
            .take()
            .filter(|(pending, _)| Some(*pending) == statement.exported_name())
            .map(|(_, doc)| doc);
        let Some(name) = statement.exported_name() else {
            continue;
        };
        let Some(doc) = statement.doc.as_deref().or(inherited) else {
            diagnostics.push(Diagnostic::MissingDocumentation {
                catalog: source_name.to_string(),
                name: name.to_string(),
            });
            continue;
        };
        if catalog.find(name).is_some() {
            warn!(name, catalog = source_name, "duplicate function in catalog, keeping the first");
            continue;
        }
        let parsed = DocComment::parse(doc);
        catalog.entries.push(CatalogEntry {
            name: name.to_string(),
            description: parsed.description,
            tags: parsed.tags,
            source_fragment: format!("{}\n{}", doc, statement.code),
            function: statement.code.clone(),
        });
    }

    Ok(LoadedCatalog {
        catalog,
        diagnostics,
    })
}

fn doc_blocks(comments: &str) -> Vec<DocComment> {
    match tokenize(comments) {
        Ok(tokens) => tokens
            .iter()
            .filter(|t| t.is_doc_comment(comments))
            .map(|t| DocComment::parse(t.text(comments)))
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Fetches and parses one catalog source.
pub async fn load(fetcher: &dyn CatalogFetcher, locator: &CatalogLocator) -> Result<LoadedCatalog> {
    let text = fetcher.fetch(locator).await?;
    let loaded = parse_catalog(&locator.to_string(), &text)?;
    debug!(
        entries = loaded.catalog.entries.len(),
        diagnostics = loaded.diagnostics.len(),
        "catalog parsed"
    );
    Ok(loaded)
}

/// Configured catalog sources, loaded one at a time in order.
///
/// Nothing is fetched until `next` is awaited, so a caller that stops
/// early never loads the remaining sources. A failing source yields its
/// error and the sequence moves on. Build a new sequence to start over.
pub struct CatalogSequence<'a> {
    fetcher: &'a dyn CatalogFetcher,
    project: PathBuf,
    locators: std::vec::IntoIter<String>,
}

impl<'a> CatalogSequence<'a> {
    pub fn new(fetcher: &'a dyn CatalogFetcher, project: &Path, registry: &[String]) -> Self {
        Self {
            fetcher,
            project: project.to_path_buf(),
            locators: registry.to_vec().into_iter(),
        }
    }

    /// The next source and its load result, or `None` when exhausted.
    pub async fn next(&mut self) -> Option<(String, Result<LoadedCatalog>)> {
        let raw = self.locators.next()?;
        let span = info_span!("catalog", source = %raw);
        let fetcher = self.fetcher;
        let project = &self.project;
        let result = async {
            let locator = CatalogLocator::parse(&raw, project)?;
            load(fetcher, &locator).await
        }
        .instrument(span)
        .await;
        Some((raw, result))
    }
}
