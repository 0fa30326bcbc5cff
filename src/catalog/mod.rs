//! Catalog sources: documented, exported functions that can be copied into
//! a project.

pub mod doc_comment;
pub mod loader;
pub mod locator;

pub use doc_comment::{DocComment, DocTag};
pub use loader::{load, parse_catalog, CatalogSequence, LoadedCatalog};
pub use locator::CatalogLocator;

use crate::capability::CapabilityToken;
use crate::obsolescence::DeprecationReason;

/// One documented function of a catalog. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    pub tags: Vec<DocTag>,
    /// Doc comment and declaration, as inserted into managed files.
    pub source_fragment: String,
    /// The declaration alone.
    pub function: String,
}

impl CatalogEntry {
    /// `@requires` tokens in declaration order.
    pub fn requires(&self) -> Vec<CapabilityToken> {
        self.tags
            .iter()
            .filter_map(|tag| match tag {
                DocTag::Requires(token) => Some(token.clone()),
                _ => None,
            })
            .collect()
    }

    /// The first `@deprecated` tag.
    pub fn deprecation(&self) -> Option<&DeprecationReason> {
        self.tags.iter().find_map(|tag| match tag {
            DocTag::Deprecated(reason) => Some(reason),
            _ => None,
        })
    }

    /// First sentence of the description, without its full stop.
    pub fn summary(&self) -> &str {
        let first_line = self.description.lines().next().unwrap_or("");
        match first_line.find(". ") {
            Some(end) => &first_line[..end],
            None => first_line.strip_suffix('.').unwrap_or(first_line),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// Display form of the locator the catalog was loaded from.
    pub source: String,
    /// Description of the module doc block, if the catalog has one.
    pub description: String,
    pub license: Option<String>,
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}
