use std::path::Path;

use async_trait::async_trait;

use crate::catalog::CatalogLocator;
use crate::error::Result;

/// Retrieves the text of one catalog source.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    async fn fetch(&self, locator: &CatalogLocator) -> Result<String>;
}

/// Reads and writes the managed output file (and generated docs).
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// `Ok(None)` when the file does not exist.
    async fn read(&self, path: &Path) -> Result<Option<String>>;
    async fn write(&self, path: &Path, contents: &str) -> Result<()>;
}
