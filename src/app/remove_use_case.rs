use std::sync::Arc;

use tracing::{info, warn};

use crate::app::ports::ArtifactStore;
use crate::artifact::ManagedArtifact;
use crate::config::UdepsConfig;
use crate::error::{Diagnostic, Result};

#[derive(Debug, Default)]
pub struct RemoveReport {
    pub removed: Vec<String>,
    pub not_found: Vec<Diagnostic>,
    /// The output file does not exist; nothing was written.
    pub missing_file: bool,
    pub written: bool,
}

/// Deletes functions from the managed output file.
pub struct RemoveUseCase {
    store: Arc<dyn ArtifactStore>,
}

impl RemoveUseCase {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Removes each name that is present and rewrites the file, even when
    /// none of the names were found.
    pub async fn execute(&self, config: &UdepsConfig, names: &[String]) -> Result<RemoveReport> {
        let path = config.output_path();
        let mut report = RemoveReport::default();
        let Some(text) = self.store.read(&path).await? else {
            warn!(path = %path.display(), "output file does not exist");
            report.missing_file = true;
            return Ok(report);
        };
        let artifact = ManagedArtifact::parse(&path, &text)?;
        let outcome = artifact.remove(names);
        for diagnostic in &outcome.not_found {
            warn!("{}", diagnostic);
        }
        self.store.write(&path, &outcome.artifact.render()).await?;
        info!(path = %path.display(), removed = outcome.removed.len(), "output file updated");
        report.removed = outcome.removed;
        report.not_found = outcome.not_found;
        report.written = true;
        Ok(report)
    }
}
