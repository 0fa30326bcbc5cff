use std::io::{Error as IoError, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::app::ports::ArtifactStore;
use crate::artifact::ManagedArtifact;
use crate::error::{Result, UdepsError};

/// Puts the exported functions of a catalog or managed file in name order.
pub struct SortUseCase {
    store: Arc<dyn ArtifactStore>,
}

impl SortUseCase {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Returns whether the file had to be rewritten.
    pub async fn execute(&self, path: &Path) -> Result<bool> {
        let text = self.store.read(path).await?.ok_or_else(|| {
            UdepsError::Io(IoError::new(
                ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ))
        })?;
        let artifact = ManagedArtifact::parse(path, &text)?;
        if artifact.is_sorted() {
            debug!(path = %path.display(), "already sorted");
            return Ok(false);
        }
        self.store.write(path, &artifact.sorted().render()).await?;
        info!(path = %path.display(), "sorted exported functions");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::FsArtifactStore;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_sorts_unsorted_file_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.ts");
        fs::write(
            &path,
            "/** @license 0BSD */\n\n/**\n * B.\n */\nexport function b() {}\n\n/**\n * A.\n */\nexport function a() {}\n",
        )
        .unwrap();
        let use_case = SortUseCase::new(Arc::new(FsArtifactStore));
        assert!(use_case.execute(&path).await.unwrap());
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "/** @license 0BSD */\n\n/**\n * A.\n */\nexport function a() {}\n\n/**\n * B.\n */\nexport function b() {}\n"
        );
        assert!(!use_case.execute(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let use_case = SortUseCase::new(Arc::new(FsArtifactStore));
        assert!(use_case.execute(&dir.path().join("nope.ts")).await.is_err());
    }
}
