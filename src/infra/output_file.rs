use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;

use crate::app::ports::ArtifactStore;
use crate::error::{Result, UdepsError};

/// Managed files on the local filesystem.
pub struct FsArtifactStore;

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn read(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UdepsError::Io(e)),
        }
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let wrap = |source| UdepsError::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
        }
        tokio::fs::write(path, contents).await.map_err(wrap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        assert_eq!(FsArtifactStore.read(&dir.path().join("udeps.ts")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("src/utils/udeps.ts");
        FsArtifactStore.write(&path, "export {};\n").await.unwrap();
        assert_eq!(
            FsArtifactStore.read(&path).await.unwrap().as_deref(),
            Some("export {};\n")
        );
    }
}
