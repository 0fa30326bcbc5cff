use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, UdepsError};

// Two or more characters so that `C:\catalog.ts` stays a path.
static URL_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]+:").expect("valid regex"));

/// Where a catalog source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocator {
    Remote(String),
    Local(PathBuf),
}

impl CatalogLocator {
    /// Classifies a configured registry entry. Paths are resolved against
    /// the project directory.
    pub fn parse(raw: &str, project: &Path) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(UdepsError::UnsupportedLocator(raw.to_string()));
        }
        let lower = raw.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(CatalogLocator::Remote(raw.to_string()));
        }
        if URL_SCHEME.is_match(raw) {
            return Err(UdepsError::UnsupportedLocator(raw.to_string()));
        }
        Ok(CatalogLocator::Local(project.join(raw)))
    }

    /// File stem used to name generated documentation.
    pub fn stem(&self) -> String {
        let last = match self {
            CatalogLocator::Remote(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.rsplit('/').next().unwrap_or(path).to_string()
            }
            CatalogLocator::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let stem = match last.find('.') {
            Some(0) | None => last.as_str(),
            Some(dot) => &last[..dot],
        };
        if stem.is_empty() {
            "catalog".to_string()
        } else {
            stem.to_string()
        }
    }
}

impl fmt::Display for CatalogLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogLocator::Remote(url) => write!(f, "{}", url),
            CatalogLocator::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
