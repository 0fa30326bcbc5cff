use std::path::PathBuf;
use thiserror::Error;

use crate::capability::CapabilityToken;
use crate::syntax::LexError;

#[derive(Error, Debug)]
pub enum UdepsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog source {locator} is unavailable: {reason}")]
    SourceUnavailable { locator: String, reason: String },

    #[error("Failed to parse catalog {locator}: {source}")]
    CatalogParse {
        locator: String,
        #[source]
        source: LexError,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    ArtifactParse {
        path: PathBuf,
        #[source]
        source: LexError,
    },

    #[error("Unsupported catalog locator: {0}")]
    UnsupportedLocator(String),

    #[error("Cannot insert exported functions into {}: unsupported file type", path.display())]
    UnsupportedArtifactDialect { path: PathBuf },

    #[error("Failed to write {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, UdepsError>;

/// Non-fatal findings. Operations collect these and keep going; the use
/// cases log them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("function {name} in {catalog} has no documentation comment and was skipped")]
    MissingDocumentation { catalog: String, name: String },

    #[error("catalog {catalog} is licensed as \"{license}\", which is not a public-domain-equivalent license")]
    LicenseMismatch { catalog: String, license: String },

    #[error("catalog {catalog} does not declare a @license")]
    MissingLicense { catalog: String },

    #[error("function {name} already exists in {}", path.display())]
    DuplicateEntryConflict { name: String, path: PathBuf },

    #[error("function {name} not found in {}", path.display())]
    EntryNotFound { name: String, path: PathBuf },

    #[error("the implementation of {name} in {catalog} requires unsupported libs: {}", join_tokens(missing))]
    CapabilityUnsatisfied {
        name: String,
        catalog: String,
        missing: Vec<CapabilityToken>,
    },
}

fn join_tokens(tokens: &[CapabilityToken]) -> String {
    tokens
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
