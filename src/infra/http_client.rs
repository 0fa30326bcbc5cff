use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::app::ports::CatalogFetcher;
use crate::catalog::CatalogLocator;
use crate::error::{Result, UdepsError};

/// Fetches remote catalogs over HTTP(S) and reads local ones from disk.
pub struct ReqwestCatalogFetcher {
    client: reqwest::Client,
}

impl ReqwestCatalogFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("udeps/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CatalogFetcher for ReqwestCatalogFetcher {
    async fn fetch(&self, locator: &CatalogLocator) -> Result<String> {
        match locator {
            CatalogLocator::Remote(url) => {
                debug!(url, "fetching catalog");
                let resp = self.client.get(url).send().await.map_err(|e| unavailable(locator, e))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(UdepsError::SourceUnavailable {
                        locator: url.clone(),
                        reason: format!("HTTP {}", status),
                    });
                }
                resp.text().await.map_err(|e| unavailable(locator, e))
            }
            CatalogLocator::Local(path) => {
                debug!(path = %path.display(), "reading catalog");
                tokio::fs::read_to_string(path).await.map_err(|e| unavailable(locator, e))
            }
        }
    }
}

fn unavailable(locator: &CatalogLocator, err: impl std::fmt::Display) -> UdepsError {
    UdepsError::SourceUnavailable {
        locator: locator.to_string(),
        reason: err.to_string(),
    }
}
