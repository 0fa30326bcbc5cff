use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::tempdir;

use udeps::app::add_use_case::AddUseCase;
use udeps::app::ports::CatalogFetcher;
use udeps::app::remove_use_case::RemoveUseCase;
use udeps::app::search_use_case::SearchUseCase;
use udeps::catalog::CatalogLocator;
use udeps::config::{ConfigOverrides, UdepsConfig};
use udeps::error::{Result, UdepsError};
use udeps::infra::{FsArtifactStore, ReqwestCatalogFetcher};

const REGISTRY_URL: &str = "https://example.com/udeps/registry.ts";

const REGISTRY: &str = r#"
/**
 * @module example/registry
 * @license 0BSD
 */

/**
 * Example function
 * @deprecated since=ES2015, replaceWith=example.newFunction
 */
export function oldFunction(): void {
  console.log("This is the old function.");
}

/**
 * Returns the larger of two numbers.
 * @requires ES5
 */
export function max(a: number, b: number): number {
  return a > b ? a : b;
}
"#;

const OLD_FUNCTION_TS: &str = r#"/**
 * Example function
 */
export function oldFunction(): void {
  console.log("This is the old function.");
}"#;

const OLD_FUNCTION_JS: &str = r#"/**
 * Example function
 */
export function oldFunction() {
  console.log("This is the old function.");
}"#;

/// Serves fixed catalog text for remote locators.
struct MockFetcher(HashMap<String, String>);

impl MockFetcher {
    fn registry() -> Arc<Self> {
        Arc::new(Self(HashMap::from([(REGISTRY_URL.to_string(), REGISTRY.to_string())])))
    }
}

#[async_trait]
impl CatalogFetcher for MockFetcher {
    async fn fetch(&self, locator: &CatalogLocator) -> Result<String> {
        self.0
            .get(&locator.to_string())
            .cloned()
            .ok_or_else(|| UdepsError::SourceUnavailable {
                locator: locator.to_string(),
                reason: "unexpected locator".to_string(),
            })
    }
}

fn project(output_file: &str) -> (tempfile::TempDir, UdepsConfig) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("package.json"), "{}").unwrap();
    fs::write(
        dir.path().join("udeps.json"),
        format!(
            r#"{{ "lib": ["es2020"], "outputFile": "./{}", "registry": ["{}"] }}"#,
            output_file, REGISTRY_URL
        ),
    )
    .unwrap();
    fs::write(dir.path().join(output_file), "").unwrap();
    let config = UdepsConfig::load_from(dir.path(), &ConfigOverrides::default()).unwrap();
    (dir, config)
}

#[tokio::test]
async fn test_add_then_remove_function() {
    let (dir, config) = project("udeps-lib.ts");
    let output = dir.path().join("udeps-lib.ts");
    let add = AddUseCase::new(MockFetcher::registry(), Arc::new(FsArtifactStore));
    let names = vec!["oldFunction".to_string()];

    let report = add.execute(&config, &names, true).await.unwrap();
    assert_eq!(report.added, vec!["oldFunction"]);
    let first = fs::read_to_string(&output).unwrap();
    assert!(first.contains(OLD_FUNCTION_TS), "unexpected output:\n{}", first);
    assert!(!first.contains("@deprecated"));

    // second add is a no-op
    let report = add.execute(&config, &names, true).await.unwrap();
    assert!(report.added.is_empty());
    assert!(!report.written);
    assert_eq!(fs::read_to_string(&output).unwrap(), first);

    let remove = RemoveUseCase::new(Arc::new(FsArtifactStore));
    let report = remove.execute(&config, &names).await.unwrap();
    assert_eq!(report.removed, vec!["oldFunction"]);
    assert!(fs::read_to_string(&output).unwrap().trim().is_empty());
}

#[tokio::test]
async fn test_add_function_to_js_file() {
    let (dir, config) = project("udeps-lib.js");
    let add = AddUseCase::new(MockFetcher::registry(), Arc::new(FsArtifactStore));
    add.execute(&config, &["oldFunction".to_string(), "max".to_string()], true)
        .await
        .unwrap();
    let written = fs::read_to_string(dir.path().join("udeps-lib.js")).unwrap();
    assert!(written.contains(OLD_FUNCTION_JS), "unexpected output:\n{}", written);
    assert!(written.contains("export function max(a, b) {\n  return a > b ? a : b;\n}"));
    assert!(written.find("function max").unwrap() < written.find("function oldFunction").unwrap());
    assert!(written.ends_with("}\n"));
}

#[tokio::test]
async fn test_obsolete_function_is_skipped_without_force() {
    let (dir, config) = project("udeps-lib.ts");
    let add = AddUseCase::new(MockFetcher::registry(), Arc::new(FsArtifactStore));
    let report = add.execute(&config, &["oldFunction".to_string()], false).await.unwrap();
    assert!(report.added.is_empty());
    assert_eq!(report.obsolete.len(), 1);
    assert!(report.obsolete[0].reason.contains("example.newFunction"));
    assert_eq!(fs::read_to_string(dir.path().join("udeps-lib.ts")).unwrap(), "");
}

#[tokio::test]
async fn test_unreachable_registry_does_not_stop_other_sources() {
    let dir = tempdir().unwrap();
    let catalog = dir.path().join("catalog.ts");
    fs::write(&catalog, REGISTRY).unwrap();
    let overrides = ConfigOverrides {
        project: Some(dir.path().to_path_buf()),
        registry: Some("missing.ts,ftp://nowhere/x.ts,catalog.ts".to_string()),
        ..ConfigOverrides::default()
    };
    let config = UdepsConfig::load_from(Path::new("/"), &overrides).unwrap();
    let fetcher = Arc::new(ReqwestCatalogFetcher::new(5).unwrap());
    let report = SearchUseCase::new(fetcher).execute(&config, "larger").await.unwrap();
    assert_eq!(report.failed_sources, 2);
    assert_eq!(report.supported.len(), 1);
    assert_eq!(report.supported[0].name, "max");
}
