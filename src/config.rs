use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::capability::CapabilitySet;
use crate::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_LIB, DEFAULT_OUTPUT_FILE, INHERIT_LIB_TOKEN,
    PACKAGE_JSON_FILE, TSCONFIG_FILE,
};
use crate::error::{Result, UdepsError};
use crate::syntax::lexer::{significant, tokenize};

/// Settings read from `udeps.json` (or `.toml`), then overridden from the
/// command line. Loaded once and passed to every use case.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UdepsConfig {
    /// Base directory for relative paths. Never read from the file.
    #[serde(skip)]
    pub project: PathBuf,
    pub output_file: String,
    pub lib: Vec<String>,
    pub registry: Vec<String>,
    pub fetch_timeout_secs: u64,
}

impl Default for UdepsConfig {
    fn default() -> Self {
        Self {
            project: PathBuf::from("."),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            lib: DEFAULT_LIB.iter().map(|s| s.to_string()).collect(),
            registry: Vec::new(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: Option<String>,
    /// Comma, semicolon or whitespace separated.
    pub lib: Option<String>,
    /// Comma, semicolon or whitespace separated.
    pub registry: Option<String>,
}

impl UdepsConfig {
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::load_from(&cwd, overrides)
    }

    /// Resolves the project directory from `cwd`, reads the config file if
    /// present and applies overrides and `[inherit]` expansion.
    pub fn load_from(cwd: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let project = match &overrides.project {
            Some(dir) => cwd.join(dir),
            None => find_project_dir(cwd),
        };

        let config_path = project.join(
            overrides
                .config
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE)),
        );
        let mut config = if config_path.is_file() {
            debug!(path = %config_path.display(), "loading config");
            Self::from_file(&config_path)?
        } else if overrides.config.is_some() {
            return Err(UdepsError::Config(format!(
                "Config file '{}' does not exist",
                config_path.display()
            )));
        } else {
            debug!(path = %config_path.display(), "no config file, using defaults");
            Self::default()
        };
        config.project = project;

        if let Some(output) = &overrides.output {
            config.output_file = output.clone();
        }
        if let Some(lib) = &overrides.lib {
            config.lib = split_list(lib);
        }
        if let Some(registry) = &overrides.registry {
            config.registry = split_list(registry);
        }

        config.lib = expand_inherit(&config.project, &config.lib)?;
        config.validate();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| UdepsError::Config(format!("Failed to read config file '{}': {}", path.display(), e)))?;
        let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
        let config: UdepsConfig = if is_toml {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    pub fn target(&self) -> CapabilitySet {
        self.lib.iter().collect()
    }

    pub fn output_path(&self) -> PathBuf {
        self.project.join(&self.output_file)
    }

    /// Logs target tokens that will not behave the way they look.
    fn validate(&self) {
        let target = self.target();
        for token in target.unparseable_levels() {
            warn!(token = %token, "lib token looks like a language level but is not one; it only matches literally");
        }
        for token in target.tokens() {
            if !token.is_compound() && token.level().is_none() && !token.normalized().starts_with("es") {
                debug!(token = %token, "lib token is a literal-only capability");
            }
        }
        if self.registry.is_empty() {
            warn!("no catalogs configured; set \"registry\" in {} or pass --registry", DEFAULT_CONFIG_FILE);
        }
    }
}

/// Nearest ancestor of `start` (inclusive) containing a package.json,
/// falling back to `start` itself.
pub fn find_project_dir(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(PACKAGE_JSON_FILE).is_file())
        .unwrap_or(start)
        .to_path_buf()
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replaces `[inherit]` with `compilerOptions.lib` from the project's
/// tsconfig.json.
fn expand_inherit(project: &Path, lib: &[String]) -> Result<Vec<String>> {
    if !lib.iter().any(|token| token == INHERIT_LIB_TOKEN) {
        return Ok(lib.to_vec());
    }
    let inherited = read_tsconfig_lib(&project.join(TSCONFIG_FILE))?;
    if inherited.is_empty() {
        warn!("lib contains {} but {} declares no compilerOptions.lib", INHERIT_LIB_TOKEN, TSCONFIG_FILE);
    }
    let mut expanded = Vec::new();
    for token in lib {
        if token == INHERIT_LIB_TOKEN {
            expanded.extend(inherited.iter().cloned());
        } else {
            expanded.push(token.clone());
        }
    }
    Ok(expanded)
}

fn read_tsconfig_lib(path: &Path) -> Result<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let json = strip_jsonc(&content)
        .map_err(|e| UdepsError::Config(format!("Failed to read '{}': {}", path.display(), e)))?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    let lib = value
        .get("compilerOptions")
        .and_then(|options| options.get("lib"))
        .and_then(|lib| lib.as_array())
        .map(|items| items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    Ok(lib)
}

/// Removes comments and trailing commas so tsconfig-style JSON parses.
fn strip_jsonc(content: &str) -> std::result::Result<String, crate::syntax::LexError> {
    let tokens = tokenize(content)?;
    let code = significant(&tokens);
    let mut dropped: Vec<std::ops::Range<usize>> = tokens
        .iter()
        .filter(|t| t.is_comment())
        .map(|t| t.span.clone())
        .collect();
    for pair in code.windows(2) {
        if pair[0].text(content) == "," && matches!(pair[1].text(content), "}" | "]") {
            dropped.push(pair[0].span.clone());
        }
    }
    dropped.sort_by_key(|range| range.start);
    let mut out = String::with_capacity(content.len());
    let mut cursor = 0;
    for range in dropped {
        out.push_str(&content[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&content[cursor..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_config_file() {
        let dir = tempdir().unwrap();
        let config = UdepsConfig::load_from(dir.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.output_file, "udeps.ts");
        assert_eq!(config.lib, vec!["es2020"]);
        assert!(config.registry.is_empty());
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.project, dir.path());
    }

    #[test]
    fn test_project_discovery_and_json_config() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(
            dir.path().join("udeps.json"),
            r#"{ "outputFile": "src/udeps.js", "lib": ["ES2017", "DOM"], "registry": ["./catalog.ts"] }"#,
        )
        .unwrap();
        let nested = dir.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let config = UdepsConfig::load_from(&nested, &ConfigOverrides::default()).unwrap();
        assert_eq!(config.project, dir.path());
        assert_eq!(config.output_path(), dir.path().join("src/udeps.js"));
        assert_eq!(config.lib, vec!["ES2017", "DOM"]);
        assert_eq!(config.registry, vec!["./catalog.ts"]);
    }

    #[test]
    fn test_toml_config_and_overrides() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("udeps.toml"),
            "outputFile = \"lib/udeps.ts\"\nlib = [\"es5\"]\nfetchTimeoutSecs = 5\n",
        )
        .unwrap();
        let overrides = ConfigOverrides {
            project: Some(dir.path().to_path_buf()),
            config: Some(PathBuf::from("udeps.toml")),
            lib: Some("es2015, dom;node  esnext".to_string()),
            registry: Some("a.ts,https://example.com/b.ts".to_string()),
            ..ConfigOverrides::default()
        };
        let config = UdepsConfig::load_from(Path::new("/"), &overrides).unwrap();
        assert_eq!(config.output_file, "lib/udeps.ts");
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.lib, vec!["es2015", "dom", "node", "esnext"]);
        assert_eq!(config.registry, vec!["a.ts", "https://example.com/b.ts"]);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempdir().unwrap();
        let overrides = ConfigOverrides {
            config: Some(PathBuf::from("custom.json")),
            ..ConfigOverrides::default()
        };
        assert!(matches!(
            UdepsConfig::load_from(dir.path(), &overrides),
            Err(UdepsError::Config(_))
        ));
    }

    #[test]
    fn test_inherit_expands_tsconfig_lib() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("tsconfig.json"),
            "{\n  // comment\n  \"compilerOptions\": {\n    /* libs */\n    \"lib\": [\"ES2022\", \"DOM\",],\n  },\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("udeps.json"), r#"{ "lib": ["node", "[inherit]"] }"#).unwrap();
        let config = UdepsConfig::load_from(dir.path(), &ConfigOverrides::default()).unwrap();
        assert_eq!(config.lib, vec!["node", "ES2022", "DOM"]);
    }

    #[test]
    fn test_inherit_without_tsconfig_expands_to_nothing() {
        let dir = tempdir().unwrap();
        let overrides = ConfigOverrides {
            lib: Some("[inherit],es5".to_string()),
            ..ConfigOverrides::default()
        };
        let config = UdepsConfig::load_from(dir.path(), &overrides).unwrap();
        assert_eq!(config.lib, vec!["es5"]);
    }
}
