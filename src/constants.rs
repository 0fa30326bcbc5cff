/// Defaults and fixed tables shared across the codebase

// Configuration defaults (used when udeps.json omits a field)
pub const DEFAULT_CONFIG_FILE: &str = "udeps.json";
pub const DEFAULT_OUTPUT_FILE: &str = "udeps.ts";
pub const DEFAULT_LIB: &[&str] = &["es2020"];
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// `lib` token that expands to the project's `compilerOptions.lib`
pub const INHERIT_LIB_TOKEN: &str = "[inherit]";
pub const TSCONFIG_FILE: &str = "tsconfig.json";
pub const PACKAGE_JSON_FILE: &str = "package.json";

/// Search prints at most this many supported matches
pub const MAX_SEARCH_RESULTS: usize = 5;

pub const DEFAULT_DOCS_DIR: &str = "docs/registry";

pub const MDN_GLOBAL_OBJECTS_URL: &str =
    "https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects";
pub const SPDX_LICENSE_URL: &str = "https://spdx.org/licenses";

// Licenses that impose no attribution requirement on copied snippets.
// Identifiers match exactly, phrases case-insensitively anywhere in the text.
pub const PUBLIC_DOMAIN_LICENSE_IDS: &[&str] = &["0BSD", "Unlicense", "CC0-1.0", "MIT-0"];
pub const PUBLIC_DOMAIN_LICENSE_PHRASES: &[&str] = &[
    "bsd zero clause",
    "unlicense",
    "public domain",
    "cc0",
    "mit no attribution",
];

/// Whether `license` (an SPDX id or free text) is public-domain equivalent
pub fn is_public_domain_license(license: &str) -> bool {
    let license = license.trim();
    if PUBLIC_DOMAIN_LICENSE_IDS.contains(&license) {
        return true;
    }
    let lower = license.to_lowercase();
    PUBLIC_DOMAIN_LICENSE_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}
