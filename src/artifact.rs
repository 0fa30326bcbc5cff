//! The managed output file: a sorted list of exported functions plus
//! whatever else the user keeps around them.
//!
//! Edits are pure: `insert`, `remove` and `sorted` return a new artifact and
//! leave the original untouched. The caller decides whether to write.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::error::{Diagnostic, Result, UdepsError};
use crate::syntax::{erase_with, parse_source, EraseOptions, SourceUnit, Statement, StatementKind};

/// Doc-comment lines that only make sense inside a catalog.
static METADATA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\*[ \t]*@(?:requires|deprecated).*\r?\n").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Esm,
    CommonJs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub typed: bool,
    pub module_kind: ModuleKind,
    pub jsx: bool,
}

impl Dialect {
    /// Infers the dialect from the file name. Declaration files and
    /// unknown extensions are rejected outright.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let unsupported = || UdepsError::UnsupportedArtifactDialect {
            path: path.to_path_buf(),
        };
        if name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts") {
            return Err(unsupported());
        }
        let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        let (typed, module_kind, jsx) = match extension {
            "ts" | "mts" => (true, ModuleKind::Esm, false),
            "tsx" => (true, ModuleKind::Esm, true),
            "js" | "mjs" => (false, ModuleKind::Esm, false),
            "jsx" => (false, ModuleKind::Esm, true),
            "cts" => (true, ModuleKind::CommonJs, false),
            "cjs" => (false, ModuleKind::CommonJs, false),
            _ => return Err(unsupported()),
        };
        Ok(Self {
            typed,
            module_kind,
            jsx,
        })
    }

    /// Fails unless exported function declarations can live in this file.
    pub fn ensure_insertable(&self, path: &Path) -> Result<()> {
        match self.module_kind {
            ModuleKind::Esm => Ok(()),
            ModuleKind::CommonJs => Err(UdepsError::UnsupportedArtifactDialect {
                path: path.to_path_buf(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedArtifact {
    pub path: PathBuf,
    pub dialect: Dialect,
    unit: SourceUnit,
}

#[derive(Debug)]
pub struct InsertOutcome {
    pub artifact: ManagedArtifact,
    pub added: Vec<String>,
    pub conflicts: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct RemoveOutcome {
    pub artifact: ManagedArtifact,
    pub removed: Vec<String>,
    pub not_found: Vec<Diagnostic>,
}

impl ManagedArtifact {
    /// An artifact for a file that does not exist yet.
    pub fn empty(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            dialect: Dialect::from_path(path)?,
            unit: SourceUnit::default(),
        })
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let dialect = Dialect::from_path(path)?;
        let unit = parse_source(text).map_err(|e| UdepsError::ArtifactParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            dialect,
            unit,
        })
    }

    /// Names of the exported functions, in file order.
    pub fn names(&self) -> Vec<&str> {
        self.unit
            .statements
            .iter()
            .filter_map(Statement::exported_name)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }

    /// Inserts each entry before the first exported function whose name
    /// sorts after it. An entry whose name is already present is reported
    /// as a conflict and skipped; the rest of the batch proceeds.
    pub fn insert(&self, entries: &[&CatalogEntry]) -> Result<InsertOutcome> {
        self.dialect.ensure_insertable(&self.path)?;
        let mut unit = self.unit.clone();
        let mut added = Vec::new();
        let mut conflicts = Vec::new();
        'entries: for entry in entries {
            let mut index = unit.statements.len();
            for (i, statement) in unit.statements.iter().enumerate() {
                let Some(name) = statement.exported_name() else {
                    continue;
                };
                if name == entry.name {
                    conflicts.push(Diagnostic::DuplicateEntryConflict {
                        name: entry.name.clone(),
                        path: self.path.clone(),
                    });
                    continue 'entries;
                }
                if name > entry.name.as_str() {
                    index = i;
                    break;
                }
            }
            let statement = self.adapt(entry)?;
            debug!(name = %entry.name, index, "inserting function");
            unit.statements.insert(index, statement);
            added.push(entry.name.clone());
        }
        Ok(InsertOutcome {
            artifact: self.with_unit(unit),
            added,
            conflicts,
        })
    }

    /// Strips catalog metadata and, for untyped files, type syntax.
    fn adapt(&self, entry: &CatalogEntry) -> Result<Statement> {
        let stripped = METADATA_LINE.replace_all(&entry.source_fragment, "");
        let fragment = if self.dialect.typed {
            stripped.into_owned()
        } else {
            erase_with(&stripped, EraseOptions { jsx: self.dialect.jsx }).map_err(|e| UdepsError::CatalogParse {
                locator: format!("function {}", entry.name),
                source: e,
            })?
        };
        let kind = StatementKind::ExportedFunction {
            name: entry.name.clone(),
        };
        let parsed = parse_source(&fragment).ok().filter(|unit| unit.statements.len() == 1);
        Ok(match parsed {
            Some(mut unit) => {
                let mut statement = unit.statements.remove(0);
                statement.comments = unit.header;
                statement.kind = kind;
                statement
            }
            None => Statement {
                comments: String::new(),
                doc: None,
                code: fragment,
                kind,
            },
        })
    }

    /// Removes the exported functions with the given names. Names that are
    /// not present are reported and skipped.
    pub fn remove(&self, names: &[String]) -> RemoveOutcome {
        let mut unit = self.unit.clone();
        let mut removed = Vec::new();
        let mut not_found = Vec::new();
        for name in names {
            match unit
                .statements
                .iter()
                .position(|s| s.exported_name() == Some(name.as_str()))
            {
                Some(index) => {
                    let statement = unit.statements.remove(index);
                    // Loose comments above the function belong to the next statement.
                    if !statement.comments.is_empty() {
                        match unit.statements.get_mut(index) {
                            Some(next) => next.comments = join_blocks(&[&statement.comments, &next.comments]),
                            None => unit.trailer = join_blocks(&[&statement.comments, &unit.trailer]),
                        }
                    }
                    removed.push(name.clone());
                }
                None => not_found.push(Diagnostic::EntryNotFound {
                    name: name.clone(),
                    path: self.path.clone(),
                }),
            }
        }
        RemoveOutcome {
            artifact: self.with_unit(unit),
            removed,
            not_found,
        }
    }

    /// Exported functions in ascending name order. Other statements keep
    /// their positions.
    pub fn sorted(&self) -> Self {
        let mut unit = self.unit.clone();
        let slots: Vec<usize> = (0..unit.statements.len())
            .filter(|&i| unit.statements[i].exported_name().is_some())
            .collect();
        let mut functions: Vec<Statement> = slots.iter().map(|&i| unit.statements[i].clone()).collect();
        functions.sort_by(|a, b| a.exported_name().cmp(&b.exported_name()));
        for (slot, statement) in slots.into_iter().zip(functions) {
            unit.statements[slot] = statement;
        }
        self.with_unit(unit)
    }

    pub fn is_sorted(&self) -> bool {
        self.names().windows(2).all(|pair| pair[0] < pair[1])
    }

    /// File text: header, statements and trailer separated by blank lines,
    /// ending in exactly one newline. Empty artifacts render as "".
    pub fn render(&self) -> String {
        let statements: Vec<String> = self.unit.statements.iter().map(Statement::render).collect();
        let mut blocks: Vec<&str> = vec![self.unit.header.as_str()];
        blocks.extend(statements.iter().map(String::as_str));
        blocks.push(self.unit.trailer.as_str());
        let text = join_blocks(&blocks);
        if text.is_empty() {
            text
        } else {
            format!("{}\n", text)
        }
    }

    fn with_unit(&self, unit: SourceUnit) -> Self {
        Self {
            path: self.path.clone(),
            dialect: self.dialect,
            unit,
        }
    }
}

fn join_blocks(blocks: &[&str]) -> String {
    blocks
        .iter()
        .map(|b| b.trim_end())
        .filter(|b| !b.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_catalog;

    const CATALOG: &str = r#"/** @license 0BSD */

/**
 * Adds two numbers.
 * @requires ES5
 */
export function add(a: number, b: number): number {
  return a + b;
}

/**
 * This is the old function.
 * @deprecated since=ES2015, replace-with={@link example.newFunction}
 */
export function oldFunction(): void {
  console.log("This is the old function.");
}

/**
 * Identity.
 */
export function identity<T>(value: T): T {
  return value;
}
"#;

    fn entries() -> Vec<CatalogEntry> {
        parse_catalog("catalog.ts", CATALOG).unwrap().catalog.entries
    }

    fn entry(name: &str) -> CatalogEntry {
        entries().into_iter().find(|e| e.name == name).unwrap()
    }

    #[test]
    fn test_dialect_table() {
        let typed = Dialect::from_path(Path::new("src/udeps.ts")).unwrap();
        assert!(typed.typed && !typed.jsx);
        let jsx = Dialect::from_path(Path::new("ui/udeps.JSX")).unwrap();
        assert!(!jsx.typed && jsx.jsx);
        assert_eq!(Dialect::from_path(Path::new("a.mjs")).unwrap().module_kind, ModuleKind::Esm);
        assert_eq!(Dialect::from_path(Path::new("a.cjs")).unwrap().module_kind, ModuleKind::CommonJs);
        for bad in ["types.d.ts", "udeps.py", "udeps"] {
            assert!(matches!(
                Dialect::from_path(Path::new(bad)),
                Err(UdepsError::UnsupportedArtifactDialect { .. })
            ));
        }
    }

    #[test]
    fn test_insert_into_empty_typed_file_strips_metadata() {
        let artifact = ManagedArtifact::empty(Path::new("udeps.ts")).unwrap();
        let outcome = artifact.insert(&[&entry("oldFunction")]).unwrap();
        assert_eq!(outcome.added, vec!["oldFunction"]);
        assert_eq!(
            outcome.artifact.render(),
            "/**\n * This is the old function.\n */\nexport function oldFunction(): void {\n  console.log(\"This is the old function.\");\n}\n"
        );
        // the original is untouched
        assert_eq!(artifact.render(), "");
    }

    #[test]
    fn test_insert_into_untyped_file_erases_types() {
        let artifact = ManagedArtifact::empty(Path::new("udeps.js")).unwrap();
        let outcome = artifact.insert(&[&entry("oldFunction"), &entry("add")]).unwrap();
        assert_eq!(
            outcome.artifact.render(),
            "/**\n * Adds two numbers.\n */\nexport function add(a, b) {\n  return a + b;\n}\n\n/**\n * This is the old function.\n */\nexport function oldFunction() {\n  console.log(\"This is the old function.\");\n}\n"
        );
    }

    #[test]
    fn test_insert_is_idempotent() {
        let artifact = ManagedArtifact::empty(Path::new("udeps.ts")).unwrap();
        let e = entry("add");
        let first = artifact.insert(&[&e]).unwrap();
        let second = first.artifact.insert(&[&e]).unwrap();
        assert!(second.added.is_empty());
        assert_eq!(
            second.conflicts,
            vec![Diagnostic::DuplicateEntryConflict {
                name: "add".to_string(),
                path: PathBuf::from("udeps.ts")
            }]
        );
        assert_eq!(second.artifact.render(), first.artifact.render());
    }

    #[test]
    fn test_sort_invariant_across_edits() {
        let existing = "import { thing } from \"./thing\";\n\nexport function zeta() {}\n";
        let artifact = ManagedArtifact::parse(Path::new("udeps.ts"), existing).unwrap();
        let all = entries();
        let refs: Vec<&CatalogEntry> = all.iter().rev().collect();
        let inserted = artifact.insert(&refs).unwrap().artifact;
        assert_eq!(inserted.names(), vec!["add", "identity", "oldFunction", "zeta"]);
        assert!(inserted.is_sorted());
        assert!(inserted.render().starts_with("import { thing } from \"./thing\";\n\n/**\n * Adds"));

        let outcome = inserted.remove(&["identity".to_string(), "missing".to_string()]);
        assert_eq!(outcome.removed, vec!["identity"]);
        assert_eq!(outcome.not_found.len(), 1);
        assert!(outcome.artifact.is_sorted());
        assert_eq!(outcome.artifact.names(), vec!["add", "oldFunction", "zeta"]);
    }

    #[test]
    fn test_insert_then_remove_round_trips() {
        let existing = "// Managed by udeps\n\nexport function alpha() {\n  return 1;\n}\n\nexport function omega() {\n  return 2;\n}\n";
        let artifact = ManagedArtifact::parse(Path::new("udeps.ts"), existing).unwrap();
        let inserted = artifact.insert(&[&entry("identity")]).unwrap().artifact;
        assert_eq!(inserted.names(), vec!["alpha", "identity", "omega"]);
        let removed = inserted.remove(&["identity".to_string()]).artifact;
        assert_eq!(removed.render(), existing);
    }

    #[test]
    fn test_remove_everything_leaves_empty_text() {
        let artifact = ManagedArtifact::empty(Path::new("udeps.js")).unwrap();
        let inserted = artifact.insert(&[&entry("oldFunction")]).unwrap().artifact;
        let removed = inserted.remove(&["oldFunction".to_string()]).artifact;
        assert_eq!(removed.render().trim(), "");
    }

    #[test]
    fn test_commonjs_rejects_insertion() {
        let artifact = ManagedArtifact::empty(Path::new("udeps.cjs")).unwrap();
        assert!(matches!(
            artifact.insert(&[&entry("add")]),
            Err(UdepsError::UnsupportedArtifactDialect { .. })
        ));
    }

    #[test]
    fn test_sorted_keeps_other_statements_in_place() {
        let text = "export function b() {}\n\nconst x = 1;\n\nexport function a() {}\n";
        let artifact = ManagedArtifact::parse(Path::new("catalog.ts"), text).unwrap();
        assert!(!artifact.is_sorted());
        let sorted = artifact.sorted();
        assert_eq!(sorted.render(), "export function a() {}\n\nconst x = 1;\n\nexport function b() {}\n");
    }
}
