//! `/** ... */` documentation blocks and the tags catalogs put in them.

use crate::capability::CapabilityToken;
use crate::obsolescence::DeprecationReason;

/// A tag parsed once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocTag {
    Requires(CapabilityToken),
    Deprecated(DeprecationReason),
    License(String),
    Unknown { name: String, value: String },
}

impl DocTag {
    pub fn from_raw(name: &str, value: &str) -> Self {
        match name {
            "requires" => match value.split_whitespace().next() {
                Some(token) => DocTag::Requires(CapabilityToken::new(token)),
                None => DocTag::Unknown {
                    name: name.to_string(),
                    value: value.to_string(),
                },
            },
            "deprecated" => DocTag::Deprecated(DeprecationReason::parse(value)),
            "license" => DocTag::License(value.trim().to_string()),
            _ => DocTag::Unknown {
                name: name.to_string(),
                value: value.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub description: String,
    pub tags: Vec<DocTag>,
}

impl DocComment {
    pub fn parse(block: &str) -> Self {
        let mut description = Vec::new();
        let mut raw_tags: Vec<(String, Vec<String>)> = Vec::new();
        for line in unwrap_block(block) {
            if let Some((name, rest)) = tag_line(&line) {
                raw_tags.push((name.to_string(), vec![rest.to_string()]));
            } else if let Some((_, lines)) = raw_tags.last_mut() {
                lines.push(line);
            } else {
                description.push(line);
            }
        }
        let tags = raw_tags
            .into_iter()
            .map(|(name, lines)| DocTag::from_raw(&name, lines.join("\n").trim()))
            .collect();
        Self {
            description: description.join("\n").trim().to_string(),
            tags,
        }
    }

    pub fn license(&self) -> Option<&str> {
        self.tags.iter().find_map(|tag| match tag {
            DocTag::License(license) => Some(license.as_str()),
            _ => None,
        })
    }
}

/// Lines of the block with the delimiters and leading ` * ` removed.
fn unwrap_block(block: &str) -> Vec<String> {
    let inner = block.trim();
    let inner = inner.strip_prefix("/**").unwrap_or(inner);
    let inner = inner.strip_suffix("*/").unwrap_or(inner);
    inner
        .lines()
        .map(|line| {
            let line = line.trim_start();
            let line = line.strip_prefix('*').unwrap_or(line);
            let line = line.strip_prefix(' ').unwrap_or(line);
            line.trim_end().to_string()
        })
        .collect()
}

fn tag_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix('@')?;
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..end];
    if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    Some((name, rest[end..].trim()))
}
