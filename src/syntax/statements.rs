//! Top-level statement splitting.
//!
//! A source file is cut into a header (comments before the first
//! statement's doc comment), a list of statements with their attached
//! comments, and a trailer (comments after the last statement). Statement
//! boundaries follow `;`, closing braces and line breaks before a
//! statement keyword; this covers declaration-style modules, which is what
//! catalogs and managed files are made of.

use std::ops::Range;

use super::lexer::{tokenize, LexError, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `export [async] function[*] name(...) { ... }`
    ExportedFunction { name: String },
    /// A bodiless overload signature of an exported function.
    FunctionSignature { name: String },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Non-documentation comments preceding the statement, verbatim.
    pub comments: String,
    /// The `/** ... */` block immediately preceding the statement.
    pub doc: Option<String>,
    pub code: String,
    pub kind: StatementKind,
}

impl Statement {
    pub fn exported_name(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::ExportedFunction { name } => Some(name),
            StatementKind::FunctionSignature { .. } | StatementKind::Other => None,
        }
    }

    pub fn signature_name(&self) -> Option<&str> {
        match &self.kind {
            StatementKind::FunctionSignature { name } => Some(name),
            _ => None,
        }
    }

    /// Comments, doc comment and code joined the way they are printed.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.comments.is_empty() {
            out.push_str(&self.comments);
            out.push('\n');
        }
        if let Some(doc) = &self.doc {
            out.push_str(doc);
            out.push('\n');
        }
        out.push_str(&self.code);
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUnit {
    pub header: String,
    pub statements: Vec<Statement>,
    pub trailer: String,
}

const STATEMENT_KEYWORDS: &[&str] = &[
    "export", "import", "function", "class", "const", "let", "var", "interface", "enum", "declare",
    "namespace", "abstract", "if", "for", "while", "do", "switch", "try", "throw", "return",
];

/// Tokens that continue an expression across a line break after `}`.
const CONTINUATIONS: &[&str] = &[
    ".", "?.", ",", ")", "]", "?", ":", "=>", "=", "+", "-", "*", "/", "%", "**", "&&", "||", "??", "&", "|",
    "^", "<", ">", "==", "===", "!=", "!==", "<=", "instanceof", "in", "as", "satisfies", "else", "catch",
    "finally", "while",
];

pub fn parse_source(source: &str) -> Result<SourceUnit, LexError> {
    let tokens = tokenize(source)?;
    let ranges = statement_ranges(source, &tokens);

    let mut unit = SourceUnit::default();
    let mut cursor = 0usize;
    for (n, range) in ranges.iter().enumerate() {
        let comments: Vec<&Token> = tokens[cursor..range.start].iter().collect();
        let doc_index = comments
            .last()
            .filter(|c| c.is_doc_comment(source))
            .map(|_| comments.len() - 1);
        let others = &comments[..doc_index.unwrap_or(comments.len())];
        let others_text = span_text(source, others);
        let doc = doc_index.map(|i| comments[i].text(source).to_string());
        let code = source[tokens[range.start].span.start..tokens[range.end - 1].span.end].to_string();
        let kind = classify(source, &tokens[range.clone()]);
        let statement = if n == 0 {
            unit.header = others_text;
            Statement {
                comments: String::new(),
                doc,
                code,
                kind,
            }
        } else {
            Statement {
                comments: others_text,
                doc,
                code,
                kind,
            }
        };
        unit.statements.push(statement);
        cursor = range.end;
    }
    let rest: Vec<&Token> = tokens[cursor..].iter().collect();
    if unit.statements.is_empty() {
        unit.header = span_text(source, &rest);
    } else {
        unit.trailer = span_text(source, &rest);
    }
    Ok(unit)
}

fn span_text(source: &str, comments: &[&Token]) -> String {
    match (comments.first(), comments.last()) {
        (Some(first), Some(last)) => source[first.span.start..last.span.end].to_string(),
        _ => String::new(),
    }
}

/// Token index ranges (into the full token list, comments included) of
/// each top-level statement. Ranges start and end on non-comment tokens.
fn statement_ranges(source: &str, tokens: &[Token]) -> Vec<Range<usize>> {
    let sig: Vec<usize> = (0..tokens.len()).filter(|&i| !tokens[i].is_comment()).collect();
    let mut ranges = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (k, &i) in sig.iter().enumerate() {
        let token = &tokens[i];
        let text = token.text(source);
        if start.is_none() {
            start = Some(i);
        }
        if token.kind == TokenKind::Punct {
            match text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        if depth > 0 {
            continue;
        }
        let next = sig.get(k + 1).map(|&j| &tokens[j]);
        let ends = match next {
            None => true,
            Some(_) if text == ";" && token.kind == TokenKind::Punct => true,
            Some(next) if next.newline_before => {
                let next_text = next.text(source);
                if text == "}" && token.kind == TokenKind::Punct {
                    !CONTINUATIONS.contains(&next_text)
                } else {
                    ends_expression(source, token) && starts_statement(source, &sig[k + 1..], tokens)
                }
            }
            Some(_) => false,
        };
        if ends {
            if let Some(s) = start.take() {
                ranges.push(s..i + 1);
            }
        }
    }
    ranges
}

fn ends_expression(source: &str, token: &Token) -> bool {
    match token.kind {
        TokenKind::Punct => matches!(token.text(source), ")" | "]" | "}" | "++" | "--"),
        TokenKind::Ident | TokenKind::Number | TokenKind::Str | TokenKind::Template | TokenKind::Regex => true,
        _ => false,
    }
}

fn starts_statement(source: &str, rest: &[usize], tokens: &[Token]) -> bool {
    let text = |n: usize| rest.get(n).map(|&i| tokens[i].text(source)).unwrap_or("");
    match text(0) {
        "async" => text(1) == "function",
        "type" => rest.get(1).is_some_and(|&i| tokens[i].kind == TokenKind::Ident),
        word => STATEMENT_KEYWORDS.contains(&word),
    }
}

fn classify(source: &str, tokens: &[Token]) -> StatementKind {
    let sig: Vec<Token> = tokens.iter().filter(|t| !t.is_comment()).cloned().collect();
    let code: Vec<&str> = sig.iter().map(|t| t.text(source)).collect();
    let body = has_body(source, &sig, &code);
    let words = &code[..code.len().min(5)];
    let rest = match words {
        ["export", "function", rest @ ..] => rest,
        ["export", "async", "function", rest @ ..] => rest,
        _ => return StatementKind::Other,
    };
    let rest = match rest {
        ["*", rest @ ..] => rest,
        rest => rest,
    };
    match rest.first() {
        Some(name) if is_identifier(name) && body => StatementKind::ExportedFunction {
            name: name.to_string(),
        },
        Some(name) if is_identifier(name) => StatementKind::FunctionSignature {
            name: name.to_string(),
        },
        _ => StatementKind::Other,
    }
}

/// The statement ends in a `{ ... }` block that is not a type literal
/// (`f(): { a: number };` is still a signature).
fn has_body(source: &str, sig: &[Token], code: &[&str]) -> bool {
    let close = match code {
        [.., "}", ";"] => code.len() - 2,
        [.., "}"] => code.len() - 1,
        _ => return false,
    };
    let Some(open) = matching_open(source, sig, close) else {
        return false;
    };
    open > 0 && !matches!(code[open - 1], ":" | "|" | "&" | "=>" | "<" | "," | "(")
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// If the function declared in `code` has a body of exactly one
/// `return <expr>` statement, returns the source text of `<expr>`.
pub fn single_return_expression(code: &str) -> Option<String> {
    let tokens: Vec<Token> = tokenize(code).ok()?.into_iter().filter(|t| !t.is_comment()).collect();
    let text = |i: usize| tokens.get(i).map(|t| t.text(code)).unwrap_or("");
    let body_open = tokens.iter().rposition(|t| t.kind == TokenKind::Punct && t.text(code) == "}")
        .and_then(|close| matching_open(code, &tokens, close))?;
    let last = tokens.len() - 1;
    if text(body_open + 1) != "return" {
        return None;
    }
    let expr_start = body_open + 2;
    if expr_start >= last || tokens[expr_start].newline_before {
        return None;
    }
    let mut depth = 0usize;
    let mut expr_end = last;
    for (i, token) in tokens.iter().enumerate().take(last).skip(expr_start) {
        match token.text(code) {
            "(" | "[" | "{" if token.kind == TokenKind::Punct => depth += 1,
            ")" | "]" | "}" if token.kind == TokenKind::Punct => depth = depth.saturating_sub(1),
            ";" if depth == 0 => {
                expr_end = i;
                break;
            }
            _ => {}
        }
    }
    if expr_end != last && expr_end + 1 != last {
        return None;
    }
    if expr_end <= expr_start {
        return None;
    }
    Some(code[tokens[expr_start].span.start..tokens[expr_end - 1].span.end].to_string())
}

fn matching_open(source: &str, tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        if tokens[i].kind != TokenKind::Punct {
            continue;
        }
        match tokens[i].text(source) {
            "}" => depth += 1,
            "{" => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
