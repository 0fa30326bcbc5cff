//! A tokenizer for the subset of JavaScript/TypeScript found in catalogs
//! and managed files.
//!
//! Tokens are byte spans into the original text, so callers can cut and
//! splice source without reprinting it. Comments are kept as tokens with
//! their own kinds; whitespace is not, but every token records whether a
//! line break precedes it.

use std::ops::Range;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Template,
    Regex,
    Punct,
    LineComment,
    BlockComment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    /// A line terminator sits between this token and the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.clone()]
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::LineComment | TokenKind::BlockComment)
    }

    pub fn is_doc_comment(&self, source: &str) -> bool {
        self.kind == TokenKind::BlockComment && self.text(source).starts_with("/**")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at byte {offset}")]
pub struct LexError {
    pub offset: usize,
    pub message: String,
}

// Longest first. `>` is never merged so that closing generic brackets stay
// one token each (`Array<Array<T>>`).
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "<<=", "&&=", "||=", "??=", "=>", "==", "!=", "<=", "&&", "||", "??",
    "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<",
];

/// Keywords after which a `/` starts a regular expression literal.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do", "else",
    "yield", "await",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        src: source.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
    };
    lexer.run(None)?;
    Ok(lexer.tokens)
}

/// Tokens with comments removed.
pub fn significant(tokens: &[Token]) -> Vec<Token> {
    tokens.iter().filter(|t| !t.is_comment()).cloned().collect()
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Lex until end of input, or until the `}` closing a template
    /// substitution when `template_depth` is set.
    fn run(&mut self, template_depth: Option<usize>) -> Result<(), LexError> {
        let mut braces = 0usize;
        let mut newline = false;
        loop {
            newline |= self.skip_whitespace();
            let Some(&c) = self.src.get(self.pos) else {
                if template_depth.is_some() {
                    return Err(self.error("unterminated template substitution"));
                }
                return Ok(());
            };
            let start = self.pos;
            let kind = match c {
                b'/' if self.peek(1) == Some(b'/') => {
                    while self.pos < self.src.len() && !is_line_break(self.src[self.pos]) {
                        self.pos += 1;
                    }
                    TokenKind::LineComment
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    let end = find(self.src, b"*/", self.pos + 2).ok_or_else(|| self.error("unterminated comment"))?;
                    self.pos = end + 2;
                    TokenKind::BlockComment
                }
                b'/' if self.regex_allowed() => {
                    self.scan_regex()?;
                    TokenKind::Regex
                }
                b'\'' | b'"' => {
                    self.scan_string(c)?;
                    TokenKind::Str
                }
                b'`' => {
                    self.scan_template()?;
                    TokenKind::Template
                }
                b'0'..=b'9' => {
                    self.scan_number();
                    TokenKind::Number
                }
                b'.' if self.peek(1).is_some_and(|d| d.is_ascii_digit()) => {
                    self.scan_number();
                    TokenKind::Number
                }
                c if is_ident_start(c) => {
                    self.pos += 1;
                    while self.pos < self.src.len() && is_ident_part(self.src[self.pos]) {
                        self.pos += 1;
                    }
                    TokenKind::Ident
                }
                b'}' if template_depth.is_some() && braces == 0 => {
                    // Closing brace of `${ ... }`; the template scanner owns it.
                    return Ok(());
                }
                _ => {
                    let rest = &self.src[self.pos..];
                    let len = PUNCTUATORS
                        .iter()
                        .find(|p| rest.starts_with(p.as_bytes()))
                        .map(|p| p.len())
                        .unwrap_or_else(|| utf8_len(c));
                    if c == b'{' {
                        braces += 1;
                    } else if c == b'}' {
                        braces = braces.saturating_sub(1);
                    }
                    self.pos += len;
                    TokenKind::Punct
                }
            };
            self.tokens.push(Token {
                kind,
                span: start..self.pos,
                newline_before: newline,
            });
            // Comments are transparent: a line break before or inside one
            // counts for the next token.
            newline = match kind {
                TokenKind::LineComment => true,
                TokenKind::BlockComment => newline || self.src[start..self.pos].iter().any(|&b| is_line_break(b)),
                _ => false,
            };
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn error(&self, message: &str) -> LexError {
        LexError {
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut newline = false;
        while let Some(&c) = self.src.get(self.pos) {
            if is_line_break(c) {
                newline = true;
                self.pos += 1;
            } else if c.is_ascii_whitespace() {
                self.pos += 1;
            } else if self.src[self.pos..].starts_with("\u{feff}".as_bytes())
                || self.src[self.pos..].starts_with("\u{a0}".as_bytes())
            {
                self.pos += utf8_len(c);
            } else {
                break;
            }
        }
        newline
    }

    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.iter().rev().find(|t| !t.is_comment()) else {
            return true;
        };
        let text = std::str::from_utf8(&self.src[prev.span.clone()]).unwrap_or("");
        match prev.kind {
            TokenKind::Ident => EXPRESSION_KEYWORDS.contains(&text),
            TokenKind::Number | TokenKind::Str | TokenKind::Template | TokenKind::Regex => false,
            _ => !matches!(text, ")" | "]" | "}"),
        }
    }

    fn scan_string(&mut self, quote: u8) -> Result<(), LexError> {
        self.pos += 1;
        while let Some(&c) = self.src.get(self.pos) {
            match c {
                b'\\' => self.pos += 2,
                c if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        Err(self.error("unterminated string literal"))
    }

    fn scan_template(&mut self) -> Result<(), LexError> {
        self.pos += 1;
        while let Some(&c) = self.src.get(self.pos) {
            match c {
                b'\\' => self.pos += 2,
                b'`' => {
                    self.pos += 1;
                    return Ok(());
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    // Substitution tokens are lexed for balance, then folded
                    // back into the template token.
                    let mark = self.tokens.len();
                    self.run(Some(mark))?;
                    self.tokens.truncate(mark);
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        Err(self.error("unterminated template literal"))
    }

    fn scan_regex(&mut self) -> Result<(), LexError> {
        self.pos += 1;
        let mut in_class = false;
        while let Some(&c) = self.src.get(self.pos) {
            match c {
                b'\\' => self.pos += 2,
                b'[' => {
                    in_class = true;
                    self.pos += 1;
                }
                b']' => {
                    in_class = false;
                    self.pos += 1;
                }
                b'/' if !in_class => {
                    self.pos += 1;
                    while self.pos < self.src.len() && is_ident_part(self.src[self.pos]) {
                        self.pos += 1;
                    }
                    return Ok(());
                }
                c if is_line_break(c) => break,
                _ => self.pos += 1,
            }
        }
        Err(self.error("unterminated regular expression"))
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        let hex = matches!(&self.src[start..], [b'0', b'x' | b'X', ..]);
        while let Some(&c) = self.src.get(self.pos) {
            let exponent_sign = !hex
                && (c == b'+' || c == b'-')
                && matches!(self.src[self.pos - 1], b'e' | b'E');
            if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
    }
}

fn is_line_break(c: u8) -> bool {
    c == b'\n' || c == b'\r'
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$' || c == b'#' || c >= 0x80
}

fn is_ident_part(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source).unwrap().iter().map(|t| t.text(source)).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            texts("export function isEven(num: number) { return num % 2 === 0; }"),
            vec![
                "export", "function", "isEven", "(", "num", ":", "number", ")", "{", "return", "num", "%", "2", "===",
                "0", ";", "}"
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let source = "// header\n/** doc */\nexport function a() {}";
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LineComment);
        assert_eq!(tokens[1].kind, TokenKind::BlockComment);
        assert!(tokens[1].is_doc_comment(source));
        assert!(tokens[1].newline_before);
        assert!(tokens[2].newline_before);
        assert!(!tokens[3].newline_before);
    }

    #[test]
    fn test_template_with_substitution_is_one_token() {
        let source = "const s = `a ${ {b: 1}.b } c`;";
        let tokens = tokenize(source).unwrap();
        let template = tokens.iter().find(|t| t.kind == TokenKind::Template).unwrap();
        assert_eq!(template.text(source), "`a ${ {b: 1}.b } c`");
        assert_eq!(tokens.last().unwrap().text(source), ";");
    }

    #[test]
    fn test_regex_versus_division() {
        let source = "input.split(/\\r?\\n/); const half = a / 2 / b;";
        let tokens = tokenize(source).unwrap();
        let regexes: Vec<_> = tokens.iter().filter(|t| t.kind == TokenKind::Regex).collect();
        assert_eq!(regexes.len(), 1);
        assert_eq!(regexes[0].text(source), "/\\r?\\n/");
    }

    #[test]
    fn test_closing_generics_are_separate() {
        assert_eq!(texts("Array<Array<T>>"), vec!["Array", "<", "Array", "<", "T", ">", ">"]);
        assert_eq!(texts("(a) => a"), vec!["(", "a", ")", "=>", "a"]);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(tokenize("const a = 'oops").is_err());
    }
}
