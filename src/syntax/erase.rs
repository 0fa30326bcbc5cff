//! Type erasure: turns a TypeScript fragment into plain JavaScript by
//! cutting out type-only syntax and leaving every other byte untouched.
//!
//! Handled constructs:
//! - annotations on parameters, variables, class properties and return types
//! - parameter properties (`constructor(private x: T)` becomes `constructor(x)`)
//! - `expr as T`, `expr satisfies T`, `<T>expr` and non-null `expr!`
//! - type parameter lists and call type arguments (`f<T>(...)`)
//! - access modifiers, `abstract`, `implements` clauses
//! - local `type` aliases and `interface` declarations

use std::ops::Range;

use super::lexer::{significant, tokenize, LexError, Token, TokenKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct EraseOptions {
    /// JSX dialects treat `<` in expression position as an element, so the
    /// `<T>expr` assertion form is left alone.
    pub jsx: bool,
}

pub fn erase(fragment: &str) -> Result<String, LexError> {
    erase_with(fragment, EraseOptions::default())
}

pub fn erase_with(fragment: &str, options: EraseOptions) -> Result<String, LexError> {
    let tokens = tokenize(fragment)?;
    let mut eraser = Eraser {
        src: fragment,
        sig: significant(&tokens),
        removals: Vec::new(),
        jsx: options.jsx,
    };
    eraser.run();
    Ok(apply_removals(fragment, eraser.removals))
}

const PARAMETER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];
const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "readonly", "declare", "abstract", "override",
];
const CONTROL_KEYWORDS: &[&str] = &["if", "for", "while", "switch", "with"];
const NON_VALUE_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do", "else",
    "yield", "await", "extends", "implements", "as", "satisfies", "keyof", "export", "import", "default",
];
const TYPE_PREFIXES: &[&str] = &["keyof", "typeof", "readonly", "unique", "infer"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Params,
    ClassBody,
    Other,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// Inside a default value or property initializer, where `:` is a
    /// ternary or object-literal colon, not an annotation.
    in_value: bool,
    member_start: bool,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            in_value: false,
            member_start: true,
        }
    }
}

struct Eraser<'s> {
    src: &'s str,
    sig: Vec<Token>,
    removals: Vec<Range<usize>>,
    jsx: bool,
}

impl<'s> Eraser<'s> {
    fn text(&self, i: usize) -> &'s str {
        self.sig.get(i).map(|t| t.text(self.src)).unwrap_or("")
    }

    fn is(&self, i: usize, expected: &str) -> bool {
        self.sig
            .get(i)
            .is_some_and(|t| matches!(t.kind, TokenKind::Punct | TokenKind::Ident) && t.text(self.src) == expected)
    }

    fn is_ident(&self, i: usize) -> bool {
        self.sig.get(i).is_some_and(|t| t.kind == TokenKind::Ident)
    }

    fn start(&self, i: usize) -> usize {
        self.sig.get(i).map(|t| t.span.start).unwrap_or(self.src.len())
    }

    fn end(&self, i: usize) -> usize {
        self.sig[i].span.end
    }

    fn remove(&mut self, span: Range<usize>) {
        if span.start < span.end {
            self.removals.push(span);
        }
    }

    /// The token at `i` can close an expression (so a following `<`, `!` or
    /// `as` applies to that expression).
    fn ends_expression(&self, i: usize) -> bool {
        let Some(t) = self.sig.get(i) else {
            return false;
        };
        match t.kind {
            TokenKind::Ident => !NON_VALUE_KEYWORDS.contains(&t.text(self.src)),
            TokenKind::Number | TokenKind::Str | TokenKind::Template | TokenKind::Regex => true,
            TokenKind::Punct => matches!(t.text(self.src), ")" | "]" | "}"),
            _ => false,
        }
    }

    /// Index just past the bracket group opened at `i`.
    fn skip_balanced(&self, i: usize) -> Option<usize> {
        let mut stack: Vec<&str> = Vec::new();
        let mut j = i;
        while let Some(t) = self.sig.get(j) {
            if t.kind == TokenKind::Punct {
                match t.text(self.src) {
                    open @ ("(" | "[" | "{" | "<") => stack.push(open),
                    close @ (")" | "]" | "}" | ">") => {
                        let expected = match close {
                            ")" => "(",
                            "]" => "[",
                            "}" => "{",
                            _ => "<",
                        };
                        if stack.pop() != Some(expected) {
                            return None;
                        }
                        if stack.is_empty() {
                            return Some(j + 1);
                        }
                    }
                    _ => {}
                }
            }
            if stack.is_empty() {
                return None;
            }
            j += 1;
        }
        None
    }

    /// Index just past a type starting at `i`.
    fn scan_type(&self, i: usize) -> Option<usize> {
        let mut j = i;
        if self.is(j, "|") || self.is(j, "&") {
            j += 1;
        }
        j = self.scan_union(j)?;
        if self.is(j, "extends") {
            let k = self.scan_union(j + 1)?;
            if self.is(k, "?") {
                let k = self.scan_type(k + 1)?;
                if !self.is(k, ":") {
                    return None;
                }
                return self.scan_type(k + 1);
            }
            return Some(k);
        }
        Some(j)
    }

    fn scan_union(&self, i: usize) -> Option<usize> {
        let mut j = self.scan_operand(i)?;
        while self.is(j, "|") || self.is(j, "&") {
            j = self.scan_operand(j + 1)?;
        }
        Some(j)
    }

    fn scan_operand(&self, i: usize) -> Option<usize> {
        let mut j = i;
        while TYPE_PREFIXES.contains(&self.text(j)) && self.starts_operand(j + 1) {
            j += 1;
        }
        if self.is(j, "asserts") && self.is_ident(j + 1) {
            j += 1;
        }
        if self.is(j, "abstract") && self.is(j + 1, "new") {
            j += 1;
        }
        if self.is(j, "new") && (self.is(j + 1, "(") || self.is(j + 1, "<")) {
            j += 1;
        }
        let t = self.sig.get(j)?;
        j = match t.kind {
            TokenKind::Str | TokenKind::Number | TokenKind::Template => j + 1,
            TokenKind::Ident if self.text(j) == "import" && self.is(j + 1, "(") => self.skip_balanced(j + 1)?,
            TokenKind::Ident => {
                let mut k = j + 1;
                while self.is(k, ".") && self.is_ident(k + 1) {
                    k += 2;
                }
                if self.is(k, "is") {
                    return self.scan_type(k + 1);
                }
                k
            }
            TokenKind::Punct => match self.text(j) {
                "-" if self.sig.get(j + 1).is_some_and(|n| n.kind == TokenKind::Number) => j + 2,
                "(" => {
                    let k = self.skip_balanced(j)?;
                    if self.is(k, "=>") {
                        return self.scan_type(k + 1);
                    }
                    k
                }
                "<" => {
                    let k = self.skip_balanced(j)?;
                    if !self.is(k, "(") {
                        return None;
                    }
                    let k = self.skip_balanced(k)?;
                    if !self.is(k, "=>") {
                        return None;
                    }
                    return self.scan_type(k + 1);
                }
                "[" | "{" => self.skip_balanced(j)?,
                _ => return None,
            },
            _ => return None,
        };
        while (self.is(j, "<") || self.is(j, ".")) && !self.sig[j].newline_before {
            if self.is(j, "<") {
                j = self.skip_balanced(j)?;
            } else if self.is_ident(j + 1) {
                j += 2;
            } else {
                break;
            }
        }
        while self.is(j, "[") && !self.sig[j].newline_before {
            j = self.skip_balanced(j)?;
        }
        Some(j)
    }

    fn starts_operand(&self, i: usize) -> bool {
        let Some(t) = self.sig.get(i) else {
            return false;
        };
        match t.kind {
            TokenKind::Ident | TokenKind::Str | TokenKind::Number | TokenKind::Template => true,
            TokenKind::Punct => matches!(t.text(self.src), "(" | "[" | "{"),
            _ => false,
        }
    }

    /// `(` at `i` opens an arrow function's parameter list.
    fn is_arrow_params(&self, i: usize) -> bool {
        let Some(close) = self.skip_balanced(i) else {
            return false;
        };
        if self.is(close, "=>") {
            return true;
        }
        self.is(close, ":") && self.scan_type(close + 1).is_some_and(|e| self.is(e, "=>"))
    }

    /// `(` at `i` opens a parameter list of a function, method or arrow.
    fn is_params(&self, i: usize) -> bool {
        if i > 0 && CONTROL_KEYWORDS.contains(&self.text(i - 1)) {
            return false;
        }
        if self.is_arrow_params(i) {
            return true;
        }
        let Some(close) = self.skip_balanced(i) else {
            return false;
        };
        if self.is(close, "{") {
            return !self.sig[close].newline_before;
        }
        self.is(close, ":") && self.scan_type(close + 1).is_some_and(|e| self.is(e, "{"))
    }

    /// Comma separated types followed by `>`; returns the index of the `>`.
    fn scan_type_list(&self, i: usize) -> Option<usize> {
        let mut j = self.scan_type(i)?;
        while self.is(j, ",") {
            if self.is(j + 1, ">") {
                return Some(j + 1);
            }
            j = self.scan_type(j + 1)?;
        }
        self.is(j, ">").then_some(j)
    }

    /// Removes an annotation whose `:` sits at `colon`, together with an
    /// optional `?` / `!` marker just before it. Returns the index after it.
    fn remove_annotation(&mut self, colon: usize) -> Option<usize> {
        let end = self.scan_type(colon + 1)?;
        let from = if colon > 0 && (self.is(colon - 1, "?") || self.is(colon - 1, "!")) {
            colon - 1
        } else {
            colon
        };
        self.remove(self.start(from)..self.end(end - 1));
        Some(end)
    }

    fn run(&mut self) {
        let mut frames: Vec<Frame> = Vec::new();
        let mut class_body_pending = false;
        let mut i = 0;
        while i < self.sig.len() {
            let t = self.text(i);
            let kind = self.sig[i].kind;
            let top = frames.last().map(|f| f.kind).unwrap_or(FrameKind::Other);

            if kind == TokenKind::Ident {
                if let Some(next) = self.declaration_keyword(i, top, &mut class_body_pending) {
                    i = next;
                    continue;
                }
                if (t == "as" || t == "satisfies")
                    && i > 0
                    && self.ends_expression(i - 1)
                    && !self.sig[i].newline_before
                {
                    if let Some(mut end) = self.scan_type(i + 1) {
                        // `x as unknown as T`
                        while (self.is(end, "as") || self.is(end, "satisfies")) && !self.sig[end].newline_before {
                            match self.scan_type(end + 1) {
                                Some(next) => end = next,
                                None => break,
                            }
                        }
                        self.remove(self.end(i - 1)..self.end(end - 1));
                        i = end;
                        continue;
                    }
                }
            }

            if t == "!" && i > 0 && self.ends_expression(i - 1) && self.end(i - 1) == self.start(i) {
                self.remove(self.sig[i].span.clone());
                i += 1;
                continue;
            }

            if t == "<" {
                if let Some(next) = self.angle_bracket(i) {
                    i = next;
                    continue;
                }
            }

            if let Some(frame) = frames.last_mut() {
                match frame.kind {
                    FrameKind::Params => {
                        if let Some(next) = self.in_params(i, frame) {
                            i = next;
                            continue;
                        }
                    }
                    FrameKind::ClassBody => {
                        if let Some(next) = self.in_class_body(i, frame) {
                            i = next;
                            continue;
                        }
                    }
                    FrameKind::Other => {}
                }
            }

            match t {
                "(" if kind == TokenKind::Punct => {
                    let frame_kind = if self.is_params(i) {
                        FrameKind::Params
                    } else {
                        FrameKind::Other
                    };
                    frames.push(Frame::new(frame_kind));
                }
                "{" if kind == TokenKind::Punct => {
                    let frame_kind = if class_body_pending {
                        class_body_pending = false;
                        FrameKind::ClassBody
                    } else {
                        FrameKind::Other
                    };
                    frames.push(Frame::new(frame_kind));
                }
                "[" if kind == TokenKind::Punct => frames.push(Frame::new(FrameKind::Other)),
                ")" | "]" | "}" if kind == TokenKind::Punct => {
                    let closed = frames.pop().map(|f| f.kind);
                    if let Some(parent) = frames.last_mut() {
                        if parent.kind == FrameKind::ClassBody && !parent.in_value {
                            parent.member_start = true;
                        }
                    }
                    if closed == Some(FrameKind::Params) && self.is(i + 1, ":") {
                        if let Some(end) = self.remove_annotation(i + 1) {
                            i = end;
                            continue;
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// `function`, `class`, `abstract`, `let`/`const`/`var`, local `type`
    /// and `interface` declarations.
    fn declaration_keyword(&mut self, i: usize, top: FrameKind, class_body_pending: &mut bool) -> Option<usize> {
        match self.text(i) {
            "function" => {
                let mut j = i + 1;
                if self.is(j, "*") {
                    j += 1;
                }
                if self.is_ident(j) {
                    j += 1;
                }
                if self.is(j, "<") {
                    let end = self.skip_balanced(j)?;
                    self.remove(self.start(j)..self.end(end - 1));
                    return Some(end);
                }
                None
            }
            "abstract" if self.is(i + 1, "class") => {
                self.remove(self.start(i)..self.start(i + 1));
                Some(i + 1)
            }
            "class" => {
                *class_body_pending = true;
                let mut j = i + 1;
                if self.is_ident(j) && !self.is(j, "extends") && !self.is(j, "implements") {
                    j += 1;
                }
                if self.is(j, "<") {
                    let end = self.skip_balanced(j)?;
                    self.remove(self.start(j)..self.end(end - 1));
                    j = end;
                }
                if self.is(j, "extends") {
                    j += 1;
                    while self.is_ident(j) && self.is(j + 1, ".") {
                        j += 2;
                    }
                    j += 1;
                    if self.is(j, "<") {
                        let end = self.skip_balanced(j)?;
                        self.remove(self.start(j)..self.end(end - 1));
                        j = end;
                    }
                }
                if self.is(j, "implements") {
                    let mut k = j;
                    while k < self.sig.len() && !self.is(k, "{") {
                        k += 1;
                    }
                    self.remove(self.start(j)..self.start(k));
                    return Some(k);
                }
                Some(j)
            }
            "let" | "const" | "var" if top != FrameKind::ClassBody => {
                let j = i + 1;
                let after = if self.is(j, "{") || self.is(j, "[") {
                    self.skip_balanced(j)?
                } else if self.is_ident(j) {
                    j + 1
                } else {
                    return None;
                };
                let colon = if self.is(after, "!") { after + 1 } else { after };
                if self.is(colon, ":") {
                    return self.remove_annotation(colon);
                }
                None
            }
            "type" if self.is_ident(i + 1) && (self.is(i + 2, "=") || self.is(i + 2, "<")) => {
                let mut j = i + 2;
                if self.is(j, "<") {
                    j = self.skip_balanced(j)?;
                }
                if !self.is(j, "=") {
                    return None;
                }
                let mut end = self.scan_type(j + 1)?;
                if self.is(end, ";") {
                    end += 1;
                }
                self.remove(self.start(i)..self.end(end - 1));
                Some(end)
            }
            "interface" if self.is_ident(i + 1) && top != FrameKind::Params => {
                let mut k = i + 1;
                while k < self.sig.len() && !self.is(k, "{") {
                    k += 1;
                }
                let end = self.skip_balanced(k)?;
                self.remove(self.start(i)..self.end(end - 1));
                Some(end)
            }
            _ => None,
        }
    }

    /// `<` at `i`: call type arguments, a `<T>expr` assertion or a generic
    /// arrow's type parameters.
    fn angle_bracket(&mut self, i: usize) -> Option<usize> {
        let prev_ends = i > 0 && self.ends_expression(i - 1) && !self.is(i - 1, "}");
        if prev_ends {
            let close = self.scan_type_list(i + 1)?;
            let next = self.sig.get(close + 1)?;
            if self.is(close + 1, "(") || next.kind == TokenKind::Template {
                self.remove(self.start(i)..self.end(close));
                return Some(close + 1);
            }
            return None;
        }
        if self.jsx {
            return None;
        }
        let end = self.skip_balanced(i)?;
        if self.is(end, "(") && self.is_arrow_params(end) {
            self.remove(self.start(i)..self.end(end - 1));
            return Some(end);
        }
        let close = self.scan_type(i + 1)?;
        if self.is(close, ">") {
            self.remove(self.start(i)..self.start(close + 1));
            return Some(close + 1);
        }
        None
    }

    fn in_params(&mut self, i: usize, frame: &mut Frame) -> Option<usize> {
        let t = self.text(i);
        match t {
            "=" => frame.in_value = true,
            "," => frame.in_value = false,
            _ if frame.in_value => {}
            "?" if self.is_ident(i.checked_sub(1)?) && (self.is(i + 1, ",") || self.is(i + 1, ")") || self.is(i + 1, "=")) => {
                self.remove(self.sig[i].span.clone());
                return Some(i + 1);
            }
            ":" => {
                let prev = i.checked_sub(1)?;
                if self.is_ident(prev) || self.is(prev, "]") || self.is(prev, "}") || self.is(prev, "?") {
                    return self.remove_annotation(i);
                }
            }
            _ if PARAMETER_MODIFIERS.contains(&t)
                && i > 0
                && (self.is(i - 1, "(") || self.is(i - 1, ",") || PARAMETER_MODIFIERS.contains(&self.text(i - 1)))
                && (self.is_ident(i + 1) || self.is(i + 1, "{") || self.is(i + 1, "[")) =>
            {
                self.remove(self.start(i)..self.start(i + 1));
                return Some(i + 1);
            }
            _ => {}
        }
        None
    }

    fn in_class_body(&mut self, i: usize, frame: &mut Frame) -> Option<usize> {
        let token = &self.sig[i];
        let t = self.text(i);
        let starts_member = matches!(token.kind, TokenKind::Ident | TokenKind::Str) || matches!(t, "[" | "*" | "@");
        if token.newline_before && starts_member && i > 0 && self.ends_expression(i - 1) {
            frame.in_value = false;
            frame.member_start = true;
        }
        match t {
            ";" => {
                frame.in_value = false;
                frame.member_start = true;
                return None;
            }
            "=" => frame.in_value = true,
            ":" if !frame.in_value => {
                let prev = i.checked_sub(1)?;
                let named = self.is_ident(prev)
                    || self.is(prev, "]")
                    || self.is(prev, "?")
                    || self.is(prev, "!")
                    || self.sig[prev].kind == TokenKind::Str;
                if named {
                    return self.remove_annotation(i);
                }
            }
            _ if frame.member_start
                && MEMBER_MODIFIERS.contains(&t)
                && !matches!(self.text(i + 1), "(" | "=" | ":" | ";" | "?" | "!" | "<") =>
            {
                self.remove(self.start(i)..self.start(i + 1));
                return Some(i + 1);
            }
            _ => {}
        }
        frame.member_start = false;
        None
    }
}

fn apply_removals(source: &str, mut removals: Vec<Range<usize>>) -> String {
    removals.sort_by_key(|r| r.start);
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for range in removals {
        if range.end <= cursor {
            continue;
        }
        let start = range.start.max(cursor);
        out.push_str(&source[cursor..start]);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
