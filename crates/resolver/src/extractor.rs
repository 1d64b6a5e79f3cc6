//! Import extraction from Solidity source text
//!
//! Parses Solidity import statements using regex over the whole text, so a
//! statement may span several lines. Comments are blanked out before matching,
//! and a match whose `import` keyword lies inside a string literal is ignored.

use crate::{Import, ImportKind, ImportedSymbol};
use project::{FileId, ProjectTree};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::ops::Range;

/// Extracts imports from Solidity source code
#[derive(Debug, Clone)]
pub struct ImportExtractor {
    simple_import: Regex,
    named_import: Regex,
    aliased_import: Regex,
    wildcard_import: Regex,
}

impl Default for ImportExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportExtractor {
    /// Create a new import extractor
    pub fn new() -> Self {
        // Simple import: import "path";
        let simple_import = Regex::new(r#"\bimport\s+["']([^"']+)["']\s*;"#)
            .expect("Invalid simple import regex");

        // Named import: import {A, B as C} from "path";
        let named_import =
            Regex::new(r#"\bimport\s*\{([^}]*)\}\s*from\s+["']([^"']+)["']\s*;"#)
                .expect("Invalid named import regex");

        // Aliased import: import "path" as X;
        let aliased_import = Regex::new(r#"\bimport\s+["']([^"']+)["']\s+as\s+(\w+)\s*;"#)
            .expect("Invalid aliased import regex");

        // Wildcard import: import * as X from "path";
        let wildcard_import =
            Regex::new(r#"\bimport\s*\*\s*as\s+(\w+)\s+from\s+["']([^"']+)["']\s*;"#)
                .expect("Invalid wildcard import regex");

        Self {
            simple_import,
            named_import,
            aliased_import,
            wildcard_import,
        }
    }

    /// Extract all imports from source code, in source order
    pub fn extract(&self, source: &str) -> Vec<Import> {
        if source.trim().is_empty() {
            return Vec::new();
        }

        let (text, strings) = blank_comments(source);
        let mut found: Vec<(usize, String, ImportKind)> = Vec::new();

        for caps in code_captures(&self.simple_import, &text, &strings) {
            let start = caps.get(0).map_or(0, |m| m.start());
            found.push((start, caps[1].to_string(), ImportKind::Simple));
        }

        for caps in code_captures(&self.named_import, &text, &strings) {
            let start = caps.get(0).map_or(0, |m| m.start());
            let symbols = parse_named_symbols(&caps[1]);
            found.push((start, caps[2].to_string(), ImportKind::Named(symbols)));
        }

        for caps in code_captures(&self.aliased_import, &text, &strings) {
            let start = caps.get(0).map_or(0, |m| m.start());
            found.push((
                start,
                caps[1].to_string(),
                ImportKind::Aliased(caps[2].to_string()),
            ));
        }

        for caps in code_captures(&self.wildcard_import, &text, &strings) {
            let start = caps.get(0).map_or(0, |m| m.start());
            found.push((
                start,
                caps[2].to_string(),
                ImportKind::Wildcard(caps[1].to_string()),
            ));
        }

        found.sort_by_key(|(start, _, _)| *start);

        found
            .into_iter()
            .map(|(start, path, kind)| Import {
                path,
                kind,
                line: line_of(&text, start),
            })
            .collect()
    }

    /// Raw import paths in source order
    pub fn import_paths(&self, source: &str) -> Vec<String> {
        self.extract(source).into_iter().map(|i| i.path).collect()
    }
}

/// Parse named import symbols (e.g., "A, B as C, D")
fn parse_named_symbols(symbols_str: &str) -> Vec<ImportedSymbol> {
    symbols_str
        .split(',')
        .filter_map(|s| {
            let mut words = s.split_whitespace();
            let name = words.next()?.to_string();
            let alias = match (words.next(), words.next()) {
                (Some("as"), Some(alias)) => Some(alias.to_string()),
                _ => None,
            };
            Some(ImportedSymbol { name, alias })
        })
        .collect()
}

/// Matches of `pattern` whose `import` keyword sits in code, not inside a string literal
fn code_captures<'t>(
    pattern: &Regex,
    text: &'t str,
    strings: &[Range<usize>],
) -> Vec<Captures<'t>> {
    let mut accepted = Vec::new();
    let mut pos = 0;

    while let Some(caps) = pattern.captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };
        if strings.iter().any(|span| span.start < whole.start() && whole.start() < span.end) {
            // The keyword is ASCII, so the next byte is a char boundary
            pos = whole.start() + 1;
            continue;
        }
        pos = whole.end();
        accepted.push(caps);
    }

    accepted
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].bytes().filter(|b| *b == b'\n').count() + 1
}

/// Replace comment text with spaces, keeping newlines and string literals intact
///
/// Byte offsets are preserved. Also returns the span of every string literal,
/// quotes included.
fn blank_comments(source: &str) -> (String, Vec<Range<usize>>) {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Str(char),
        LineComment,
        BlockComment,
    }

    let mut out = String::with_capacity(source.len());
    let mut strings = Vec::new();
    let mut opened = 0;
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '"' | '\'' => {
                    opened = out.len();
                    out.push(c);
                    state = State::Str(c);
                }
                _ => out.push(c),
            },
            State::Str(quote) => {
                out.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                } else if c == quote || c == '\n' {
                    strings.push(opened..out.len());
                    state = State::Code;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    out.push_str(&" ".repeat(c.len_utf8()));
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                } else {
                    out.push_str(&" ".repeat(c.len_utf8()));
                }
            }
        }
    }

    if let State::Str(_) = state {
        strings.push(opened..out.len());
    }

    (out, strings)
}

/// Parsed imports of every file in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportIndex {
    imports: BTreeMap<FileId, Vec<Import>>,
}

impl ImportIndex {
    /// Parse every file of the tree
    pub fn scan(tree: &ProjectTree, extractor: &ImportExtractor) -> Self {
        let imports = tree
            .files()
            .into_iter()
            .map(|file| {
                let found = extractor.extract(file.content());
                tracing::debug!("{}: {} imports", file.name, found.len());
                (file.id, found)
            })
            .collect();

        Self { imports }
    }

    /// Imports of one file (empty when the file is unknown)
    pub fn get(&self, id: FileId) -> &[Import] {
        self.imports.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn insert(&mut self, id: FileId, imports: Vec<Import>) {
        self.imports.insert(id, imports);
    }

    pub fn remove(&mut self, id: FileId) {
        self.imports.remove(&id);
    }

    /// Drop entries for files no longer in the snapshot
    pub fn retain_files(&mut self, tree: &ProjectTree) {
        self.imports
            .retain(|id, _| tree.get(*id).is_some_and(|f| f.is_file()));
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}
