//! Highlight tokens built on top of syntect.
//!
//! Syntect scope stacks are reduced to the coarse categories rendered by the
//! stylesheet. Tokens never include line breaks, and ordinary code is split
//! into identifier words and single punctuation characters so that analyzer
//! references, which point at identifier starts, line up with token starts.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::domain::model::{HighlightToken, TokenCategory};

static DEFAULT_SYNTAXES: Lazy<Arc<SyntaxSet>> =
    Lazy::new(|| Arc::new(SyntaxSet::load_defaults_newlines()));

#[derive(Debug, Clone)]
pub struct Highlighter {
    syntax_set: Arc<SyntaxSet>,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            syntax_set: Arc::clone(&DEFAULT_SYNTAXES),
        }
    }

    /// Name of the syntax used for `path`.
    pub fn language(&self, path: &Path, source: &str) -> String {
        self.syntax_for(path, source).name.clone()
    }

    /// Sorted, non-overlapping tokens for `source`.
    ///
    /// Sources that are not valid UTF-8 produce no tokens and render as plain text.
    pub fn tokens(&self, path: &Path, source: &[u8]) -> Vec<HighlightToken> {
        let Ok(text) = std::str::from_utf8(source) else {
            tracing::debug!(path = %path.display(), "source is not UTF-8; skipping highlighting");
            return Vec::new();
        };
        let syntax = self.syntax_for(path, text);
        match self.tokenize(text, syntax) {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "highlight failed");
                Vec::new()
            }
        }
    }

    fn tokenize(&self, text: &str, syntax: &SyntaxReference) -> Result<Vec<HighlightToken>> {
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut tokens = Vec::new();
        let mut line_start = 0;

        for line in LinesWithEndings::from(text) {
            let ops = state
                .parse_line(line, &self.syntax_set)
                .map_err(|err| anyhow!("parse error at byte {line_start}: {err}"))?;

            let mut runs: Vec<Run> = Vec::new();
            let mut cursor = 0;
            for (pos, op) in ops {
                if pos > cursor {
                    push_run(&mut runs, cursor, pos, classify(stack.as_slice()));
                    cursor = pos;
                }
                stack
                    .apply(&op)
                    .map_err(|err| anyhow!("scope error at byte {}: {err:?}", line_start + pos))?;
            }
            if cursor < line.len() {
                push_run(&mut runs, cursor, line.len(), classify(stack.as_slice()));
            }

            for run in runs {
                split_run(line, line_start, run, &mut tokens);
            }
            line_start += line.len();
        }

        Ok(tokens)
    }

    fn syntax_for(&self, path: &Path, text: &str) -> &SyntaxReference {
        let by_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.syntax_set.find_syntax_by_extension(ext));
        let by_name = || {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| self.syntax_set.find_syntax_by_extension(name))
        };
        let by_first_line = || {
            text.lines()
                .next()
                .and_then(|line| self.syntax_set.find_syntax_by_first_line(line))
        };
        by_extension
            .or_else(by_name)
            .or_else(by_first_line)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    start: usize,
    end: usize,
    category: TokenCategory,
}

/// Append a run, extending the previous one when a whole-run category continues.
fn push_run(runs: &mut Vec<Run>, start: usize, end: usize, category: TokenCategory) {
    if let Some(last) = runs.last_mut()
        && last.end == start
        && last.category == category
        && keeps_whole(category)
    {
        last.end = end;
        return;
    }
    runs.push(Run {
        start,
        end,
        category,
    });
}

fn keeps_whole(category: TokenCategory) -> bool {
    matches!(
        category,
        TokenCategory::Comment | TokenCategory::String | TokenCategory::AttrValue
    )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Turn one run of a line into tokens with absolute offsets.
fn split_run(line: &str, line_start: usize, run: Run, tokens: &mut Vec<HighlightToken>) {
    let text = &line[run.start..run.end];

    if keeps_whole(run.category) {
        let trimmed_end = text.trim_end().len();
        let leading = text.len() - text.trim_start().len();
        if leading < trimmed_end {
            tokens.push(HighlightToken::new(
                line_start + run.start + leading,
                line_start + run.start + trimmed_end,
                run.category,
            ));
        }
        return;
    }

    let mut word_start: Option<usize> = None;
    for (offset, c) in text.char_indices() {
        if is_word_char(c) {
            word_start.get_or_insert(offset);
            continue;
        }
        if let Some(start) = word_start.take() {
            tokens.push(HighlightToken::new(
                line_start + run.start + start,
                line_start + run.start + offset,
                run.category,
            ));
        }
        if !c.is_whitespace() {
            let start = line_start + run.start + offset;
            tokens.push(HighlightToken::new(
                start,
                start + c.len_utf8(),
                run.category,
            ));
        }
    }
    if let Some(start) = word_start {
        tokens.push(HighlightToken::new(
            line_start + run.start + start,
            line_start + run.end,
            run.category,
        ));
    }
}

fn classify(scopes: &[Scope]) -> TokenCategory {
    let names: Vec<String> = scopes.iter().map(|scope| scope.build_string()).collect();
    let has = |prefix: &str| names.iter().any(|name| name.starts_with(prefix));

    if has("comment") {
        return TokenCategory::Comment;
    }
    if has("string") {
        return if has("meta.tag") {
            TokenCategory::AttrValue
        } else {
            TokenCategory::String
        };
    }

    for name in names.iter().rev() {
        if let Some(category) = classify_scope(name) {
            return category;
        }
    }
    TokenCategory::Plaintext
}

fn classify_scope(name: &str) -> Option<TokenCategory> {
    const PREFIXES: &[(&str, TokenCategory)] = &[
        ("constant.numeric", TokenCategory::Decimal),
        ("constant.character", TokenCategory::String),
        ("constant", TokenCategory::Literal),
        ("variable.language", TokenCategory::Literal),
        ("support.constant", TokenCategory::Literal),
        ("entity.name.tag", TokenCategory::Tag),
        ("entity.other.attribute-name", TokenCategory::AttrName),
        ("punctuation.definition.tag", TokenCategory::HtmlTag),
        ("meta.tag", TokenCategory::HtmlTag),
        ("keyword.operator", TokenCategory::Punctuation),
        ("keyword", TokenCategory::Keyword),
        ("storage", TokenCategory::Keyword),
        ("entity.name.type", TokenCategory::Type),
        ("entity.name.class", TokenCategory::Type),
        ("entity.name.struct", TokenCategory::Type),
        ("entity.name.enum", TokenCategory::Type),
        ("support.type", TokenCategory::Type),
        ("support.class", TokenCategory::Type),
        ("punctuation", TokenCategory::Punctuation),
    ];
    PREFIXES
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|(_, category)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of<'a>(source: &'a str, token: &HighlightToken) -> &'a str {
        &source[token.span.start..token.span.end]
    }

    #[test]
    fn rust_source_produces_categorized_tokens() {
        let source = "fn main() {\n    let s = \"hi\"; // note\n}\n";
        let tokens = Highlighter::new().tokens(Path::new("sample.rs"), source.as_bytes());

        assert!(!tokens.is_empty());
        let fn_token = tokens.iter().find(|t| text_of(source, t) == "fn").expect("fn token");
        assert_eq!(fn_token.category, TokenCategory::Keyword);
        assert!(tokens.iter().any(|t| text_of(source, t) == "main"));
        let string = tokens
            .iter()
            .find(|t| t.category == TokenCategory::String)
            .expect("string token");
        assert_eq!(text_of(source, string), "\"hi\"");
        let comment = tokens
            .iter()
            .find(|t| t.category == TokenCategory::Comment)
            .expect("comment token");
        assert_eq!(text_of(source, comment), "// note");
    }

    #[test]
    fn tokens_are_sorted_and_never_span_lines() {
        let source = "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(1 + 2)\n}\n";
        let tokens = Highlighter::new().tokens(Path::new("main.go"), source.as_bytes());

        for pair in tokens.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
        for token in &tokens {
            assert!(!token.span.is_empty());
            assert!(!text_of(source, token).contains('\n'));
            assert!(!text_of(source, token).trim().is_empty());
        }
        assert!(tokens.iter().any(|t| text_of(source, t) == "Println"));
    }

    #[test]
    fn unknown_files_fall_back_to_plain_words() {
        let source = "hello, world";
        let tokens = Highlighter::new().tokens(Path::new("notes.unknown-ext"), source.as_bytes());
        let words: Vec<_> = tokens.iter().map(|t| text_of(source, t)).collect();
        assert_eq!(words, vec!["hello", ",", "world"]);
        assert!(tokens.iter().all(|t| t.category == TokenCategory::Plaintext));
    }

    #[test]
    fn invalid_utf8_yields_no_tokens() {
        let tokens = Highlighter::new().tokens(Path::new("blob.rs"), b"\xff\xfe fn");
        assert!(tokens.is_empty());
    }
}
