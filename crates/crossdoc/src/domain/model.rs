//! Domain models for spans, analyzer records, annotations, and segments.

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into one file's raw contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether `offset` lies strictly between the span's endpoints.
    pub fn strictly_contains(&self, offset: usize) -> bool {
        self.start < offset && offset < self.end
    }
}

/// Lexical category assigned to a highlight token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenCategory {
    String,
    Keyword,
    Comment,
    Type,
    Literal,
    Punctuation,
    Plaintext,
    Tag,
    HtmlTag,
    AttrName,
    AttrValue,
    Decimal,
}

impl TokenCategory {
    /// Stable identifier used as the configuration key.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenCategory::String => "string",
            TokenCategory::Keyword => "keyword",
            TokenCategory::Comment => "comment",
            TokenCategory::Type => "type",
            TokenCategory::Literal => "literal",
            TokenCategory::Punctuation => "punctuation",
            TokenCategory::Plaintext => "plaintext",
            TokenCategory::Tag => "tag",
            TokenCategory::HtmlTag => "html-tag",
            TokenCategory::AttrName => "attr-name",
            TokenCategory::AttrValue => "attr-value",
            TokenCategory::Decimal => "decimal",
        }
    }

    /// CSS class emitted for the category unless configuration overrides it.
    pub fn default_class(&self) -> &'static str {
        match self {
            TokenCategory::String => "str",
            TokenCategory::Keyword => "kwd",
            TokenCategory::Comment => "com",
            TokenCategory::Type => "typ",
            TokenCategory::Literal => "lit",
            TokenCategory::Punctuation => "pun",
            TokenCategory::Plaintext => "pln",
            TokenCategory::Tag => "tag",
            TokenCategory::HtmlTag => "htm",
            TokenCategory::AttrName => "atn",
            TokenCategory::AttrValue => "atv",
            TokenCategory::Decimal => "dec",
        }
    }

    pub fn all() -> &'static [TokenCategory] {
        &[
            TokenCategory::String,
            TokenCategory::Keyword,
            TokenCategory::Comment,
            TokenCategory::Type,
            TokenCategory::Literal,
            TokenCategory::Punctuation,
            TokenCategory::Plaintext,
            TokenCategory::Tag,
            TokenCategory::HtmlTag,
            TokenCategory::AttrName,
            TokenCategory::AttrValue,
            TokenCategory::Decimal,
        ]
    }
}

/// A lexer token covering a span of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightToken {
    pub span: Span,
    pub category: TokenCategory,
}

impl HighlightToken {
    pub fn new(start: usize, end: usize, category: TokenCategory) -> Self {
        Self {
            span: Span::new(start, end),
            category,
        }
    }
}

/// Identity of a definition across the whole project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct DefKey {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub path: String,
}

impl DefKey {
    pub fn new(unit: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            path: path.into(),
        }
    }

    /// Fragment identifier used both as the anchor `id` and in link targets.
    pub fn anchor_id(&self) -> String {
        let parts: Vec<&str> = self
            .unit
            .split('/')
            .chain(self.path.split('/'))
            .filter(|part| !part.is_empty() && *part != ".")
            .collect();
        parts.join("/")
    }
}

/// A use of a definition at a position in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reference {
    #[serde(default)]
    pub def_unit: String,
    #[serde(default)]
    pub def_path: String,
    #[serde(default)]
    pub file: String,
    pub start: usize,
}

impl Reference {
    pub fn def_key(&self) -> DefKey {
        DefKey::new(self.def_unit.clone(), self.def_path.clone())
    }
}

/// A function, type, variable, or other named declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Definition {
    #[serde(flatten)]
    pub key: DefKey,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file: String,
    pub def_start: usize,
    #[serde(default)]
    pub def_end: usize,
    #[serde(default)]
    pub tree_path: String,
}

/// Media type of the only comment format rendered into the doc column.
pub const HTML_DOC_FORMAT: &str = "text/html";

/// A documentation comment with its pre-rendered content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocComment {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub data: String,
    pub start: usize,
    pub end: usize,
}

impl DocComment {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    pub fn is_html(&self) -> bool {
        self.format == HTML_DOC_FORMAT
    }
}

/// Markup to wrap around a span of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub span: Span,
    pub left: String,
    pub right: String,
    /// Zero-width jump target for a definition rather than a real token.
    pub def_anchor: bool,
}

/// One rendered row: documentation beside the code it describes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Segment {
    pub doc_html: String,
    pub code_html: String,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.doc_html.is_empty() && self.code_html.is_empty()
    }
}
