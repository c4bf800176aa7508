//! Annotation merging: highlight tokens, references, and definition anchors.
//!
//! The merger walks the sorted highlight tokens of one file with a cursor into
//! the file's sorted references. Tokens that sit on a reference to a known
//! definition become hyperlinks; every other token is wrapped in a plain class
//! span. Each definition declared in the file adds a zero-width anchor so the
//! definition can be linked to even when no token starts at its position.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::app::defs::DefinitionTable;
use crate::domain::errors::DomainError;
use crate::domain::html::{escape, page_href};
use crate::domain::model::{Annotation, HighlightToken, Reference, Span, TokenCategory};

/// CSS classes emitted per token category. Categories without a class are not rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    classes: HashMap<TokenCategory, String>,
}

impl Default for ClassMap {
    fn default() -> Self {
        Self {
            classes: TokenCategory::all()
                .iter()
                .map(|category| (*category, category.default_class().to_owned()))
                .collect(),
        }
    }
}

impl ClassMap {
    /// Apply overrides keyed by category name (`string`, `html-tag`, ...).
    ///
    /// An empty class removes the category from the output.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut map = Self::default();
        for (name, class) in overrides {
            match TokenCategory::all()
                .iter()
                .find(|category| category.as_str() == name.as_str())
            {
                Some(category) => {
                    map.classes.insert(*category, class.trim().to_owned());
                }
                None => {
                    tracing::warn!(category = %name, "unknown highlight category in config");
                }
            }
        }
        map
    }

    pub fn class(&self, category: TokenCategory) -> Option<&str> {
        self.classes
            .get(&category)
            .map(String::as_str)
            .filter(|class| !class.is_empty())
    }
}

/// Merges the annotation sources of one file into a single sorted sequence.
#[derive(Debug, Clone, Copy)]
pub struct AnnotationMerger<'a> {
    definitions: &'a DefinitionTable,
    classes: &'a ClassMap,
}

impl<'a> AnnotationMerger<'a> {
    pub fn new(definitions: &'a DefinitionTable, classes: &'a ClassMap) -> Self {
        Self {
            definitions,
            classes,
        }
    }

    /// Produce the annotations for `file`, sorted by `(start, end)`.
    ///
    /// `tokens` and `refs` must be sorted by start; tokens must not overlap.
    pub fn merge(
        &self,
        file: &str,
        tokens: &[HighlightToken],
        refs: &[Reference],
    ) -> Result<Vec<Annotation>, DomainError> {
        check_tokens(tokens)?;
        check_references(refs)?;

        let mut pending = Vec::with_capacity(tokens.len());
        let mut cursor = 0;
        let mut dangling = 0usize;
        for token in tokens {
            let start = token.span.start;
            while cursor < refs.len() && refs[cursor].start < start {
                cursor += 1;
            }
            let reference = match refs.get(cursor) {
                Some(reference) if reference.start == start => {
                    cursor += 1;
                    Some(reference)
                }
                _ => None,
            };

            let Some(class) = self.classes.class(token.category) else {
                continue;
            };
            let target = reference.and_then(|reference| {
                let target = self.target(file, reference);
                if target.is_none() {
                    dangling += 1;
                }
                target
            });
            pending.push(Pending {
                span: token.span,
                kind: PendingKind::Token {
                    class: class.to_owned(),
                    target,
                },
            });
        }

        for def in self.definitions.defined_in(file) {
            let at = anchor_position(def.def_start, tokens);
            pending.push(Pending {
                span: Span::new(at, at),
                kind: PendingKind::Anchor {
                    id: def.key.anchor_id(),
                },
            });
        }

        pending.sort_by_key(|p| (p.span.start, p.span.end));

        if dangling > 0 {
            tracing::debug!(file, dangling, "references without a known definition");
        }

        let mut claimed = HashSet::new();
        Ok(pending
            .into_iter()
            .map(|p| p.into_annotation(&mut claimed))
            .collect())
    }

    fn target(&self, file: &str, reference: &Reference) -> Option<LinkTarget> {
        let def = self.definitions.get(&reference.def_key())?;
        let id = def.key.anchor_id();
        if def.file == file {
            Some(LinkTarget::SamePage { id })
        } else {
            Some(LinkTarget::OtherPage {
                href: format!("{}#{}", page_href(file, &def.file), id),
            })
        }
    }
}

fn check_tokens(tokens: &[HighlightToken]) -> Result<(), DomainError> {
    for pair in tokens.windows(2) {
        if pair[1].span.start < pair[0].span.end {
            return Err(DomainError::TokensOutOfOrder {
                previous_end: pair[0].span.end,
                found: pair[1].span.start,
            });
        }
    }
    Ok(())
}

fn check_references(refs: &[Reference]) -> Result<(), DomainError> {
    for pair in refs.windows(2) {
        if pair[1].start < pair[0].start {
            return Err(DomainError::ReferencesOutOfOrder {
                previous: pair[0].start,
                found: pair[1].start,
            });
        }
    }
    Ok(())
}

/// Move an anchor that lands inside a token to that token's start.
fn anchor_position(def_start: usize, tokens: &[HighlightToken]) -> usize {
    let idx = tokens.partition_point(|token| token.span.start <= def_start);
    match idx.checked_sub(1).and_then(|i| tokens.get(i)) {
        Some(token) if token.span.strictly_contains(def_start) => token.span.start,
        _ => def_start,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkTarget {
    SamePage { id: String },
    OtherPage { href: String },
}

#[derive(Debug)]
struct Pending {
    span: Span,
    kind: PendingKind,
}

#[derive(Debug)]
enum PendingKind {
    Token {
        class: String,
        target: Option<LinkTarget>,
    },
    Anchor {
        id: String,
    },
}

impl Pending {
    /// Build the final markup. Only the first annotation carrying an id emits the attribute.
    fn into_annotation(self, claimed: &mut HashSet<String>) -> Annotation {
        let mut id_attr = |id: &str| {
            if claimed.insert(id.to_owned()) {
                format!(r#" id="{}""#, escape(id))
            } else {
                String::new()
            }
        };

        let (left, right, def_anchor) = match self.kind {
            PendingKind::Token {
                class,
                target: None,
            } => (
                format!(r#"<span class="{}">"#, escape(&class)),
                "</span>".to_owned(),
                false,
            ),
            PendingKind::Token {
                class,
                target: Some(LinkTarget::OtherPage { href }),
            } => (
                format!(
                    r#"<span class="{}"><a href="{}">"#,
                    escape(&class),
                    escape(&href)
                ),
                "</a></span>".to_owned(),
                false,
            ),
            PendingKind::Token {
                class,
                target: Some(LinkTarget::SamePage { id }),
            } => (
                format!(
                    r##"<span class="{}"{}><a href="#{}">"##,
                    escape(&class),
                    id_attr(&id),
                    escape(&id)
                ),
                "</a></span>".to_owned(),
                false,
            ),
            PendingKind::Anchor { id } => (
                format!(r#"<span class="def"{}>"#, id_attr(&id)),
                "</span>".to_owned(),
                true,
            ),
        };

        Annotation {
            span: self.span,
            left,
            right,
            def_anchor,
        }
    }
}
