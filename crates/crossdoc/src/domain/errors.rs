//! Domain-specific errors.

use thiserror::Error;

/// Violations of the ordering and range assumptions made by the composition engine.
///
/// Each variant aborts processing of the affected file; continuing would corrupt the
/// byte-exact reconstruction of the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("references out of order: start {found} follows start {previous}")]
    ReferencesOutOfOrder { previous: usize, found: usize },
    #[error("highlight tokens out of order: token at {found} overlaps token ending at {previous_end}")]
    TokensOutOfOrder { previous_end: usize, found: usize },
    #[error("annotation {start}..{end} straddles the documentation boundary at {run_to}")]
    AnnotationStraddlesDoc {
        start: usize,
        end: usize,
        run_to: usize,
    },
    #[error("annotation starting at {start} overlaps code already emitted up to {cursor}")]
    AnnotationOverlap { start: usize, cursor: usize },
    #[error("doc comment starting at {start} overlaps content already consumed up to {cursor}")]
    DocOutOfOrder { start: usize, cursor: usize },
    #[error("{what} span {start}..{end} is outside the source (length {len})")]
    SpanOutOfBounds {
        what: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("table of contents mixes definition and file entries")]
    MixedTocLeaves,
}
