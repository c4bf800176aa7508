//! Segment composition: interleaving documentation comments with annotated code.
//!
//! A single forward sweep over the source bytes. Documentation comments end the
//! current code run and open the next row; annotations are spliced into the code
//! runs between comments. A comment that shares its line with the code after it
//! is rendered beside that code instead of beside the preceding block.

use std::collections::HashSet;

use crate::domain::errors::DomainError;
use crate::domain::html::escape_bytes;
use crate::domain::model::{Annotation, DocComment, Segment, Span};

/// Keep the HTML-formatted comments, drop duplicate spans, and order by `(start, end)`.
pub fn html_docs<I>(docs: I) -> Vec<DocComment>
where
    I: IntoIterator<Item = DocComment>,
{
    let mut seen = HashSet::new();
    let mut filtered: Vec<DocComment> = docs
        .into_iter()
        .filter(|doc| doc.is_html() && seen.insert(doc.span()))
        .collect();
    filtered.sort_by_key(|doc| (doc.start, doc.end));
    filtered
}

/// Compose the rows of one page.
///
/// `annotations` must be sorted by `(start, end)` and `docs` by start, without
/// duplicates; neither is re-sorted here.
pub fn compose(
    source: &[u8],
    annotations: &[Annotation],
    docs: &[DocComment],
) -> Result<Vec<Segment>, DomainError> {
    for annotation in annotations {
        check_bounds("annotation", annotation.span, source.len())?;
    }
    for doc in docs {
        check_bounds("doc comment", doc.span(), source.len())?;
    }

    Sweep {
        source,
        annotations,
        docs,
        next_annotation: 0,
        next_doc: 0,
        current: Segment::default(),
        segments: Vec::new(),
        seeded: false,
    }
    .run()
}

fn check_bounds(what: &'static str, span: Span, len: usize) -> Result<(), DomainError> {
    if span.start > span.end || span.end > len {
        return Err(DomainError::SpanOutOfBounds {
            what,
            start: span.start,
            end: span.end,
            len,
        });
    }
    Ok(())
}

fn is_line_break(byte: u8) -> bool {
    byte == b'\n' || byte == b'\r'
}

struct Sweep<'a> {
    source: &'a [u8],
    annotations: &'a [Annotation],
    docs: &'a [DocComment],
    next_annotation: usize,
    next_doc: usize,
    current: Segment,
    segments: Vec<Segment>,
    /// The current row already shows the next pending comment.
    seeded: bool,
}

impl<'a> Sweep<'a> {
    fn run(mut self) -> Result<Vec<Segment>, DomainError> {
        let len = self.source.len();
        let mut i = 0;
        while i < len {
            i = self.attach_docs(i)?;

            let run_to = self.docs.get(self.next_doc).map_or(len, |doc| doc.start);

            while self
                .annotations
                .get(self.next_annotation)
                .is_some_and(|annotation| annotation.span.start < i)
            {
                self.next_annotation += 1;
            }

            while i < run_to && is_line_break(self.source[i]) {
                i += 1;
            }
            let anchors = self.take_skipped(i);

            if let Some(doc) = self.docs.get(self.next_doc) {
                if i == run_to {
                    // Only line breaks separate this comment from the next one.
                    continue;
                }
                if !self.source[i..run_to].iter().copied().any(is_line_break) {
                    self.close();
                    self.current.doc_html.push_str(&doc.data);
                    self.seeded = true;
                }
            }

            for anchor in anchors {
                self.current.code_html.push_str(&anchor.left);
                self.current.code_html.push_str(&anchor.right);
            }
            i = self.emit_code(i, run_to)?;
            self.close();
        }
        self.close();
        Ok(self.segments)
    }

    fn attach_docs(&mut self, mut i: usize) -> Result<usize, DomainError> {
        while let Some(doc) = self.docs.get(self.next_doc) {
            if doc.start < i {
                return Err(DomainError::DocOutOfOrder {
                    start: doc.start,
                    cursor: i,
                });
            }
            if doc.start != i {
                break;
            }
            if self.seeded {
                self.seeded = false;
            } else {
                self.current.doc_html.push_str(&doc.data);
            }
            i = doc.end;
            self.next_doc += 1;
        }
        Ok(i)
    }

    /// Pass over annotations left behind on skipped line breaks.
    ///
    /// Zero-width anchors there are returned so they can open the code at `i`.
    fn take_skipped(&mut self, i: usize) -> Vec<&'a Annotation> {
        let annotations = self.annotations;
        let mut anchors = Vec::new();
        while let Some(annotation) = annotations
            .get(self.next_annotation)
            .filter(|annotation| annotation.span.start < i)
        {
            if annotation.span.is_empty() {
                anchors.push(annotation);
            }
            self.next_annotation += 1;
        }
        anchors
    }

    fn emit_code(&mut self, mut i: usize, run_to: usize) -> Result<usize, DomainError> {
        while i < run_to {
            let Some(annotation) = self
                .annotations
                .get(self.next_annotation)
                .filter(|annotation| annotation.span.start < run_to)
            else {
                self.current
                    .code_html
                    .push_str(&escape_bytes(&self.source[i..run_to]));
                return Ok(run_to);
            };

            let span = annotation.span;
            if span.start > i {
                self.current
                    .code_html
                    .push_str(&escape_bytes(&self.source[i..span.start]));
                i = span.start;
                continue;
            }
            if span.start < i {
                return Err(DomainError::AnnotationOverlap {
                    start: span.start,
                    cursor: i,
                });
            }
            if span.end > run_to {
                tracing::error!(
                    start = span.start,
                    end = span.end,
                    run_to,
                    text = %String::from_utf8_lossy(&self.source[span.start..span.end]),
                    "annotation crosses a doc comment"
                );
                return Err(DomainError::AnnotationStraddlesDoc {
                    start: span.start,
                    end: span.end,
                    run_to,
                });
            }

            let code = &mut self.current.code_html;
            code.push_str(&annotation.left);
            code.push_str(&escape_bytes(&self.source[span.start..span.end]));
            code.push_str(&annotation.right);
            i = span.end;
            self.next_annotation += 1;
        }
        Ok(i)
    }

    fn close(&mut self) {
        let mut segment = std::mem::take(&mut self.current);
        let trimmed = segment.code_html.trim_end_matches(['\n', '\r']).len();
        segment.code_html.truncate(trimmed);
        if !segment.is_empty() {
            self.segments.push(segment);
        }
    }
}
