use crate::link::{LinkOccurrence, ResolvedLinkRewrite, Span};
use std::cmp::Ordering;

/// One substitution to perform: replace `occurrence.original` at
/// `occurrence.span` with `fresh_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanEdit<'a> {
    pub occurrence: &'a LinkOccurrence,
    pub fresh_text: &'a str,
}

impl SpanEdit<'_> {
    pub fn span(&self) -> Span {
        self.occurrence.span
    }
}

/// Two pending edits whose spans overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{first} overlaps {second}")]
pub struct SpanConflict {
    pub first: Span,
    pub second: Span,
}

/// Order two spans for tail-to-head rewriting.
///
/// `Less` means `a` is closer to the document end and goes first. `None`
/// means the spans overlap and cannot both be rewritten.
pub fn compare_spans(a: &Span, b: &Span) -> Option<Ordering> {
    if a.start >= b.end {
        Some(Ordering::Less)
    } else if b.start >= a.end {
        Some(Ordering::Greater)
    } else {
        None
    }
}

/// Expand rewrites into edits ordered from the document end toward its start.
///
/// Rewriting in this order keeps the recorded offsets of every pending edit
/// valid, since only text at or after an edit changes length before it runs.
pub fn sort_tail_to_head(rewrites: &[ResolvedLinkRewrite]) -> Result<Vec<SpanEdit<'_>>, SpanConflict> {
    let mut edits: Vec<SpanEdit<'_>> = rewrites
        .iter()
        .flat_map(|rewrite| rewrite.edits())
        .map(|(occurrence, fresh_text)| SpanEdit { occurrence, fresh_text })
        .collect();

    edits.sort_by(|a, b| {
        b.span()
            .start
            .cmp(&a.span().start)
            .then_with(|| b.span().end.cmp(&a.span().end))
    });

    // Starts only decrease along the list, so once an earlier edit starts at or
    // after this one's end, every edit before it does too.
    for (j, edit) in edits.iter().enumerate() {
        let current = edit.span();
        for earlier in edits[..j].iter().rev() {
            let later = earlier.span();
            if later.start >= current.end {
                break;
            }
            if compare_spans(&later, &current).is_none() {
                return Err(SpanConflict {
                    first: current,
                    second: later,
                });
            }
        }
    }

    Ok(edits)
}
