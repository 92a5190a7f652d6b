use crate::error::HostError;
use crate::host::DocumentStore;
use crate::line_split::{join_lines, split_lines, LineEnding, DEFAULT_LINE_SEPARATORS};
use crate::link::{Document, Span};
use crate::span_order::SpanEdit;

/// A substitution that was performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub span: Span,
    pub old_text: String,
    pub new_text: String,
}

/// An edit skipped because the text at its span was not the expected link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleEdit {
    pub span: Span,
    pub expected: String,
    /// Text found at the span, `None` when the span is out of range or
    /// crosses a line boundary.
    pub found: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Replacement text, present iff at least one edit applied.
    pub text: Option<String>,
    pub applied: Vec<AppliedEdit>,
    pub stale: Vec<StaleEdit>,
}

impl RewriteOutcome {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Byte range of `[span.start.col, span.end.col)` within `line`.
fn locate(line: &str, span: &Span) -> Option<(usize, usize)> {
    if !span.is_single_line() || span.start.col > span.end.col {
        return None;
    }
    let byte_at = |col: usize| {
        line.char_indices()
            .map(|(idx, _)| idx)
            .chain(std::iter::once(line.len()))
            .nth(col)
    };
    Some((byte_at(span.start.col)?, byte_at(span.end.col)?))
}

/// Apply `edits` (ordered tail to head) to `text`.
///
/// Each edit is verified against the text actually found at its span; a
/// mismatch skips that edit only. Lines are rejoined with `join_separator`,
/// which normalizes every terminator in the document.
pub fn apply_edits(
    text: &str,
    edits: &[SpanEdit<'_>],
    separators: &[&str],
    join_separator: &str,
) -> RewriteOutcome {
    let mut lines = split_lines(text, separators, false);
    let mut outcome = RewriteOutcome::default();

    for edit in edits {
        let span = edit.span();
        let expected = &edit.occurrence.original;

        let found = lines
            .get(span.start.line)
            .and_then(|line| locate(line, &span).map(|(start, end)| (line, start, end)));
        let Some((line, start, end)) = found else {
            outcome.stale.push(StaleEdit {
                span,
                expected: expected.clone(),
                found: None,
            });
            continue;
        };

        if &line[start..end] != expected.as_str() {
            outcome.stale.push(StaleEdit {
                span,
                expected: expected.clone(),
                found: Some(line[start..end].to_string()),
            });
            continue;
        }

        let new_line = format!("{}{}{}", &line[..start], edit.fresh_text, &line[end..]);
        lines[span.start.line] = new_line;
        outcome.applied.push(AppliedEdit {
            span,
            old_text: expected.clone(),
            new_text: edit.fresh_text.to_string(),
        });
    }

    if !outcome.applied.is_empty() {
        outcome.text = Some(join_lines(&lines, join_separator));
    }
    outcome
}

/// Rewrite one document through the store's transactional update.
///
/// The edits are applied to the text the store hands over at write time, so
/// offsets that went stale since discovery are caught here. The document is
/// written only when at least one edit applied, and never when `dry_run` is set.
pub async fn rewrite_document(
    store: &dyn DocumentStore,
    document: &Document,
    edits: &[SpanEdit<'_>],
    line_ending: LineEnding,
    dry_run: bool,
) -> Result<RewriteOutcome, HostError> {
    let mut outcome = RewriteOutcome::default();
    {
        let mut transform = |content: &str| {
            outcome = apply_edits(content, edits, &DEFAULT_LINE_SEPARATORS, line_ending.as_str());
            if dry_run {
                None
            } else {
                outcome.text.clone()
            }
        };
        store.update(document, &mut transform).await?;
    }

    for stale in &outcome.stale {
        tracing::warn!(
            "{}: can not locate link at {}, expected {:?}, found {:?}",
            document.path,
            stale.span,
            stale.expected,
            stale.found.as_deref().unwrap_or("<out of range>")
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkOccurrence;

    fn occ(original: &str, line: usize, col: usize) -> LinkOccurrence {
        LinkOccurrence::wikilink(original, "t", Span::on_line(line, col, col + original.chars().count()))
    }

    fn apply(text: &str, edits: &[SpanEdit<'_>]) -> RewriteOutcome {
        apply_edits(text, edits, &DEFAULT_LINE_SEPARATORS, "\n")
    }

    #[test]
    fn replaces_single_link_keeping_surrounding_text() {
        let link = occ("[[A]]", 0, 4);
        let edits = [SpanEdit { occurrence: &link, fresh_text: "[[Alpha]]" }];
        let outcome = apply("See [[A]] here.", &edits);
        assert_eq!(outcome.text.as_deref(), Some("See [[Alpha]] here."));
        assert_eq!(outcome.applied_count(), 1);
        assert!(outcome.stale.is_empty());
    }

    #[test]
    fn tail_to_head_edits_on_one_line() {
        let first = occ("[[A]]", 0, 4);
        let second = occ("[[A]]", 0, 14);
        let edits = [
            SpanEdit { occurrence: &second, fresh_text: "[[Alpha]]" },
            SpanEdit { occurrence: &first, fresh_text: "[[Alpha]]" },
        ];
        let outcome = apply("See [[A]] and [[A]] here.", &edits);
        assert_eq!(outcome.text.as_deref(), Some("See [[Alpha]] and [[Alpha]] here."));
        assert_eq!(outcome.applied_count(), 2);
    }

    #[test]
    fn stale_edit_is_skipped_and_others_apply() {
        let stale = occ("[[Gone]]", 0, 0);
        let good = occ("[[B]]", 1, 2);
        let edits = [
            SpanEdit { occurrence: &good, fresh_text: "[[Beta]]" },
            SpanEdit { occurrence: &stale, fresh_text: "[[Whatever]]" },
        ];
        let outcome = apply("[[Here]] now\n- [[B]]", &edits);
        assert_eq!(outcome.text.as_deref(), Some("[[Here]] now\n- [[Beta]]"));
        assert_eq!(outcome.applied_count(), 1);
        assert_eq!(outcome.stale.len(), 1);
        assert_eq!(outcome.stale[0].found.as_deref(), Some("[[Here]]"));
    }

    #[test]
    fn all_stale_produces_no_text() {
        let link = occ("[[A]]", 3, 0);
        let edits = [SpanEdit { occurrence: &link, fresh_text: "[[Alpha]]" }];
        let outcome = apply("only one line", &edits);
        assert_eq!(outcome.text, None);
        assert_eq!(outcome.applied_count(), 0);
        assert_eq!(outcome.stale[0].found, None);
    }

    #[test]
    fn column_past_line_end_is_stale() {
        let link = occ("[[A]]", 0, 8);
        let edits = [SpanEdit { occurrence: &link, fresh_text: "[[Alpha]]" }];
        let outcome = apply("short", &edits);
        assert_eq!(outcome.applied_count(), 0);
        assert_eq!(outcome.stale.len(), 1);
    }

    #[test]
    fn multi_line_span_is_stale() {
        let mut link = occ("[[A]]", 0, 0);
        link.span.end.line = 1;
        let edits = [SpanEdit { occurrence: &link, fresh_text: "[[Alpha]]" }];
        let outcome = apply("[[A]]\n[[A]]", &edits);
        assert_eq!(outcome.applied_count(), 0);
        assert_eq!(outcome.stale.len(), 1);
    }

    #[test]
    fn columns_are_characters() {
        let link = occ("[[Ü]]", 0, 6);
        let edits = [SpanEdit { occurrence: &link, fresh_text: "[[Über]]" }];
        let outcome = apply("héllo [[Ü]] ✓", &edits);
        assert_eq!(outcome.text.as_deref(), Some("héllo [[Über]] ✓"));
    }

    #[test]
    fn rewrite_normalizes_line_endings() {
        let link = occ("[[A]]", 1, 0);
        let edits = [SpanEdit { occurrence: &link, fresh_text: "[[Alpha]]" }];
        let outcome = apply("top\r\n[[A]]\r\nend\n", &edits);
        assert_eq!(outcome.text.as_deref(), Some("top\n[[Alpha]]\nend\n"));

        let crlf = apply_edits("top\n[[A]]\n", &edits, &DEFAULT_LINE_SEPARATORS, "\r\n");
        assert_eq!(crlf.text.as_deref(), Some("top\r\n[[Alpha]]\r\n"));
    }
}
