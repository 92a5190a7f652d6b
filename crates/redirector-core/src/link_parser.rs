#[cfg(test)]
mod tests {
    use super::*;

    // === wikilinks ===

    #[test]
    fn extracts_simple_wikilink_with_span() {
        let result = extract_link_occurrences("See [[Foo]] here");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].original, "[[Foo]]");
        assert_eq!(result[0].target, "Foo");
        assert_eq!(result[0].span, Span::on_line(0, 4, 11));
        assert_eq!(result[0].kind, LinkKind::Wikilink);
        assert!(!result[0].embed);
    }

    #[test]
    fn returns_empty_for_no_links() {
        assert!(extract_link_occurrences("plain text").is_empty());
    }

    #[test]
    fn keeps_subpath_in_target_and_splits_alias() {
        let result = extract_link_occurrences("[[Foo#Section|Display]]");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target, "Foo#Section");
        assert_eq!(result[0].alias.as_deref(), Some("Display"));
        assert_eq!(result[0].original, "[[Foo#Section|Display]]");
    }

    #[test]
    fn ignores_empty_brackets_and_same_document_headings() {
        assert!(extract_link_occurrences("[[]] and [[#Heading]]").is_empty());
    }

    #[test]
    fn preserves_relative_segments() {
        let result = extract_link_occurrences("[[../Ideas]]");
        assert_eq!(result[0].target, "../Ideas");
    }

    #[test]
    fn ignores_links_in_code_blocks() {
        let markdown = "```\n[[CodeLink]]\n```\nOutside [[RealLink]]";
        let result = extract_link_occurrences(markdown);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target, "RealLink");
        assert_eq!(result[0].span, Span::on_line(3, 8, 20));
    }

    #[test]
    fn ignores_links_in_inline_code() {
        let result = extract_link_occurrences("See `[[Fake]]` but [[Real]]");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target, "Real");
    }

    #[test]
    fn embeds_follow_inline_links() {
        let result = extract_link_occurrences("![[pic.png]]\n[[Note]]");
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].original, "[[Note]]");
        assert_eq!(result[1].original, "![[pic.png]]");
        assert!(result[1].embed);
        assert_eq!(result[1].span, Span::on_line(0, 0, 12));
    }

    // === markdown links ===

    #[test]
    fn extracts_markdown_link_and_decodes_target() {
        let result = extract_link_occurrences("Read [the notes](My%20Notes.md#Part) now");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kind, LinkKind::Markdown);
        assert_eq!(result[0].target, "My Notes.md#Part");
        assert_eq!(result[0].alias.as_deref(), Some("the notes"));
        assert_eq!(result[0].original, "[the notes](My%20Notes.md#Part)");
        assert_eq!(result[0].span, Span::on_line(0, 5, 36));
    }

    #[test]
    fn angle_bracket_markdown_target() {
        let result = extract_link_occurrences("[x](<Sub Dir/Note.md>)");
        assert_eq!(result[0].target, "Sub Dir/Note.md");
    }

    #[test]
    fn skips_external_markdown_links() {
        let markdown = "[site](https://example.com) [mail](mailto:a@b.c) [local](Local.md)";
        let result = extract_link_occurrences(markdown);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].target, "Local.md");
    }

    #[test]
    fn markdown_image_is_embed() {
        let result = extract_link_occurrences("![](assets/pic.png)");
        assert_eq!(result.len(), 1);
        assert!(result[0].embed);
        assert_eq!(result[0].alias, None);
    }

    // === positions ===

    #[test]
    fn columns_count_characters_not_bytes() {
        let result = extract_link_occurrences("héllo wörld [[Ünï]]");
        assert_eq!(result[0].span, Span::on_line(0, 12, 19));
    }

    #[test]
    fn positions_after_crlf_lines() {
        let result = extract_link_occurrences("first\r\nsecond [[B]]\r\n");
        assert_eq!(result[0].span, Span::on_line(1, 7, 12));
    }

    #[test]
    fn multiple_occurrences_keep_document_order() {
        let result = extract_link_occurrences("[[A]] then [[B]]\n[c](C.md)");
        let targets: Vec<&str> = result.iter().map(|o| o.target.as_str()).collect();
        assert_eq!(targets, vec!["A", "B", "C.md"]);
        assert_eq!(result[1].span, Span::on_line(0, 11, 16));
        assert_eq!(result[2].span, Span::on_line(1, 0, 9));
    }
}

use crate::link::{LinkKind, LinkOccurrence, Position, Span};
use regex::Regex;
use std::sync::LazyLock;

// Compile regex once, reuse across calls
static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[\[([^\[\]\n]+)\]\]").unwrap()
});

static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(!?)\[([^\[\]\n]*)\]\((<[^<>\n]+>|[^()\s]+)\)").unwrap()
});

static URL_SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap()
});

static FENCED_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[^\n]*\n.*?```|~~~[^\n]*\n.*?~~~").unwrap()
});

static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`[^`]*`").unwrap()
});

/// Build a set of byte ranges that are inside code blocks or inline code.
fn build_excluded_ranges(markdown: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    for m in FENCED_CODE_RE.find_iter(markdown) {
        ranges.push((m.start(), m.end()));
    }
    for m in INLINE_CODE_RE.find_iter(markdown) {
        ranges.push((m.start(), m.end()));
    }
    ranges
}

/// Returns true if the byte offset falls within any excluded range.
fn is_excluded(offset: usize, excluded: &[(usize, usize)]) -> bool {
    excluded.iter().any(|&(start, end)| offset >= start && offset < end)
}

/// Maps byte offsets to (line, character column) positions.
///
/// Lines break after every `\n`, so a `\r\n` terminator never shows up inside
/// a line, matching [`crate::line_split::split_lines`] with default separators.
struct LineTable {
    starts: Vec<usize>,
}

impl LineTable {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn position(&self, text: &str, offset: usize) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset) - 1;
        let col = text[self.starts[line]..offset].chars().count();
        Position { line, col }
    }
}

/// Split the inside of `[[...]]` into (raw target, alias).
/// Returns None when the link has no path (`[[#Heading]]`, `[[ ]]`).
fn parse_wikilink_content(content: &str) -> Option<(String, Option<String>)> {
    let (target, alias) = match content.find('|') {
        Some(pipe_idx) => (&content[..pipe_idx], Some(content[pipe_idx + 1..].trim())),
        None => (content, None),
    };
    let target = target.trim();
    let path = target.split('#').next().unwrap_or_default().trim();
    if path.is_empty() {
        return None;
    }
    Some((target.to_string(), alias.map(str::to_string)))
}

/// Normalize a markdown link destination into a raw target, or None for
/// external URLs and same-document anchors.
fn parse_markdown_destination(destination: &str) -> Option<String> {
    let destination = destination
        .strip_prefix('<')
        .and_then(|d| d.strip_suffix('>'))
        .unwrap_or(destination);
    if URL_SCHEME_RE.is_match(destination) || destination.starts_with('#') {
        return None;
    }
    let decoded = urlencoding::decode(destination)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| destination.to_string());
    Some(decoded)
}

/// Extract internal link occurrences from markdown text.
///
/// Returns wikilinks and markdown links with their exact source text and
/// line/column span. Inline links come first, then embeds, each group in
/// document order. Links inside code blocks or inline code and links to
/// external URLs are skipped.
pub fn extract_link_occurrences(markdown: &str) -> Vec<LinkOccurrence> {
    let excluded = build_excluded_ranges(markdown);
    let lines = LineTable::new(markdown);
    let mut found: Vec<(usize, LinkOccurrence)> = Vec::new();
    let mut wikilink_ranges: Vec<(usize, usize)> = Vec::new();

    for cap in WIKILINK_RE.captures_iter(markdown) {
        let Some(full_match) = cap.get(0) else { continue };
        if is_excluded(full_match.start(), &excluded) {
            continue;
        }
        wikilink_ranges.push((full_match.start(), full_match.end()));

        let Some((target, alias)) = parse_wikilink_content(&cap[2]) else {
            continue;
        };
        found.push((
            full_match.start(),
            LinkOccurrence {
                original: full_match.as_str().to_string(),
                target,
                span: Span {
                    start: lines.position(markdown, full_match.start()),
                    end: lines.position(markdown, full_match.end()),
                },
                kind: LinkKind::Wikilink,
                embed: !cap[1].is_empty(),
                alias,
            },
        ));
    }

    for cap in MARKDOWN_LINK_RE.captures_iter(markdown) {
        let Some(full_match) = cap.get(0) else { continue };
        if is_excluded(full_match.start(), &excluded)
            || is_excluded(full_match.start(), &wikilink_ranges)
        {
            continue;
        }
        let Some(target) = parse_markdown_destination(&cap[3]) else {
            continue;
        };
        if target.split('#').next().unwrap_or_default().trim().is_empty() {
            continue;
        }
        let text = &cap[2];
        found.push((
            full_match.start(),
            LinkOccurrence {
                original: full_match.as_str().to_string(),
                target,
                span: Span {
                    start: lines.position(markdown, full_match.start()),
                    end: lines.position(markdown, full_match.end()),
                },
                kind: LinkKind::Markdown,
                embed: !cap[1].is_empty(),
                alias: (!text.is_empty()).then(|| text.to_string()),
            },
        ));
    }

    found.sort_by_key(|(offset, _)| *offset);
    let (links, embeds): (Vec<_>, Vec<_>) = found
        .into_iter()
        .map(|(_, occurrence)| occurrence)
        .partition(|occurrence| !occurrence.embed);

    links.into_iter().chain(embeds).collect()
}
