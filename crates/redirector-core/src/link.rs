use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in the line-split representation of a document.
///
/// `col` counts characters (not bytes) from the start of `line`.
/// Positions order by line first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Half-open `[start, end)` range. A well-formed span never crosses a line boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn on_line(line: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start: Position { line, col: start_col },
            end: Position { line, col: end_col },
        }
    }

    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Syntax a link was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// `[[Target#Sub|Alias]]`
    Wikilink,
    /// `[Alias](Target#Sub)`
    Markdown,
}

/// One link written inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence {
    /// Exact source text, e.g. `[[Foo|bar]]`.
    pub original: String,
    /// Raw target as written: link path plus any `#subpath`, never the alias.
    pub target: String,
    pub span: Span,
    pub kind: LinkKind,
    /// Written with a leading `!`.
    pub embed: bool,
    pub alias: Option<String>,
}

impl LinkOccurrence {
    /// Plain wikilink occurrence; mostly useful for hosts and tests that
    /// don't track aliases.
    pub fn wikilink(original: impl Into<String>, target: impl Into<String>, span: Span) -> Self {
        let original = original.into();
        Self {
            embed: original.starts_with('!'),
            original,
            target: target.into(),
            span,
            kind: LinkKind::Wikilink,
            alias: None,
        }
    }

    /// The link path without any `#subpath`.
    pub fn link_path(&self) -> &str {
        match self.target.find('#') {
            Some(idx) => &self.target[..idx],
            None => &self.target,
        }
    }

    /// The `#subpath` portion (heading or block reference), including the `#`.
    pub fn subpath(&self) -> Option<&str> {
        self.target.find('#').map(|idx| &self.target[idx..])
    }
}

/// Opaque handle for a document, supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A host document as seen by the engine: identity plus vault path.
/// Text is only ever reached through the store's transactional update.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Document {
    pub id: DocumentId,
    /// Vault-relative path, e.g. `Notes/Ideas.md`.
    pub path: String,
}

impl Document {
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            path: path.into(),
        }
    }
}

/// Occurrences of one target written with the same source text, and the text
/// that replaces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkVariant {
    /// First-seen occurrence written this way.
    pub occurrence: LinkOccurrence,
    /// Later occurrences with identical source text.
    pub duplicates: Vec<LinkOccurrence>,
    pub fresh_text: String,
}

/// A link occurrence whose text differs from the canonical text for its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLinkRewrite {
    /// First-seen occurrence for this raw target that needs rewriting.
    pub occurrence: LinkOccurrence,
    /// Later occurrences with the same raw target and identical source text.
    pub duplicates: Vec<LinkOccurrence>,
    pub target: DocumentId,
    pub fresh_text: String,
    /// Same-target occurrences written differently (another alias or syntax),
    /// each with its own fresh text.
    pub variants: Vec<LinkVariant>,
}

impl ResolvedLinkRewrite {
    /// Every occurrence written like `occurrence`, first-seen first.
    pub fn occurrences(&self) -> impl Iterator<Item = &LinkOccurrence> {
        std::iter::once(&self.occurrence).chain(self.duplicates.iter())
    }

    /// Every substitution this rewrite performs, as (occurrence, fresh text).
    pub fn edits(&self) -> impl Iterator<Item = (&LinkOccurrence, &str)> {
        let primary = self
            .occurrences()
            .map(move |occurrence| (occurrence, self.fresh_text.as_str()));
        let variants = self.variants.iter().flat_map(|variant| {
            std::iter::once(&variant.occurrence)
                .chain(variant.duplicates.iter())
                .map(move |occurrence| (occurrence, variant.fresh_text.as_str()))
        });
        primary.chain(variants)
    }
}
