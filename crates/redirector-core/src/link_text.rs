use crate::doc_resolver::{has_markdown_extension, DocumentResolver};
use crate::error::HostError;
use crate::host::LinkTextGenerator;
use crate::link::{DocumentId, LinkKind, LinkOccurrence};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the path inside a generated link is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkFormat {
    /// File name alone when it is unique in the vault, full vault path otherwise.
    #[default]
    Shortest,
    /// Path relative to the referencing document.
    Relative,
    /// Full vault path.
    Absolute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkTextOptions {
    pub format: LinkFormat,
    /// Keep the display text of `[[Target|alias]]` and `[alias](Target.md)`.
    pub preserve_alias: bool,
    /// Keep `#heading` and `#^block` references.
    pub preserve_subpath: bool,
}

impl Default for LinkTextOptions {
    fn default() -> Self {
        Self {
            format: LinkFormat::Shortest,
            preserve_alias: true,
            preserve_subpath: true,
        }
    }
}

/// Compute the path that reaches `target_path` from the document at `source_path`.
///
/// Both paths are vault paths with extension. Examples:
/// - `("Getting Started.md", "Archive/Welcome.md")` → `"Archive/Welcome.md"`
/// - `("Notes/Ideas.md", "Archive/Welcome.md")` → `"../Archive/Welcome.md"`
/// - `("Notes/Ideas.md", "Notes/Welcome.md")` → `"Welcome.md"`
pub fn compute_relative_link(source_path: &str, target_path: &str) -> String {
    let source_dir = &source_path[..source_path.rfind('/').unwrap_or(0)];
    let source_segments: Vec<&str> = source_dir.split('/').filter(|s| !s.is_empty()).collect();
    let target_segments: Vec<&str> = target_path.split('/').filter(|s| !s.is_empty()).collect();

    // Never consume the file name itself as a shared directory
    let max_common = target_segments.len().saturating_sub(1);
    let common_len = source_segments
        .iter()
        .zip(target_segments.iter())
        .take(max_common)
        .take_while(|(a, b)| a.to_lowercase() == b.to_lowercase())
        .count();

    let ups = source_segments.len() - common_len;
    let mut parts: Vec<&str> = vec![".."; ups];
    parts.extend_from_slice(&target_segments[common_len..]);
    parts.join("/")
}

fn strip_markdown_extension(path: &str) -> &str {
    if has_markdown_extension(path) {
        &path[..path.len() - 3]
    } else {
        path
    }
}

/// Wikilinks drop the `.md` extension, markdown destinations keep it.
fn written_path(path: &str, kind: LinkKind) -> &str {
    match kind {
        LinkKind::Wikilink => strip_markdown_extension(path),
        LinkKind::Markdown => path,
    }
}

fn file_stem(path: &str) -> &str {
    strip_markdown_extension(path.rsplit('/').next().unwrap_or(path))
}

/// Markdown link destinations may not contain raw spaces.
fn encode_destination(path: &str) -> String {
    path.replace(' ', "%20")
}

/// Canonical link text generator backed by a [`DocumentResolver`].
///
/// Keeps each occurrence's syntax (wikilink or markdown, embed or not) and,
/// depending on [`LinkTextOptions`], its alias and subpath.
pub struct LinkTextPolicy {
    resolver: Arc<DocumentResolver>,
    options: LinkTextOptions,
}

impl LinkTextPolicy {
    pub fn new(resolver: Arc<DocumentResolver>, options: LinkTextOptions) -> Self {
        Self { resolver, options }
    }

    /// Path portion of a link from `referencing_path` to `target_path`, as
    /// written for a link of `kind`.
    ///
    /// The format's preferred path is used when it resolves back to
    /// `target_path` from the referencing document. Otherwise the link is
    /// anchored at the vault root (`/a/Note`), which always resolves there.
    pub fn link_path(&self, target_path: &str, referencing_path: &str, kind: LinkKind) -> String {
        let anchored = format!("/{}", target_path);
        let candidates = match self.options.format {
            LinkFormat::Shortest => {
                let name = target_path.rsplit('/').next().unwrap_or(target_path);
                let mut candidates = Vec::with_capacity(2);
                if self.resolver.count_file_name(name) == 1 {
                    candidates.push(name.to_string());
                }
                candidates.push(target_path.to_string());
                candidates
            }
            LinkFormat::Relative => vec![compute_relative_link(referencing_path, target_path)],
            LinkFormat::Absolute => vec![target_path.to_string()],
        };

        candidates
            .into_iter()
            .map(|path| written_path(&path, kind).to_string())
            .find(|written| self.resolves_to(written, referencing_path, target_path))
            .unwrap_or_else(|| written_path(&anchored, kind).to_string())
    }

    fn resolves_to(&self, written: &str, referencing_path: &str, target_path: &str) -> bool {
        self.resolver
            .resolve_link(written, referencing_path)
            .is_some_and(|entry| entry.path == target_path)
    }

    /// Render the full link text for `occurrence` pointing at `target_path`.
    pub fn render(&self, target_path: &str, referencing_path: &str, occurrence: &LinkOccurrence) -> String {
        let path = self.link_path(target_path, referencing_path, occurrence.kind);
        let bang = if occurrence.embed { "!" } else { "" };
        let subpath = if self.options.preserve_subpath {
            occurrence.subpath().unwrap_or_default()
        } else {
            ""
        };
        let alias = if self.options.preserve_alias {
            occurrence.alias.as_deref()
        } else {
            None
        };

        match occurrence.kind {
            LinkKind::Wikilink => {
                let alias = alias.map(|a| format!("|{}", a)).unwrap_or_default();
                format!("{}[[{}{}{}]]", bang, path, subpath, alias)
            }
            LinkKind::Markdown => {
                let text = match alias {
                    Some(a) => a,
                    None if occurrence.embed => "",
                    None => file_stem(target_path),
                };
                format!(
                    "{}[{}]({}{})",
                    bang,
                    text,
                    encode_destination(&path),
                    encode_destination(subpath)
                )
            }
        }
    }
}

#[async_trait]
impl LinkTextGenerator for LinkTextPolicy {
    async fn generate(
        &self,
        target: &DocumentId,
        referencing_path: &str,
        occurrence: &LinkOccurrence,
    ) -> Result<String, HostError> {
        let target_path = self.resolver.path_for_id(target).ok_or_else(|| {
            HostError::failed("generate link text", anyhow::anyhow!("unknown document {}", target))
        })?;
        let referencing_path = self.resolver.normalize_path(referencing_path);
        Ok(self.render(&target_path, &referencing_path, occurrence))
    }
}
