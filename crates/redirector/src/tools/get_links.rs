use crate::fs_vault::FsVault;
use anyhow::{anyhow, Result};
use redirector_core::host::LinkTextGenerator;
use redirector_core::link_parser::extract_link_occurrences;
use redirector_core::link_text::{LinkTextOptions, LinkTextPolicy};
use redirector_core::{LinkKind, Span};
use serde::Serialize;

/// One link of the inspected document.
#[derive(Debug, Serialize)]
pub struct LinkReport {
    pub span: Span,
    pub original: String,
    pub target: String,
    pub kind: LinkKind,
    pub embed: bool,
    /// Vault path of the linked file, `None` when dangling.
    pub resolved: Option<String>,
    /// Text `format-links` would write, `None` when dangling.
    pub canonical: Option<String>,
    /// Resolved, but `original` differs from `canonical`, so `format-links`
    /// would rewrite it.
    pub stale: bool,
}

/// Execute `links <path>`: list the links of one document with their
/// resolution and canonical text.
pub async fn execute(vault: &FsVault, links: &LinkTextOptions, file_path: &str, json: bool) -> Result<String> {
    let document = vault
        .document(file_path)
        .ok_or_else(|| anyhow!("Document not found: {}", file_path))?;
    let text = vault.read(&document).await?;
    let policy = LinkTextPolicy::new(vault.resolver().clone(), links.clone());

    let mut reports = Vec::new();
    for occurrence in extract_link_occurrences(&text) {
        let target = vault.resolver().resolve_link(&occurrence.target, &document.path);
        let canonical = match &target {
            Some(entry) => Some(policy.generate(&entry.id, &document.path, &occurrence).await?),
            None => None,
        };
        reports.push(LinkReport {
            stale: canonical.as_deref().is_some_and(|c| c != occurrence.original),
            span: occurrence.span,
            original: occurrence.original,
            target: occurrence.target,
            kind: occurrence.kind,
            embed: occurrence.embed,
            resolved: target.map(|entry| entry.path),
            canonical,
        });
    }
    reports.sort_by_key(|report| report.span.start);

    if json {
        return Ok(serde_json::to_string_pretty(&reports)?);
    }
    Ok(render(&document.path, &reports))
}

fn render(path: &str, reports: &[LinkReport]) -> String {
    let mut output = format!("Links in {}:\n", path);
    if reports.is_empty() {
        output.push_str("- (none)\n");
        return output;
    }

    for report in reports {
        let resolution = match (&report.resolved, &report.canonical) {
            (Some(resolved), Some(canonical)) if *canonical == report.original => {
                format!("{} (canonical)", resolved)
            }
            (Some(resolved), Some(canonical)) => format!("{}, rewrite to {}", resolved, canonical),
            _ => "(unresolved)".to_string(),
        };
        output.push_str(&format!("- {} {} -> {}", report.span, report.original, resolution));
        if report.stale {
            output.push_str(" [stale]");
        }
        output.push('\n');
    }
    output
}
