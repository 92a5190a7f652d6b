use crate::config::RedirectorConfig;
use crate::fs_vault::FsVault;
use anyhow::Result;
use redirector_core::link_text::LinkTextPolicy;
use redirector_core::{FormatOptions, FormatReport, LinkFormatter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Execute `format-links`: rewrite every link in the vault to its canonical
/// text and return the summary to print.
pub async fn execute(
    vault: Arc<FsVault>,
    config: &RedirectorConfig,
    dry_run: bool,
    json: bool,
    cancel: CancellationToken,
) -> Result<String> {
    let policy = Arc::new(LinkTextPolicy::new(vault.resolver().clone(), config.links.clone()));
    let options = FormatOptions {
        line_ending: config.output.line_ending,
        dry_run,
    };
    let formatter = LinkFormatter::from_vault(vault, policy, options).with_cancellation(cancel);

    let report = formatter.format_links().await?;
    if json {
        return Ok(serde_json::to_string_pretty(&report)?);
    }
    Ok(summary(&report, dry_run))
}

fn summary(report: &FormatReport, dry_run: bool) -> String {
    let mut output = if dry_run {
        format!("dry run, {} files would change", report.documents_changed)
    } else {
        format!("format finished, {} files are changed", report.documents_changed)
    };

    output.push_str(&format!(
        "\n{} documents scanned, {} links rewritten",
        report.documents_scanned, report.links_rewritten
    ));
    if report.stale_skipped > 0 {
        output.push_str(&format!(", {} stale links skipped", report.stale_skipped));
    }
    if report.documents_failed > 0 {
        output.push_str(&format!(", {} documents failed", report.documents_failed));
    }
    if report.cancelled {
        output.push_str("\ncancelled before all documents were processed");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use tempfile::TempDir;

    fn vault_with(files: &[(&str, &str)]) -> (TempDir, Arc<FsVault>) {
        let dir = TempDir::new().unwrap();
        for (path, text) in files {
            let full = dir.path().join(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, text).unwrap();
        }
        let vault = Arc::new(FsVault::open(dir.path(), &VaultConfig::default()).unwrap());
        (dir, vault)
    }

    #[test]
    fn summary_mentions_only_nonzero_extras() {
        let report = FormatReport {
            documents_scanned: 3,
            documents_changed: 1,
            links_rewritten: 2,
            ..FormatReport::default()
        };
        assert_eq!(
            summary(&report, false),
            "format finished, 1 files are changed\n3 documents scanned, 2 links rewritten"
        );

        let report = FormatReport {
            stale_skipped: 1,
            documents_failed: 2,
            cancelled: true,
            ..report
        };
        let text = summary(&report, true);
        assert!(text.starts_with("dry run, 1 files would change"));
        assert!(text.contains("1 stale links skipped, 2 documents failed"));
        assert!(text.ends_with("cancelled before all documents were processed"));
    }

    #[tokio::test]
    async fn dry_run_leaves_files_alone() {
        let (dir, vault) = vault_with(&[("A.md", "[[Deep/B]]"), ("Deep/B.md", "")]);
        let output = execute(vault, &RedirectorConfig::default(), true, false, CancellationToken::new())
            .await
            .unwrap();

        assert!(output.starts_with("dry run, 1 files would change"));
        assert_eq!(std::fs::read_to_string(dir.path().join("A.md")).unwrap(), "[[Deep/B]]");
    }

    #[tokio::test]
    async fn json_output_is_the_report() {
        let (dir, vault) = vault_with(&[("A.md", "[[Deep/B]]"), ("Deep/B.md", "")]);
        let output = execute(vault, &RedirectorConfig::default(), false, true, CancellationToken::new())
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["documents_changed"], 1);
        assert_eq!(value["links_rewritten"], 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("A.md")).unwrap(), "[[B]]");
    }
}
