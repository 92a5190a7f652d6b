use crate::error::{Error, Result};
use crate::host::{DocumentStore, LinkIndex, LinkResolver, LinkTextGenerator};
use crate::line_split::LineEnding;
use crate::link::Document;
use crate::rewrite_plan::collect_rewrites;
use crate::rewriter::{rewrite_document, RewriteOutcome};
use crate::span_order::sort_tail_to_head;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Terminator used when a rewritten document is reassembled.
    pub line_ending: LineEnding,
    /// Run the whole pipeline but never write.
    pub dry_run: bool,
}

/// Summary of one `format_links` batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatReport {
    pub documents_scanned: usize,
    /// Documents with at least one applied edit (would-be changes in dry-run).
    pub documents_changed: usize,
    pub links_rewritten: usize,
    pub stale_skipped: usize,
    pub documents_failed: usize,
    /// The batch stopped early because its cancellation token fired.
    pub cancelled: bool,
}

/// Rewrites every link in a vault to its canonical text.
///
/// Documents are processed one at a time in store order. Per-document
/// failures are logged and counted; only an enumeration failure or a store
/// the host reports as unusable ends the batch with an error.
pub struct LinkFormatter {
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn LinkIndex>,
    resolver: Arc<dyn LinkResolver>,
    generator: Arc<dyn LinkTextGenerator>,
    options: FormatOptions,
    cancel: CancellationToken,
}

impl LinkFormatter {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn LinkIndex>,
        resolver: Arc<dyn LinkResolver>,
        generator: Arc<dyn LinkTextGenerator>,
        options: FormatOptions,
    ) -> Self {
        Self {
            store,
            index,
            resolver,
            generator,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Build a formatter over a host that is its own store, index and resolver.
    pub fn from_vault<V>(vault: Arc<V>, generator: Arc<dyn LinkTextGenerator>, options: FormatOptions) -> Self
    where
        V: DocumentStore + LinkIndex + LinkResolver + 'static,
    {
        Self::new(vault.clone(), vault.clone(), vault, generator, options)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    /// Rewrite the links of one document.
    ///
    /// Overlapping rewrites fail the document before anything is written.
    pub async fn format_document(&self, document: &Document) -> Result<RewriteOutcome> {
        let rewrites = collect_rewrites(
            document,
            self.index.as_ref(),
            self.resolver.as_ref(),
            self.generator.as_ref(),
        )
        .await?;
        if rewrites.is_empty() {
            return Ok(RewriteOutcome::default());
        }

        let edits = sort_tail_to_head(&rewrites).map_err(|conflict| Error::ConflictingSpans {
            path: document.path.clone(),
            first: conflict.first,
            second: conflict.second,
        })?;

        let outcome = rewrite_document(
            self.store.as_ref(),
            document,
            &edits,
            self.options.line_ending,
            self.options.dry_run,
        )
        .await?;

        if outcome.applied_count() > 0 {
            let changes: Vec<String> = outcome
                .applied
                .iter()
                .rev()
                .map(|edit| format!("{} -> {}", edit.old_text, edit.new_text))
                .collect();
            tracing::info!(
                "{}{}: {}",
                if self.options.dry_run { "[dry-run] " } else { "" },
                document.path,
                changes.join(", ")
            );
        }

        Ok(outcome)
    }

    /// Format every document in the store.
    pub async fn format_links(&self) -> Result<FormatReport> {
        let documents = self.store.documents().await.map_err(Error::Enumerate)?;
        tracing::info!("Formatting links in {} documents", documents.len());

        let mut report = FormatReport::default();
        for document in &documents {
            if self.cancel.is_cancelled() {
                tracing::info!(
                    "Cancelled after {} of {} documents",
                    report.documents_scanned,
                    documents.len()
                );
                report.cancelled = true;
                break;
            }
            report.documents_scanned += 1;

            match self.format_document(document).await {
                Ok(outcome) => {
                    report.links_rewritten += outcome.applied_count();
                    report.stale_skipped += outcome.stale.len();
                    if outcome.applied_count() > 0 {
                        report.documents_changed += 1;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!("{}: skipped, {}", document.path, e);
                    report.documents_failed += 1;
                }
                Err(e) => {
                    tracing::error!("Aborting link format at {}: {}", document.path, e);
                    return Err(e);
                }
            }
        }

        tracing::info!("format finished, {} files are changed", report.documents_changed);
        Ok(report)
    }
}
