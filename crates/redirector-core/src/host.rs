//! Narrow interfaces the engine consumes from its host.
//!
//! Every method is an await point; the engine never holds host state across
//! documents and never calls the host concurrently.

use crate::error::HostError;
use crate::link::{Document, DocumentId, LinkOccurrence};
use async_trait::async_trait;

/// Pure transform handed to [`DocumentStore::update`]. Receives the current
/// document text; `Some(text)` replaces it, `None` leaves it untouched.
pub type DocumentTransform<'a> = dyn FnMut(&str) -> Option<String> + Send + 'a;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All text-bearing documents of the tracked type, in store order.
    async fn documents(&self) -> Result<Vec<Document>, HostError>;

    /// Read-modify-write one document atomically. Returns whether a new text
    /// was written.
    async fn update(
        &self,
        document: &Document,
        transform: &mut DocumentTransform<'_>,
    ) -> Result<bool, HostError>;
}

#[async_trait]
pub trait LinkIndex: Send + Sync {
    /// Inline and embed occurrences of `document`; `None` when it has none.
    async fn occurrences(&self, document: &Document) -> Result<Option<Vec<LinkOccurrence>>, HostError>;
}

#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// Resolve a raw link target written in the document at `referencing_path`.
    /// `None` means the link is dangling.
    async fn resolve(&self, raw_target: &str, referencing_path: &str) -> Result<Option<DocumentId>, HostError>;
}

#[async_trait]
pub trait LinkTextGenerator: Send + Sync {
    /// Canonical text linking from `referencing_path` to `target`.
    ///
    /// `occurrence` is the link being replaced; a policy may use it to keep
    /// the author's syntax, alias or subpath, or ignore it entirely.
    async fn generate(
        &self,
        target: &DocumentId,
        referencing_path: &str,
        occurrence: &LinkOccurrence,
    ) -> Result<String, HostError>;
}
