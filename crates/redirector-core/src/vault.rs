use crate::doc_resolver::DocumentResolver;
use crate::error::HostError;
use crate::host::{DocumentStore, DocumentTransform, LinkIndex, LinkResolver};
use crate::link::{Document, DocumentId, LinkOccurrence};
use crate::link_parser::extract_link_occurrences;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory vault implementing every host trait except link text generation.
///
/// Any file can be registered (attachments are valid link targets), but only
/// markdown files are listed as documents. Links are indexed by parsing the
/// current text on demand.
pub struct MemoryVault {
    resolver: Arc<DocumentResolver>,
    texts: DashMap<DocumentId, String>,
    write_lock: Mutex<()>,
}

impl MemoryVault {
    pub fn new(resolver: Arc<DocumentResolver>) -> Self {
        Self {
            resolver,
            texts: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn resolver(&self) -> &Arc<DocumentResolver> {
        &self.resolver
    }

    /// Add or replace a file at `path`.
    pub fn insert(&self, id: impl Into<String>, path: &str, text: impl Into<String>) -> DocumentId {
        let id = DocumentId::new(id);
        self.resolver.upsert(id.clone(), path);
        self.texts.insert(id.clone(), text.into());
        id
    }

    pub fn text(&self, id: &DocumentId) -> Option<String> {
        self.texts.get(id).map(|text| text.value().clone())
    }

    /// Replace a file's text without going through the transactional update.
    pub fn set_text(&self, id: &DocumentId, text: impl Into<String>) {
        self.texts.insert(id.clone(), text.into());
    }
}

#[async_trait]
impl DocumentStore for MemoryVault {
    async fn documents(&self) -> Result<Vec<Document>, HostError> {
        Ok(self
            .resolver
            .entries()
            .into_iter()
            .filter(|entry| entry.is_markdown())
            .map(|entry| Document {
                id: entry.id,
                path: entry.path,
            })
            .collect())
    }

    async fn update(
        &self,
        document: &Document,
        transform: &mut DocumentTransform<'_>,
    ) -> Result<bool, HostError> {
        let _guard = self.write_lock.lock().await;
        let current = self.text(&document.id).ok_or_else(|| {
            HostError::failed("update", anyhow::anyhow!("document not found: {}", document.path))
        })?;
        match transform(&current) {
            Some(text) => {
                self.texts.insert(document.id.clone(), text);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LinkIndex for MemoryVault {
    async fn occurrences(&self, document: &Document) -> Result<Option<Vec<LinkOccurrence>>, HostError> {
        let Some(text) = self.text(&document.id) else {
            return Ok(None);
        };
        let occurrences = extract_link_occurrences(&text);
        Ok((!occurrences.is_empty()).then_some(occurrences))
    }
}

#[async_trait]
impl LinkResolver for MemoryVault {
    async fn resolve(&self, raw_target: &str, referencing_path: &str) -> Result<Option<DocumentId>, HostError> {
        Ok(self
            .resolver
            .resolve_link(raw_target, referencing_path)
            .map(|entry| entry.id))
    }
}
