use anyhow::{Context, Result};
use async_trait::async_trait;
use glob_match::glob_match;
use redirector_core::doc_resolver::{DocEntry, DocumentResolver};
use redirector_core::host::{DocumentStore, DocumentTransform, LinkIndex, LinkResolver};
use redirector_core::link_parser::extract_link_occurrences;
use redirector_core::{Document, DocumentId, HostError, LinkOccurrence};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use walkdir::WalkDir;

use crate::config::VaultConfig;

/// A vault backed by a directory tree.
///
/// Every non-excluded file is registered as a link target; markdown files are
/// also the documents the formatter rewrites. Document ids are vault paths
/// at scan time, host paths use the configured separator.
pub struct FsVault {
    root: PathBuf,
    resolver: Arc<DocumentResolver>,
    write_lock: Mutex<()>,
}

impl FsVault {
    pub fn open(root: &Path, config: &VaultConfig) -> Result<Self> {
        let resolver = DocumentResolver::new(config.path_separator)?;
        if !root.is_dir() {
            anyhow::bail!("vault {} is not a directory", root.display());
        }

        let vault = Self {
            root: root.to_path_buf(),
            resolver: Arc::new(resolver),
            write_lock: Mutex::new(()),
        };
        let count = vault.scan(&config.exclude)?;
        tracing::info!("Opened vault {} with {} files", root.display(), count);
        Ok(vault)
    }

    fn scan(&self, exclude: &[String]) -> Result<usize> {
        let separator = self.resolver.separator().to_string();
        let mut count = 0;

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.with_context(|| format!("failed to walk {}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            let vault_path = segments.join("/");
            if exclude.iter().any(|pattern| glob_match(pattern, &vault_path)) {
                tracing::debug!("Excluded {}", vault_path);
                continue;
            }

            self.resolver
                .upsert(DocumentId::new(vault_path), &segments.join(&separator));
            count += 1;
        }

        Ok(count)
    }

    pub fn resolver(&self) -> &Arc<DocumentResolver> {
        &self.resolver
    }

    /// Path as the host writes it, using the configured separator.
    pub fn host_path(&self, entry: &DocEntry) -> String {
        entry.path.replace('/', &self.resolver.separator().to_string())
    }

    /// Find a markdown document by its path inside the vault.
    pub fn document(&self, path: &str) -> Option<Document> {
        self.resolver
            .resolve_path(path)
            .filter(DocEntry::is_markdown)
            .map(|entry| Document {
                path: self.host_path(&entry),
                id: entry.id,
            })
    }

    fn file_path(&self, document: &Document) -> PathBuf {
        let vault_path = self.resolver.normalize_path(&document.path);
        vault_path
            .split('/')
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    /// Read the current text of `document`.
    ///
    /// A missing vault root means the store is gone; any other failure only
    /// affects this document.
    pub async fn read(&self, document: &Document) -> Result<String, HostError> {
        if tokio::fs::metadata(&self.root).await.is_err() {
            return Err(HostError::StoreUnusable(anyhow::anyhow!(
                "vault root {} is no longer accessible",
                self.root.display()
            )));
        }

        let path = self.file_path(document);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
            .map_err(|e| HostError::failed("read", e))
    }
}

/// Replace `path` with `text` through a temporary file in the same directory.
fn write_atomically(path: &Path, text: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl DocumentStore for FsVault {
    async fn documents(&self) -> Result<Vec<Document>, HostError> {
        if !self.root.is_dir() {
            return Err(HostError::StoreUnusable(anyhow::anyhow!(
                "vault root {} is missing",
                self.root.display()
            )));
        }
        Ok(self
            .resolver
            .entries()
            .into_iter()
            .filter(DocEntry::is_markdown)
            .map(|entry| Document {
                path: self.host_path(&entry),
                id: entry.id,
            })
            .collect())
    }

    async fn update(
        &self,
        document: &Document,
        transform: &mut DocumentTransform<'_>,
    ) -> Result<bool, HostError> {
        let _guard = self.write_lock.lock().await;
        let current = self.read(document).await?;
        let Some(text) = transform(&current) else {
            return Ok(false);
        };

        let path = self.file_path(document);
        tokio::task::spawn_blocking(move || {
            write_atomically(&path, &text).with_context(|| format!("failed to write {}", path.display()))
        })
        .await
        .map_err(|e| HostError::failed("write", e))?
        .map_err(|e| HostError::failed("write", e))?;
        Ok(true)
    }
}

#[async_trait]
impl LinkIndex for FsVault {
    async fn occurrences(&self, document: &Document) -> Result<Option<Vec<LinkOccurrence>>, HostError> {
        let text = self.read(document).await?;
        let occurrences = extract_link_occurrences(&text);
        Ok((!occurrences.is_empty()).then_some(occurrences))
    }
}

#[async_trait]
impl LinkResolver for FsVault {
    async fn resolve(&self, raw_target: &str, referencing_path: &str) -> Result<Option<DocumentId>, HostError> {
        Ok(self
            .resolver
            .resolve_link(raw_target, referencing_path)
            .map(|entry| entry.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redirector_core::link_text::{LinkTextOptions, LinkTextPolicy};
    use redirector_core::{FormatOptions, LinkFormatter};
    use tempfile::TempDir;

    // === Test Helpers ===

    fn write(root: &Path, path: &str, text: &str) {
        let full = root.join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, text).unwrap();
    }

    fn sample_vault() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Index.md", "Start at [[Notes/Ideas]] and ![[img/logo.png]]\n");
        write(dir.path(), "Notes/Ideas.md", "Back to [Index](../Index.md)\n");
        write(dir.path(), "img/logo.png", "png");
        write(dir.path(), ".obsidian/workspace.md", "[[Index]]");
        dir
    }

    fn open(dir: &TempDir) -> FsVault {
        FsVault::open(dir.path(), &VaultConfig::default()).unwrap()
    }

    // === scan tests ===

    #[tokio::test]
    async fn lists_markdown_documents_outside_excluded_dirs() {
        let dir = sample_vault();
        let vault = open(&dir);
        let docs = vault.documents().await.unwrap();
        let paths: Vec<&str> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["Index.md", "Notes/Ideas.md"]);
        assert!(vault.resolver().resolve_path("img/logo.png").is_some());
    }

    #[tokio::test]
    async fn backslash_separator_yields_host_paths() {
        let dir = sample_vault();
        let config = VaultConfig {
            path_separator: '\\',
            ..VaultConfig::default()
        };
        let vault = FsVault::open(dir.path(), &config).unwrap();
        let doc = vault.document("Notes\\Ideas.md").expect("document");
        assert_eq!(doc.path, "Notes\\Ideas.md");
        assert_eq!(vault.read(&doc).await.unwrap(), "Back to [Index](../Index.md)\n");
    }

    #[test]
    fn invalid_separator_is_rejected() {
        let dir = sample_vault();
        let config = VaultConfig {
            path_separator: ':',
            ..VaultConfig::default()
        };
        assert!(FsVault::open(dir.path(), &config).is_err());
    }

    // === store tests ===

    #[tokio::test]
    async fn update_replaces_file_contents() {
        let dir = sample_vault();
        let vault = open(&dir);
        let doc = vault.document("Index.md").unwrap();

        let written = vault
            .update(&doc, &mut |text: &str| Some(text.replace("Start", "Begin")))
            .await
            .unwrap();
        assert!(written);
        let on_disk = std::fs::read_to_string(dir.path().join("Index.md")).unwrap();
        assert!(on_disk.starts_with("Begin at"));

        let written = vault.update(&doc, &mut |_: &str| None).await.unwrap();
        assert!(!written);
    }

    #[tokio::test]
    async fn deleted_file_fails_only_that_document() {
        let dir = sample_vault();
        let vault = open(&dir);
        let doc = vault.document("Index.md").unwrap();
        std::fs::remove_file(dir.path().join("Index.md")).unwrap();

        let err = vault.occurrences(&doc).await.unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn removed_vault_root_is_fatal() {
        let dir = sample_vault();
        let vault = open(&dir);
        let doc = vault.document("Index.md").unwrap();
        std::fs::remove_dir_all(dir.path()).unwrap();

        let err = vault.read(&doc).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(vault.documents().await.unwrap_err().is_fatal());
    }

    // === formatting through the filesystem ===

    #[tokio::test]
    async fn formats_links_on_disk() {
        let dir = sample_vault();
        let vault = Arc::new(open(&dir));
        let policy = Arc::new(LinkTextPolicy::new(vault.resolver().clone(), LinkTextOptions::default()));
        let formatter = LinkFormatter::from_vault(vault, policy, FormatOptions::default());

        let report = formatter.format_links().await.unwrap();
        assert_eq!(report.documents_changed, 2);

        let index = std::fs::read_to_string(dir.path().join("Index.md")).unwrap();
        assert_eq!(index, "Start at [[Ideas]] and ![[logo.png]]\n");
        let ideas = std::fs::read_to_string(dir.path().join("Notes/Ideas.md")).unwrap();
        assert_eq!(ideas, "Back to [Index](Index.md)\n");

        let again = formatter.format_links().await.unwrap();
        assert_eq!(again.documents_changed, 0);
        let excluded = std::fs::read_to_string(dir.path().join(".obsidian/workspace.md")).unwrap();
        assert_eq!(excluded, "[[Index]]");
    }

    #[tokio::test]
    async fn shadowed_and_aliased_links_settle_on_first_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "x/Src.md", "[[../a/Note]]
[[Deep/A|one]] and [[Deep/A|two]]
");
        write(dir.path(), "a/Note.md", "");
        write(dir.path(), "x/a/Note.md", "");
        write(dir.path(), "Deep/A.md", "");
        let vault = Arc::new(open(&dir));
        let policy = Arc::new(LinkTextPolicy::new(vault.resolver().clone(), LinkTextOptions::default()));
        let formatter = LinkFormatter::from_vault(vault, policy, FormatOptions::default());

        let first = formatter.format_links().await.unwrap();
        assert_eq!(first.documents_changed, 1);
        let src = std::fs::read_to_string(dir.path().join("x/Src.md")).unwrap();
        assert_eq!(src, "[[/a/Note]]\n[[A|one]] and [[A|two]]\n");

        let second = formatter.format_links().await.unwrap();
        assert_eq!(second.documents_changed, 0);
    }
}
