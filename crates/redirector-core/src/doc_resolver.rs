use crate::error::{Error, Result};
use crate::link::DocumentId;
use dashmap::DashMap;

/// Separators a host may use in the paths it hands over.
const ALLOWED_SEPARATORS: [char; 2] = ['/', '\\'];

/// A document registered with the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocEntry {
    pub id: DocumentId,
    /// Normalized vault path, `/`-separated, no leading slash: `Notes/Ideas.md`
    pub path: String,
}

impl DocEntry {
    /// Last path component, e.g. `Ideas.md`.
    pub fn file_name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn is_markdown(&self) -> bool {
        has_markdown_extension(&self.path)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Case-insensitive `.md` check. When true the last three bytes are ASCII.
pub(crate) fn has_markdown_extension(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[bytes.len() - 3..].eq_ignore_ascii_case(b".md")
}

/// Resolve `link_path` relative to the directory containing `current_file_path`.
///
/// `..` above the vault root is dropped, `.` segments are skipped.
///
/// Example: `resolve_relative("Notes/Source.md", "../Ideas.md")` → `"Ideas.md"`
pub fn resolve_relative(current_file_path: &str, link_path: &str) -> String {
    let last_slash = current_file_path.rfind('/').unwrap_or(0);
    let dir = &current_file_path[..last_slash];
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();

    for part in link_path.split('/') {
        if part == ".." {
            segments.pop();
        } else if part != "." && !part.is_empty() {
            segments.push(part);
        }
    }

    segments.join("/")
}

/// Paths a link path may refer to: `Foo` means `Foo.md` first, then `Foo`
/// itself (attachments, extensionless files).
fn candidate_paths(link_path: &str) -> Vec<String> {
    if has_markdown_extension(link_path) {
        vec![link_path.to_string()]
    } else {
        vec![format!("{}.md", link_path), link_path.to_string()]
    }
}

/// Bidirectional index between vault paths and document ids, used to resolve
/// link targets the way the vault application does.
///
/// Lookups are case-insensitive. The host path separator is fixed at
/// construction and every incoming path is normalized to `/`.
pub struct DocumentResolver {
    separator: char,
    /// Forward map: lowercase vault path -> entry
    path_to_doc: DashMap<String, DocEntry>,
    /// Reverse map: id -> vault path
    id_to_path: DashMap<DocumentId, String>,
}

impl Default for DocumentResolver {
    fn default() -> Self {
        Self {
            separator: '/',
            path_to_doc: DashMap::new(),
            id_to_path: DashMap::new(),
        }
    }
}

impl DocumentResolver {
    pub fn new(separator: char) -> Result<Self> {
        if !ALLOWED_SEPARATORS.contains(&separator) {
            return Err(Error::InvalidConfig(format!(
                "path separator must be '/' or '\\', got {:?}",
                separator
            )));
        }
        Ok(Self {
            separator,
            ..Self::default()
        })
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    /// Normalize a host path: unify separators, drop leading slashes, collapse
    /// `.` and `..` segments.
    pub fn normalize_path(&self, path: &str) -> String {
        let unified = path.replace(self.separator, "/");
        resolve_relative("", &unified)
    }

    /// Register or move a document.
    pub fn upsert(&self, id: DocumentId, path: &str) {
        let path = self.normalize_path(path);
        if let Some((_, old_path)) = self.id_to_path.remove(&id) {
            self.path_to_doc.remove(&old_path.to_lowercase());
        }
        self.path_to_doc.insert(
            path.to_lowercase(),
            DocEntry {
                id: id.clone(),
                path: path.clone(),
            },
        );
        self.id_to_path.insert(id, path);
    }

    pub fn remove(&self, id: &DocumentId) -> Option<DocEntry> {
        let (_, path) = self.id_to_path.remove(id)?;
        self.path_to_doc.remove(&path.to_lowercase()).map(|(_, entry)| entry)
    }

    /// Look up an exact vault path (case-insensitive).
    pub fn resolve_path(&self, path: &str) -> Option<DocEntry> {
        let path = self.normalize_path(path);
        self.path_to_doc
            .get(&path.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    pub fn path_for_id(&self, id: &DocumentId) -> Option<String> {
        self.id_to_path.get(id).map(|path| path.value().clone())
    }

    /// All registered entries, sorted by path.
    pub fn entries(&self) -> Vec<DocEntry> {
        let mut entries: Vec<DocEntry> = self
            .path_to_doc
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Number of documents whose file name equals `name` (case-insensitive).
    pub fn count_file_name(&self, name: &str) -> usize {
        let lower = name.to_lowercase();
        self.path_to_doc
            .iter()
            .filter(|entry| file_name(entry.key()) == lower)
            .count()
    }

    /// Resolve a raw link target written in `referencing_path`.
    ///
    /// Any `#subpath` is ignored. Resolution order:
    /// 1. relative to the referencing document's directory
    /// 2. from the vault root
    /// 3. by path suffix anywhere in the vault (`Ideas` finds `Notes/Ideas.md`);
    ///    the shortest matching path wins, ties broken alphabetically
    ///
    /// A path starting with `/` is anchored at the vault root and only step 2
    /// applies.
    pub fn resolve_link(&self, raw_target: &str, referencing_path: &str) -> Option<DocEntry> {
        let link_path = raw_target.split('#').next().unwrap_or_default().trim();
        if link_path.is_empty() {
            return None;
        }
        let link_path = link_path.replace(self.separator, "/");
        let referencing_path = self.normalize_path(referencing_path);

        if link_path.starts_with('/') {
            return candidate_paths(&link_path).into_iter().find_map(|candidate| {
                let absolute = resolve_relative("", &candidate).to_lowercase();
                self.path_to_doc.get(&absolute).map(|entry| entry.value().clone())
            });
        }

        for candidate in candidate_paths(&link_path) {
            let relative = resolve_relative(&referencing_path, &candidate).to_lowercase();
            if let Some(entry) = self.path_to_doc.get(&relative) {
                return Some(entry.value().clone());
            }

            let absolute = resolve_relative("", &candidate).to_lowercase();
            if let Some(entry) = self.path_to_doc.get(&absolute) {
                return Some(entry.value().clone());
            }

            if let Some(entry) = self.resolve_by_suffix(&absolute) {
                return Some(entry);
            }
        }

        None
    }

    fn resolve_by_suffix(&self, lower_path: &str) -> Option<DocEntry> {
        if lower_path.is_empty() {
            return None;
        }
        let suffix = format!("/{}", lower_path);
        self.path_to_doc
            .iter()
            .filter(|entry| entry.key().ends_with(&suffix))
            .map(|entry| entry.value().clone())
            .min_by(|a, b| a.path.len().cmp(&b.path.len()).then_with(|| a.path.cmp(&b.path)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
