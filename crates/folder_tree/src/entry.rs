use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A single file and its text content.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name of the document.
    pub name: String,
    /// Full path the document was read from.
    pub path: PathBuf,
    /// Content of the file. Invalid UTF-8 is replaced with `U+FFFD`.
    pub content: String,
    /// Length of the file in bytes as read, before any UTF-8 replacement.
    pub size_in_bytes: u64,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        Self {
            name: entry_name(&path),
            size_in_bytes: content.len() as u64,
            path,
            content,
        }
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        let size_in_bytes = bytes.len() as u64;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Self {
            size_in_bytes,
            ..Self::new(path, content)
        }
    }
}

/// A directory holding subfolders and documents.
///
/// `size` is the number of documents reachable from this folder; folders
/// themselves never add to it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    pub path: PathBuf,
    subfolders: Vec<Arc<Folder>>,
    documents: Vec<Arc<Document>>,
    size: u64,
}

impl Folder {
    /// Creates an empty folder for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: entry_name(&path),
            path,
            subfolders: vec![],
            documents: vec![],
            size: 0,
        }
    }

    pub fn subfolders(&self) -> &[Arc<Folder>] {
        &self.subfolders
    }

    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    /// Number of documents reachable from this folder, kept up to date while
    /// the folder is assembled.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.subfolders.is_empty() && self.documents.is_empty()
    }

    /// Adds a built entry as a direct child.
    pub fn add_entry(&mut self, entry: Entry) {
        match entry {
            Entry::Folder(folder) => self.add_folder(folder),
            Entry::Document(document) => self.add_document(document),
        }
    }

    pub fn add_folder(&mut self, folder: impl Into<Arc<Folder>>) {
        let folder = folder.into();
        self.size += folder.size;
        self.subfolders.push(folder);
    }

    pub fn add_document(&mut self, document: impl Into<Arc<Document>>) {
        self.size += 1;
        self.documents.push(document.into());
    }

    /// Folds the children of `other` into this folder.
    ///
    /// Both folders must stand for the same directory, e.g. two partial
    /// results over disjoint slices of one listing. The longer child lists
    /// are kept and the shorter ones appended to them, so sibling order is
    /// not preserved across merges.
    pub fn merge(mut self, mut other: Folder) -> Folder {
        if other.subfolders.len() > self.subfolders.len() {
            std::mem::swap(&mut self.subfolders, &mut other.subfolders);
        }
        self.subfolders.append(&mut other.subfolders);
        if other.documents.len() > self.documents.len() {
            std::mem::swap(&mut self.documents, &mut other.documents);
        }
        self.documents.append(&mut other.documents);
        self.size += other.size;
        self
    }

    /// Sorts children by name, recursively. Useful after a concurrent build
    /// when a stable order is needed.
    pub fn sort(&mut self) {
        self.documents.sort_by(|a, b| a.name.cmp(&b.name));
        for folder in self.subfolders.iter_mut() {
            Arc::make_mut(folder).sort();
        }
        self.subfolders.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

/// Either kind of directory entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Entry {
    Document(Document),
    Folder(Folder),
}

impl Entry {
    /// 1 for a document, the reachable document count for a folder.
    pub fn size(&self) -> u64 {
        match self {
            Entry::Document(_) => 1,
            Entry::Folder(f) => f.size,
        }
    }
}

impl From<Document> for Entry {
    fn from(d: Document) -> Self {
        Entry::Document(d)
    }
}

impl From<Folder> for Entry {
    fn from(f: Folder) -> Self {
        Entry::Folder(f)
    }
}

fn entry_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_with(path: &str, docs: &[&str]) -> Folder {
        let mut f = Folder::new(path);
        for d in docs {
            f.add_document(Document::new(format!("{path}/{d}"), ""));
        }
        f
    }

    #[test]
    fn size_counts_documents_only() {
        let mut root = folder_with("/r", &["a", "b"]);
        let mut sub = folder_with("/r/s", &["c"]);
        sub.add_folder(Folder::new("/r/s/empty"));
        root.add_entry(Entry::Folder(sub));
        assert_eq!(root.size(), 3);
        assert_eq!(root.subfolders().len(), 1);
        assert_eq!(root.documents().len(), 2);
        assert_eq!(Entry::from(root).size(), 3);
    }

    #[test]
    fn merge_adds_sizes_and_children() {
        let a = folder_with("/r", &["a"]);
        let mut b = folder_with("/r", &["b", "c"]);
        b.add_folder(folder_with("/r/s", &["d"]));
        let merged = a.merge(b);
        assert_eq!(merged.size(), 4);
        assert_eq!(merged.documents().len(), 3);
        assert_eq!(merged.subfolders().len(), 1);
        assert_eq!(merged.name, "r");
    }

    #[test]
    fn merge_is_associative_in_size() {
        let parts = || {
            (
                folder_with("/r", &["a"]),
                folder_with("/r", &["b", "c"]),
                folder_with("/r", &["d", "e", "f"]),
            )
        };
        let (a, b, c) = parts();
        let left = a.merge(b).merge(c);
        let (a, b, c) = parts();
        let right = a.merge(b.merge(c));
        assert_eq!(left.size(), right.size());
        assert_eq!(left.documents().len(), right.documents().len());
    }

    #[test]
    fn sort_orders_children_by_name() {
        let mut root = folder_with("/r", &["z", "a", "m"]);
        root.add_folder(folder_with("/r/y", &["2", "1"]));
        root.add_folder(Folder::new("/r/b"));
        root.sort();
        let docs: Vec<&str> = root.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(docs, ["a", "m", "z"]);
        assert_eq!(root.subfolders()[0].name, "b");
        assert_eq!(root.subfolders()[1].documents()[0].name, "1");
    }

    #[test]
    fn lossy_content() {
        let d = Document::from_bytes("/r/bin", vec![b'o', b'k', 0xff]);
        assert_eq!(d.content, "ok\u{fffd}");
        assert_eq!(d.size_in_bytes, 3);
        assert_eq!(Document::new("/r/t", "héllo").size_in_bytes, 6);
        assert_eq!(d.name, "bin");
    }
}
