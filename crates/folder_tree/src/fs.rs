//! File-system access used by the tree builder.
//!
//! The builder only needs to list a directory and read a file, so any
//! backing store that can answer those two questions can be walked.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// One listed child: its full path and whether it is a directory.
pub type Child = (PathBuf, bool);

pub trait FileSystem: Send + Sync {
    /// Lists the direct children of `dir`.
    fn list_children(&self, dir: &Path) -> io::Result<Vec<Child>>;

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// `Err` if `path` does not exist.
    fn is_dir(&self, path: &Path) -> io::Result<bool>;
}

/// The local file system through `std::fs`.
///
/// Children are returned sorted by name. Symbolic links to directories are
/// skipped so a link cycle can never turn the walk into an endless one.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn list_children(&self, dir: &Path) -> io::Result<Vec<Child>> {
        let mut children = vec![];
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_symlink() && fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false) {
                debug!(path = %path.display(), "skipping symlinked directory");
                continue;
            }
            children.push((path, file_type.is_dir()));
        }
        children.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
        Ok(children)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::metadata(path)?.is_dir())
    }
}

#[derive(Debug, Clone)]
enum MemNode {
    Dir,
    File(Vec<u8>),
    /// Listed like a file but every read fails, as if it vanished after listing.
    Vanished,
}

/// An in-memory file system, handy for tests and for trees that never lived
/// on disk.
///
/// ```
/// use folder_tree::fs::{FileSystem, MemoryFs};
/// use std::path::Path;
///
/// let fs = MemoryFs::new("/works")
///     .with_file("/works/a.txt", "the cat sat")
///     .with_file("/works/sub/b.txt", "the dog");
/// assert_eq!(fs.list_children(Path::new("/works")).unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: BTreeMap<PathBuf, MemNode>,
}

impl MemoryFs {
    /// Creates a file system holding just the directory `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::default().with_dir(root)
    }

    /// Adds a directory, creating any missing parents.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert_dirs(path.as_ref());
        self
    }

    /// Adds a file, creating any missing parent directories.
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.insert_dirs(parent);
        }
        self.nodes
            .insert(path.to_path_buf(), MemNode::File(content.into()));
        self
    }

    /// Adds a file that shows up in listings but cannot be read.
    pub fn with_vanished_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.insert_dirs(parent);
        }
        self.nodes.insert(path.to_path_buf(), MemNode::Vanished);
        self
    }

    fn insert_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(MemNode::Dir);
        }
    }

    fn node(&self, path: &Path) -> io::Result<&MemNode> {
        self.nodes.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such entry: {}", path.display()),
            )
        })
    }
}

impl FileSystem for MemoryFs {
    fn list_children(&self, dir: &Path) -> io::Result<Vec<Child>> {
        match self.node(dir)? {
            MemNode::Dir => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("not a directory: {}", dir.display()),
                ))
            }
        }
        Ok(self
            .nodes
            .iter()
            .filter(|(path, _)| path.parent() == Some(dir))
            .map(|(path, node)| (path.clone(), matches!(node, MemNode::Dir)))
            .collect())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.node(path)? {
            MemNode::File(content) => Ok(content.clone()),
            MemNode::Vanished => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("vanished: {}", path.display()),
            )),
            MemNode::Dir => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("is a directory: {}", path.display()),
            )),
        }
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(matches!(self.node(path)?, MemNode::Dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_creates_parents() {
        let fs = MemoryFs::new("/r").with_file("/r/x/y/z.txt", "z");
        assert!(fs.is_dir(Path::new("/r/x")).unwrap());
        assert!(fs.is_dir(Path::new("/r/x/y")).unwrap());
        assert!(!fs.is_dir(Path::new("/r/x/y/z.txt")).unwrap());
        assert_eq!(
            fs.list_children(Path::new("/r")).unwrap(),
            vec![(PathBuf::from("/r/x"), true)]
        );
    }

    #[test]
    fn memory_fs_reports_missing_and_vanished() {
        let fs = MemoryFs::new("/r").with_vanished_file("/r/gone.txt");
        assert!(fs.is_dir(Path::new("/nope")).is_err());
        assert_eq!(fs.list_children(Path::new("/r")).unwrap().len(), 1);
        let err = fs.read_file(Path::new("/r/gone.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn memory_fs_root_is_a_directory() {
        let fs = MemoryFs::new("/").with_file("/a.txt", "x");
        assert!(fs.is_dir(Path::new("/")).unwrap());
        assert_eq!(
            fs.list_children(Path::new("/")).unwrap(),
            vec![(PathBuf::from("/a.txt"), false)]
        );
    }

    #[cfg(unix)]
    #[test]
    fn os_fs_skips_symlinked_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("real")).unwrap();
        fs::write(dir.path().join("real/a.txt"), "a").unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real/a.txt"), dir.path().join("b.txt"))
            .unwrap();
        let children = OsFs.list_children(dir.path()).unwrap();
        assert_eq!(
            children,
            vec![
                (dir.path().join("b.txt"), false),
                (dir.path().join("real"), true)
            ]
        );
    }

    #[test]
    fn os_fs_lists_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();
        let names: Vec<(String, bool)> = OsFs
            .list_children(dir.path())
            .unwrap()
            .into_iter()
            .map(|(p, d)| (p.file_name().unwrap().to_string_lossy().into_owned(), d))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.txt".to_string(), false),
                ("b.txt".to_string(), false),
                ("c".to_string(), true)
            ]
        );
    }
}
