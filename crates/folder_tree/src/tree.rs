use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use rayon::prelude::*;
use regex::Regex;
use threadpool::{JobSender, ThreadPool};
use tracing::{debug, info, warn};

use crate::entry::{Document, Entry, Folder};
use crate::error::{Result, TreeError};
use crate::fs::{Child, FileSystem, OsFs};

/// Represents the method of building the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMethod {
    /// Every path is visited one after another on the calling thread.
    /// Children keep the order in which the file system lists them.
    #[default]
    Sequential,
    /// Every path becomes a job on a bounded pool of worker threads. A folder
    /// is attached to its parent by whichever of its children finishes last,
    /// so sibling order is not stable.
    Concurrent,
    /// Every child of a directory is forked onto rayon's work-stealing pool
    /// and partial folders are merged at the joins. Small directories and
    /// deep subtrees fall back to the sequential walk.
    Parallel,
}

impl FromStr for BuildMethod {
    type Err = TreeError;

    fn from_str(method: &str) -> Result<Self> {
        match method {
            "seq" | "sequential" => Ok(Self::Sequential),
            "conc" | "concurrent" => Ok(Self::Concurrent),
            "par" | "parallel" => Ok(Self::Parallel),
            _ => Err(TreeError::InvalidArgument(format!(
                "unknown build method '{method}'"
            ))),
        }
    }
}

impl fmt::Display for BuildMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Concurrent => "concurrent",
            Self::Parallel => "parallel",
        })
    }
}

/// Directories with fewer entries than this are not forked.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 2;

/// From this depth on the parallel walk stops forking altogether.
pub const DEFAULT_MAX_FORK_DEPTH: usize = 16;

/// Represents config for building the tree.
#[derive(Debug, Clone)]
pub struct Config {
    /// The directory to build the tree for.
    pub path: PathBuf,
    /// Method of building.
    pub build_method: BuildMethod,
    /// Pool size for [`BuildMethod::Concurrent`].
    pub workers: usize,
    /// Minimum entry count for a directory to be forked by
    /// [`BuildMethod::Parallel`].
    pub parallel_threshold: usize,
    /// Depth from which [`BuildMethod::Parallel`] walks subtrees sequentially.
    pub max_fork_depth: usize,
    /// Entries whose name matches this regex are left out of the tree.
    pub exclude_pattern: Option<String>,
}

impl Config {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            build_method: BuildMethod::default(),
            workers: default_workers(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            max_fork_depth: DEFAULT_MAX_FORK_DEPTH,
            exclude_pattern: None,
        }
    }

    pub fn with_method(mut self, build_method: BuildMethod) -> Self {
        self.build_method = build_method;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_pattern = Some(pattern.into());
        self
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builds the folder tree for `config.path` on the local file system.
///
/// ```no_run
/// use folder_tree::{build, BuildMethod, Config};
///
/// let root = build(&Config::new("works").with_method(BuildMethod::Parallel))
///     .expect("unable to build tree");
/// println!("{} documents", root.size());
/// ```
pub fn build(config: &Config) -> Result<Folder> {
    build_with(Arc::new(OsFs), config)
}

/// Builds the folder tree for `config.path` from any [`FileSystem`].
///
/// The first failure aborts the whole build; no partial tree is returned.
pub fn build_with(fs: Arc<dyn FileSystem>, config: &Config) -> Result<Folder> {
    let walker = Walker::new(fs, config)?;
    let root = config.path.as_path();
    match walker.fs.is_dir(root) {
        Ok(true) => {}
        Ok(false) => return Err(TreeError::NotADirectory(root.to_path_buf())),
        Err(e) => return Err(TreeError::io(root, e)),
    }

    info!(root = %root.display(), method = %config.build_method, "building tree");
    let started = Instant::now();
    let folder = match config.build_method {
        BuildMethod::Sequential => walker.build_seq(root),
        BuildMethod::Parallel => walker.build_par(root, 0),
        BuildMethod::Concurrent => build_concurrent(Arc::new(walker), root, config.workers),
    }?;
    info!(
        root = %root.display(),
        method = %config.build_method,
        documents = folder.size(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "tree built"
    );
    Ok(folder)
}

struct Walker {
    fs: Arc<dyn FileSystem>,
    exclude: Option<Regex>,
    parallel_threshold: usize,
    max_fork_depth: usize,
}

impl Walker {
    fn new(fs: Arc<dyn FileSystem>, config: &Config) -> Result<Self> {
        let exclude = match &config.exclude_pattern {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| {
                TreeError::InvalidArgument(format!("bad exclude pattern '{pattern}': {e}"))
            })?),
            None => None,
        };
        if config.workers == 0 && config.build_method == BuildMethod::Concurrent {
            return Err(TreeError::InvalidArgument(
                "worker count must be at least 1".into(),
            ));
        }
        Ok(Self {
            fs,
            exclude,
            parallel_threshold: config.parallel_threshold.max(1),
            max_fork_depth: config.max_fork_depth,
        })
    }

    fn list(&self, dir: &Path) -> Result<Vec<Child>> {
        let mut children = self
            .fs
            .list_children(dir)
            .map_err(|e| TreeError::io(dir, e))?;
        // Some listings report the directory itself; walking it again would never end.
        children.retain(|(path, _)| path != dir && !self.is_excluded(path));
        debug!(dir = %dir.display(), entries = children.len(), "listed");
        Ok(children)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        match (&self.exclude, path.file_name()) {
            (Some(re), Some(name)) => re.is_match(&name.to_string_lossy()),
            _ => false,
        }
    }

    fn read_document(&self, path: &Path) -> Result<Document> {
        let bytes = self.fs.read_file(path).map_err(|e| TreeError::io(path, e))?;
        Ok(Document::from_bytes(path, bytes))
    }

    fn build_seq(&self, dir: &Path) -> Result<Folder> {
        let mut folder = Folder::new(dir);
        for (path, is_dir) in self.list(dir)? {
            let entry = if is_dir {
                Entry::Folder(self.build_seq(&path)?)
            } else {
                Entry::Document(self.read_document(&path)?)
            };
            folder.add_entry(entry);
        }
        Ok(folder)
    }

    fn build_par(&self, dir: &Path, depth: usize) -> Result<Folder> {
        if depth >= self.max_fork_depth {
            return self.build_seq(dir);
        }
        let children = self.list(dir)?;
        if children.len() < self.parallel_threshold {
            let mut folder = Folder::new(dir);
            for (path, is_dir) in children {
                folder.add_entry(self.entry_par(&path, is_dir, depth + 1)?);
            }
            return Ok(folder);
        }
        children
            .into_par_iter()
            .map(|(path, is_dir)| self.entry_par(&path, is_dir, depth + 1))
            .try_fold(
                || Folder::new(dir),
                |mut folder, entry: Result<Entry>| -> Result<Folder> {
                    folder.add_entry(entry?);
                    Ok(folder)
                },
            )
            .try_reduce(|| Folder::new(dir), |a, b| Ok(a.merge(b)))
    }

    fn entry_par(&self, path: &Path, is_dir: bool, depth: usize) -> Result<Entry> {
        if is_dir {
            Ok(Entry::Folder(self.build_par(path, depth)?))
        } else {
            Ok(Entry::Document(self.read_document(path)?))
        }
    }
}

/// A folder still waiting for some of its children.
///
/// Every outstanding child job holds one reference; the job that releases
/// the last one attaches the finished folder to its parent.
struct PendingFolder {
    folder: Mutex<Folder>,
    parent: Option<Arc<PendingFolder>>,
}

impl PendingFolder {
    fn lock(&self) -> std::sync::MutexGuard<'_, Folder> {
        self.folder.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `Some(root)` from the job that completed the root folder.
type NodeProcessingResult = Result<Option<Folder>>;

fn build_concurrent(walker: Arc<Walker>, root: &Path, workers: usize) -> Result<Folder> {
    let (pool, sender, results) = ThreadPool::new::<NodeProcessingResult>(workers);
    debug!(workers = pool.size(), "thread pool started");
    submit(&walker, &sender, root.to_path_buf(), true, None);
    drop(sender);

    let mut built = None;
    let mut failure = None;
    for outcome in results {
        let outcome = outcome.unwrap_or_else(|_| {
            Err(TreeError::Worker("tree build job panicked".into()))
        });
        match outcome {
            Ok(Some(folder)) => built = Some(folder),
            Ok(None) => {}
            Err(e) => {
                if failure.is_none() {
                    warn!(error = %e, "build failed, cancelling queued jobs");
                    pool.cancel();
                    failure = Some(e);
                }
            }
        }
    }
    drop(pool);

    match (failure, built) {
        (Some(e), _) => Err(e),
        (None, Some(folder)) => Ok(folder),
        (None, None) => Err(TreeError::Worker("no root folder was produced".into())),
    }
}

fn submit(
    walker: &Arc<Walker>,
    sender: &JobSender<NodeProcessingResult>,
    path: PathBuf,
    is_dir: bool,
    parent: Option<Arc<PendingFolder>>,
) {
    let walker = Arc::clone(walker);
    let child_sender = sender.clone();
    sender.add(Box::new(move || -> NodeProcessingResult {
        if is_dir {
            let node = Arc::new(PendingFolder {
                folder: Mutex::new(Folder::new(&path)),
                parent,
            });
            for (child, child_is_dir) in walker.list(&path)? {
                submit(
                    &walker,
                    &child_sender,
                    child,
                    child_is_dir,
                    Some(Arc::clone(&node)),
                );
            }
            Ok(complete(node))
        } else {
            let document = walker.read_document(&path)?;
            match parent {
                Some(parent) => {
                    parent.lock().add_document(document);
                    Ok(complete(parent))
                }
                None => Err(TreeError::NotADirectory(path)),
            }
        }
    }));
}

/// Releases one reference to `node`, walking up the chain of parents for as
/// long as this call releases the last one.
fn complete(mut node: Arc<PendingFolder>) -> Option<Folder> {
    loop {
        let pending = Arc::into_inner(node)?;
        let folder = pending
            .folder
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        match pending.parent {
            Some(parent) => {
                parent.lock().add_folder(folder);
                node = parent;
            }
            None => return Some(folder),
        }
    }
}
