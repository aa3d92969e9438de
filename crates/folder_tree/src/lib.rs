/*!
# Folder Tree
Builds an in-memory tree of folders and documents mirroring a directory on disk, then answers questions about it: how many documents and folders it holds, how often a word occurs, and which documents contain that word.

# Building
A tree can be built three ways, picked with [`BuildMethod`] -
  - `Sequential` - recursive walk on the calling thread, children kept in listing order.
  - `Concurrent` - one job per entry on a bounded pool of worker threads. Sibling order is not stable.
  - `Parallel` - divide and conquer with rayon, merging partial folders at the joins. Small directories and deep subtrees are walked sequentially.

All three give the same sizes and counts. The first I/O error aborts the build; queued work is cancelled and no partial tree is returned.

[No support for symlinked directories] - [`fs::OsFs`] leaves out symbolic links that point at directories, so their contents never show up in the tree. Links to files are read like any other document.

# Querying
Every query takes a `concurrent` flag and returns the same answer either way. The root folder is never counted by [`count_folders`]. [`total_bytes`] sums the byte lengths of the documents as they were read.

# Example
```
use folder_tree::{build_with, count_documents, get_documents, search_word, BuildMethod, Config};
use folder_tree::fs::MemoryFs;
use std::sync::Arc;

let fs = MemoryFs::new("/works")
    .with_file("/works/a.txt", "the cat sat")
    .with_file("/works/sub/b.txt", "the dog");
let root = build_with(Arc::new(fs), &Config::new("/works").with_method(BuildMethod::Parallel))
    .expect("unable to build tree");

assert_eq!(count_documents(&root, true), 2);
assert_eq!(search_word(&root, "the", false).unwrap(), 2);
assert_eq!(get_documents(&root, "cat", true).unwrap()[0].name, "a.txt");
```
*/

pub mod collect;
mod entry;
pub mod error;
pub mod fs;
mod query;
mod tree;

pub use collect::{DocumentSet, FromDocumentSet};
pub use entry::{Document, Entry, Folder};
pub use error::{Result, TreeError};
pub use query::*;
pub use tree::*;
