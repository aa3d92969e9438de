//! Accumulating matched documents from many branches at once.
//!
//! Each branch of a concurrent search fills its own [`DocumentSet`]; the sets
//! are merged pairwise at the joins and the survivor is finally converted
//! into whatever container the caller asked for via [`FromDocumentSet`].

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelIterator};

use crate::entry::Document;

/// Documents keyed by path, each held at most once.
#[derive(Debug, Default, Clone)]
pub struct DocumentSet {
    docs: HashMap<PathBuf, Arc<Document>>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `doc` unless a document with the same path is already present.
    /// Returns whether it was added.
    pub fn insert(&mut self, doc: Arc<Document>) -> bool {
        match self.docs.entry(doc.path.clone()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(doc);
                true
            }
        }
    }

    /// Union of two sets. The smaller set is folded into the larger one.
    pub fn merge(self, other: DocumentSet) -> DocumentSet {
        let (mut big, small) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        for (path, doc) in small.docs {
            big.docs.entry(path).or_insert(doc);
        }
        big
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.docs.contains_key(path)
    }

    /// Converts into the caller's container.
    pub fn finish<C: FromDocumentSet>(self) -> C {
        C::from_document_set(self)
    }
}

/// Final step of a document collection.
pub trait FromDocumentSet: Sized {
    fn from_document_set(set: DocumentSet) -> Self;
}

impl FromDocumentSet for DocumentSet {
    fn from_document_set(set: DocumentSet) -> Self {
        set
    }
}

impl FromDocumentSet for HashMap<PathBuf, Arc<Document>> {
    fn from_document_set(set: DocumentSet) -> Self {
        set.docs
    }
}

impl FromDocumentSet for BTreeMap<PathBuf, Arc<Document>> {
    fn from_document_set(set: DocumentSet) -> Self {
        set.docs.into_iter().collect()
    }
}

/// Sorted by path.
impl FromDocumentSet for Vec<Arc<Document>> {
    fn from_document_set(set: DocumentSet) -> Self {
        let mut docs: Vec<Arc<Document>> = set.docs.into_values().collect();
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        docs
    }
}

impl Extend<Arc<Document>> for DocumentSet {
    fn extend<I: IntoIterator<Item = Arc<Document>>>(&mut self, iter: I) {
        for doc in iter {
            self.insert(doc);
        }
    }
}

impl FromIterator<Arc<Document>> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = Arc<Document>>>(iter: I) -> Self {
        let mut set = DocumentSet::new();
        set.extend(iter);
        set
    }
}

impl FromParallelIterator<Arc<Document>> for DocumentSet {
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = Arc<Document>>,
    {
        par_iter
            .into_par_iter()
            .fold(DocumentSet::new, |mut set, doc| {
                set.insert(doc);
                set
            })
            .reduce(DocumentSet::new, DocumentSet::merge)
    }
}
