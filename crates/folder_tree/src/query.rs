//! Read-only queries over a built [`Folder`] tree.
//!
//! Every query has a sequential and a concurrent form selected by a flag;
//! both give the same answer. The concurrent form forks the documents and
//! the subfolders of each folder onto rayon and sums per-branch results at
//! the joins. None of them touch the file system again.

use std::sync::Arc;

use rayon::prelude::*;
use regex::{Regex, RegexBuilder};

use crate::collect::{DocumentSet, FromDocumentSet};
use crate::entry::{Document, Folder};
use crate::error::{Result, TreeError};

/// A word to look for in document contents.
#[derive(Debug, Clone)]
pub struct WordQuery {
    word: String,
    matcher: Regex,
}

impl WordQuery {
    /// Case-sensitive query for `word`.
    pub fn new(word: &str) -> Result<Self> {
        Self::with_case(word, true)
    }

    pub fn with_case(word: &str, case_sensitive: bool) -> Result<Self> {
        if word.trim().is_empty() {
            return Err(TreeError::InvalidArgument(
                "search word must not be blank".into(),
            ));
        }
        let matcher = RegexBuilder::new(&regex::escape(word))
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| TreeError::InvalidArgument(format!("search word '{word}': {e}")))?;
        Ok(Self {
            word: word.to_string(),
            matcher,
        })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// Non-overlapping occurrences of the word in `text`.
    pub fn occurrences(&self, text: &str) -> u64 {
        self.matcher.find_iter(text).count() as u64
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// Counts every document below `folder`.
///
/// Walks the tree instead of trusting the cached [`Folder::size`]; the two
/// agree for any tree the builder produced.
pub fn count_documents(folder: &Folder, concurrent: bool) -> u64 {
    if concurrent {
        count_documents_par(folder)
    } else {
        count_documents_seq(folder)
    }
}

fn count_documents_seq(folder: &Folder) -> u64 {
    folder.documents().len() as u64
        + folder
            .subfolders()
            .iter()
            .map(|f| count_documents_seq(f))
            .sum::<u64>()
}

fn count_documents_par(folder: &Folder) -> u64 {
    let (documents, nested) = rayon::join(
        || folder.documents().par_iter().map(|_| 1u64).sum::<u64>(),
        || {
            folder
                .subfolders()
                .par_iter()
                .map(|f| count_documents_par(f))
                .sum::<u64>()
        },
    );
    documents + nested
}

/// Sum of the byte lengths of every document below `folder`.
pub fn total_bytes(folder: &Folder, concurrent: bool) -> u64 {
    if concurrent {
        let (here, nested) = rayon::join(
            || folder.documents().par_iter().map(|d| d.size_in_bytes).sum::<u64>(),
            || {
                folder
                    .subfolders()
                    .par_iter()
                    .map(|f| total_bytes(f, true))
                    .sum::<u64>()
            },
        );
        here + nested
    } else {
        folder.documents().iter().map(|d| d.size_in_bytes).sum::<u64>()
            + folder
                .subfolders()
                .iter()
                .map(|f| total_bytes(f, false))
                .sum::<u64>()
    }
}

/// Counts the folders below `folder`. The folder itself is not counted.
pub fn count_folders(folder: &Folder, concurrent: bool) -> u64 {
    let direct = folder.subfolders().len() as u64;
    let nested: u64 = if concurrent {
        folder
            .subfolders()
            .par_iter()
            .map(|f| count_folders(f, true))
            .sum()
    } else {
        folder
            .subfolders()
            .iter()
            .map(|f| count_folders(f, false))
            .sum()
    };
    direct + nested
}

/// Total number of case-sensitive occurrences of `word` in every document.
pub fn search_word(folder: &Folder, word: &str, concurrent: bool) -> Result<u64> {
    let query = WordQuery::new(word)?;
    Ok(search(folder, &query, concurrent))
}

/// Total number of occurrences of `query` in every document.
pub fn search(folder: &Folder, query: &WordQuery, concurrent: bool) -> u64 {
    if concurrent {
        search_par(folder, query)
    } else {
        search_seq(folder, query)
    }
}

fn search_seq(folder: &Folder, query: &WordQuery) -> u64 {
    let here: u64 = folder
        .documents()
        .iter()
        .map(|d| query.occurrences(&d.content))
        .sum();
    here + folder
        .subfolders()
        .iter()
        .map(|f| search_seq(f, query))
        .sum::<u64>()
}

fn search_par(folder: &Folder, query: &WordQuery) -> u64 {
    let (here, nested) = rayon::join(
        || {
            folder
                .documents()
                .par_iter()
                .map(|d| query.occurrences(&d.content))
                .sum::<u64>()
        },
        || {
            folder
                .subfolders()
                .par_iter()
                .map(|f| search_par(f, query))
                .sum::<u64>()
        },
    );
    here + nested
}

/// Every document whose content contains `word` (case-sensitive), sorted by
/// path.
pub fn get_documents(folder: &Folder, word: &str, concurrent: bool) -> Result<Vec<Arc<Document>>> {
    let query = WordQuery::new(word)?;
    Ok(collect_documents(folder, &query, concurrent))
}

/// Every document matching `query`, gathered into `C`.
pub fn collect_documents<C: FromDocumentSet>(folder: &Folder, query: &WordQuery, concurrent: bool) -> C {
    let set = if concurrent {
        matching_par(folder, query)
    } else {
        let mut set = DocumentSet::new();
        matching_seq(folder, query, &mut set);
        set
    };
    set.finish()
}

fn matching_seq(folder: &Folder, query: &WordQuery, set: &mut DocumentSet) {
    for doc in folder.documents() {
        if query.is_match(&doc.content) {
            set.insert(Arc::clone(doc));
        }
    }
    for sub in folder.subfolders() {
        matching_seq(sub, query, set);
    }
}

fn matching_par(folder: &Folder, query: &WordQuery) -> DocumentSet {
    let (here, nested) = rayon::join(
        || {
            folder
                .documents()
                .par_iter()
                .filter(|d| query.is_match(&d.content))
                .cloned()
                .collect::<DocumentSet>()
        },
        || {
            folder
                .subfolders()
                .par_iter()
                .map(|f| matching_par(f, query))
                .reduce(DocumentSet::new, DocumentSet::merge)
        },
    );
    here.merge(nested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Folder {
        let mut sub = Folder::new("/r/sub");
        sub.add_document(Document::new("/r/sub/b.txt", "the dog The end"));
        let mut root = Folder::new("/r");
        root.add_document(Document::new("/r/a.txt", "the cat sat on the mat"));
        root.add_folder(sub);
        root.add_folder(Folder::new("/r/empty"));
        root
    }

    #[test]
    fn counts_match_in_both_modes() {
        let root = tree();
        for concurrent in [false, true] {
            assert_eq!(count_documents(&root, concurrent), 2);
            assert_eq!(count_folders(&root, concurrent), 2);
        }
        assert_eq!(count_documents(&root, false), root.size());
    }

    #[test]
    fn byte_totals_match_in_both_modes() {
        let root = tree();
        let expected = ("the cat sat on the mat".len() + "the dog The end".len()) as u64;
        assert_eq!(total_bytes(&root, false), expected);
        assert_eq!(total_bytes(&root, true), expected);
        assert_eq!(total_bytes(&Folder::new("/none"), true), 0);
    }

    #[test]
    fn search_is_case_sensitive_by_default() {
        let root = tree();
        assert_eq!(search_word(&root, "the", false).unwrap(), 3);
        assert_eq!(search_word(&root, "the", true).unwrap(), 3);
        let loose = WordQuery::with_case("the", false).unwrap();
        assert_eq!(search(&root, &loose, false), 4);
        assert_eq!(search(&root, &loose, true), 4);
    }

    #[test]
    fn search_treats_word_literally() {
        let mut root = Folder::new("/r");
        root.add_document(Document::new("/r/x", "a.b a+b axb"));
        assert_eq!(search_word(&root, "a.b", false).unwrap(), 1);
        assert_eq!(search_word(&root, "a+b", true).unwrap(), 1);
    }

    #[test]
    fn blank_word_is_rejected() {
        let root = tree();
        assert!(matches!(
            search_word(&root, "  ", false),
            Err(TreeError::InvalidArgument(_))
        ));
        assert!(matches!(
            get_documents(&root, "", true),
            Err(TreeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn documents_containing_word() {
        let root = tree();
        for concurrent in [false, true] {
            let docs = get_documents(&root, "the", concurrent).unwrap();
            let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
            assert_eq!(names, ["a.txt", "b.txt"]);
            let docs = get_documents(&root, "cat", concurrent).unwrap();
            assert_eq!(docs.len(), 1);
            assert_eq!(docs[0].name, "a.txt");
            assert!(get_documents(&root, "zebra", concurrent).unwrap().is_empty());
        }
    }

    #[test]
    fn shared_document_reported_once() {
        let shared = Arc::new(Document::new("/r/same.txt", "word"));
        let mut left = Folder::new("/r/l");
        left.add_document(Arc::clone(&shared));
        let mut right = Folder::new("/r/r");
        right.add_document(Arc::clone(&shared));
        let mut root = Folder::new("/r");
        root.add_folder(left);
        root.add_folder(right);
        let query = WordQuery::new("word").unwrap();
        for concurrent in [false, true] {
            let set: DocumentSet = collect_documents(&root, &query, concurrent);
            assert_eq!(set.len(), 1);
        }
    }
}
