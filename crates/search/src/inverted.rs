//! Inverted index over stored documents
//!
//! Term to posting map plus per-document bookkeeping so a document can be
//! replaced or removed without scanning the whole vocabulary. The index
//! stores keys and term statistics only, never document content.
//!
//! Maintenance is single-writer (extensions apply under the engine's writer
//! lock); reads are concurrent, hence the DashMap shards.

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tessera_core::ItemKey;

use crate::tokenizer::tokenize;

/// Term statistics for one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Occurrences of the term in the document
    pub tf: u32,
    /// Document length in tokens
    pub doc_len: u32,
}

#[derive(Default)]
pub struct InvertedIndex {
    /// Term -> document -> posting
    postings: DashMap<String, FxHashMap<ItemKey, Posting>>,
    /// Document -> its distinct terms, for removal
    doc_terms: DashMap<ItemKey, Vec<String>>,
    /// Document -> token count
    doc_lengths: DashMap<ItemKey, u32>,
    /// Sum of all document lengths
    total_doc_len: AtomicUsize,
}

impl InvertedIndex {
    pub fn new() -> Self {
        InvertedIndex::default()
    }

    /// Index a document's text, replacing any prior posting for the key
    ///
    /// A document that tokenizes to nothing is removed rather than indexed.
    pub fn index_document(&self, key: &ItemKey, text: &str) {
        self.remove_document(key);

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return;
        }
        let doc_len = tokens.len() as u32;

        let mut freqs: FxHashMap<String, u32> = FxHashMap::default();
        for token in tokens {
            *freqs.entry(token).or_insert(0) += 1;
        }

        let terms: Vec<String> = freqs.keys().cloned().collect();
        for (term, tf) in freqs {
            self.postings
                .entry(term)
                .or_default()
                .insert(key.clone(), Posting { tf, doc_len });
        }
        self.doc_terms.insert(key.clone(), terms);
        self.doc_lengths.insert(key.clone(), doc_len);
        self.total_doc_len.fetch_add(doc_len as usize, Ordering::Relaxed);
    }

    /// Drop a document from the index; unknown keys are a no-op
    pub fn remove_document(&self, key: &ItemKey) {
        let Some((_, terms)) = self.doc_terms.remove(key) else {
            return;
        };
        for term in terms {
            if let Some(mut entry) = self.postings.get_mut(&term) {
                entry.remove(key);
                if entry.is_empty() {
                    drop(entry);
                    self.postings.remove_if(&term, |_, docs| docs.is_empty());
                }
            }
        }
        if let Some((_, len)) = self.doc_lengths.remove(key) {
            self.total_doc_len.fetch_sub(len as usize, Ordering::Relaxed);
        }
    }

    pub fn clear(&self) {
        self.postings.clear();
        self.doc_terms.clear();
        self.doc_lengths.clear();
        self.total_doc_len.store(0, Ordering::Relaxed);
    }

    /// Number of indexed documents
    pub fn total_docs(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Number of documents containing a term
    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, |docs| docs.len())
    }

    /// Average document length in tokens; zero when empty
    pub fn avg_doc_len(&self) -> f64 {
        let docs = self.total_docs();
        if docs == 0 {
            return 0.0;
        }
        self.total_doc_len.load(Ordering::Relaxed) as f64 / docs as f64
    }

    /// Indexed keys of documents containing a term
    pub fn postings_for(&self, term: &str) -> Vec<(ItemKey, Posting)> {
        self.postings
            .get(term)
            .map(|docs| docs.iter().map(|(k, p)| (k.clone(), *p)).collect())
            .unwrap_or_default()
    }

    /// Vocabulary terms starting with a prefix
    pub fn terms_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.postings
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Whether a document is currently indexed
    pub fn contains_document(&self, key: &ItemKey) -> bool {
        self.doc_lengths.contains_key(key)
    }

    /// Keys of all indexed documents
    pub fn document_keys(&self) -> Vec<ItemKey> {
        self.doc_lengths.iter().map(|e| e.key().clone()).collect()
    }
}

impl std::fmt::Debug for InvertedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvertedIndex")
            .field("docs", &self.total_docs())
            .field("terms", &self.postings.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> ItemKey {
        ItemKey::new("docs", k)
    }

    #[test]
    fn test_index_and_lookup() {
        let index = InvertedIndex::new();
        index.index_document(&key("a"), "the quick brown fox");
        index.index_document(&key("b"), "quick quick hedgehog");

        assert_eq!(index.total_docs(), 2);
        assert_eq!(index.doc_freq("quick"), 2);
        assert_eq!(index.doc_freq("fox"), 1);
        assert_eq!(index.doc_freq("missing"), 0);

        let postings = index.postings_for("quick");
        let b = postings.iter().find(|(k, _)| k.key == "b").unwrap();
        assert_eq!(b.1.tf, 2);
        assert_eq!(b.1.doc_len, 3);
    }

    #[test]
    fn test_reindex_replaces_prior_posting() {
        let index = InvertedIndex::new();
        index.index_document(&key("a"), "alpha beta");
        index.index_document(&key("a"), "gamma delta");

        assert_eq!(index.total_docs(), 1);
        assert_eq!(index.doc_freq("alpha"), 0);
        assert_eq!(index.doc_freq("gamma"), 1);
        assert_eq!(index.avg_doc_len(), 2.0);
    }

    #[test]
    fn test_remove_document_updates_stats() {
        let index = InvertedIndex::new();
        index.index_document(&key("a"), "one two three four");
        index.index_document(&key("b"), "one two");
        index.remove_document(&key("a"));

        assert_eq!(index.total_docs(), 1);
        assert_eq!(index.avg_doc_len(), 2.0);
        assert_eq!(index.doc_freq("three"), 0);
        assert!(!index.contains_document(&key("a")));
    }

    #[test]
    fn test_empty_text_removes_instead_of_indexing() {
        let index = InvertedIndex::new();
        index.index_document(&key("a"), "something here");
        index.index_document(&key("a"), "!!!");

        assert_eq!(index.total_docs(), 0);
        assert_eq!(index.avg_doc_len(), 0.0);
    }

    #[test]
    fn test_terms_with_prefix() {
        let index = InvertedIndex::new();
        index.index_document(&key("a"), "apple application banana");

        let mut terms = index.terms_with_prefix("app");
        terms.sort();
        assert_eq!(terms, vec!["apple", "application"]);
        assert!(index.terms_with_prefix("zzz").is_empty());
    }
}
