//! The full-text search extension
//!
//! A `FullTextSearch` pairs a text handler with an inverted index and keeps
//! the index current across commits. The handler maps a record to named text
//! columns; the columns are concatenated (in column-name order, so the
//! document is deterministic) into the one document that gets indexed.
//! Returning `None` keeps the record out of the index.
//!
//! Searches score with BM25 and AND together the query's terms. A prefix
//! term expands to every matching vocabulary term; a document matches the
//! prefix if it contains any of them, scoring the sum of the expansions.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tessera_core::{
    Change, ChangeSet, Extension, ItemKey, Record, Result, StoreReader, Value,
};

use crate::inverted::InvertedIndex;
use crate::query::{SearchQuery, Term};
use crate::scorer::Bm25;

/// Per-column text produced by a text handler
pub type ColumnText = HashMap<String, String>;

type TextFn = dyn Fn(&ItemKey, &Record) -> Option<ColumnText> + Send + Sync;

/// Extracts searchable text columns from a record
#[derive(Clone)]
pub struct TextHandler {
    f: Arc<TextFn>,
}

impl TextHandler {
    /// Extract from the record's value
    pub fn by_value<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Value) -> Option<ColumnText> + Send + Sync + 'static,
    {
        TextHandler {
            f: Arc::new(move |key, record| f(key, &record.value)),
        }
    }

    /// Extract from the record's metadata
    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, Option<&Value>) -> Option<ColumnText> + Send + Sync + 'static,
    {
        TextHandler {
            f: Arc::new(move |key, record| f(key, record.metadata.as_ref())),
        }
    }

    /// Extract from the whole record
    pub fn by_record<F>(f: F) -> Self
    where
        F: Fn(&ItemKey, &Record) -> Option<ColumnText> + Send + Sync + 'static,
    {
        TextHandler { f: Arc::new(f) }
    }

    pub fn extract(&self, key: &ItemKey, record: &Record) -> Option<ColumnText> {
        (self.f)(key, record)
    }
}

impl std::fmt::Debug for TextHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TextHandler")
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub key: ItemKey,
    pub score: f64,
}

/// A registered full-text search extension
pub struct FullTextSearch {
    name: String,
    handler: TextHandler,
    collections: Option<HashSet<String>>,
    index: InvertedIndex,
    scorer: Bm25,
}

impl FullTextSearch {
    pub fn new(name: impl Into<String>, handler: TextHandler) -> Self {
        FullTextSearch {
            name: name.into(),
            handler,
            collections: None,
            index: InvertedIndex::new(),
            scorer: Bm25::default(),
        }
    }

    /// Restrict indexing to records in the given collections
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    /// Number of indexed documents
    pub fn indexed_docs(&self) -> usize {
        self.index.total_docs()
    }

    fn collection_allowed(&self, collection: &str) -> bool {
        match &self.collections {
            Some(allowed) => allowed.contains(collection),
            None => true,
        }
    }

    /// Index or unindex one record according to the handler
    fn place(&self, key: &ItemKey, record: &Record) {
        match self.handler.extract(key, record) {
            Some(columns) => {
                // Column-name order keeps the concatenated document stable
                let ordered: BTreeMap<String, String> = columns.into_iter().collect();
                let document = ordered.values().cloned().collect::<Vec<_>>().join("\n");
                self.index.index_document(key, &document);
            }
            None => self.index.remove_document(key),
        }
    }

    /// Parse and run a query
    pub fn search(&self, query: &str) -> Vec<SearchMatch> {
        self.execute(&SearchQuery::parse(query))
    }

    /// Run a parsed query: AND all terms, score with BM25
    ///
    /// Results are sorted by descending score; equal scores order by key.
    pub fn execute(&self, query: &SearchQuery) -> Vec<SearchMatch> {
        if query.is_empty() {
            return Vec::new();
        }

        let mut combined: Option<FxHashMap<ItemKey, f64>> = None;
        for term in query.terms() {
            let scores = self.term_scores(term);
            if scores.is_empty() {
                return Vec::new();
            }
            combined = Some(match combined {
                None => scores,
                Some(prev) => {
                    let mut merged = FxHashMap::default();
                    for (key, score) in scores {
                        if let Some(acc) = prev.get(&key) {
                            merged.insert(key, acc + score);
                        }
                    }
                    merged
                }
            });
            if combined.as_ref().is_some_and(FxHashMap::is_empty) {
                return Vec::new();
            }
        }

        let mut matches: Vec<SearchMatch> = combined
            .unwrap_or_default()
            .into_iter()
            .map(|(key, score)| SearchMatch { key, score })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.key.cmp(&b.key))
        });
        matches
    }

    /// Score all documents matching one query term
    fn term_scores(&self, term: &Term) -> FxHashMap<ItemKey, f64> {
        let vocabulary: Vec<String> = if term.prefix {
            self.index.terms_with_prefix(&term.text)
        } else {
            vec![term.text.clone()]
        };

        let total_docs = self.index.total_docs();
        let avg_doc_len = self.index.avg_doc_len();
        let mut scores: FxHashMap<ItemKey, f64> = FxHashMap::default();
        for word in vocabulary {
            let doc_freq = self.index.doc_freq(&word);
            for (key, posting) in self.index.postings_for(&word) {
                let score = self.scorer.score(
                    posting.tf,
                    posting.doc_len,
                    avg_doc_len,
                    total_docs,
                    doc_freq,
                );
                *scores.entry(key).or_insert(0.0) += score;
            }
        }
        scores
    }
}

impl Extension for FullTextSearch {
    fn name(&self) -> &str {
        &self.name
    }

    fn repopulate(&self, reader: &dyn StoreReader) -> Result<()> {
        self.index.clear();
        for collection in reader.collections() {
            if !self.collection_allowed(&collection) {
                continue;
            }
            for (key, vr) in reader.scan_collection(&collection) {
                self.place(&key, &vr.record);
            }
        }
        Ok(())
    }

    fn apply(&self, changes: &ChangeSet, _reader: &dyn StoreReader) -> Result<()> {
        for change in &changes.changes {
            match change {
                Change::Put { key, record } => {
                    if self.collection_allowed(&key.collection) {
                        self.place(key, record);
                    }
                }
                Change::Remove { key } => {
                    self.index.remove_document(key);
                }
                Change::RemoveCollection { collection } => {
                    for key in self.index.document_keys() {
                        if key.collection == *collection {
                            self.index.remove_document(&key);
                        }
                    }
                }
                Change::RemoveAll => {
                    self.index.clear();
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FullTextSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullTextSearch")
            .field("name", &self.name)
            .field("docs", &self.indexed_docs())
            .finish()
    }
}
