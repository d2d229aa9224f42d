//! Full-text search for tesseradb
//!
//! An inverted index maintained by the `FullTextSearch` extension, BM25
//! scoring, a small query language (AND terms, trailing-`*` prefixes), a
//! search-results view that projects matches through a parent view, and a
//! queue for coalescing type-ahead queries.

pub mod fts;
pub mod inverted;
pub mod query;
pub mod queue;
pub mod results_view;
pub mod scorer;
pub mod tokenizer;

pub use fts::{ColumnText, FullTextSearch, SearchMatch, TextHandler};
pub use inverted::{InvertedIndex, Posting};
pub use query::{SearchQuery, Term};
pub use queue::SearchQueue;
pub use results_view::SearchResultsView;
pub use scorer::Bm25;
pub use tokenizer::{tokenize, tokenize_unique};
