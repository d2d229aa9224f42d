//! Search query parsing
//!
//! Queries are whitespace-separated terms with AND semantics: a document must
//! match every term. A trailing `*` on a word turns it into a prefix term
//! matching any vocabulary term that starts with it. Terms run through the
//! same tokenizer as documents, so case and punctuation never matter.

use crate::tokenizer::tokenize;

/// One parsed query term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    /// Match any vocabulary term starting with `text`
    pub prefix: bool,
}

/// A parsed search query: the conjunction of its terms
///
/// An empty query (no surviving terms) matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    terms: Vec<Term>,
}

impl SearchQuery {
    /// Parse user input into query terms
    pub fn parse(input: &str) -> Self {
        let mut terms = Vec::new();
        for word in input.split_whitespace() {
            let prefix = word.ends_with('*');
            let tokens = tokenize(word);
            let last = tokens.len().saturating_sub(1);
            for (i, token) in tokens.into_iter().enumerate() {
                let term = Term {
                    prefix: prefix && i == last,
                    text: token,
                };
                if !terms.contains(&term) {
                    terms.push(term);
                }
            }
        }
        SearchQuery { terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Whether the query can match anything at all
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&term.text)?;
            if term.prefix {
                f.write_str("*")?;
            }
        }
        Ok(())
    }
}
