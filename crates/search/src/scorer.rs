//! BM25 relevance scoring
//!
//! Standard BM25 with the usual defaults (k1 = 1.2, b = 0.75) and a smoothed
//! IDF, `ln((N - df + 0.5) / (df + 0.5) + 1)`, which stays positive even for
//! terms present in most documents.

/// BM25 parameters
#[derive(Debug, Clone, Copy)]
pub struct Bm25 {
    /// Term-frequency saturation
    pub k1: f64,
    /// Document-length normalization strength
    pub b: f64,
}

impl Default for Bm25 {
    fn default() -> Self {
        Bm25 { k1: 1.2, b: 0.75 }
    }
}

impl Bm25 {
    /// Score one term's contribution for one document
    pub fn score(
        &self,
        tf: u32,
        doc_len: u32,
        avg_doc_len: f64,
        total_docs: usize,
        doc_freq: usize,
    ) -> f64 {
        if tf == 0 || total_docs == 0 || doc_freq == 0 {
            return 0.0;
        }
        let idf = self.idf(total_docs, doc_freq);
        let tf = tf as f64;
        let norm = if avg_doc_len > 0.0 {
            1.0 - self.b + self.b * (doc_len as f64 / avg_doc_len)
        } else {
            1.0
        };
        idf * (tf * (self.k1 + 1.0)) / (tf + self.k1 * norm)
    }

    fn idf(&self, total_docs: usize, doc_freq: usize) -> f64 {
        let n = total_docs as f64;
        let df = doc_freq as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarer_terms_score_higher() {
        let bm25 = Bm25::default();
        let rare = bm25.score(1, 10, 10.0, 100, 1);
        let common = bm25.score(1, 10, 10.0, 100, 90);
        assert!(rare > common);
        assert!(common > 0.0);
    }

    #[test]
    fn test_tf_saturates() {
        let bm25 = Bm25::default();
        let once = bm25.score(1, 10, 10.0, 100, 5);
        let thrice = bm25.score(3, 10, 10.0, 100, 5);
        let many = bm25.score(50, 10, 10.0, 100, 5);
        assert!(thrice > once);
        // Gains shrink as tf grows
        assert!(many - thrice < thrice - once);
    }

    #[test]
    fn test_shorter_docs_score_higher_at_equal_tf() {
        let bm25 = Bm25::default();
        let short = bm25.score(2, 5, 20.0, 100, 5);
        let long = bm25.score(2, 80, 20.0, 100, 5);
        assert!(short > long);
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        let bm25 = Bm25::default();
        assert_eq!(bm25.score(0, 10, 10.0, 100, 5), 0.0);
        assert_eq!(bm25.score(1, 10, 10.0, 0, 0), 0.0);
    }
}
