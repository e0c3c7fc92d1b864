//! Query construction for the Tantivy backend.
//!
//! Every analyzed query term becomes a `Should` clause per full-text field,
//! boosted by that field's weight. A document matches if any term matches
//! any field, so the Tantivy score is the boosted BM25 sum across fields.

use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, TermQuery};
use tantivy::schema::IndexRecordOption;
use tantivy::tokenizer::TokenStream;
use tantivy::Term;

use crate::schema::SearchSchema;

/// Builds boosted OR queries over the article fields.
pub struct QueryBuilder<'a> {
    schema: &'a SearchSchema,
}

impl<'a> QueryBuilder<'a> {
    /// Create a new query builder.
    pub fn new(schema: &'a SearchSchema) -> Self {
        Self { schema }
    }

    /// Build a query from already-normalized text.
    ///
    /// Returns `None` when no term survives analysis.
    pub fn build_query(&self, text: &str) -> Option<Box<dyn Query>> {
        let mut terms = analyze(text);
        terms.sort();
        terms.dedup();
        if terms.is_empty() {
            return None;
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in self.schema.full_text_fields() {
            for token in &terms {
                let term = Term::from_field_text(field, token);
                let query = TermQuery::new(term, IndexRecordOption::WithFreqs);
                clauses.push((Occur::Should, Box::new(BoostQuery::new(Box::new(query), boost))));
            }
        }

        Some(Box::new(BooleanQuery::new(clauses)))
    }
}

/// Run text through the same analyzer used at index time.
///
/// Returns stemmed, lowercased tokens ("elections" becomes "elect").
pub fn analyze(text: &str) -> Vec<String> {
    let mut analyzer = SearchSchema::analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next() {
        tokens.push(token.text.clone());
    }
    tokens
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_stems_and_lowercases() {
        let tokens = analyze("Elections RUNNING");
        assert_eq!(tokens, vec!["elect", "run"]);
    }

    #[test]
    fn test_build_query_empty() {
        let schema = SearchSchema::build();
        let builder = QueryBuilder::new(&schema);
        assert!(builder.build_query("   ").is_none());
        assert!(builder.build_query("!!!").is_none());
    }

    #[test]
    fn test_build_query_terms() {
        let schema = SearchSchema::build();
        let builder = QueryBuilder::new(&schema);
        assert!(builder.build_query("healthcare policy").is_some());
    }
}
