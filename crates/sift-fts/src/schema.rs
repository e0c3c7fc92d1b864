//! Tantivy schema for the article index.
//!
//! The index holds one Tantivy document per [`LexicalDocument`]: the `id` is
//! an exact-match stored string, and the three text fields are analyzed with
//! the English stemming tokenizer registered under [`TOKENIZER_NAME`].
//!
//! [`LexicalDocument`]: crate::document::LexicalDocument

use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder, TextFieldIndexing,
    TextOptions,
};
use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer};
use tantivy::Index;

use crate::document::{BODY_BOOST, EXCERPT_BOOST, TITLE_BOOST};

/// Name of the analyzer used for all full-text fields.
pub const TOKENIZER_NAME: &str = "sift_en_stem";

/// Field handles for the article index.
#[derive(Debug, Clone)]
pub struct SearchSchema {
    schema: Schema,
    pub id: Field,
    pub title: Field,
    pub excerpt: Field,
    pub body: Field,
}

impl SearchSchema {
    /// Build the schema.
    pub fn build() -> Self {
        let mut builder = SchemaBuilder::new();

        let text_options = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(TOKENIZER_NAME)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let id = builder.add_text_field("id", STRING | STORED);
        let title = builder.add_text_field("title", text_options.clone());
        let excerpt = builder.add_text_field("excerpt", text_options.clone());
        let body = builder.add_text_field("body", text_options);

        Self {
            schema: builder.build(),
            id,
            title,
            excerpt,
            body,
        }
    }

    /// The underlying Tantivy schema.
    pub fn schema(&self) -> Schema {
        self.schema.clone()
    }

    /// Full-text fields with their query-time boosts.
    pub fn full_text_fields(&self) -> [(Field, f32); 3] {
        [
            (self.title, TITLE_BOOST),
            (self.excerpt, EXCERPT_BOOST),
            (self.body, BODY_BOOST),
        ]
    }

    /// Build the analyzer shared by indexing and querying.
    pub fn analyzer() -> TextAnalyzer {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(Stemmer::new(Language::English))
            .build()
    }

    /// Register the analyzer with an index.
    ///
    /// Must run after the index is created or opened and before any
    /// indexing or searching.
    pub fn register_tokenizers(index: &Index) {
        index.tokenizers().register(TOKENIZER_NAME, Self::analyzer());
    }
}
