//! Lexical backend over an on-disk Tantivy index.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sift_fts::{LexicalBackend, TantivySearch};
//!
//! let backend = TantivySearch::open("/var/lib/sift/index")?;
//! let hits = backend.search("healthcare policy", 10).await?;
//! ```

use std::path::Path;

use async_trait::async_trait;
use sift_core::{Error, Result, RetrievalHit};
use tantivy::collector::TopDocs;
use tantivy::schema::Value;
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument};

use crate::backend::LexicalBackend;
use crate::query::QueryBuilder;
use crate::schema::SearchSchema;

/// Tantivy-based lexical backend.
pub struct TantivySearch {
    reader: IndexReader,
    schema: SearchSchema,
}

impl TantivySearch {
    /// Open an existing index directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::not_found("Index", path.display().to_string()));
        }

        let index = Index::open_in_dir(path)
            .map_err(|e| Error::operation(format!("Failed to open index: {e}")))?;
        SearchSchema::register_tokenizers(&index);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| Error::operation(format!("Failed to create reader: {e}")))?;

        Ok(Self {
            reader,
            schema: SearchSchema::build(),
        })
    }

    fn run(&self, text: &str, limit: usize) -> Result<Vec<RetrievalHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let Some(query) = QueryBuilder::new(&self.schema).build_query(text) else {
            return Ok(Vec::new());
        };

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(query.as_ref(), &TopDocs::with_limit(limit))
            .map_err(|e| Error::retrieval(sift_core::Source::Lexical, e.to_string()))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| Error::operation(format!("Failed to retrieve document: {e}")))?;
            let Some(id) = doc.get_first(self.schema.id).and_then(|v| v.as_str()) else {
                log::warn!("Indexed document without id at {address:?}");
                continue;
            };
            hits.push(RetrievalHit::lexical(id, score));
        }

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        Ok(hits)
    }
}

#[async_trait]
impl LexicalBackend for TantivySearch {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<RetrievalHit>> {
        self.run(text, limit)
    }

    fn name(&self) -> &str {
        "tantivy"
    }

    fn document_count(&self) -> Result<usize> {
        Ok(self.reader.searcher().num_docs() as usize)
    }
}

impl std::fmt::Debug for TantivySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivySearch").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
