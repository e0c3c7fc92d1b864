//! Writes [`LexicalDocument`]s into an on-disk Tantivy index.

use std::path::Path;

use sift_core::{Error, Result};
use tantivy::{doc, Index, IndexWriter};

use crate::document::LexicalDocument;
use crate::schema::SearchSchema;

/// Writer heap size for index builds.
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Builds a Tantivy index from documents.
pub struct Indexer {
    writer: IndexWriter,
    schema: SearchSchema,
    added: usize,
}

impl Indexer {
    /// Create a fresh index at `path`.
    ///
    /// The directory is created if missing and must not already hold an index.
    pub fn new(path: &Path, schema: &SearchSchema) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| Error::io_with_path(e, path))?;

        let index = Index::create_in_dir(path, schema.schema())
            .map_err(|e| Error::operation(format!("Failed to create index: {e}")))?;
        SearchSchema::register_tokenizers(&index);

        let writer = index
            .writer(WRITER_HEAP_BYTES)
            .map_err(|e| Error::operation(format!("Failed to create index writer: {e}")))?;

        Ok(Self {
            writer,
            schema: schema.clone(),
            added: 0,
        })
    }

    /// Queue one document for indexing.
    pub fn add_document(&mut self, document: &LexicalDocument) -> Result<()> {
        self.writer
            .add_document(doc!(
                self.schema.id => document.id.as_str(),
                self.schema.title => document.title.as_str(),
                self.schema.excerpt => document.excerpt.as_str(),
                self.schema.body => document.body.as_str(),
            ))
            .map_err(|e| Error::operation(format!("Failed to add document {}: {e}", document.id)))?;
        self.added += 1;
        Ok(())
    }

    /// Commit queued documents, returning how many were added.
    pub fn commit(&mut self) -> Result<usize> {
        self.writer
            .commit()
            .map_err(|e| Error::operation(format!("Failed to commit index: {e}")))?;
        log::info!("Committed {} documents to index", self.added);
        Ok(self.added)
    }
}

/// Build a complete index at `path` from `documents`.
pub fn build_index(path: &Path, documents: &[LexicalDocument]) -> Result<usize> {
    let schema = SearchSchema::build();
    let mut indexer = Indexer::new(path, &schema)?;
    for document in documents {
        indexer.add_document(document)?;
    }
    indexer.commit()
}

impl std::fmt::Debug for Indexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indexer").field("added", &self.added).finish()
    }
}
