//! Supporting-context retrieval seam.
//!
//! Each pipeline run owns a vector-store collection named after its run
//! timestamp, so concurrent runs never share state. Indexing the store is
//! outside this crate; the debate loop only issues nearest-neighbor queries
//! through this trait.

use async_trait::async_trait;

use crate::error::SymposiumError;

/// Base name of the per-run paper collection.
pub const COLLECTION_BASE_NAME: &str = "lit_review_papers";

/// Returned when a query matches nothing, or when no store is wired at all.
pub const NO_DOCUMENTS_SENTINEL: &str = "No relevant documents found in the database.";

/// Collection name for a given run timestamp.
pub fn collection_name(run_timestamp: &str) -> String {
    format!("{COLLECTION_BASE_NAME}_{run_timestamp}")
}

/// Render retrieved document chunks for inclusion in a debater prompt.
pub fn format_documents(documents: &[String]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS_SENTINEL.to_string();
    }
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("--- Document {} ---\n{}", i + 1, doc))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Nearest-neighbor retrieval against the run's collection.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Retrieve formatted supporting context for `query` from the collection
    /// belonging to `run_timestamp`.
    async fn retrieve(&self, run_timestamp: &str, query: &str)
    -> Result<String, SymposiumError>;
}

/// Stand-in retriever for runs without an indexed paper store.
pub struct NoRetrieval;

#[async_trait]
impl ContextRetriever for NoRetrieval {
    async fn retrieve(
        &self,
        _run_timestamp: &str,
        _query: &str,
    ) -> Result<String, SymposiumError> {
        Ok(NO_DOCUMENTS_SENTINEL.to_string())
    }
}
