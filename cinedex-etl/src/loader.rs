//! Batching sink in front of the search backend.
//!
//! Producers push documents one at a time; the loader accumulates
//! them into batches of the configured size and submits each batch as
//! a single bulk upsert, retrying transient failures. `close` flushes
//! whatever is left, so a tick never strands a partial batch.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use cinedex_model::{GenreDocument, MovieDocument, PersonDocument};

use crate::error::Result;
use crate::index::SearchIndex;
use crate::retry::{RetryPolicy, retry};

/// A document addressable by id in a search index.
pub trait IndexDocument: Serialize {
    fn doc_id(&self) -> Uuid;
}

impl IndexDocument for MovieDocument {
    fn doc_id(&self) -> Uuid {
        self.id.to_uuid()
    }
}

impl IndexDocument for GenreDocument {
    fn doc_id(&self) -> Uuid {
        self.id.to_uuid()
    }
}

impl IndexDocument for PersonDocument {
    fn doc_id(&self) -> Uuid {
        self.id.to_uuid()
    }
}

/// Accumulates documents for one target index and submits them in
/// bulk. Upserts are keyed by document id, so re-running an aborted
/// tick converges instead of duplicating.
pub struct BulkLoader<'a, S: SearchIndex + ?Sized> {
    search: &'a S,
    index: String,
    batch_size: usize,
    policy: RetryPolicy,
    buffer: Vec<(Uuid, serde_json::Value)>,
    loaded: usize,
}

impl<'a, S: SearchIndex + ?Sized> BulkLoader<'a, S> {
    pub fn new(
        search: &'a S,
        index: impl Into<String>,
        batch_size: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            search,
            index: index.into(),
            batch_size,
            policy,
            buffer: Vec::with_capacity(batch_size),
            loaded: 0,
        }
    }

    /// Queue a document; submits the current batch once it reaches the
    /// configured size.
    pub async fn push<D: IndexDocument>(&mut self, document: &D) -> Result<()> {
        let body = serde_json::to_value(document)?;
        self.buffer.push((document.doc_id(), body));
        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Submit any remaining documents and report the tick's total.
    pub async fn close(mut self) -> Result<()> {
        self.flush().await?;
        info!(
            "loaded {} documents into {} during this iteration",
            self.loaded, self.index
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.buffer);
        retry(self.policy, "bulk submit", || {
            self.search.bulk_upsert(&self.index, &batch)
        })
        .await?;
        self.loaded += batch.len();
        Ok(())
    }
}
