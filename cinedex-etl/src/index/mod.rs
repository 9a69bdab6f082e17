//! The search backend boundary.
//!
//! [`SearchIndex`] is the port the loader and provisioner talk to;
//! [`ElasticIndex`] is the production implementation. Provisioning is
//! idempotent: it runs at the top of every tick and only does work
//! when an index is missing.

mod elastic;
pub mod mappings;

pub use elastic::ElasticIndex;

use std::time::Duration;

use async_trait::async_trait;
use cinedex_config::ElasticConfig;
use uuid::Uuid;

use crate::error::Result;
use crate::retry::{RetryPolicy, retry};

/// Interval between provisioning attempts while the backend is
/// still coming up.
const PROVISION_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Port over the search backend: bulk document upserts plus
/// idempotent index creation.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Upsert the given documents (id + serialized body) into `index`
    /// in one submission. Partial failures reported by the backend
    /// must surface as errors, not silent drops.
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[(Uuid, serde_json::Value)],
    ) -> Result<()>;

    /// Create `index` with `mapping` if it does not already exist.
    async fn create_index(
        &self,
        index: &str,
        mapping: &serde_json::Value,
    ) -> Result<()>;
}

/// Make sure all three indexes exist before producers run.
///
/// Provisioning failures are retried on a fixed interval until the
/// startup deadline; exhaustion is process-fatal, not tick-fatal.
pub async fn ensure_indexes<S>(
    search: &S,
    config: &ElasticConfig,
) -> Result<()>
where
    S: SearchIndex + ?Sized,
{
    let policy = RetryPolicy::constant(
        PROVISION_RETRY_INTERVAL,
        config.startup_deadline(),
    );

    let wanted = [
        (&config.movies_index, mappings::movies()),
        (&config.genres_index, mappings::genres()),
        (&config.persons_index, mappings::persons()),
    ];

    for (name, mapping) in wanted {
        retry(policy, "provision index", || {
            search.create_index(name, &mapping)
        })
        .await?;
    }

    Ok(())
}
