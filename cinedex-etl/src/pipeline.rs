//! The tick scheduler: one full synchronization pass per interval.
//!
//! A tick provisions the indexes, records its start time, then runs
//! the movies dataflow (all three movie producers feeding one
//! loader), the genres dataflow, and the persons dataflow, and
//! finally rolls the per-tick dedup sets over. A tick that fails simply
//! does not reach `complete_tick`, so the next tick resumes from the
//! last durable cursors with the dedup sets still in place.

use chrono::Utc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use cinedex_config::Config;

use crate::catalog::CatalogSource;
use crate::error::Result;
use crate::index::{self, SearchIndex};
use crate::loader::BulkLoader;
use crate::producers::{self, ProducerSettings};
use crate::retry::RetryPolicy;
use crate::state::SyncState;

/// Owns the pipeline's collaborators and runs the unbounded tick
/// loop.
pub struct SyncPipeline<C, S> {
    catalog: C,
    search: S,
    state: SyncState,
    config: Config,
}

impl<C, S> SyncPipeline<C, S>
where
    C: CatalogSource,
    S: SearchIndex,
{
    pub fn new(
        catalog: C,
        search: S,
        state: SyncState,
        config: Config,
    ) -> Self {
        Self {
            catalog,
            search,
            state,
            config,
        }
    }

    /// Run ticks forever.
    ///
    /// Tick failures are logged and retried on the next interval;
    /// only exhausted index provisioning escapes, taking the process
    /// down with a non-zero exit.
    pub async fn run(mut self) -> Result<()> {
        let mut ticker = interval(self.config.check_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            index::ensure_indexes(&self.search, &self.config.elastic)
                .await?;

            info!("starting full sync");
            match self.run_tick().await {
                Ok(()) => info!("full sync completed, sleeping"),
                Err(err) => {
                    error!("sync aborted, will retry next tick: {err}")
                }
            }
        }
    }

    /// One full synchronization pass over all three indexes.
    pub async fn run_tick(&mut self) -> Result<()> {
        self.state.begin_tick(Utc::now())?;

        let settings = ProducerSettings {
            fetch_by: self.config.database.fetch_by,
            catalog_retry: RetryPolicy::exponential(
                self.config.database.retry_deadline(),
            ),
        };
        let bulk_retry = RetryPolicy::exponential(
            self.config.elastic.connect_deadline(),
        );
        let batch_size = self.config.elastic.load_by;

        // Movies: all three producers share one loader so the dedup
        // bucket spans them, then a single flush closes the flow.
        //
        // The loader is closed even when a producer fails: cursors
        // and the dedup bucket have already durably advanced past the
        // buffered documents, so abandoning the buffer would skip
        // those rows forever.
        let mut movies = BulkLoader::new(
            &self.search,
            self.config.elastic.movies_index.clone(),
            batch_size,
            bulk_retry,
        );
        let mut produced = producers::movies_by_genre_change(
            &self.catalog,
            &mut self.state,
            &mut movies,
            settings,
        )
        .await;
        if produced.is_ok() {
            produced = producers::movies_by_movie_change(
                &self.catalog,
                &mut self.state,
                &mut movies,
                settings,
            )
            .await;
        }
        if produced.is_ok() {
            produced = producers::movies_by_person_change(
                &self.catalog,
                &mut self.state,
                &mut movies,
                settings,
            )
            .await;
        }
        let closed = movies.close().await;
        produced?;
        closed?;

        let mut genres = BulkLoader::new(
            &self.search,
            self.config.elastic.genres_index.clone(),
            batch_size,
            bulk_retry,
        );
        let produced = producers::genres_by_genre_change(
            &self.catalog,
            &mut self.state,
            &mut genres,
            settings,
        )
        .await;
        let closed = genres.close().await;
        produced?;
        closed?;

        let mut persons = BulkLoader::new(
            &self.search,
            self.config.elastic.persons_index.clone(),
            batch_size,
            bulk_retry,
        );
        let produced = producers::persons_by_person_change(
            &self.catalog,
            &mut self.state,
            &mut persons,
            settings,
        )
        .await;
        let closed = persons.close().await;
        produced?;
        closed?;

        self.state.complete_tick()?;
        Ok(())
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }
}
