//! ETL daemon entry point: load configuration, wire the pipeline, run
//! ticks until the process is stopped.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cinedex_config::Config;
use cinedex_etl::catalog::PostgresCatalog;
use cinedex_etl::index::ElasticIndex;
use cinedex_etl::pipeline::SyncPipeline;
use cinedex_etl::state::SyncState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let config = Config::from_env()?;

    let default_filter = if config.debug {
        "info,cinedex_etl=debug,cinedex_config=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "starting ETL daemon: catalog at {}:{}, search backend at {}",
        config.database.host, config.database.port, config.elastic.url
    );

    std::fs::create_dir_all(&config.etl.state_folder).with_context(|| {
        format!(
            "unable to create state folder {}",
            config.etl.state_folder.display()
        )
    })?;
    let state = SyncState::open(config.state_file());
    if let Some(started) = state.last_tick_started_at() {
        info!("resuming; previous sync started at {started}");
    }

    // The pool connects lazily: catalog availability is handled by
    // the producers' retry deadlines, not at startup.
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_lazy(&config.database.connection_url())
        .context("invalid database configuration")?;
    let catalog = PostgresCatalog::new(pool);
    let search = ElasticIndex::new(&config.elastic)?;

    SyncPipeline::new(catalog, search, state, config)
        .run()
        .await?;
    Ok(())
}
