//! The five resumable producers that stream changed rows downstream.
//!
//! Every producer pages through the catalog in ascending `modified`
//! order, pushes what it finds into the loader, and advances its
//! durable cursor to the last row of each page before fetching the
//! next one, so an aborted tick resumes exactly where it stopped.
//!
//! Movies are reached three ways: through their own row, and through
//! fan-out from changed persons and changed genres (editing a person
//! or genre does not touch the movie row, so the movie cursor alone
//! would miss those). The per-tick `movies` dedup bucket keeps a
//! movie from being shipped more than once per tick regardless of
//! which producer saw it first.

use tracing::debug;

use cinedex_model::MovieId;

use crate::catalog::{CatalogSource, MovieChange};
use crate::error::Result;
use crate::index::SearchIndex;
use crate::loader::BulkLoader;
use crate::retry::{RetryPolicy, retry};
use crate::state::{Cursor, SyncBucket, SyncState, default_date};
use crate::transform;

/// Shared producer tuning: catalog page size and the retry policy for
/// catalog I/O.
#[derive(Debug, Clone, Copy)]
pub struct ProducerSettings {
    pub fetch_by: i64,
    pub catalog_retry: RetryPolicy,
}

/// Movies whose own row changed.
pub async fn movies_by_movie_change<C, S>(
    catalog: &C,
    state: &mut SyncState,
    loader: &mut BulkLoader<'_, S>,
    settings: ProducerSettings,
) -> Result<()>
where
    C: CatalogSource + ?Sized,
    S: SearchIndex + ?Sized,
{
    let started_from = state.cursor(Cursor::MovieSyncedAt);
    let mut cursor = started_from;

    loop {
        let page = retry(settings.catalog_retry, "fetch changed movies", || {
            catalog.movies_changed_after(cursor, settings.fetch_by)
        })
        .await?;
        let Some(page_end) = page.last().map(|m| m.modified) else {
            break;
        };

        forward_movies(catalog, state, loader, settings, &page).await?;

        debug!("synced movies changed after {cursor}, looking for more");
        cursor = page_end;
        state.set_cursor(Cursor::MovieSyncedAt, cursor)?;
    }

    debug!("finished with movies changed after {started_from}");
    Ok(())
}

/// Movies reached through changed persons.
///
/// The outer cursor walks persons; for each person batch the inner
/// cursor walks the linked movies from the epoch sentinel (the movie
/// rows themselves are unchanged). The outer cursor only advances
/// once its inner loop drains, so an abort mid-batch re-runs that
/// batch next tick.
pub async fn movies_by_person_change<C, S>(
    catalog: &C,
    state: &mut SyncState,
    loader: &mut BulkLoader<'_, S>,
    settings: ProducerSettings,
) -> Result<()>
where
    C: CatalogSource + ?Sized,
    S: SearchIndex + ?Sized,
{
    let started_from = state.cursor(Cursor::PersonForMoviesSyncedAt);
    let mut person_cursor = started_from;

    loop {
        let persons = retry(settings.catalog_retry, "fetch changed persons", || {
            catalog.persons_changed_after(person_cursor, settings.fetch_by)
        })
        .await?;
        let Some(batch_end) = persons.last().map(|p| p.modified) else {
            break;
        };
        let person_ids: Vec<_> = persons.iter().map(|p| p.id).collect();

        let mut movie_cursor = default_date();
        loop {
            let linked =
                retry(settings.catalog_retry, "fetch movies by persons", || {
                    catalog.movies_for_persons(
                        &person_ids,
                        movie_cursor,
                        settings.fetch_by,
                    )
                })
                .await?;
            let Some(page_end) = linked.last().map(|m| m.modified) else {
                break;
            };

            forward_movies(catalog, state, loader, settings, &linked).await?;

            debug!(
                "synced movies after {movie_cursor} for persons changed \
                 after {person_cursor}, looking for more movies"
            );
            movie_cursor = page_end;
        }

        person_cursor = batch_end;
        state.set_cursor(Cursor::PersonForMoviesSyncedAt, person_cursor)?;
    }

    debug!("finished with movies linked to persons changed after {started_from}");
    Ok(())
}

/// Movies reached through changed genres; mirrors the person fan-out.
pub async fn movies_by_genre_change<C, S>(
    catalog: &C,
    state: &mut SyncState,
    loader: &mut BulkLoader<'_, S>,
    settings: ProducerSettings,
) -> Result<()>
where
    C: CatalogSource + ?Sized,
    S: SearchIndex + ?Sized,
{
    let started_from = state.cursor(Cursor::GenreSyncedAt);
    let mut genre_cursor = started_from;

    loop {
        let genres = retry(settings.catalog_retry, "fetch changed genres", || {
            catalog.genres_changed_after(genre_cursor, settings.fetch_by)
        })
        .await?;
        let Some(batch_end) = genres.last().map(|g| g.modified) else {
            break;
        };
        let genre_ids: Vec<_> = genres.iter().map(|g| g.id).collect();

        let mut movie_cursor = default_date();
        loop {
            let linked =
                retry(settings.catalog_retry, "fetch movies by genres", || {
                    catalog.movies_for_genres(
                        &genre_ids,
                        movie_cursor,
                        settings.fetch_by,
                    )
                })
                .await?;
            let Some(page_end) = linked.last().map(|m| m.modified) else {
                break;
            };

            forward_movies(catalog, state, loader, settings, &linked).await?;

            debug!(
                "synced movies after {movie_cursor} for genres changed \
                 after {genre_cursor}, looking for more movies"
            );
            movie_cursor = page_end;
        }

        genre_cursor = batch_end;
        state.set_cursor(Cursor::GenreSyncedAt, genre_cursor)?;
    }

    debug!("finished with movies linked to genres changed after {started_from}");
    Ok(())
}

/// Changed genres, shipped to the genres index directly (no fan-out).
pub async fn genres_by_genre_change<C, S>(
    catalog: &C,
    state: &mut SyncState,
    loader: &mut BulkLoader<'_, S>,
    settings: ProducerSettings,
) -> Result<()>
where
    C: CatalogSource + ?Sized,
    S: SearchIndex + ?Sized,
{
    let started_from = state.cursor(Cursor::GenreForGenresSyncedAt);
    let mut cursor = started_from;

    loop {
        let page = retry(settings.catalog_retry, "fetch changed genres", || {
            catalog.genres_changed_after(cursor, settings.fetch_by)
        })
        .await?;
        let Some(page_end) = page.last().map(|g| g.modified) else {
            break;
        };

        for genre in page {
            let id = genre.id.to_uuid();
            if state.is_synced(SyncBucket::Genres, id) {
                continue;
            }
            loader.push(&transform::genre_document(genre)).await?;
            state.mark_synced(SyncBucket::Genres, &[id])?;
        }

        debug!("synced genres changed after {cursor}, looking for more");
        cursor = page_end;
        state.set_cursor(Cursor::GenreForGenresSyncedAt, cursor)?;
    }

    debug!("finished with genres changed after {started_from}");
    Ok(())
}

/// Changed persons, shipped to the persons index directly (no
/// fan-out; movies referencing them are handled by
/// [`movies_by_person_change`]).
pub async fn persons_by_person_change<C, S>(
    catalog: &C,
    state: &mut SyncState,
    loader: &mut BulkLoader<'_, S>,
    settings: ProducerSettings,
) -> Result<()>
where
    C: CatalogSource + ?Sized,
    S: SearchIndex + ?Sized,
{
    let started_from = state.cursor(Cursor::PersonSyncedAt);
    let mut cursor = started_from;

    loop {
        let page = retry(settings.catalog_retry, "fetch changed persons", || {
            catalog.persons_changed_after(cursor, settings.fetch_by)
        })
        .await?;
        let Some(page_end) = page.last().map(|p| p.modified) else {
            break;
        };

        for person in page {
            let id = person.id.to_uuid();
            if state.is_synced(SyncBucket::Persons, id) {
                continue;
            }
            loader.push(&transform::person_document(person)).await?;
            state.mark_synced(SyncBucket::Persons, &[id])?;
        }

        debug!("synced persons changed after {cursor}, looking for more");
        cursor = page_end;
        state.set_cursor(Cursor::PersonSyncedAt, cursor)?;
    }

    debug!("finished with persons changed after {started_from}");
    Ok(())
}

/// Fetch the full rows for the not-yet-synced movies in a page and
/// push them downstream, marking each one synced as it ships.
async fn forward_movies<C, S>(
    catalog: &C,
    state: &mut SyncState,
    loader: &mut BulkLoader<'_, S>,
    settings: ProducerSettings,
    page: &[MovieChange],
) -> Result<()>
where
    C: CatalogSource + ?Sized,
    S: SearchIndex + ?Sized,
{
    let pending: Vec<MovieId> = page
        .iter()
        .filter(|m| !state.is_synced(SyncBucket::Movies, m.id.to_uuid()))
        .map(|m| m.id)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let rows = retry(settings.catalog_retry, "fetch full movies", || {
        catalog.movies_by_ids(&pending)
    })
    .await?;

    for row in rows {
        let id = row.id.to_uuid();
        loader.push(&transform::movie_document(row)?).await?;
        state.mark_synced(SyncBucket::Movies, &[id])?;
    }

    Ok(())
}
