//! Read-only access to the relational movie catalog.
//!
//! The pipeline talks to the catalog through the [`CatalogSource`]
//! port; [`PostgresCatalog`] is the production implementation. Pages
//! are ordered by `modified` ascending and bounded by the configured
//! fetch size, which is what makes the producers' cursors resumable.

mod postgres;

pub use postgres::PostgresCatalog;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cinedex_model::{GenreId, MovieId, PersonId};

use crate::error::Result;

/// A changed movie row: just enough to drive a cursor and a dedup
/// check before the full row is fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieChange {
    pub id: MovieId,
    pub modified: DateTime<Utc>,
}

/// A person row as paged out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRow {
    pub id: PersonId,
    pub full_name: String,
    pub modified: DateTime<Utc>,
}

/// A genre row as paged out of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreRow {
    pub id: GenreId,
    pub name: String,
    pub description: Option<String>,
    pub modified: DateTime<Utc>,
}

/// A movie with its person and genre joins aggregated into parallel
/// arrays.
///
/// The arrays come from `array_agg` over left joins, so a movie with
/// no credits yields a single uniformly-null triple rather than empty
/// arrays. The transformer depends on that encoding; a triple that is
/// only partially null is a data integrity error.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieSourceRow {
    pub id: MovieId,
    pub title: String,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub genre_names: Vec<Option<String>>,
    pub genre_ids: Vec<Option<Uuid>>,
    pub person_names: Vec<Option<String>>,
    pub person_roles: Vec<Option<String>>,
    pub person_ids: Vec<Option<Uuid>>,
}

/// Port over the five catalog queries the producers page through.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Movies whose own row changed after `after`.
    async fn movies_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>>;

    /// Persons changed after `after`.
    async fn persons_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PersonRow>>;

    /// Genres changed after `after`.
    async fn genres_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<GenreRow>>;

    /// Movies credited to any of `persons`, filtered by the movie's
    /// own `modified` for inner-cursor pagination.
    async fn movies_for_persons(
        &self,
        persons: &[PersonId],
        movies_after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>>;

    /// Movies carrying any of `genres`, filtered by the movie's own
    /// `modified` for inner-cursor pagination.
    async fn movies_for_genres(
        &self,
        genres: &[GenreId],
        movies_after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>>;

    /// Full movie rows (with aggregated joins) for the given ids.
    async fn movies_by_ids(
        &self,
        ids: &[MovieId],
    ) -> Result<Vec<MovieSourceRow>>;
}
