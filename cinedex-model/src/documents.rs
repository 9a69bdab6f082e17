//! Denormalized document shapes stored in the search indexes.
//!
//! These are the wire types the ETL writes and the read API consumes.
//! Every document's `id` equals the source row's primary key, so a
//! re-run of the pipeline upserts in place.

use crate::ids::{GenreId, MovieId, PersonId};

/// Nested person reference inside a movie document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PersonEntry {
    pub id: PersonId,
    pub name: String,
}

/// Nested genre reference inside a movie document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenreEntry {
    pub id: GenreId,
    pub name: String,
}

/// Document stored in the movies index.
///
/// Person credits are bucketed by role; the `*_names` lists duplicate
/// the nested entries as flat strings for full-text matching. All
/// nested lists are deduplicated by id.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MovieDocument {
    pub id: MovieId,
    pub title: String,
    pub description: Option<String>,
    pub imdb_rating: Option<f64>,
    pub genre: Vec<GenreEntry>,
    pub actors: Vec<PersonEntry>,
    pub writers: Vec<PersonEntry>,
    pub directors: Vec<PersonEntry>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub directors_names: Vec<String>,
}

/// Document stored in the genres index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenreDocument {
    pub id: GenreId,
    pub name: String,
    pub description: Option<String>,
}

/// Document stored in the persons index.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PersonDocument {
    pub id: PersonId,
    pub full_name: String,
}
