//! Row-to-document transformations.
//!
//! All three transformers are pure functions. The movie transformer
//! walks the parallel credit/genre arrays produced by the catalog's
//! aggregated left joins: a uniformly-null triple means the movie has
//! no credits and is skipped, while a partially-null triple or an
//! unrecognized role aborts the tick.

use std::collections::{BTreeMap, BTreeSet};

use cinedex_model::{
    GenreDocument, GenreEntry, GenreId, MovieDocument, PersonDocument,
    PersonEntry, PersonId, Role,
};

use crate::catalog::{GenreRow, MovieSourceRow, PersonRow};
use crate::error::{EtlError, Result};

pub fn movie_document(row: MovieSourceRow) -> Result<MovieDocument> {
    if row.person_names.len() != row.person_ids.len()
        || row.person_names.len() != row.person_roles.len()
    {
        return Err(EtlError::Integrity(format!(
            "mismatched credit arrays on movie {}",
            row.id
        )));
    }
    if row.genre_names.len() != row.genre_ids.len() {
        return Err(EtlError::Integrity(format!(
            "mismatched genre arrays on movie {}",
            row.id
        )));
    }

    // The join fans out persons across genres (and vice versa), so the
    // same triple shows up repeatedly; bucketing into maps keyed by id
    // both deduplicates and fixes the emission order.
    let mut actors = BTreeMap::new();
    let mut writers = BTreeMap::new();
    let mut directors = BTreeMap::new();

    let credits = row
        .person_names
        .iter()
        .zip(&row.person_ids)
        .zip(&row.person_roles);
    for ((name, person_id), role) in credits {
        match (name, person_id, role) {
            (Some(name), Some(person_id), Some(role)) => {
                let role = Role::parse(role).map_err(|err| {
                    EtlError::Integrity(format!(
                        "movie {}: {err}",
                        row.id
                    ))
                })?;
                let bucket = match role {
                    Role::Actor => &mut actors,
                    Role::Writer => &mut writers,
                    Role::Director => &mut directors,
                };
                bucket.insert(PersonId(*person_id), name.clone());
            }
            (None, None, None) => {
                // Left join found no credits for this movie.
            }
            _ => {
                return Err(EtlError::Integrity(format!(
                    "partially null credit triple on movie {}",
                    row.id
                )));
            }
        }
    }

    let mut genres = BTreeMap::new();
    for (name, genre_id) in row.genre_names.iter().zip(&row.genre_ids) {
        match (name, genre_id) {
            (Some(name), Some(genre_id)) => {
                genres.insert(GenreId(*genre_id), name.clone());
            }
            (None, None) => {
                // Left join found no genres for this movie.
            }
            _ => {
                return Err(EtlError::Integrity(format!(
                    "partially null genre pair on movie {}",
                    row.id
                )));
            }
        }
    }

    let (actors, actors_names) = person_entries(actors);
    let (writers, writers_names) = person_entries(writers);
    let (directors, directors_names) = person_entries(directors);

    Ok(MovieDocument {
        id: row.id,
        title: row.title,
        description: row.description,
        imdb_rating: row.rating,
        genre: genres
            .into_iter()
            .map(|(id, name)| GenreEntry { id, name })
            .collect(),
        actors,
        writers,
        directors,
        actors_names,
        writers_names,
        directors_names,
    })
}

pub fn genre_document(row: GenreRow) -> GenreDocument {
    GenreDocument {
        id: row.id,
        name: row.name,
        description: row.description,
    }
}

pub fn person_document(row: PersonRow) -> PersonDocument {
    PersonDocument {
        id: row.id,
        full_name: row.full_name,
    }
}

fn person_entries(
    bucket: BTreeMap<PersonId, String>,
) -> (Vec<PersonEntry>, Vec<String>) {
    let names: BTreeSet<String> = bucket.values().cloned().collect();
    let entries = bucket
        .into_iter()
        .map(|(id, name)| PersonEntry { id, name })
        .collect();
    (entries, names.into_iter().collect())
}
