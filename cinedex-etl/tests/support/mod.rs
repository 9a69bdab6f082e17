//! In-memory test doubles for the pipeline's two ports, plus config
//! and fixture helpers shared by the integration suites.

use std::{
    io,
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use cinedex_config::{Config, DatabaseConfig, ElasticConfig, EtlConfig};
use cinedex_etl::catalog::{
    CatalogSource, GenreRow, MovieChange, MovieSourceRow, PersonRow,
};
use cinedex_etl::error::{EtlError, Result};
use cinedex_etl::index::SearchIndex;
use cinedex_model::{GenreId, MovieId, PersonId};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Pipeline configuration pointed at a temp state folder. Retry
/// deadlines are zero so an injected transient failure aborts the
/// tick on the first attempt instead of sleeping through backoff.
pub fn test_config(state_dir: &Path, fetch_by: i64, load_by: usize) -> Config {
    Config {
        debug: false,
        etl: EtlConfig {
            state_folder: state_dir.to_path_buf(),
            check_interval_secs: 60,
        },
        database: DatabaseConfig {
            host: "127.0.0.1".into(),
            port: 5432,
            name: "catalog".into(),
            user: "etl".into(),
            password: None,
            fetch_by,
            timeout_secs: 0,
        },
        elastic: ElasticConfig {
            url: "http://127.0.0.1:9200".into(),
            load_by,
            movies_index: "movies".into(),
            genres_index: "genres".into(),
            persons_index: "persons".into(),
            connect_timeout_secs: 0,
            startup_timeout_secs: 1,
        },
    }
}

#[derive(Debug, Clone)]
pub struct MovieRecord {
    pub id: MovieId,
    pub title: String,
    pub rating: Option<f64>,
    pub modified: DateTime<Utc>,
    /// (person, name, role) credit rows.
    pub credits: Vec<(PersonId, String, String)>,
    pub genres: Vec<GenreId>,
}

#[derive(Debug, Clone)]
pub struct PersonRecord {
    pub id: PersonId,
    pub full_name: String,
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct GenreRecord {
    pub id: GenreId,
    pub name: String,
    pub modified: DateTime<Utc>,
}

#[derive(Default)]
struct CatalogData {
    movies: Vec<MovieRecord>,
    persons: Vec<PersonRecord>,
    genres: Vec<GenreRecord>,
    movie_page_calls: usize,
    fail_movie_pages_from: Option<usize>,
}

/// In-memory stand-in for the relational catalog.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<Mutex<CatalogData>>,
}

impl MemoryCatalog {
    pub fn add_movie(&self, movie: MovieRecord) {
        self.inner.lock().unwrap().movies.push(movie);
    }

    pub fn add_person(&self, person: PersonRecord) {
        self.inner.lock().unwrap().persons.push(person);
    }

    pub fn add_genre(&self, genre: GenreRecord) {
        self.inner.lock().unwrap().genres.push(genre);
    }

    pub fn touch_person(&self, id: PersonId, modified: DateTime<Utc>) {
        let mut data = self.inner.lock().unwrap();
        for person in &mut data.persons {
            if person.id == id {
                person.modified = modified;
            }
        }
    }

    pub fn touch_genre(&self, id: GenreId, modified: DateTime<Utc>) {
        let mut data = self.inner.lock().unwrap();
        for genre in &mut data.genres {
            if genre.id == id {
                genre.modified = modified;
            }
        }
    }

    /// Make every movie page fetch starting with call `from` (1-based)
    /// fail with a connection error, until cleared.
    pub fn fail_movie_pages_from(&self, from: usize) {
        self.inner.lock().unwrap().fail_movie_pages_from = Some(from);
    }

    pub fn clear_failures(&self) {
        let mut data = self.inner.lock().unwrap();
        data.fail_movie_pages_from = None;
        data.movie_page_calls = 0;
    }

    fn source_row(movie: &MovieRecord, data: &CatalogData) -> MovieSourceRow {
        let (person_names, person_ids, person_roles) =
            if movie.credits.is_empty() {
                // A left join with no credits yields one null triple.
                (vec![None], vec![None], vec![None])
            } else {
                (
                    movie
                        .credits
                        .iter()
                        .map(|(_, name, _)| Some(name.clone()))
                        .collect(),
                    movie
                        .credits
                        .iter()
                        .map(|(id, _, _)| Some(id.to_uuid()))
                        .collect(),
                    movie
                        .credits
                        .iter()
                        .map(|(_, _, role)| Some(role.clone()))
                        .collect(),
                )
            };

        let (genre_names, genre_ids) = if movie.genres.is_empty() {
            (vec![None], vec![None])
        } else {
            let names = movie
                .genres
                .iter()
                .map(|id| {
                    data.genres
                        .iter()
                        .find(|g| g.id == *id)
                        .map(|g| g.name.clone())
                })
                .collect();
            let ids =
                movie.genres.iter().map(|id| Some(id.to_uuid())).collect();
            (names, ids)
        };

        MovieSourceRow {
            id: movie.id,
            title: movie.title.clone(),
            description: None,
            rating: movie.rating,
            created: movie.modified,
            modified: movie.modified,
            genre_names,
            genre_ids,
            person_names,
            person_ids,
            person_roles,
        }
    }
}

fn page<T, K>(mut rows: Vec<T>, key: K, limit: i64) -> Vec<T>
where
    K: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|row| key(row));
    rows.truncate(limit as usize);
    rows
}

fn connection_refused() -> EtlError {
    EtlError::Catalog(sqlx::Error::Io(io::Error::new(
        io::ErrorKind::ConnectionRefused,
        "connection refused",
    )))
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn movies_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>> {
        let mut data = self.inner.lock().unwrap();
        data.movie_page_calls += 1;
        if let Some(from) = data.fail_movie_pages_from
            && data.movie_page_calls >= from
        {
            return Err(connection_refused());
        }

        let rows: Vec<MovieChange> = data
            .movies
            .iter()
            .filter(|m| m.modified > after)
            .map(|m| MovieChange {
                id: m.id,
                modified: m.modified,
            })
            .collect();
        Ok(page(rows, |m| m.modified, limit))
    }

    async fn persons_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PersonRow>> {
        let data = self.inner.lock().unwrap();
        let rows: Vec<PersonRow> = data
            .persons
            .iter()
            .filter(|p| p.modified > after)
            .map(|p| PersonRow {
                id: p.id,
                full_name: p.full_name.clone(),
                modified: p.modified,
            })
            .collect();
        Ok(page(rows, |p| p.modified, limit))
    }

    async fn genres_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<GenreRow>> {
        let data = self.inner.lock().unwrap();
        let rows: Vec<GenreRow> = data
            .genres
            .iter()
            .filter(|g| g.modified > after)
            .map(|g| GenreRow {
                id: g.id,
                name: g.name.clone(),
                description: None,
                modified: g.modified,
            })
            .collect();
        Ok(page(rows, |g| g.modified, limit))
    }

    async fn movies_for_persons(
        &self,
        persons: &[PersonId],
        movies_after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>> {
        let data = self.inner.lock().unwrap();
        let rows: Vec<MovieChange> = data
            .movies
            .iter()
            .filter(|m| m.modified > movies_after)
            .filter(|m| {
                m.credits.iter().any(|(id, _, _)| persons.contains(id))
            })
            .map(|m| MovieChange {
                id: m.id,
                modified: m.modified,
            })
            .collect();
        Ok(page(rows, |m| m.modified, limit))
    }

    async fn movies_for_genres(
        &self,
        genres: &[GenreId],
        movies_after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>> {
        let data = self.inner.lock().unwrap();
        let rows: Vec<MovieChange> = data
            .movies
            .iter()
            .filter(|m| m.modified > movies_after)
            .filter(|m| m.genres.iter().any(|id| genres.contains(id)))
            .map(|m| MovieChange {
                id: m.id,
                modified: m.modified,
            })
            .collect();
        Ok(page(rows, |m| m.modified, limit))
    }

    async fn movies_by_ids(
        &self,
        ids: &[MovieId],
    ) -> Result<Vec<MovieSourceRow>> {
        let data = self.inner.lock().unwrap();
        Ok(data
            .movies
            .iter()
            .filter(|m| ids.contains(&m.id))
            .map(|m| Self::source_row(m, &data))
            .collect())
    }
}

#[derive(Default)]
struct IndexData {
    submissions: Vec<(String, Vec<(Uuid, serde_json::Value)>)>,
    created: Vec<String>,
}

/// Records everything the pipeline sends to the search backend.
#[derive(Clone, Default)]
pub struct RecordingIndex {
    inner: Arc<Mutex<IndexData>>,
}

impl RecordingIndex {
    /// Ids submitted to `index`, in submission order, across all
    /// batches.
    pub fn submitted_ids(&self, index: &str) -> Vec<Uuid> {
        self.inner
            .lock()
            .unwrap()
            .submissions
            .iter()
            .filter(|(name, _)| name == index)
            .flat_map(|(_, docs)| docs.iter().map(|(id, _)| *id))
            .collect()
    }

    pub fn submitted_documents(&self, index: &str) -> Vec<serde_json::Value> {
        self.inner
            .lock()
            .unwrap()
            .submissions
            .iter()
            .filter(|(name, _)| name == index)
            .flat_map(|(_, docs)| docs.iter().map(|(_, doc)| doc.clone()))
            .collect()
    }

    pub fn submission_count(&self) -> usize {
        self.inner.lock().unwrap().submissions.len()
    }

    pub fn created_indexes(&self) -> Vec<String> {
        self.inner.lock().unwrap().created.clone()
    }

    pub fn reset(&self) {
        let mut data = self.inner.lock().unwrap();
        data.submissions.clear();
        data.created.clear();
    }
}

#[async_trait]
impl SearchIndex for RecordingIndex {
    async fn bulk_upsert(
        &self,
        index: &str,
        documents: &[(Uuid, serde_json::Value)],
    ) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .submissions
            .push((index.to_string(), documents.to_vec()));
        Ok(())
    }

    async fn create_index(
        &self,
        index: &str,
        _mapping: &serde_json::Value,
    ) -> Result<()> {
        self.inner.lock().unwrap().created.push(index.to_string());
        Ok(())
    }
}
