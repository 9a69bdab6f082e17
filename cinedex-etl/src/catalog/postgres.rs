use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use cinedex_model::{GenreId, MovieId, PersonId};

use crate::error::Result;

use super::{
    CatalogSource, GenreRow, MovieChange, MovieSourceRow, PersonRow,
};

/// Catalog access backed by the `content` schema in Postgres.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogSource for PostgresCatalog {
    async fn movies_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>> {
        let rows = sqlx::query_as::<_, ChangeRow>(
            r#"
            SELECT id, modified
            FROM content.film_work
            WHERE modified > $1
            ORDER BY modified
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        debug!("fetched {} changed movies", rows.len());
        Ok(rows.into_iter().map(ChangeRow::into_movie).collect())
    }

    async fn persons_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PersonRow>> {
        let rows = sqlx::query_as::<_, PersonDbRow>(
            r#"
            SELECT id, full_name, modified
            FROM content.person
            WHERE modified > $1
            ORDER BY modified
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        debug!("fetched {} changed persons", rows.len());
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn genres_changed_after(
        &self,
        after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<GenreRow>> {
        let rows = sqlx::query_as::<_, GenreDbRow>(
            r#"
            SELECT id, name, description, modified
            FROM content.genre
            WHERE modified > $1
            ORDER BY modified
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        debug!("fetched {} changed genres", rows.len());
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn movies_for_persons(
        &self,
        persons: &[PersonId],
        movies_after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>> {
        let person_ids: Vec<Uuid> =
            persons.iter().map(PersonId::to_uuid).collect();

        let rows = sqlx::query_as::<_, ChangeRow>(
            r#"
            SELECT fw.id, fw.modified
            FROM content.film_work fw
            LEFT JOIN content.person_film_work pfw
                ON pfw.film_work_id = fw.id
            WHERE fw.modified > $1 AND pfw.person_id = ANY($2)
            ORDER BY fw.modified
            LIMIT $3
            "#,
        )
        .bind(movies_after)
        .bind(&person_ids)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        debug!("fetched {} movies linked to changed persons", rows.len());
        Ok(rows.into_iter().map(ChangeRow::into_movie).collect())
    }

    async fn movies_for_genres(
        &self,
        genres: &[GenreId],
        movies_after: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MovieChange>> {
        let genre_ids: Vec<Uuid> =
            genres.iter().map(GenreId::to_uuid).collect();

        let rows = sqlx::query_as::<_, ChangeRow>(
            r#"
            SELECT fw.id, fw.modified
            FROM content.film_work fw
            LEFT JOIN content.genre_film_work gfw
                ON gfw.film_work_id = fw.id
            WHERE fw.modified > $1 AND gfw.genre_id = ANY($2)
            ORDER BY fw.modified
            LIMIT $3
            "#,
        )
        .bind(movies_after)
        .bind(&genre_ids)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        debug!("fetched {} movies linked to changed genres", rows.len());
        Ok(rows.into_iter().map(ChangeRow::into_movie).collect())
    }

    async fn movies_by_ids(
        &self,
        ids: &[MovieId],
    ) -> Result<Vec<MovieSourceRow>> {
        let movie_ids: Vec<Uuid> = ids.iter().map(MovieId::to_uuid).collect();

        let rows = sqlx::query_as::<_, MovieDbRow>(
            r#"
            SELECT
                fw.id,
                fw.title,
                fw.description,
                fw.rating,
                fw.created,
                fw.modified,
                array_agg(g.name) AS genre_names,
                array_agg(g.id) AS genre_ids,
                array_agg(p.full_name) AS person_names,
                array_agg(pfw.role) AS person_roles,
                array_agg(p.id) AS person_ids
            FROM content.film_work fw
            LEFT JOIN content.person_film_work pfw
                ON pfw.film_work_id = fw.id
            LEFT JOIN content.person p
                ON p.id = pfw.person_id
            LEFT JOIN content.genre_film_work gfw
                ON gfw.film_work_id = fw.id
            LEFT JOIN content.genre g
                ON g.id = gfw.genre_id
            WHERE fw.id = ANY($1)
            GROUP BY fw.id
            "#,
        )
        .bind(&movie_ids)
        .fetch_all(self.pool())
        .await?;

        debug!("fetched {} full movies by id", rows.len());
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ChangeRow {
    id: Uuid,
    modified: DateTime<Utc>,
}

impl ChangeRow {
    fn into_movie(self) -> MovieChange {
        MovieChange {
            id: MovieId(self.id),
            modified: self.modified,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PersonDbRow {
    id: Uuid,
    full_name: String,
    modified: DateTime<Utc>,
}

impl From<PersonDbRow> for PersonRow {
    fn from(row: PersonDbRow) -> Self {
        PersonRow {
            id: PersonId(row.id),
            full_name: row.full_name,
            modified: row.modified,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GenreDbRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    modified: DateTime<Utc>,
}

impl From<GenreDbRow> for GenreRow {
    fn from(row: GenreDbRow) -> Self {
        GenreRow {
            id: GenreId(row.id),
            name: row.name,
            description: row.description,
            modified: row.modified,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MovieDbRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    rating: Option<f64>,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    genre_names: Vec<Option<String>>,
    genre_ids: Vec<Option<Uuid>>,
    person_names: Vec<Option<String>>,
    person_roles: Vec<Option<String>>,
    person_ids: Vec<Option<Uuid>>,
}

impl From<MovieDbRow> for MovieSourceRow {
    fn from(row: MovieDbRow) -> Self {
        MovieSourceRow {
            id: MovieId(row.id),
            title: row.title,
            description: row.description,
            rating: row.rating,
            created: row.created,
            modified: row.modified,
            genre_names: row.genre_names,
            genre_ids: row.genre_ids,
            person_names: row.person_names,
            person_roles: row.person_roles,
            person_ids: row.person_ids,
        }
    }
}
