//! Persisted pipeline state: resumable cursors and per-tick dedup sets.
//!
//! Every mutation is written through to disk before the caller sees it
//! succeed, so cursors survive crashes and a restarted tick skips the
//! rows it already shipped.

mod storage;

pub use storage::JsonFileStorage;

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Sentinel predating every catalog row; the initial value of every
/// cursor and the inner-loop reset for fan-out producers.
pub fn default_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap()
}

/// The resumable cursors the producers advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// `modified` of the last movie row shipped by the movie-change
    /// producer.
    MovieSyncedAt,
    /// `modified` of the last person row shipped to the persons index.
    PersonSyncedAt,
    /// Outer cursor of the person-change fan-out onto movies.
    PersonForMoviesSyncedAt,
    /// Outer cursor of the genre-change fan-out onto movies.
    GenreSyncedAt,
    /// `modified` of the last genre row shipped to the genres index.
    GenreForGenresSyncedAt,
}

/// Per-tick dedup buckets, one per target index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncBucket {
    Movies,
    Genres,
    Persons,
}

/// Serialized shape of the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_full_state_sync_started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_movie_synced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_person_synced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_person_for_movies_synced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_genre_synced_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_genre_for_genres_synced_at: Option<DateTime<Utc>>,

    #[serde(default)]
    movies_synced: HashSet<Uuid>,
    #[serde(default)]
    genres_synced: HashSet<Uuid>,
    #[serde(default)]
    persons_synced: HashSet<Uuid>,
}

/// Durable pipeline state with typed accessors.
#[derive(Debug)]
pub struct SyncState {
    storage: JsonFileStorage,
    data: StateData,
}

impl SyncState {
    /// Open (or initialize) the state document at `path`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let storage = JsonFileStorage::new(path.as_ref());
        let data = storage.load();
        Self { storage, data }
    }

    pub fn cursor(&self, cursor: Cursor) -> DateTime<Utc> {
        let stored = match cursor {
            Cursor::MovieSyncedAt => self.data.last_movie_synced_at,
            Cursor::PersonSyncedAt => self.data.last_person_synced_at,
            Cursor::PersonForMoviesSyncedAt => {
                self.data.last_person_for_movies_synced_at
            }
            Cursor::GenreSyncedAt => self.data.last_genre_synced_at,
            Cursor::GenreForGenresSyncedAt => {
                self.data.last_genre_for_genres_synced_at
            }
        };
        stored.unwrap_or_else(default_date)
    }

    pub fn set_cursor(
        &mut self,
        cursor: Cursor,
        value: DateTime<Utc>,
    ) -> Result<()> {
        let slot = match cursor {
            Cursor::MovieSyncedAt => &mut self.data.last_movie_synced_at,
            Cursor::PersonSyncedAt => &mut self.data.last_person_synced_at,
            Cursor::PersonForMoviesSyncedAt => {
                &mut self.data.last_person_for_movies_synced_at
            }
            Cursor::GenreSyncedAt => &mut self.data.last_genre_synced_at,
            Cursor::GenreForGenresSyncedAt => {
                &mut self.data.last_genre_for_genres_synced_at
            }
        };
        *slot = Some(value);
        self.persist()
    }

    pub fn is_synced(&self, bucket: SyncBucket, id: Uuid) -> bool {
        self.bucket(bucket).contains(&id)
    }

    pub fn mark_synced(
        &mut self,
        bucket: SyncBucket,
        ids: &[Uuid],
    ) -> Result<()> {
        let set = self.bucket_mut(bucket);
        set.extend(ids.iter().copied());
        self.persist()
    }

    /// Record when the current tick started.
    pub fn begin_tick(&mut self, started_at: DateTime<Utc>) -> Result<()> {
        self.data.last_full_state_sync_started_at = Some(started_at);
        self.persist()
    }

    pub fn last_tick_started_at(&self) -> Option<DateTime<Utc>> {
        self.data.last_full_state_sync_started_at
    }

    /// Roll the per-tick dedup sets over; the next tick starts clean.
    pub fn complete_tick(&mut self) -> Result<()> {
        self.data.movies_synced.clear();
        self.data.genres_synced.clear();
        self.data.persons_synced.clear();
        self.persist()
    }

    fn bucket(&self, bucket: SyncBucket) -> &HashSet<Uuid> {
        match bucket {
            SyncBucket::Movies => &self.data.movies_synced,
            SyncBucket::Genres => &self.data.genres_synced,
            SyncBucket::Persons => &self.data.persons_synced,
        }
    }

    fn bucket_mut(&mut self, bucket: SyncBucket) -> &mut HashSet<Uuid> {
        match bucket {
            SyncBucket::Movies => &mut self.data.movies_synced,
            SyncBucket::Genres => &mut self.data.genres_synced,
            SyncBucket::Persons => &mut self.data.persons_synced,
        }
    }

    fn persist(&self) -> Result<()> {
        self.storage.save(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn missing_file_yields_epoch_cursors() {
        let dir = tempfile::tempdir().unwrap();
        let state = SyncState::open(dir.path().join("state.json"));
        assert_eq!(state.cursor(Cursor::MovieSyncedAt), default_date());
        assert_eq!(
            state.cursor(Cursor::GenreForGenresSyncedAt),
            default_date()
        );
        assert!(state.last_tick_started_at().is_none());
    }

    #[test]
    fn cursors_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = SyncState::open(&path);
        state.set_cursor(Cursor::MovieSyncedAt, ts(1_700_000_000)).unwrap();
        state
            .set_cursor(Cursor::PersonForMoviesSyncedAt, ts(1_700_000_100))
            .unwrap();
        drop(state);

        let reopened = SyncState::open(&path);
        assert_eq!(reopened.cursor(Cursor::MovieSyncedAt), ts(1_700_000_000));
        assert_eq!(
            reopened.cursor(Cursor::PersonForMoviesSyncedAt),
            ts(1_700_000_100)
        );
        // Untouched cursors still default to the epoch sentinel.
        assert_eq!(reopened.cursor(Cursor::GenreSyncedAt), default_date());
    }

    #[test]
    fn buckets_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = SyncState::open(dir.path().join("state.json"));

        let id = Uuid::new_v4();
        state.mark_synced(SyncBucket::Movies, &[id]).unwrap();

        assert!(state.is_synced(SyncBucket::Movies, id));
        assert!(!state.is_synced(SyncBucket::Genres, id));
        assert!(!state.is_synced(SyncBucket::Persons, id));
    }

    #[test]
    fn dedup_sets_survive_reopen_until_tick_completes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let id = Uuid::new_v4();
        let mut state = SyncState::open(&path);
        state.mark_synced(SyncBucket::Movies, &[id]).unwrap();
        drop(state);

        // An interrupted tick keeps its dedup set across restart.
        let mut reopened = SyncState::open(&path);
        assert!(reopened.is_synced(SyncBucket::Movies, id));

        reopened.complete_tick().unwrap();
        assert!(!reopened.is_synced(SyncBucket::Movies, id));

        // And the rollover is durable too.
        let after = SyncState::open(&path);
        assert!(!after.is_synced(SyncBucket::Movies, id));
    }

    #[test]
    fn complete_tick_keeps_cursors() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = SyncState::open(dir.path().join("state.json"));

        state.set_cursor(Cursor::GenreSyncedAt, ts(1_700_000_000)).unwrap();
        state
            .mark_synced(SyncBucket::Genres, &[Uuid::new_v4()])
            .unwrap();
        state.complete_tick().unwrap();

        assert_eq!(state.cursor(Cursor::GenreSyncedAt), ts(1_700_000_000));
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let state = SyncState::open(&path);
        assert_eq!(state.cursor(Cursor::MovieSyncedAt), default_date());
    }

    #[test]
    fn begin_tick_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = SyncState::open(&path);
        state.begin_tick(ts(1_700_000_000)).unwrap();
        drop(state);

        let reopened = SyncState::open(&path);
        assert_eq!(reopened.last_tick_started_at(), Some(ts(1_700_000_000)));
    }
}
