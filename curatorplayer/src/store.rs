//! Local track store
//!
//! Records which tracks are available offline and where their audio lives, and
//! remembers the last playback position of each track.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use curatorcatalog::Track;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A track as recorded in the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrack {
    pub track: Track,
    /// Audio is available offline
    pub cached: bool,
    pub local_path: Option<PathBuf>,
}

/// Last known playback position of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub id: String,
    /// Seconds
    pub position: f64,
    pub timestamp: DateTime<Utc>,
}

impl PlaybackPosition {
    pub fn now(id: impl Into<String>, position: f64) -> Self {
        Self {
            id: id.into(),
            position,
            timestamp: Utc::now(),
        }
    }
}

/// Keyed store of track records and playback positions
pub trait TrackStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<StoredTrack>>;

    /// Insert or refresh a track; an existing offline copy is kept
    fn put(&self, track: &Track) -> Result<()>;

    /// Flag a stored track as available offline at `local_path`
    fn mark_cached(&self, id: &str, local_path: &Path) -> Result<()>;

    fn remove(&self, id: &str) -> Result<()>;

    fn save_playback(&self, position: &PlaybackPosition) -> Result<()>;

    fn playback(&self, id: &str) -> Result<Option<PlaybackPosition>>;
}

/// SQLite-backed [`TrackStore`]
#[derive(Debug)]
pub struct SqliteTrackStore {
    conn: Mutex<Connection>,
}

impl SqliteTrackStore {
    /// Open (or create) the store at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tracks (
                id TEXT PRIMARY KEY,
                slug TEXT,
                cached INTEGER NOT NULL DEFAULT 0,
                local_path TEXT,
                track_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS playback_states (
                id TEXT PRIMARY KEY,
                position REAL NOT NULL,
                timestamp TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TrackStore for SqliteTrackStore {
    fn get(&self, id: &str) -> Result<Option<StoredTrack>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT track_json, cached, local_path FROM tracks WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        match row {
            None => Ok(None),
            Some((json, cached, local_path)) => {
                let mut track: Track = serde_json::from_str(&json)?;
                track.cached = cached;
                Ok(Some(StoredTrack {
                    track,
                    cached,
                    local_path: local_path.map(PathBuf::from),
                }))
            }
        }
    }

    fn put(&self, track: &Track) -> Result<()> {
        let json = serde_json::to_string(track)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tracks (id, slug, cached, local_path, track_json)
             VALUES (?1, ?2, 0, NULL, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 slug = excluded.slug,
                 track_json = excluded.track_json",
            params![track.id, track.slug, json],
        )?;
        Ok(())
    }

    fn mark_cached(&self, id: &str, local_path: &Path) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE tracks SET cached = 1, local_path = ?1 WHERE id = ?2",
            params![local_path.to_string_lossy(), id],
        )?;
        if updated == 0 {
            return Err(Error::UnknownTrack(id.to_string()));
        }
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM tracks WHERE id = ?1", [id])?;
        conn.execute("DELETE FROM playback_states WHERE id = ?1", [id])?;
        Ok(())
    }

    fn save_playback(&self, position: &PlaybackPosition) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO playback_states (id, position, timestamp)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                 position = excluded.position,
                 timestamp = excluded.timestamp",
            params![
                position.id,
                position.position,
                position.timestamp.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn playback(&self, id: &str) -> Result<Option<PlaybackPosition>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT position, timestamp FROM playback_states WHERE id = ?1",
                [id],
                |row| Ok((row.get::<_, f64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(position, timestamp)| PlaybackPosition {
            id: id.to_string(),
            position,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }))
    }
}

/// In-memory [`TrackStore`] for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryTrackStore {
    tracks: Mutex<HashMap<String, StoredTrack>>,
    positions: Mutex<HashMap<String, PlaybackPosition>>,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackStore for MemoryTrackStore {
    fn get(&self, id: &str) -> Result<Option<StoredTrack>> {
        Ok(self.tracks.lock().unwrap().get(id).cloned())
    }

    fn put(&self, track: &Track) -> Result<()> {
        let mut tracks = self.tracks.lock().unwrap();
        match tracks.get_mut(&track.id) {
            Some(stored) => {
                stored.track = track.clone();
                stored.track.cached = stored.cached;
            }
            None => {
                let mut track = track.clone();
                track.cached = false;
                tracks.insert(
                    track.id.clone(),
                    StoredTrack {
                        track,
                        cached: false,
                        local_path: None,
                    },
                );
            }
        }
        Ok(())
    }

    fn mark_cached(&self, id: &str, local_path: &Path) -> Result<()> {
        let mut tracks = self.tracks.lock().unwrap();
        let stored = tracks
            .get_mut(id)
            .ok_or_else(|| Error::UnknownTrack(id.to_string()))?;
        stored.cached = true;
        stored.track.cached = true;
        stored.local_path = Some(local_path.to_path_buf());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        self.tracks.lock().unwrap().remove(id);
        self.positions.lock().unwrap().remove(id);
        Ok(())
    }

    fn save_playback(&self, position: &PlaybackPosition) -> Result<()> {
        self.positions
            .lock()
            .unwrap()
            .insert(position.id.clone(), position.clone());
        Ok(())
    }

    fn playback(&self, id: &str) -> Result<Option<PlaybackPosition>> {
        Ok(self.positions.lock().unwrap().get(id).cloned())
    }
}
