//! Catalog — the primary per-profile store of `MusicRecord`s (spec §4.4).
//!
//! Connection setup mirrors the teacher's `db::engine::setup_sqlite` (WAL,
//! bounded pool, busy timeout), generalized from a single process-wide
//! singleton to one instance per active profile, since each `Profile` here
//! owns its own database file rather than sharing one global store.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::Row;

use crate::error::{VinylError, VinylResult};
use crate::models::MusicRecord;

use super::schema;

/// Primary store of [`MusicRecord`]s for one profile's database file.
///
/// A single `Catalog` is reused across profile switches: [`Catalog::initialize`]
/// is a no-op if already open at the requested path, and otherwise performs
/// the `shutdown`-then-reopen sequence spec §9 requires.
pub struct Catalog {
    pool: RwLock<Option<SqlitePool>>,
    path: RwLock<Option<PathBuf>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog {
            pool: RwLock::new(None),
            path: RwLock::new(None),
        }
    }

    /// Open (or reuse) a connection to `database_path`. If already connected
    /// elsewhere, shuts down the previous connection first.
    pub async fn initialize(&self, database_path: impl Into<PathBuf>) -> VinylResult<()> {
        let database_path = database_path.into();

        if self.path.read().as_deref() == Some(database_path.as_path()) && self.pool.read().is_some() {
            return Ok(());
        }

        if self.pool.read().is_some() {
            self.shutdown().await;
        }

        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VinylError::io("create database directory", parent.to_path_buf(), e))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", database_path.display()))
            .map_err(|e| VinylError::InvalidConfig {
                reason: format!("invalid database path {}: {e}", database_path.display()),
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| VinylError::database("open catalog database", e))?;

        schema::ensure_schema(&pool).await?;

        *self.pool.write() = Some(pool);
        *self.path.write() = Some(database_path);
        Ok(())
    }

    /// Release the connection. Idempotent; safe to call when not initialized.
    pub async fn shutdown(&self) {
        let pool = self.pool.write().take();
        if let Some(pool) = pool {
            pool.close().await;
        }
        *self.path.write() = None;
    }

    pub fn database_path(&self) -> Option<PathBuf> {
        self.path.read().clone()
    }

    fn pool(&self) -> VinylResult<SqlitePool> {
        self.pool
            .read()
            .clone()
            .ok_or_else(|| VinylError::internal("catalog accessed before initialize()"))
    }

    /// Insert (if `id` is `None`) or update (by `id`) `record`. Clears
    /// `modified` and assigns the surrogate id on success.
    pub async fn save(&self, record: &mut MusicRecord) -> VinylResult<()> {
        let pool = self.pool()?;

        match record.id() {
            None => {
                let result = sqlx::query(
                    "INSERT INTO music_files (
                        file_path, title, artist, album, album_artist, genre,
                        track_number, year, duration_seconds, bit_rate, sample_rate,
                        file_type, file_size_bytes, last_modified, date_added
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(record.file_path())
                .bind(record.title())
                .bind(record.artist())
                .bind(record.album())
                .bind(record.album_artist())
                .bind(record.genre())
                .bind(record.track_number())
                .bind(record.year())
                .bind(record.duration_seconds())
                .bind(record.bit_rate())
                .bind(record.sample_rate())
                .bind(record.file_type())
                .bind(record.file_size_bytes())
                .bind(record.last_modified().to_rfc3339())
                .bind(record.date_added().to_rfc3339())
                .execute(&pool)
                .await
                .map_err(|e| {
                    if matches!(&e, sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation) {
                        VinylError::DuplicateFilePath {
                            path: PathBuf::from(record.file_path()),
                        }
                    } else {
                        VinylError::database("insert music record", e)
                    }
                })?;

                record.set_id(result.last_insert_rowid());
                record.clear_modified();
                Ok(())
            }
            Some(id) => {
                sqlx::query(
                    "UPDATE music_files SET
                        file_path = ?, title = ?, artist = ?, album = ?, album_artist = ?, genre = ?,
                        track_number = ?, year = ?, duration_seconds = ?, bit_rate = ?, sample_rate = ?,
                        file_type = ?, file_size_bytes = ?, last_modified = ?, date_added = ?
                    WHERE id = ?",
                )
                .bind(record.file_path())
                .bind(record.title())
                .bind(record.artist())
                .bind(record.album())
                .bind(record.album_artist())
                .bind(record.genre())
                .bind(record.track_number())
                .bind(record.year())
                .bind(record.duration_seconds())
                .bind(record.bit_rate())
                .bind(record.sample_rate())
                .bind(record.file_type())
                .bind(record.file_size_bytes())
                .bind(record.last_modified().to_rfc3339())
                .bind(record.date_added().to_rfc3339())
                .bind(id)
                .execute(&pool)
                .await
                .map_err(|e| {
                    if matches!(&e, sqlx::Error::Database(db) if db.kind() == sqlx::error::ErrorKind::UniqueViolation) {
                        VinylError::DuplicateFilePath {
                            path: PathBuf::from(record.file_path()),
                        }
                    } else {
                        VinylError::database("update music record", e)
                    }
                })?;

                record.clear_modified();
                Ok(())
            }
        }
    }

    /// Remove `record` by id. Errs with [`VinylError::NotFound`] if absent.
    pub async fn delete(&self, record: &MusicRecord) -> VinylResult<()> {
        let id = record
            .id()
            .ok_or_else(|| VinylError::not_found("record has no id (never persisted)"))?;
        self.delete_by_id(id).await
    }

    pub async fn delete_by_id(&self, id: i64) -> VinylResult<()> {
        let pool = self.pool()?;
        let result = sqlx::query("DELETE FROM music_files WHERE id = ?")
            .bind(id)
            .execute(&pool)
            .await
            .map_err(|e| VinylError::database("delete music record", e))?;

        if result.rows_affected() == 0 {
            return Err(VinylError::not_found(format!("music record id={id}")));
        }
        Ok(())
    }

    pub async fn get(&self, id: i64) -> VinylResult<Option<MusicRecord>> {
        let pool = self.pool()?;
        let row = sqlx::query("SELECT * FROM music_files WHERE id = ?")
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| VinylError::database("get music record", e))?;

        row.map(|r| row_to_record(&r)).transpose()
    }

    /// A fresh snapshot of every record, ordered by ascending `id`.
    pub async fn get_all(&self) -> VinylResult<Vec<MusicRecord>> {
        let pool = self.pool()?;
        let rows = sqlx::query("SELECT * FROM music_files ORDER BY id ASC")
            .fetch_all(&pool)
            .await
            .map_err(|e| VinylError::database("get all music records", e))?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn count(&self) -> VinylResult<i64> {
        let pool = self.pool()?;
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM music_files")
            .fetch_one(&pool)
            .await
            .map_err(|e| VinylError::database("count music records", e))?;
        Ok(row.0)
    }

    pub async fn search_by_title(&self, term: &str) -> VinylResult<Vec<MusicRecord>> {
        self.search_column("title", term).await
    }

    pub async fn search_by_artist(&self, term: &str) -> VinylResult<Vec<MusicRecord>> {
        self.search_column("artist", term).await
    }

    pub async fn search_by_album(&self, term: &str) -> VinylResult<Vec<MusicRecord>> {
        self.search_column("album", term).await
    }

    async fn search_column(&self, column: &str, term: &str) -> VinylResult<Vec<MusicRecord>> {
        let pool = self.pool()?;
        let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
        let sql = format!("SELECT * FROM music_files WHERE {column} LIKE ? ESCAPE '\\' COLLATE NOCASE");
        let rows = sqlx::query(&sql)
            .bind(pattern)
            .fetch_all(&pool)
            .await
            .map_err(|e| VinylError::database("search music records", e))?;

        rows.iter().map(row_to_record).collect()
    }

    /// OR-search across title, artist, album, and file path.
    pub async fn search(&self, term: &str) -> VinylResult<Vec<MusicRecord>> {
        let pool = self.pool()?;
        let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query(
            "SELECT * FROM music_files WHERE
                title LIKE ? ESCAPE '\\' COLLATE NOCASE OR
                artist LIKE ? ESCAPE '\\' COLLATE NOCASE OR
                album LIKE ? ESCAPE '\\' COLLATE NOCASE OR
                file_path LIKE ? ESCAPE '\\' COLLATE NOCASE",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&pool)
        .await
        .map_err(|e| VinylError::database("search music records", e))?;

        rows.iter().map(row_to_record).collect()
    }

    /// Remove every record. Used ahead of a full re-scan.
    pub async fn clear_all(&self) -> VinylResult<()> {
        let pool = self.pool()?;
        sqlx::query("DELETE FROM music_files")
            .execute(&pool)
            .await
            .map_err(|e| VinylError::database("clear all music records", e))?;
        Ok(())
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> VinylResult<MusicRecord> {
    let last_modified = parse_timestamp(row, "last_modified")?;
    let date_added = parse_timestamp(row, "date_added")?;

    Ok(MusicRecord::from_row(
        row.try_get("id")
            .map_err(|e| VinylError::database("read id column", e))?,
        row.try_get("file_path")
            .map_err(|e| VinylError::database("read file_path column", e))?,
        row.try_get("title")
            .map_err(|e| VinylError::database("read title column", e))?,
        row.try_get("artist")
            .map_err(|e| VinylError::database("read artist column", e))?,
        row.try_get("album")
            .map_err(|e| VinylError::database("read album column", e))?,
        row.try_get("album_artist")
            .map_err(|e| VinylError::database("read album_artist column", e))?,
        row.try_get("genre")
            .map_err(|e| VinylError::database("read genre column", e))?,
        row.try_get("track_number")
            .map_err(|e| VinylError::database("read track_number column", e))?,
        row.try_get("year")
            .map_err(|e| VinylError::database("read year column", e))?,
        row.try_get("duration_seconds")
            .map_err(|e| VinylError::database("read duration_seconds column", e))?,
        row.try_get("bit_rate")
            .map_err(|e| VinylError::database("read bit_rate column", e))?,
        row.try_get("sample_rate")
            .map_err(|e| VinylError::database("read sample_rate column", e))?,
        row.try_get("file_type")
            .map_err(|e| VinylError::database("read file_type column", e))?,
        row.try_get("file_size_bytes")
            .map_err(|e| VinylError::database("read file_size_bytes column", e))?,
        last_modified,
        date_added,
    ))
}

fn parse_timestamp(row: &sqlx::sqlite::SqliteRow, column: &str) -> VinylResult<DateTime<Utc>> {
    let raw: String = row
        .try_get(column)
        .map_err(|e| VinylError::database("read timestamp column", e))?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VinylError::internal(format!("malformed timestamp in {column}: {e}")))
}
