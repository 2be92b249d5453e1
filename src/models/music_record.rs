//! MusicRecord model — an indexed audio file entry with change tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single audio file entry in the catalog.
///
/// `id` is `None` before the record is first persisted by [`crate::catalog::Catalog`].
/// Mutating accessors compare the new value against the current one (null-safe,
/// via `PartialEq`) and set `modified` only when the value actually changes,
/// per spec §4.3. `modified` is cleared by `Catalog` on successful persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicRecord {
    id: Option<i64>,
    file_path: String,
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    album_artist: Option<String>,
    genre: Option<String>,
    track_number: Option<i32>,
    year: Option<i32>,
    duration_seconds: Option<i32>,
    bit_rate: Option<i32>,
    sample_rate: Option<i32>,
    file_type: String,
    file_size_bytes: i64,
    last_modified: DateTime<Utc>,
    date_added: DateTime<Utc>,
    #[serde(skip)]
    modified: bool,
}

impl MusicRecord {
    /// Construct a new, not-yet-persisted record.
    ///
    /// `file_path` and `file_type` are required per the data model invariants
    /// (non-empty path, extension drawn from the configured filter set); all
    /// other fields default to absent and are filled in via setters.
    pub fn new(file_path: impl Into<String>, file_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            file_path: file_path.into(),
            title: None,
            artist: None,
            album: None,
            album_artist: None,
            genre: None,
            track_number: None,
            year: None,
            duration_seconds: None,
            bit_rate: None,
            sample_rate: None,
            file_type: file_type.into().to_lowercase(),
            file_size_bytes: 0,
            last_modified: now,
            date_added: now,
            modified: false,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Only `Catalog` assigns the surrogate id on insert.
    pub(crate) fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    /// Reconstruct a record from a persisted row. Bypasses the change-
    /// tracking setters since a freshly loaded row is never `modified`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_row(
        id: i64,
        file_path: String,
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
        album_artist: Option<String>,
        genre: Option<String>,
        track_number: Option<i32>,
        year: Option<i32>,
        duration_seconds: Option<i32>,
        bit_rate: Option<i32>,
        sample_rate: Option<i32>,
        file_type: String,
        file_size_bytes: i64,
        last_modified: DateTime<Utc>,
        date_added: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            file_path,
            title,
            artist,
            album,
            album_artist,
            genre,
            track_number,
            year,
            duration_seconds,
            bit_rate,
            sample_rate,
            file_type,
            file_size_bytes,
            last_modified,
            date_added,
            modified: false,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn file_type(&self) -> &str {
        &self.file_type
    }

    pub fn file_size_bytes(&self) -> i64 {
        self.file_size_bytes
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn album_artist(&self) -> Option<&str> {
        self.album_artist.as_deref()
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub fn track_number(&self) -> Option<i32> {
        self.track_number
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn duration_seconds(&self) -> Option<i32> {
        self.duration_seconds
    }

    pub fn bit_rate(&self) -> Option<i32> {
        self.bit_rate
    }

    pub fn sample_rate(&self) -> Option<i32> {
        self.sample_rate
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Cleared by `Catalog` after a successful save.
    pub(crate) fn clear_modified(&mut self) {
        self.modified = false;
    }

    fn set_field<T: PartialEq>(slot: &mut T, value: T, modified: &mut bool) {
        if *slot != value {
            *slot = value;
            *modified = true;
        }
    }

    pub fn set_file_path(&mut self, value: impl Into<String>) {
        Self::set_field(&mut self.file_path, value.into(), &mut self.modified);
    }

    pub fn set_title(&mut self, value: Option<impl Into<String>>) {
        Self::set_field(&mut self.title, value.map(Into::into), &mut self.modified);
    }

    pub fn set_artist(&mut self, value: Option<impl Into<String>>) {
        Self::set_field(&mut self.artist, value.map(Into::into), &mut self.modified);
    }

    pub fn set_album(&mut self, value: Option<impl Into<String>>) {
        Self::set_field(&mut self.album, value.map(Into::into), &mut self.modified);
    }

    pub fn set_album_artist(&mut self, value: Option<impl Into<String>>) {
        Self::set_field(
            &mut self.album_artist,
            value.map(Into::into),
            &mut self.modified,
        );
    }

    pub fn set_genre(&mut self, value: Option<impl Into<String>>) {
        Self::set_field(&mut self.genre, value.map(Into::into), &mut self.modified);
    }

    pub fn set_track_number(&mut self, value: Option<i32>) {
        Self::set_field(&mut self.track_number, value, &mut self.modified);
    }

    pub fn set_year(&mut self, value: Option<i32>) {
        Self::set_field(&mut self.year, value, &mut self.modified);
    }

    pub fn set_duration_seconds(&mut self, value: Option<i32>) {
        Self::set_field(&mut self.duration_seconds, value, &mut self.modified);
    }

    pub fn set_bit_rate(&mut self, value: Option<i32>) {
        Self::set_field(&mut self.bit_rate, value, &mut self.modified);
    }

    pub fn set_sample_rate(&mut self, value: Option<i32>) {
        Self::set_field(&mut self.sample_rate, value, &mut self.modified);
    }

    pub fn set_file_size_bytes(&mut self, value: i64) {
        Self::set_field(&mut self.file_size_bytes, value, &mut self.modified);
    }

    pub fn set_last_modified(&mut self, value: DateTime<Utc>) {
        Self::set_field(&mut self.last_modified, value, &mut self.modified);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_unmodified() {
        let record = MusicRecord::new("/music/a.mp3", "mp3");
        assert!(!record.is_modified());
        assert_eq!(record.id(), None);
    }

    #[test]
    fn setter_marks_modified_only_on_change() {
        let mut record = MusicRecord::new("/music/a.mp3", "mp3");
        record.set_title(Some("Hey Jude"));
        assert!(record.is_modified());

        record.clear_modified();
        record.set_title(Some("Hey Jude"));
        assert!(!record.is_modified(), "re-setting the same value must not mark modified");

        record.set_title(Some("Let It Be"));
        assert!(record.is_modified());
    }

    #[test]
    fn null_to_null_setter_is_noop() {
        let mut record = MusicRecord::new("/music/a.mp3", "mp3");
        record.clear_modified();
        record.set_genre(None::<String>);
        assert!(!record.is_modified());
    }
}
