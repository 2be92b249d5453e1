//! FileScanner — recursive directory walk, metadata extraction, and
//! progress/cancellation plumbing (spec §4.5).
//!
//! Grounded in the teacher's `core::indexer::Indexer` (walkdir + lofty), but
//! `MetadataExtractor` is pulled out behind a trait since tag reading is an
//! external collaborator this core only depends on the interface of, and the
//! audio-extension filter is driven by the active profile's
//! `enabled_file_types` instead of a fixed constant list.

use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Utc};
use lofty::{Accessor, AudioFile, Probe, TaggedFileExt};
use walkdir::{DirEntry, WalkDir};

use crate::error::{VinylError, VinylResult};
use crate::models::MusicRecord;

/// Reads audio tags and stream properties from a file into a [`MusicRecord`].
/// An external collaborator: the core depends only on this trait, not on
/// any particular tag-reading library.
pub trait MetadataExtractor: Sync {
    fn extract(&self, path: &Path) -> VinylResult<MusicRecord>;
}

/// Default [`MetadataExtractor`] backed by `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyExtractor;

impl MetadataExtractor for LoftyExtractor {
    fn extract(&self, path: &Path) -> VinylResult<MusicRecord> {
        let tagged_file = Probe::open(path)
            .map_err(|e| VinylError::internal(format!("failed to open {}: {e}", path.display())))?
            .read()
            .map_err(|e| VinylError::internal(format!("failed to read tags from {}: {e}", path.display())))?;

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let title = tag.and_then(|t| t.title().map(|s| s.to_string()));
        let artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));
        let album = tag.and_then(|t| t.album().map(|s| s.to_string()));
        let album_artist = tag
            .and_then(|t| t.get_string(&lofty::ItemKey::AlbumArtist).map(|s| s.to_string()));
        let genre = tag.and_then(|t| t.genre().map(|s| s.to_string()));
        let track_number = tag.and_then(|t| t.track()).map(|n| n as i32);
        let year = tag.and_then(|t| t.year()).map(|y| y as i32);

        let properties = tagged_file.properties();
        let duration_seconds = Some(properties.duration().as_secs() as i32);
        let bit_rate = properties.audio_bitrate().map(|b| b as i32);
        let sample_rate = properties.sample_rate().map(|r| r as i32);

        let file_type = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let metadata = std::fs::metadata(path)
            .map_err(|e| VinylError::io("stat audio file", path.to_path_buf(), e))?;
        let file_size_bytes = metadata.len() as i64;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .and_then(|d| DateTime::<Utc>::from_timestamp(d.as_secs() as i64, 0))
            .unwrap_or_else(Utc::now);

        let mut record = MusicRecord::new(path.to_string_lossy().to_string(), file_type);
        record.set_title(title);
        record.set_artist(artist);
        record.set_album(album);
        record.set_album_artist(album_artist);
        record.set_genre(genre);
        record.set_track_number(track_number);
        record.set_year(year);
        record.set_duration_seconds(duration_seconds);
        record.set_bit_rate(bit_rate);
        record.set_sample_rate(sample_rate);
        record.set_file_size_bytes(file_size_bytes);
        record.set_last_modified(last_modified);
        record.clear_modified();

        Ok(record)
    }
}

/// Sink for scan progress and cancellation, checked between files.
pub trait ScanCallback: Sync {
    fn on_progress(&self, files_seen: u64, files_matched: u64, current_dir: &Path);
    fn is_cancelled(&self) -> bool;
}

/// A no-op callback, for callers that don't need progress/cancellation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScanCallback;

impl ScanCallback for NullScanCallback {
    fn on_progress(&self, _files_seen: u64, _files_matched: u64, _current_dir: &Path) {}
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A file the scanner saw but could not extract metadata from.
#[derive(Debug)]
pub struct ScanFailure {
    pub path: std::path::PathBuf,
    pub message: String,
}

/// Result of a directory scan: successfully extracted records plus any
/// per-file failures, neither of which aborts the run (spec §7).
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub records: Vec<MusicRecord>,
    pub failures: Vec<ScanFailure>,
    pub cancelled: bool,
}

pub struct FileScanner;

impl FileScanner {
    fn should_skip_dir(entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map(|s| s.starts_with('.'))
                .unwrap_or(false)
    }

    fn matches_enabled_type(entry: &DirEntry, enabled_file_types: &std::collections::HashSet<String>) -> bool {
        if !entry.file_type().is_file() {
            return false;
        }
        entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| enabled_file_types.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Walk `root` recursively (following symlinks; walkdir reports an error
    /// entry rather than looping), extracting a `MusicRecord` per file whose
    /// extension is in `enabled_file_types`. The scanner never writes to a
    /// `Catalog` — the caller decides how (and whether) to persist and batch.
    pub fn scan(
        root: &Path,
        enabled_file_types: &std::collections::HashSet<String>,
        extractor: &dyn MetadataExtractor,
        callback: &dyn ScanCallback,
    ) -> VinylResult<ScanOutcome> {
        if !root.exists() {
            return Err(VinylError::not_found(format!(
                "scan root {} does not exist",
                root.display()
            )));
        }

        let mut outcome = ScanOutcome::default();
        let mut files_seen: u64 = 0;
        let mut files_matched: u64 = 0;

        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !Self::should_skip_dir(e));

        for entry in walker {
            if callback.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("walk error under {}: {e}", root.display());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            files_seen += 1;

            if !Self::matches_enabled_type(&entry, enabled_file_types) {
                continue;
            }
            files_matched += 1;

            match extractor.extract(entry.path()) {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    tracing::warn!("failed to extract metadata from {}: {e}", entry.path().display());
                    outcome.failures.push(ScanFailure {
                        path: entry.path().to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }

            let current_dir = entry.path().parent().unwrap_or(root);
            callback.on_progress(files_seen, files_matched, current_dir);
        }

        Ok(outcome)
    }
}
