//! DuplicateEngine — parallel O(N^2) fuzzy duplicate pair search (spec §4.6).
//!
//! Grounded in the teacher's use of `rayon::par_iter` for parallel, CPU-bound
//! work over an indexed collection (`core/indexer.rs`), generalized here from
//! a flat map-filter to an outer/inner nested index scan with a shared
//! atomic progress counter.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rayon::prelude::*;

use crate::error::{VinylError, VinylResult};
use crate::models::{FuzzyConfig, MusicRecord};

use super::similarity::{normalize, similarity};

/// Terminal outcome of a duplicate scan. Cancellation is a normal, distinct
/// outcome (spec §7), never an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Completed,
    Cancelled,
}

/// An unordered duplicate pair, for callers that want an owned result
/// instead of implementing [`DuplicateCallback`] directly (e.g. tests, CLI).
#[derive(Debug, Clone)]
pub struct DuplicatePair {
    pub a: MusicRecord,
    pub b: MusicRecord,
}

/// Streaming sink for a duplicate scan. `on_duplicate_found` may be invoked
/// concurrently from multiple worker threads — implementations must use a
/// thread-safe collection (or equivalent) internally, exactly as the host
/// marshals results onto whatever UI scheduling primitive it needs (spec §9).
pub trait DuplicateCallback: Sync {
    fn on_duplicate_found(&self, a: &MusicRecord, b: &MusicRecord);
    fn on_progress_update(&self, completed: u64, total: u64);
    fn is_cancelled(&self) -> bool;
}

/// A simple in-memory callback that collects pairs into a `Mutex<Vec<_>>`,
/// useful for tests and for the CLI's `dedupe` subcommand.
#[derive(Default)]
pub struct CollectingCallback {
    pairs: std::sync::Mutex<Vec<DuplicatePair>>,
    cancel: AtomicBool,
}

impl CollectingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the engine's next check-point.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn into_pairs(self) -> Vec<DuplicatePair> {
        self.pairs.into_inner().unwrap_or_default()
    }
}

impl DuplicateCallback for CollectingCallback {
    fn on_duplicate_found(&self, a: &MusicRecord, b: &MusicRecord) {
        self.pairs.lock().unwrap().push(DuplicatePair {
            a: a.clone(),
            b: b.clone(),
        });
    }

    fn on_progress_update(&self, _completed: u64, _total: u64) {}

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// Per-record cached normalized forms of title/artist/album, computed at
/// most once per scan (spec §4.6 performance contract).
struct Normalized {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
}

fn precompute(records: &[MusicRecord], cfg: &FuzzyConfig) -> Vec<Normalized> {
    records
        .iter()
        .map(|r| Normalized {
            title: r.title().map(|s| normalize(s, cfg)),
            artist: r.artist().map(|s| normalize(s, cfg)),
            album: r.album().map(|s| normalize(s, cfg)),
        })
        .collect()
}

/// Null-safe field comparison: both absent is a match at 100; exactly one
/// absent is a mismatch at 0; otherwise compare normalized similarity
/// against `threshold`.
fn field_matches(a: Option<&str>, b: Option<&str>, threshold: f64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(_), None) | (None, Some(_)) => false,
        (Some(x), Some(y)) => similarity(x, y) >= threshold,
    }
}

fn duration_matches(a: Option<i32>, b: Option<i32>, cfg: &FuzzyConfig) -> bool {
    match (a, b) {
        (None, _) | (_, None) => true, // skip the check when either is absent
        (Some(da), Some(db)) => {
            let diff = (da - db).abs();
            let within_abs = diff <= cfg.duration_tolerance_seconds;
            let max_d = da.max(db);
            let within_pct = if max_d > 0 {
                (diff as f64 / max_d as f64) * 100.0 <= cfg.duration_tolerance_percent
            } else {
                diff == 0
            };
            within_abs || within_pct
        }
    }
}

/// `areDuplicates(a, b, cfg)` from spec §4.6.
fn are_duplicates(
    i: usize,
    j: usize,
    records: &[MusicRecord],
    normalized: &[Normalized],
    cfg: &FuzzyConfig,
) -> bool {
    let (a, b) = (&records[i], &records[j]);

    let track_number_matched = if cfg.track_number_must_match {
        match (a.track_number(), b.track_number()) {
            (Some(x), Some(y)) if x == y => true,
            _ => return false,
        }
    } else {
        false
    };

    if !duration_matches(a.duration_seconds(), b.duration_seconds(), cfg) {
        return false;
    }

    let (na, nb) = (&normalized[i], &normalized[j]);
    let mut count = 0u8;
    if field_matches(na.title.as_deref(), nb.title.as_deref(), cfg.title_threshold) {
        count += 1;
    }
    if field_matches(
        na.artist.as_deref(),
        nb.artist.as_deref(),
        cfg.artist_threshold,
    ) {
        count += 1;
    }
    if field_matches(na.album.as_deref(), nb.album.as_deref(), cfg.album_threshold) {
        count += 1;
    }
    if track_number_matched {
        count += 1;
    }

    count >= cfg.minimum_fields_to_match
}

/// Parallel fuzzy duplicate pair search over a read-only snapshot of records.
pub struct DuplicateEngine;

impl DuplicateEngine {
    /// Emit every unordered pair `{a,b}, a != b` that `cfg` considers
    /// duplicates, via `callback`, and report progress at least every 100
    /// comparisons. Blocks only on internal work distribution; performs no I/O.
    pub fn find_duplicates(
        records: &[MusicRecord],
        cfg: &FuzzyConfig,
        callback: &dyn DuplicateCallback,
    ) -> VinylResult<ScanStatus> {
        let n = records.len() as u64;
        let total = n.saturating_mul(n.saturating_sub(1)) / 2;

        if total == 0 {
            callback.on_progress_update(0, 0);
            return Ok(ScanStatus::Completed);
        }

        let normalized = precompute(records, cfg);
        let completed = AtomicU64::new(0);
        let cancelled = AtomicBool::new(false);

        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .build()
            .map_err(|e| VinylError::internal(format!("failed to build worker pool: {e}")))?;

        let len = records.len();
        pool.install(|| {
            (0..len).into_par_iter().for_each(|i| {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                for j in (i + 1)..len {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }

                    if are_duplicates(i, j, records, &normalized, cfg) {
                        callback.on_duplicate_found(&records[i], &records[j]);
                    }

                    let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        callback.on_progress_update(count, total);
                        if callback.is_cancelled() {
                            cancelled.store(true, Ordering::Relaxed);
                        }
                    }
                }
            });
        });

        let final_completed = completed.load(Ordering::Relaxed);
        if cancelled.load(Ordering::Relaxed) {
            callback.on_progress_update(final_completed, total);
            return Ok(ScanStatus::Cancelled);
        }

        callback.on_progress_update(total, total);
        Ok(ScanStatus::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Preset;

    fn record(title: &str, artist: &str, album: &str, dur: i32, track: i32) -> MusicRecord {
        let mut r = MusicRecord::new(format!("/music/{title}-{artist}.mp3"), "mp3");
        r.set_title(Some(title));
        r.set_artist(Some(artist));
        r.set_album(Some(album));
        r.set_duration_seconds(Some(dur));
        r.set_track_number(Some(track));
        r
    }

    #[test]
    fn total_matches_n_choose_2_and_completes() {
        let records: Vec<MusicRecord> = (0..100)
            .map(|i| record(&format!("Title {i}"), &format!("Artist {i}"), "Album", 200, i))
            .collect();
        let cfg = FuzzyConfig::preset(Preset::Balanced);
        let cb = CollectingCallback::new();

        let status = DuplicateEngine::find_duplicates(&records, &cfg, &cb).unwrap();
        assert_eq!(status, ScanStatus::Completed);
        // no two distinct titles/artists should match at Balanced thresholds
        assert!(cb.into_pairs().len() <= 100 * 99 / 2);
    }

    #[test]
    fn s2_fuzzy_match_scenario() {
        let a = record("Hey Jude", "The Beatles", "1", 431, 9);
        let b = record("Hey Jude ", "Beatles", "1 (Remastered)", 432, 9);
        let cfg = FuzzyConfig::preset(Preset::Balanced);
        let normalized = precompute(&[a.clone(), b.clone()], &cfg);
        assert!(are_duplicates(0, 1, &[a, b], &normalized, &cfg));
    }

    #[test]
    fn s3_engine_total_for_100_records() {
        let records: Vec<MusicRecord> = (0..100)
            .map(|i| record(&format!("T{i}"), &format!("A{i}"), "Alb", 100, i))
            .collect();
        let cfg = FuzzyConfig::preset(Preset::Strict);
        let cb = CollectingCallback::new();
        let status = DuplicateEngine::find_duplicates(&records, &cfg, &cb).unwrap();
        assert_eq!(status, ScanStatus::Completed);
    }

    struct CancelAfterOne {
        cancel: AtomicBool,
        found: std::sync::atomic::AtomicU64,
    }

    impl DuplicateCallback for CancelAfterOne {
        fn on_duplicate_found(&self, _a: &MusicRecord, _b: &MusicRecord) {
            self.found.fetch_add(1, Ordering::Relaxed);
        }
        fn on_progress_update(&self, _completed: u64, _total: u64) {
            self.cancel.store(true, Ordering::Relaxed);
        }
        fn is_cancelled(&self) -> bool {
            self.cancel.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn cancellation_is_observed_and_reported() {
        let records: Vec<MusicRecord> = (0..50)
            .map(|i| record(&format!("T{i}"), &format!("A{i}"), "Alb", 100, i))
            .collect();
        let cfg = FuzzyConfig::preset(Preset::Lenient);
        let cb = CancelAfterOne {
            cancel: AtomicBool::new(false),
            found: std::sync::atomic::AtomicU64::new(0),
        };
        let status = DuplicateEngine::find_duplicates(&records, &cfg, &cb).unwrap();
        assert_eq!(status, ScanStatus::Cancelled);
    }

    #[test]
    fn identical_records_always_pair_under_strict() {
        let a = record("Same Title", "Same Artist", "Same Album", 200, 1);
        let b = a.clone();
        let cfg = FuzzyConfig::preset(Preset::Strict);
        let normalized = precompute(&[a.clone(), b.clone()], &cfg);
        assert!(are_duplicates(0, 1, &[a, b], &normalized, &cfg));
    }

    #[test]
    fn no_pair_for_self_or_reversed_index() {
        // are_duplicates is only ever invoked with j > i by the engine; this
        // documents that invariant rather than re-deriving it structurally.
        let records: Vec<MusicRecord> = (0..5)
            .map(|i| record(&format!("T{i}"), &format!("A{i}"), "Alb", 100, i))
            .collect();
        let cfg = FuzzyConfig::preset(Preset::Strict);
        let cb = CollectingCallback::new();
        DuplicateEngine::find_duplicates(&records, &cfg, &cb).unwrap();
        for pair in cb.into_pairs() {
            assert_ne!(pair.a.file_path(), pair.b.file_path());
        }
    }
}
