//! FileOrganizer — projects records onto a destination tree via a
//! `PathTemplate`, without mutating the catalog (spec §4.9).

use std::path::{Path, PathBuf};

use crate::error::{VinylError, VinylResult};
use crate::models::MusicRecord;
use crate::template::{ArtistBucketer, PathTemplate};

/// External collaborator for file copy primitives — the core depends only
/// on this trait, never on a concrete filesystem implementation.
pub trait FileOps: Sync {
    fn copy(&self, src: &Path, dst: &Path) -> VinylResult<()>;
    fn exists(&self, path: &Path) -> bool;
    fn metadata(&self, path: &Path) -> VinylResult<(u64, std::time::SystemTime)>;
}

/// Default [`FileOps`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileOps;

impl FileOps for StdFileOps {
    fn copy(&self, src: &Path, dst: &Path) -> VinylResult<()> {
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VinylError::io("create destination directory", parent.to_path_buf(), e))?;
        }
        std::fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| VinylError::io("copy file", dst.to_path_buf(), e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn metadata(&self, path: &Path) -> VinylResult<(u64, std::time::SystemTime)> {
        let m = std::fs::metadata(path).map_err(|e| VinylError::io("stat file", path.to_path_buf(), e))?;
        let modified = m
            .modified()
            .map_err(|e| VinylError::io("read mtime", path.to_path_buf(), e))?;
        Ok((m.len(), modified))
    }
}

/// Progress sink: `(completed, total, last_target)`, checked between files.
pub trait OrganizeCallback: Sync {
    fn on_progress(&self, completed: u64, total: u64, last_target: &Path);
    fn is_cancelled(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullOrganizeCallback;

impl OrganizeCallback for NullOrganizeCallback {
    fn on_progress(&self, _completed: u64, _total: u64, _last_target: &Path) {}
    fn is_cancelled(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct OrganizeFailure {
    pub source: PathBuf,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct OrganizeOutcome {
    pub copied: u64,
    pub skipped_idempotent: u64,
    pub failures: Vec<OrganizeFailure>,
    pub cancelled: bool,
}

pub struct FileOrganizer;

impl FileOrganizer {
    /// Copy every record to `destination_root/template.render(record, ...)`,
    /// resolving name collisions and skipping files that are already in
    /// place byte-for-byte (idempotent re-runs).
    pub fn organize(
        records: &[MusicRecord],
        template: &PathTemplate,
        destination_root: &Path,
        file_ops: &dyn FileOps,
        callback: &dyn OrganizeCallback,
    ) -> OrganizeOutcome {
        let distribution = ArtistBucketer::compute(records, template.subdirectory_levels as usize);
        let total = records.len() as u64;
        let mut outcome = OrganizeOutcome::default();

        for record in records {
            if callback.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let relative = template.render(record, &distribution);
            let target = destination_root.join(relative);
            let source = Path::new(record.file_path());

            let resolved_target = match Self::resolve_target(&target, source, file_ops) {
                Ok(TargetResolution::AlreadyInPlace) => {
                    outcome.skipped_idempotent += 1;
                    target.clone()
                }
                Ok(TargetResolution::Unique(final_target)) => match file_ops.copy(source, &final_target) {
                    Ok(()) => {
                        outcome.copied += 1;
                        final_target
                    }
                    Err(e) => {
                        outcome.failures.push(OrganizeFailure {
                            source: source.to_path_buf(),
                            message: e.to_string(),
                        });
                        final_target
                    }
                },
                Err(e) => {
                    outcome.failures.push(OrganizeFailure {
                        source: source.to_path_buf(),
                        message: e.to_string(),
                    });
                    target.clone()
                }
            };

            let completed = outcome.copied + outcome.skipped_idempotent + outcome.failures.len() as u64;
            callback.on_progress(completed, total, &resolved_target);
        }

        outcome
    }

    /// Decide whether `target` can be reused as-is, must be disambiguated
    /// with a `_2`, `_3`, ... suffix, or is free to use directly.
    fn resolve_target(
        target: &Path,
        source: &Path,
        file_ops: &dyn FileOps,
    ) -> VinylResult<TargetResolution> {
        if !file_ops.exists(target) {
            return Ok(TargetResolution::Unique(target.to_path_buf()));
        }

        let (target_len, target_mtime) = file_ops.metadata(target)?;
        if let Ok((source_len, source_mtime)) = file_ops.metadata(source) {
            if target_len == source_len && target_mtime == source_mtime {
                return Ok(TargetResolution::AlreadyInPlace);
            }
        }

        let mut candidate_index = 2u32;
        loop {
            let candidate = suffixed(target, candidate_index);
            if !file_ops.exists(&candidate) {
                return Ok(TargetResolution::Unique(candidate));
            }
            candidate_index += 1;
        }
    }
}

enum TargetResolution {
    AlreadyInPlace,
    Unique(PathBuf),
}

fn suffixed(path: &Path, index: u32) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str());
    let file_name = match ext {
        Some(ext) => format!("{stem}_{index}.{ext}"),
        None => format!("{stem}_{index}"),
    };
    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TextFormat;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeFileOps {
        files: Mutex<HashMap<PathBuf, (u64, std::time::SystemTime)>>,
    }

    impl FakeFileOps {
        fn with(mut self, path: &str, len: u64, mtime: std::time::SystemTime) -> Self {
            self.files
                .get_mut()
                .unwrap()
                .insert(PathBuf::from(path), (len, mtime));
            self
        }
    }

    impl FileOps for FakeFileOps {
        fn copy(&self, src: &Path, dst: &Path) -> VinylResult<()> {
            let len = self
                .files
                .lock()
                .unwrap()
                .get(src)
                .map(|(l, _)| *l)
                .unwrap_or(0);
            self.files
                .lock()
                .unwrap()
                .insert(dst.to_path_buf(), (len, std::time::SystemTime::now()));
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }

        fn metadata(&self, path: &Path) -> VinylResult<(u64, std::time::SystemTime)> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .ok_or_else(|| VinylError::not_found(path.display().to_string()))
        }
    }

    fn record(artist: &str, title: &str, path: &str) -> MusicRecord {
        let mut r = MusicRecord::new(path, "mp3");
        r.set_artist(Some(artist));
        r.set_title(Some(title));
        r
    }

    #[test]
    fn copies_to_rendered_target() {
        let template =
            PathTemplate::parse("{artist}/{title}.{file_type}", TextFormat::None, false, 26).unwrap();
        let fops = FakeFileOps::default().with("/src/a.mp3", 100, std::time::SystemTime::now());
        let records = vec![record("Artist", "Title", "/src/a.mp3")];

        let outcome = FileOrganizer::organize(
            &records,
            &template,
            Path::new("/dest"),
            &fops,
            &NullOrganizeCallback,
        );
        assert_eq!(outcome.copied, 1);
        assert!(fops.exists(Path::new("/dest/Artist/Title.mp3")));
    }

    #[test]
    fn identical_existing_target_is_idempotent() {
        let template =
            PathTemplate::parse("{artist}/{title}.{file_type}", TextFormat::None, false, 26).unwrap();
        let mtime = std::time::SystemTime::now();
        let fops = FakeFileOps::default()
            .with("/src/a.mp3", 100, mtime)
            .with("/dest/Artist/Title.mp3", 100, mtime);
        let records = vec![record("Artist", "Title", "/src/a.mp3")];

        let outcome = FileOrganizer::organize(
            &records,
            &template,
            Path::new("/dest"),
            &fops,
            &NullOrganizeCallback,
        );
        assert_eq!(outcome.skipped_idempotent, 1);
        assert_eq!(outcome.copied, 0);
    }

    #[test]
    fn colliding_different_target_gets_suffixed() {
        let template =
            PathTemplate::parse("{artist}/{title}.{file_type}", TextFormat::None, false, 26).unwrap();
        let fops = FakeFileOps::default()
            .with("/src/a.mp3", 100, std::time::SystemTime::now())
            .with(
                "/dest/Artist/Title.mp3",
                999,
                std::time::SystemTime::UNIX_EPOCH,
            );
        let records = vec![record("Artist", "Title", "/src/a.mp3")];

        let outcome = FileOrganizer::organize(
            &records,
            &template,
            Path::new("/dest"),
            &fops,
            &NullOrganizeCallback,
        );
        assert_eq!(outcome.copied, 1);
        assert!(fops.exists(Path::new("/dest/Artist/Title_2.mp3")));
    }

    #[test]
    fn does_not_mutate_record_file_path() {
        let template =
            PathTemplate::parse("{artist}/{title}.{file_type}", TextFormat::None, false, 26).unwrap();
        let fops = FakeFileOps::default().with("/src/a.mp3", 100, std::time::SystemTime::now());
        let records = vec![record("Artist", "Title", "/src/a.mp3")];

        FileOrganizer::organize(&records, &template, Path::new("/dest"), &fops, &NullOrganizeCallback);
        assert_eq!(records[0].file_path(), "/src/a.mp3");
    }
}
