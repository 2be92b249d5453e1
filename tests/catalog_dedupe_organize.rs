//! End-to-end: catalog persistence, fuzzy dedupe, and organize over a small
//! in-memory library, per spec §8's testable properties.

use std::path::Path;

use vinylcrate::catalog::Catalog;
use vinylcrate::fuzzy::{CollectingCallback, DuplicateEngine};
use vinylcrate::models::{FuzzyConfig, MusicRecord, Preset};
use vinylcrate::organizer::{FileOrganizer, FileOps, NullOrganizeCallback};
use vinylcrate::template::{PathTemplate, TextFormat};

fn record(path: &str, title: &str, artist: &str, album: &str, track: i32) -> MusicRecord {
    let mut r = MusicRecord::new(path, "mp3");
    r.set_title(Some(title));
    r.set_artist(Some(artist));
    r.set_album(Some(album));
    r.set_track_number(Some(track));
    r
}

#[tokio::test]
async fn scan_then_dedupe_then_organize() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::new();
    catalog.initialize(dir.path().join("catalog.db")).await.unwrap();

    let mut original = record("/music/hey_jude.mp3", "Hey Jude", "The Beatles", "Singles", 1);
    let mut duplicate = record(
        "/music/hey_jude_copy.mp3",
        "Hey Jude (feat. Someone)",
        "Beatles",
        "Singles",
        1,
    );
    let mut unrelated = record("/music/purple_rain.mp3", "Purple Rain", "Prince", "Purple Rain", 1);

    catalog.save(&mut original).await.unwrap();
    catalog.save(&mut duplicate).await.unwrap();
    catalog.save(&mut unrelated).await.unwrap();
    assert_eq!(catalog.count().await.unwrap(), 3);

    let records = catalog.get_all().await.unwrap();
    let config = FuzzyConfig::preset(Preset::Lenient);
    let callback = CollectingCallback::default();
    DuplicateEngine::find_duplicates(&records, &config, &callback).unwrap();
    let pairs = callback.into_pairs();

    assert_eq!(pairs.len(), 1);
    let paths: Vec<&str> = vec![pairs[0].a.file_path(), pairs[0].b.file_path()];
    assert!(paths.contains(&"/music/hey_jude.mp3"));
    assert!(paths.contains(&"/music/hey_jude_copy.mp3"));

    let template = PathTemplate::parse(
        "{artist}/{album}/{track_number:02d}-{title}.{file_type}",
        TextFormat::Underscore,
        false,
        26,
    )
    .unwrap();

    struct CopyingFileOps;
    impl FileOps for CopyingFileOps {
        fn copy(&self, _src: &Path, dst: &Path) -> vinylcrate::VinylResult<()> {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(dst, b"organized").unwrap();
            Ok(())
        }
        fn exists(&self, path: &Path) -> bool {
            path.exists()
        }
        fn metadata(&self, path: &Path) -> vinylcrate::VinylResult<(u64, std::time::SystemTime)> {
            let m = std::fs::metadata(path).unwrap();
            Ok((m.len(), m.modified().unwrap()))
        }
    }

    let dest = dir.path().join("organized");
    let outcome = FileOrganizer::organize(&records, &template, &dest, &CopyingFileOps, &NullOrganizeCallback);

    assert_eq!(outcome.copied, 3);
    assert!(outcome.failures.is_empty());
    assert!(dest.join("The_Beatles/Singles/01-Hey_Jude.mp3").exists());
    assert!(dest.join("Prince/Purple_Rain/01-Purple_Rain.mp3").exists());

    catalog.shutdown().await;
}

#[tokio::test]
async fn reopening_catalog_preserves_records_across_profile_switch() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::new();

    catalog.initialize(dir.path().join("a.db")).await.unwrap();
    let mut a = record("/music/a.mp3", "A", "Artist A", "Album A", 1);
    catalog.save(&mut a).await.unwrap();
    assert_eq!(catalog.count().await.unwrap(), 1);

    catalog.initialize(dir.path().join("b.db")).await.unwrap();
    assert_eq!(catalog.count().await.unwrap(), 0);

    catalog.initialize(dir.path().join("a.db")).await.unwrap();
    assert_eq!(catalog.count().await.unwrap(), 1);
}
