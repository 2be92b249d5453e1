//! vinylcrate - a catalog, deduper, and organizer for local audio files
//!
//! This binary is a thin CLI translation layer over the `vinylcrate` library:
//! it owns argument parsing, logging setup, and terminal progress rendering,
//! and otherwise delegates every decision to the library's subsystems.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use vinylcrate::config::Paths;
use vinylcrate::fuzzy::{CollectingCallback, DuplicateEngine};
use vinylcrate::models::{FuzzyConfig, Preset, Profile};
use vinylcrate::organizer::{FileOrganizer, NullOrganizeCallback, StdFileOps};
use vinylcrate::profile::ProfileManager;
use vinylcrate::scanner::{FileScanner, LoftyExtractor};

/// vinylcrate - audio catalog, duplicate finder, and library organizer
#[derive(Parser, Debug)]
#[command(name = "vinylcrate")]
#[command(author = "vinylcrate contributors")]
#[command(version = "0.1.0")]
#[command(about = "Index, dedupe, and organize a local audio collection")]
struct Args {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Override the config directory (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage profiles (isolated catalogs with their own settings)
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Scan a directory and add discovered audio files to the active profile
    Scan {
        /// Directory to scan recursively
        root: PathBuf,
    },
    /// Find fuzzy duplicates in the active profile's catalog
    Dedupe {
        /// Matching preset: strict, balanced, or lenient (default: balanced)
        #[arg(long, default_value = "balanced")]
        preset: String,
    },
    /// Copy the active profile's catalog into an organized destination tree
    Organize {
        /// Destination root directory
        dest: PathBuf,
    },
    /// Search the active profile's catalog by title, artist, album, or path
    Search { term: String },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Create a new profile
    Create {
        name: String,
        /// Database file path (defaults under the config directory)
        #[arg(long)]
        database_path: Option<PathBuf>,
    },
    /// List all profiles
    List,
    /// Switch the active profile
    Switch { name: String },
    /// Delete a profile (fails if it is the only one)
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::new(format!("{log_level},lofty=error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let paths = Paths::init(args.config).context("failed to initialize config paths")?;
    info!("config directory: {:?}", paths.config_dir());

    let manager = ProfileManager::init_global(paths.profiles_manifest_path())
        .context("failed to load profiles manifest")?;

    match args.command {
        Command::Profile { action } => run_profile_command(&manager, &paths, action).await?,
        Command::Scan { root } => run_scan(&manager, &root).await?,
        Command::Dedupe { preset } => run_dedupe(&manager, &preset).await?,
        Command::Organize { dest } => run_organize(&manager, &dest).await?,
        Command::Search { term } => run_search(&manager, &term).await?,
    }

    Ok(())
}

async fn run_profile_command(
    manager: &Arc<ProfileManager>,
    paths: &Arc<Paths>,
    action: ProfileAction,
) -> Result<()> {
    match action {
        ProfileAction::Create { name, database_path } => {
            let database_path =
                database_path.unwrap_or_else(|| paths.profiles_dir().join(format!("{name}.db")));
            let id = manager.create_profile(&name, database_path)?;
            println!("created profile \"{name}\" ({id})");
        }
        ProfileAction::List => {
            let active = manager.active_profile().map(|p| p.id);
            for profile in manager.list_profiles() {
                let marker = if Some(profile.id) == active { "*" } else { " " };
                println!("{marker} {} ({})", profile.name, profile.database_path.display());
            }
        }
        ProfileAction::Switch { name } => {
            let profile = find_profile_by_name(manager, &name)?;
            manager.switch_active(profile.id).await?;
            println!("switched to profile \"{name}\"");
        }
        ProfileAction::Delete { name } => {
            let profile = find_profile_by_name(manager, &name)?;
            manager.delete_profile(profile.id)?;
            println!("deleted profile \"{name}\"");
        }
    }
    Ok(())
}

async fn run_scan(manager: &Arc<ProfileManager>, root: &PathBuf) -> Result<()> {
    let profile = active_profile(manager)?;
    manager.ensure_catalog_initialized().await?;

    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner} {msg}").unwrap());
    let callback = ProgressScanCallback { bar: bar.clone() };

    let outcome = FileScanner::scan(root, &profile.enabled_file_types, &LoftyExtractor, &callback)?;
    bar.finish_and_clear();

    let catalog = manager.catalog();
    let mut inserted = 0u64;
    for mut record in outcome.records {
        catalog.save(&mut record).await?;
        inserted += 1;
    }

    println!(
        "scanned {}: {inserted} files added, {} failures{}",
        root.display(),
        outcome.failures.len(),
        if outcome.cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}

async fn run_dedupe(manager: &Arc<ProfileManager>, preset: &str) -> Result<()> {
    let _ = active_profile(manager)?;
    manager.ensure_catalog_initialized().await?;

    let config = match preset.to_lowercase().as_str() {
        "strict" => FuzzyConfig::preset(Preset::Strict),
        "lenient" => FuzzyConfig::preset(Preset::Lenient),
        "balanced" => FuzzyConfig::preset(Preset::Balanced),
        other => bail!("unknown preset \"{other}\" (expected strict, balanced, or lenient)"),
    };

    let records = manager.catalog().get_all().await?;
    let callback = CollectingCallback::default();
    let status = DuplicateEngine::find_duplicates(&records, &config, &callback)?;

    let pairs = callback.into_pairs();
    for pair in &pairs {
        println!("{} <-> {}", pair.a.file_path(), pair.b.file_path());
    }
    println!("{} duplicate pair(s) found ({status:?})", pairs.len());
    Ok(())
}

async fn run_organize(manager: &Arc<ProfileManager>, dest: &PathBuf) -> Result<()> {
    let profile = active_profile(manager)?;
    manager.ensure_catalog_initialized().await?;

    let records = manager.catalog().get_all().await?;
    let outcome = FileOrganizer::organize(
        &records,
        &profile.path_template,
        dest,
        &StdFileOps,
        &NullOrganizeCallback,
    );

    println!(
        "organized into {}: {} copied, {} already in place, {} failed",
        dest.display(),
        outcome.copied,
        outcome.skipped_idempotent,
        outcome.failures.len()
    );
    for failure in &outcome.failures {
        println!("  failed: {} ({})", failure.source.display(), failure.message);
    }
    Ok(())
}

async fn run_search(manager: &Arc<ProfileManager>, term: &str) -> Result<()> {
    manager.ensure_catalog_initialized().await?;
    let matches = manager.catalog().search(term).await?;
    for record in &matches {
        println!(
            "{} - {} [{}]",
            record.artist().unwrap_or("Unknown Artist"),
            record.title().unwrap_or("Unknown Title"),
            record.file_path()
        );
    }
    println!("{} match(es)", matches.len());
    Ok(())
}

fn active_profile(manager: &ProfileManager) -> Result<Profile> {
    manager
        .active_profile()
        .context("no active profile; create one with `vinylcrate profile create`")
}

fn find_profile_by_name(manager: &ProfileManager, name: &str) -> Result<Profile> {
    manager
        .list_profiles()
        .into_iter()
        .find(|p| p.name == name)
        .with_context(|| format!("no profile named \"{name}\""))
}

struct ProgressScanCallback {
    bar: ProgressBar,
}

impl vinylcrate::scanner::ScanCallback for ProgressScanCallback {
    fn on_progress(&self, files_seen: u64, files_matched: u64, current_dir: &std::path::Path) {
        self.bar.set_message(format!(
            "{files_seen} seen, {files_matched} matched ({})",
            current_dir.display()
        ));
        self.bar.tick();
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}
