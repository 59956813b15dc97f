//! relabel - safe single-item rename with metadata index reconciliation.
//!
//! Usage:
//!   relabel rename PATH NEW_NAME     Rename a file or folder
//!   relabel sanitize RAW             Show the name a raw input becomes
//!   relabel track PATH --db FILE     Start tracking a path in the index
//!   relabel records --db FILE        List tracked records
//!   relabel reindex OLD NEW --db F   Rewrite a path prefix in the index
//!   relabel --help                   Show help

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use relabel_core::{
    Capability, CapabilitySet, Item, ItemKind, RenameConfig, RenameOutcome, RenameRequest,
};
use relabel_index::{MemoryStore, MetadataReindexer, MetadataStore, SqliteStore};
use relabel_ops::{
    AsciiTransliterator, LocalFilesystem, MessageLevel, NameSanitizer, OutcomeReporter,
    RenameEngine, RenameResult, start_rename,
};

#[derive(Parser)]
#[command(
    name = "relabel",
    version,
    about = "Rename files and folders without breaking the metadata index",
    long_about = "relabel sanitizes the new name, refuses to overwrite anything, and \
                  rewrites the paths of every metadata record affected by the rename."
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log progress and decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rename a file or folder
    Rename {
        /// Entry to rename
        path: PathBuf,

        /// New name, sanitized before use; file extensions are kept
        new_name: String,

        /// SQLite metadata database
        #[arg(long)]
        db: Option<PathBuf>,

        /// Withhold the permission to rename this kind of entry
        #[arg(long, value_enum)]
        deny: Vec<KindArg>,

        /// Treat this path and everything below it as protected
        #[arg(long)]
        protect: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the name a raw input is sanitized to
    Sanitize {
        /// Raw user input
        raw: String,
    },

    /// Create a metadata record for a path
    Track {
        /// Path to track
        path: PathBuf,

        /// SQLite metadata database
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List metadata records
    Records {
        /// Only list records stored under this prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// SQLite metadata database
        #[arg(long)]
        db: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Rewrite every record under OLD_PREFIX to NEW_PREFIX
    Reindex {
        old_prefix: String,
        new_prefix: String,

        /// SQLite metadata database
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    File,
    Folder,
}

impl From<KindArg> for Capability {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::File => Capability::RenameFile,
            KindArg::Folder => Capability::RenameFolder,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config =
        RenameConfig::load_or_default(cli.config.as_deref()).context("Invalid configuration")?;

    match cli.command {
        Command::Rename {
            path,
            new_name,
            db,
            deny,
            protect,
            format,
        } => run_rename(config, &path, new_name, db, &deny, protect, format).await,
        Command::Sanitize { raw } => {
            let sanitizer = NameSanitizer::from_config(&config, Arc::new(AsciiTransliterator));
            println!("{}", sanitizer.sanitize(&raw));
            Ok(())
        }
        Command::Track { path, db } => run_track(&config, &path, db),
        Command::Records { prefix, db, format } => {
            run_records(&config, prefix.as_deref(), db, format)
        }
        Command::Reindex {
            old_prefix,
            new_prefix,
            db,
        } => {
            let store = open_database(&config, db)?;
            let reindexer = MetadataReindexer::new(store, config.separator);
            let count = reindexer
                .reindex(&old_prefix, &new_prefix)
                .context("Reindex failed")?;
            println!("{count} record(s) updated");
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Rename one entry and print the report.
async fn run_rename(
    mut config: RenameConfig,
    path: &Path,
    new_name: String,
    db: Option<PathBuf>,
    deny: &[KindArg],
    protect: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let item = item_for(path)?;
    config.protected_paths.extend(protect);

    let store: Arc<dyn MetadataStore> = match db.or_else(|| config.database.clone()) {
        Some(db) => Arc::new(
            SqliteStore::open(&db)
                .with_context(|| format!("Cannot open {}", db.display()))?
                .with_separator(config.separator),
        ),
        None => Arc::new(MemoryStore::new(config.separator)),
    };

    let capabilities = deny
        .iter()
        .fold(CapabilitySet::all(), |caps, kind| caps.revoke((*kind).into()));

    let engine = Arc::new(RenameEngine::new(config, Arc::new(LocalFilesystem::new()), store));
    let mut rx = start_rename(engine, RenameRequest::new(item, new_name, capabilities));

    let mut outcome = None;
    while let Some(result) = rx.recv().await {
        match result {
            RenameResult::Progress(state) => debug!(%state, "rename progress"),
            RenameResult::Complete(done) => outcome = Some(done),
        }
    }
    let outcome = outcome.ok_or_else(|| eyre!("Rename finished without an outcome"))?;

    match format {
        OutputFormat::Text => print_report(&outcome),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(outcome: &RenameOutcome) {
    let report = OutcomeReporter::new().report(outcome);
    match report.level {
        MessageLevel::Success => println!("{}", report.message),
        MessageLevel::Warning => eprintln!("warning: {}", report.message),
        MessageLevel::Error => eprintln!("error: {}", report.message),
    }
}

/// Build the item for a native path from its metadata.
///
/// A symlink is renamed itself, never its target.
fn item_for(path: &Path) -> Result<Item> {
    let (parent, name) = split_entry(path)?;
    let metadata = fs::symlink_metadata(parent.join(&name)).context("Cannot read metadata")?;
    let kind = if metadata.is_dir() {
        ItemKind::Folder
    } else {
        ItemKind::File
    };

    Ok(Item::new(name.to_string_lossy(), kind, native_str(&parent)))
}

/// The absolute parent folder and the final component of `path`. Only the
/// parent is canonicalized, so a trailing symlink is kept as named.
fn split_entry(path: &Path) -> Result<(PathBuf, OsString)> {
    let Some(name) = path.file_name() else {
        // `..` or a root; there is no link to keep.
        let resolved = path.canonicalize().context("Invalid path")?;
        let (Some(parent), Some(name)) = (resolved.parent(), resolved.file_name()) else {
            bail!("Cannot rename {}", path.display());
        };
        return Ok((parent.to_path_buf(), name.to_os_string()));
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize(),
        _ => std::env::current_dir(),
    }
    .context("Invalid path")?;
    Ok((parent, name.to_os_string()))
}

fn native_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn open_database(config: &RenameConfig, db: Option<PathBuf>) -> Result<Arc<dyn MetadataStore>> {
    let Some(db) = db.or_else(|| config.database.clone()) else {
        bail!("No database given; pass --db or set `database` in the config file");
    };
    let store = SqliteStore::open(&db)
        .with_context(|| format!("Cannot open {}", db.display()))?
        .with_separator(config.separator);
    Ok(Arc::new(store))
}

fn run_track(config: &RenameConfig, path: &Path, db: Option<PathBuf>) -> Result<()> {
    let store = open_database(config, db)?;
    let (parent, name) = split_entry(path)?;
    let record = store
        .create_record(&native_str(&parent.join(name)))
        .context("Cannot create record")?;
    println!("{} {}", record.id, record.stored_path);
    Ok(())
}

fn run_records(
    config: &RenameConfig,
    prefix: Option<&str>,
    db: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let store = open_database(config, db)?;
    let records = match prefix {
        Some(prefix) => store.find_by_path_prefix(prefix),
        None => store.all(),
    }
    .context("Cannot read records")?;

    match format {
        OutputFormat::Text => {
            for record in &records {
                println!("{:>6}  {}", record.id, record.stored_path);
            }
            println!();
            println!("{} record(s)", records.len());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_item_for_file_and_folder() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("docs")).unwrap();
        fs::write(root.join("docs/a.txt"), "a").unwrap();

        let file = item_for(&root.join("docs/a.txt")).unwrap();
        assert_eq!(file.name, "a.txt");
        assert_eq!(file.kind, ItemKind::File);
        assert_eq!(file.parent_path, native_str(&root.join("docs")));

        let folder = item_for(&root.join("docs")).unwrap();
        assert_eq!(folder.name, "docs");
        assert_eq!(folder.kind, ItemKind::Folder);
        assert_eq!(folder.parent_path, native_str(&root));
    }

    #[test]
    fn test_item_for_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(item_for(&dir.path().join("missing.txt")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_item_for_symlink_keeps_link() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("selected")).unwrap();
        fs::create_dir(root.join("elsewhere")).unwrap();
        fs::write(root.join("elsewhere/real.txt"), "real").unwrap();
        std::os::unix::fs::symlink(root.join("elsewhere/real.txt"), root.join("selected/link.txt"))
            .unwrap();

        let item = item_for(&root.join("selected/link.txt")).unwrap();
        assert_eq!(item.name, "link.txt");
        assert_eq!(item.kind, ItemKind::File);
        assert_eq!(item.parent_path, native_str(&root.join("selected")));
    }

    #[cfg(unix)]
    #[test]
    fn test_item_for_symlink_to_folder_is_not_followed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir(root.join("target")).unwrap();
        std::os::unix::fs::symlink(root.join("target"), root.join("shortcut")).unwrap();

        let item = item_for(&root.join("shortcut")).unwrap();
        assert_eq!(item.name, "shortcut");
        assert_eq!(item.kind, ItemKind::File);
    }
}
