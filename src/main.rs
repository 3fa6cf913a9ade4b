//! Codetrail CLI - inspect and maintain a code graph index

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use codetrail::config::{self, CodetrailConfig, ProjectSettings};
use codetrail::ui::{self, Icons};
use codetrail::{AccessMode, EdgeKind, NameHierarchy, SqliteStore, StorageFile, STORAGE_VERSION};
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "codetrail")]
#[command(version)]
#[command(about = "Persistent graph index for source-code navigation")]
#[command(long_about = r#"
Codetrail keeps everything an indexer learns about a code base in one SQLite
file: symbols, files, typed edges, source locations and diagnostics.

Example usage:
  codetrail init --name demo
  codetrail stats
  codetrail symbol "ns::foo"
  codetrail locations src/main.cpp --line 42
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the index file (default: from codetrail.toml, then .codetrail/index.db)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an index file and write codetrail.toml
    Init {
        /// Project name stored with the index
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite an existing codetrail.toml
        #[arg(long)]
        force: bool,
    },

    /// Show statistics about the index
    Stats,

    /// Report whether the index matches this build's storage version
    Check,

    /// Drop all indexed data and recreate the schema
    Clear {
        /// Also restart id allocation
        #[arg(long)]
        reset_ids: bool,
    },

    /// List indexed files
    Files,

    /// List indexing errors
    Errors {
        /// Only errors reported for this path
        #[arg(long)]
        file: Option<String>,
    },

    /// Look up a node by qualified or serialized name
    Symbol {
        /// Qualified name such as ns::foo, or a serialized name
        name: String,

        /// Name delimiter used to split qualified names
        #[arg(long, default_value = "::")]
        delimiter: String,
    },

    /// List edges touching a node
    Edges {
        /// Node id
        id: u64,

        /// Filter by edge kind
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Show the token locations of a file
    Locations {
        /// File path as stored in the index
        path: String,

        /// Only locations covering this line
        #[arg(short, long)]
        line: Option<u32>,
    },

    /// Show or change the project settings stored in the index
    Settings {
        /// Assignments like source_paths=src,include (repeatable)
        #[arg(long = "set")]
        assignments: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let tool_config = config::load_config(None)?.unwrap_or_default();
    let database = resolve_database(cli.database, &tool_config);
    let format = cli.format;

    match cli.command {
        Commands::Init { name, force } => {
            config::ensure_db_dir(&database)?;
            let store = SqliteStore::open(&database, AccessMode::ReadWrite)?;
            store.setup()?;

            if let Some(name) = name {
                let mut settings = load_settings(&store)?;
                settings.name = name;
                store.set_project_settings_text(&settings.to_text()?)?;
            }

            let config_path = config::default_config_path();
            if force || !config_path.exists() {
                let new_config = CodetrailConfig {
                    database: Some(database.to_string_lossy().into_owned()),
                    read_only: tool_config.read_only,
                };
                config::write_config(&config_path, &new_config, force)?;
            }
            if database.components().any(|c| c.as_os_str() == ".codetrail") {
                config::ensure_gitignore(Path::new("."))?;
            }

            ui::success(&format!("Index ready at {}", database.display()));
        }

        Commands::Stats => {
            let store = open_existing(&database, &tool_config, true)?;
            let stats = store.stats()?;

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                ui::header(&format!("Codetrail Statistics ({})", database.display()));
                println!("{}", ui::stats_table(&stats));
            }
        }

        Commands::Check => {
            let store = open_existing(&database, &tool_config, true)?;
            let found = store.storage_version()?;
            let incompatible = store.is_incompatible()?;

            if format == OutputFormat::Json {
                let report = json!({
                    "storage_version": found,
                    "expected_version": STORAGE_VERSION,
                    "application_version": store.application_version()?,
                    "incompatible": incompatible,
                    "empty": store.is_empty()?,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                ui::status(Icons::DATABASE, "Index", &database.display().to_string());
                ui::status(
                    Icons::GEAR,
                    "Storage version",
                    &found.map_or_else(|| "none".to_string(), |v| v.to_string()),
                );
                if let Some(app) = store.application_version()? {
                    ui::status(Icons::INFO, "Written by", &app);
                }
                if incompatible {
                    ui::error(&format!("Incompatible (expected version {STORAGE_VERSION})"));
                } else {
                    ui::success("Compatible");
                }
            }

            if incompatible {
                anyhow::bail!("index at {} needs a full re-index", database.display());
            }
        }

        Commands::Clear { reset_ids } => {
            let store = open_existing(&database, &tool_config, false)?;
            store.clear()?;
            if reset_ids {
                store.reset_ids()?;
            }
            ui::success("Index cleared");
        }

        Commands::Files => {
            let store = open_existing(&database, &tool_config, true)?;
            let mut files = store.get_all::<StorageFile>()?;
            files.sort_by(|a, b| a.file_path.cmp(&b.file_path));

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else if files.is_empty() {
                println!("∅ No files indexed.");
            } else {
                let records = files
                    .iter()
                    .map(|file| {
                        vec![
                            file.id.to_string(),
                            file.file_path.clone(),
                            file.line_count.to_string(),
                            file.modification_time.clone(),
                        ]
                    })
                    .collect();
                println!("{}", ui::records_table(&["Id", "Path", "Lines", "Modified"], records));
            }
        }

        Commands::Errors { file } => {
            let store = open_existing(&database, &tool_config, true)?;
            let errors = match &file {
                Some(path) => store.get_errors_in_file(path)?,
                None => store.get_errors()?,
            };

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&errors)?);
            } else if errors.is_empty() {
                ui::success("No errors recorded");
            } else {
                for error in &errors {
                    ui::diagnostic(error);
                }
            }
        }

        Commands::Symbol { name, delimiter } => {
            let store = open_existing(&database, &tool_config, true)?;
            let serialized = NameHierarchy::from_qualified(&name, &delimiter).serialize_name();
            let node = match store.get_node_by_serialized_name(&name)? {
                Some(node) => Some(node),
                None => store.get_node_by_serialized_name(&serialized)?,
            };
            let Some(node) = node else {
                anyhow::bail!("no node named {name:?}");
            };

            let symbol = store.get_symbol_by_serialized_name(&node.serialized_name)?;
            let outgoing = store.get_edges_by_source_id(node.id)?;
            let incoming = store.get_edges_by_target_id(node.id)?;
            let occurrences = store.get_occurrences_for_element_ids(&[node.id])?;
            let display_name = NameHierarchy::deserialize_name(&node.serialized_name)
                .map(|name| name.qualified_name())
                .unwrap_or_else(|_| node.serialized_name.clone());

            if format == OutputFormat::Json {
                let report = json!({
                    "node": node,
                    "name": display_name,
                    "definition": symbol.map(|s| s.definition_kind),
                    "outgoing": outgoing,
                    "incoming": incoming,
                    "occurrences": occurrences.len(),
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                ui::header(&display_name);
                ui::summary_row("Id:", &node.id.to_string());
                ui::summary_row("Kind:", node.kind.as_str());
                if let Some(symbol) = symbol {
                    ui::summary_row("Definition:", symbol.definition_kind.as_str());
                }
                ui::summary_row("Occurrences:", &occurrences.len().to_string());

                ui::section(&format!("Outgoing ({})", outgoing.len()));
                for edge in &outgoing {
                    println!("  {}", ui::edge_line(edge));
                }
                ui::section(&format!("Incoming ({})", incoming.len()));
                for edge in &incoming {
                    println!("  {}", ui::edge_line(edge));
                }
            }
        }

        Commands::Edges { id, kind } => {
            let store = open_existing(&database, &tool_config, true)?;
            let mut edges = store.get_edges_by_source_or_target_id(id)?;
            if let Some(kind) = kind {
                let kind: EdgeKind = kind.parse()?;
                edges.retain(|edge| edge.kind == kind);
            }
            edges.sort_by_key(|edge| edge.id);

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&edges)?);
            } else if edges.is_empty() {
                println!("∅ No edges found.");
            } else {
                for edge in &edges {
                    println!("{} {}", Icons::LINK, ui::edge_line(edge));
                }
            }
        }

        Commands::Locations { path, line } => {
            let store = open_existing(&database, &tool_config, true)?;
            let view = store.get_token_locations_for_file(&path)?;
            let locations: Vec<_> = match line {
                Some(line) => view.locations_on_line(line).collect(),
                None => view.locations.iter().collect(),
            };

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&locations)?);
            } else if locations.is_empty() {
                println!("∅ No locations in {path}.");
            } else {
                ui::status(Icons::FILE, "File", &path);
                for location in locations {
                    let elements: Vec<String> =
                        location.element_ids.iter().map(|id| id.to_string()).collect();
                    println!(
                        "{} {} {} {}",
                        Icons::PIN,
                        location.span,
                        ui::muted(location.kind.as_str()),
                        elements.join(", ")
                    );
                }
            }
        }

        Commands::Settings { assignments } => {
            let read_only = assignments.is_empty();
            let store = open_existing(&database, &tool_config, read_only)?;
            let mut settings = load_settings(&store)?;

            if !assignments.is_empty() {
                for assignment in &assignments {
                    settings.assign(assignment)?;
                }
                store.set_project_settings_text(&settings.to_text()?)?;
                ui::success("Settings updated");
            }

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                print!("{}", settings.to_text()?);
            }
        }
    }

    Ok(())
}

fn resolve_database(arg: Option<PathBuf>, config: &CodetrailConfig) -> PathBuf {
    arg.or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
}

/// Open an index that must already exist. Reads always get a read-only
/// handle, writes a read-write one unless codetrail.toml sets `read_only`.
fn open_existing(database: &Path, config: &CodetrailConfig, read: bool) -> anyhow::Result<SqliteStore> {
    if !database.exists() {
        anyhow::bail!(
            "no index at {} (run `codetrail init` first)",
            database.display()
        );
    }
    let mode = if read || config.read_only.unwrap_or(false) {
        AccessMode::ReadOnly
    } else {
        AccessMode::ReadWrite
    };
    if !read && mode == AccessMode::ReadOnly {
        ui::warn("codetrail.toml sets read_only = true");
    }
    Ok(SqliteStore::open(database, mode)?)
}

fn load_settings(store: &SqliteStore) -> anyhow::Result<ProjectSettings> {
    Ok(match store.project_settings_text()? {
        Some(text) => ProjectSettings::from_text(&text)?,
        None => ProjectSettings::default(),
    })
}
