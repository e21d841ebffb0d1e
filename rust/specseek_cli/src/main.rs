mod cli;
mod commands;
mod config;
mod errors;

use clap::Parser;
use specseek::{
    AllowAll,
    MemoryCache,
    SearchEngine,
    SqliteStore,
};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{
    Cli,
    Command,
};
use config::Config;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), errors::CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    // Parse command line arguments
    let args = Cli::parse();

    // Load and parse configuration
    let mut config = match args.config {
        Some(ref path) => {
            let file = match std::fs::File::open(path) {
                Ok(x) => x,
                Err(e) => {
                    return Err(errors::CliError::Io {
                        source: e.to_string(),
                        path: Some(path.to_string_lossy().to_string()),
                    });
                }
            };
            match serde_json::from_reader(file) {
                Ok(x) => x,
                Err(e) => {
                    return Err(errors::CliError::ParseError { msg: e.to_string() });
                }
            }
        }
        None => Config::default(),
    };

    // Override config with command line arguments if provided
    if let Some(database) = args.database {
        config.database = Some(database);
    }
    if let Some(identity) = args.identity {
        config.identity = Some(identity);
    }
    let database = match config.database {
        Some(ref x) => x.clone(),
        None => {
            return Err(errors::CliError::Config {
                source: "No database provided, please provide one in either the config file or with the --database flag".to_string(),
            });
        }
    };
    let identity = config.identity.clone().unwrap_or_else(|| "cli".to_string());
    info!("Parsed configuration: {:#?}", config.clone());

    let store = SqliteStore::open(&database)?;
    let engine = SearchEngine::new(
        store,
        MemoryCache::new(),
        AllowAll,
        config.engine.to_engine_config(),
    );

    match args.command {
        Command::Add {
            file,
            category,
            name,
            class,
        } => commands::run_add(
            &engine,
            &file,
            &category,
            name.as_deref(),
            class.as_deref(),
            &identity,
        ),
        Command::Search {
            file,
            category,
            comparator,
            limit,
        } => commands::run_search(&engine, &file, &category, &comparator, limit),
        Command::Delete { id } => commands::run_delete(&engine, id, &identity),
        Command::Rebuild { category } => commands::run_rebuild(&engine, &category, &identity),
        Command::Import {
            directory,
            category,
            names_from_filenames,
            recursive,
        } => commands::run_import(
            &engine,
            &directory,
            &category,
            names_from_filenames,
            recursive,
            &identity,
        ),
    }
}
