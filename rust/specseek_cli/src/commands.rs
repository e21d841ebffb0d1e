use crate::errors::CliError;
use indicatif::{
    ProgressIterator,
    ProgressStyle,
};
use rayon::prelude::*;
use specquery::compare::Comparator;
use specquery::models::{
    SpectrumCategory,
    SpectrumId,
};
use specseek::{
    AllowAll,
    MemoryCache,
    SearchEngine,
    SearchInput,
    SqliteStore,
};
use std::path::{
    Path,
    PathBuf,
};
use std::time::Instant;
use tracing::{
    info,
    warn,
};

pub type CliEngine = SearchEngine<SqliteStore, MemoryCache, AllowAll>;

fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|e| CliError::Io {
        source: e.to_string(),
        path: Some(path.to_string_lossy().to_string()),
    })
}

pub fn run_add(
    engine: &CliEngine,
    file: &Path,
    category: &str,
    name: Option<&str>,
    class: Option<&str>,
    identity: &str,
) -> Result<(), CliError> {
    let category: SpectrumCategory = category.parse()?;
    let bytes = read_file(file)?;
    let id = engine.add(&bytes, None, category, name, class, identity)?;
    println!("{}", id);
    Ok(())
}

pub fn run_search(
    engine: &CliEngine,
    file: &Path,
    category: &str,
    comparator: &str,
    limit: usize,
) -> Result<(), CliError> {
    let category: SpectrumCategory = category.parse()?;
    let comparator: Comparator = comparator.parse()?;
    let bytes = read_file(file)?;

    let start = Instant::now();
    let mut hits = engine.search(
        SearchInput::Raw {
            bytes: &bytes,
            format: None,
            category,
        },
        comparator,
    )?;
    info!(
        "Scored {} candidates with {} in {:?}",
        hits.len(),
        comparator.as_str(),
        start.elapsed()
    );
    hits.truncate(limit);

    println!("{}", serde_json::to_string_pretty(&hits).unwrap());
    Ok(())
}

pub fn run_delete(engine: &CliEngine, id: u64, identity: &str) -> Result<(), CliError> {
    engine.delete(SpectrumId(id), identity)?;
    println!("Deleted spectrum {}", id);
    Ok(())
}

pub fn run_rebuild(engine: &CliEngine, category: &str, identity: &str) -> Result<(), CliError> {
    let category: SpectrumCategory = category.parse()?;
    let start = Instant::now();
    engine.rebuild(category, identity)?;
    println!("Rebuilt the {} index in {:?}", category, start.elapsed());
    Ok(())
}

fn collect_files(directory: &Path, recursive: bool) -> Result<Vec<PathBuf>, CliError> {
    let entries = std::fs::read_dir(directory).map_err(|e| CliError::Io {
        source: e.to_string(),
        path: Some(directory.to_string_lossy().to_string()),
    })?;
    let mut out = Vec::new();
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if path.is_file() {
            out.push(path);
        } else if recursive && path.is_dir() {
            out.extend(collect_files(&path, recursive)?);
        }
    }
    Ok(out)
}

pub fn run_import(
    engine: &CliEngine,
    directory: &Path,
    category: &str,
    names_from_filenames: bool,
    recursive: bool,
    identity: &str,
) -> Result<(), CliError> {
    let category: SpectrumCategory = category.parse()?;

    let mut paths = collect_files(directory, recursive)?;
    paths.sort();
    info!("Importing {} files from {:?}", paths.len(), directory);

    // File reads fan out; adds stay sequential since they serialize on
    // the category write lock anyway.
    let files: Vec<(PathBuf, Result<Vec<u8>, CliError>)> = paths
        .into_par_iter()
        .map(|p| {
            let bytes = read_file(&p);
            (p, bytes)
        })
        .collect();

    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .unwrap();
    let start = Instant::now();
    let mut added = 0;
    let mut failed = 0;
    for (path, bytes) in files.into_iter().progress_with_style(style) {
        let bytes = match bytes {
            Ok(b) => b,
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                failed += 1;
                continue;
            }
        };
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name = if names_from_filenames {
            Some(stem.as_str())
        } else {
            None
        };
        match engine.add(&bytes, None, category, name, None, identity) {
            Ok(_) => added += 1,
            Err(e) => {
                warn!("Skipping {:?}: {:?}", path, e);
                failed += 1;
            }
        }
    }

    println!(
        "Imported {} spectra ({} skipped) in {:?}",
        added,
        failed,
        start.elapsed()
    );
    Ok(())
}
