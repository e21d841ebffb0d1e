use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite library database (will over-write the config file)
    #[arg(short, long)]
    pub database: Option<PathBuf>,

    /// Identity reported to the authorization layer (will over-write the
    /// config file)
    #[arg(short, long)]
    pub identity: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add one spectrum file to the reference library
    Add {
        /// Spectrum file, JCAMP-DX text or the legacy binary layout
        file: PathBuf,

        /// Instrument category, "infrared" or "raman"
        #[arg(short, long)]
        category: String,

        /// Chemical name, overrides the TITLE in the file
        #[arg(short, long)]
        name: Option<String>,

        /// Substance class, overrides the CLASS in the file
        #[arg(long)]
        class: Option<String>,
    },

    /// Identify a spectrum file against the library
    Search {
        file: PathBuf,

        /// Instrument category, "infrared" or "raman"
        #[arg(short, long)]
        category: String,

        /// Scoring algorithm, "bove" or "leastsquares"
        #[arg(short = 'a', long, default_value = "bove")]
        comparator: String,

        /// Keep only the best N results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Remove a spectrum from the library
    Delete {
        /// Id printed by `add` / returned by `search`
        id: u64,
    },

    /// Recompute a category's similarity index from the stored spectra
    Rebuild {
        /// Instrument category, "infrared" or "raman"
        #[arg(short, long)]
        category: String,
    },

    /// Bulk-add every spectrum file in a directory
    Import {
        directory: PathBuf,

        /// Instrument category, "infrared" or "raman"
        #[arg(short, long)]
        category: String,

        /// Use each file's stem as the chemical name instead of its TITLE
        #[arg(long)]
        names_from_filenames: bool,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
}
