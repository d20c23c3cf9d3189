//! Command line argument parsing for the ptable CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::index::builder::BuildConfig;
use crate::index::probing::DEFAULT_LOAD_FACTOR;
use crate::phrase::encoder::EncodingMode;

/// ptable - build and query memory-mapped phrase tables
#[derive(Parser, Debug, Clone)]
#[command(name = "ptable")]
#[command(about = "Build and query compact memory-mapped phrase tables")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PtableArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl PtableArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Process exit code for a failed parse: 1 for usage errors, 0 for `--help`
/// and `--version`.
pub fn parse_exit_code(error: &clap::Error) -> i32 {
    if error.use_stderr() { 1 } else { 0 }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactively query a phrase table
    Query(QueryArgs),

    /// Build a phrase table from a text file
    Build(BuildArgs),

    /// Look up a single source phrase
    Lookup(LookupArgs),

    /// Show table statistics
    Stats(StatsArgs),
}

/// Arguments for the interactive query tool
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Path to the probing hash table
    #[arg(value_name = "HASH_TABLE")]
    pub hash_table: PathBuf,

    /// Path to the binary blob
    #[arg(value_name = "DATA_BIN")]
    pub data_bin: PathBuf,

    /// Path to the source vocabulary
    #[arg(value_name = "VOCAB")]
    pub vocab: PathBuf,

    /// Number of entries in the hash table
    #[arg(value_name = "TABLE_SIZE")]
    pub table_size: u64,

    /// Largest entry, in bytes, the table may hold
    #[arg(value_name = "MAX_ENTRY_SIZE")]
    pub max_entry_size: u64,
}

/// Arguments for building a table
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Phrase table in `source ||| target ||| scores [||| alignment]` format
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory to write the artifacts to
    #[arg(value_name = "OUT_DIR")]
    pub out_dir: PathBuf,

    /// How target phrases are encoded
    #[arg(short = 'm', long, default_value = "words")]
    pub mode: EncodingMode,

    /// Scores per line (default: taken from the first line)
    #[arg(long)]
    pub num_scores: Option<usize>,

    /// Load factor of the hash table
    #[arg(long, default_value_t = DEFAULT_LOAD_FACTOR)]
    pub load_factor: f64,

    /// Reject entries larger than this many bytes
    #[arg(long)]
    pub max_entry_size: Option<u64>,
}

impl BuildArgs {
    pub fn to_config(&self) -> BuildConfig {
        BuildConfig {
            mode: self.mode,
            num_scores: self.num_scores,
            load_factor: self.load_factor,
            max_entry_size: self.max_entry_size,
            ..BuildConfig::default()
        }
    }
}

/// Arguments for a one-shot lookup
#[derive(Parser, Debug, Clone)]
pub struct LookupArgs {
    /// Directory written by `ptable build`
    #[arg(value_name = "TABLE_DIR")]
    pub table_dir: PathBuf,

    /// Source phrase
    #[arg(value_name = "PHRASE")]
    pub phrase: String,
}

/// Arguments for table statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Directory written by `ptable build`
    #[arg(value_name = "TABLE_DIR")]
    pub table_dir: PathBuf,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_query_command() {
        let args = PtableArgs::try_parse_from([
            "ptable",
            "query",
            "table.idx",
            "table.bin",
            "vocab.json",
            "120",
            "4096",
        ])
        .unwrap();

        if let Command::Query(query_args) = args.command {
            assert_eq!(query_args.hash_table, PathBuf::from("table.idx"));
            assert_eq!(query_args.data_bin, PathBuf::from("table.bin"));
            assert_eq!(query_args.vocab, PathBuf::from("vocab.json"));
            assert_eq!(query_args.table_size, 120);
            assert_eq!(query_args.max_entry_size, 4096);
        } else {
            panic!("Expected Query command");
        }
    }

    #[test]
    fn test_query_requires_all_arguments() {
        let result =
            PtableArgs::try_parse_from(["ptable", "query", "table.idx", "table.bin", "vocab.json"]);
        assert!(result.is_err());
        assert!(result.unwrap_err().use_stderr());
    }

    #[test]
    fn test_wrong_argument_count_exits_with_one() {
        let missing = PtableArgs::try_parse_from([
            "ptable",
            "query",
            "table.idx",
            "table.bin",
            "vocab.json",
            "120",
        ])
        .unwrap_err();
        assert_eq!(parse_exit_code(&missing), 1);

        let extra = PtableArgs::try_parse_from([
            "ptable",
            "query",
            "table.idx",
            "table.bin",
            "vocab.json",
            "120",
            "4096",
            "surplus",
        ])
        .unwrap_err();
        assert_eq!(parse_exit_code(&extra), 1);

        let help = PtableArgs::try_parse_from(["ptable", "query", "--help"]).unwrap_err();
        assert_eq!(parse_exit_code(&help), 0);
    }

    #[test]
    fn test_build_command() {
        let args = PtableArgs::try_parse_from([
            "ptable",
            "build",
            "phrase-table.txt",
            "out",
            "--mode",
            "phrase",
            "--num-scores",
            "4",
            "--load-factor",
            "0.5",
        ])
        .unwrap();

        if let Command::Build(build_args) = args.command {
            let config = build_args.to_config();
            assert_eq!(config.mode, EncodingMode::Phrase);
            assert_eq!(config.num_scores, Some(4));
            assert_eq!(config.load_factor, 0.5);
            assert_eq!(config.max_entry_size, None);
        } else {
            panic!("Expected Build command");
        }
    }

    #[test]
    fn test_build_defaults() {
        let args = PtableArgs::try_parse_from(["ptable", "build", "in.txt", "out"]).unwrap();
        if let Command::Build(build_args) = args.command {
            assert_eq!(build_args.mode, EncodingMode::Words);
            assert_eq!(build_args.load_factor, DEFAULT_LOAD_FACTOR);
        } else {
            panic!("Expected Build command");
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let args = PtableArgs::try_parse_from(["ptable", "stats", "dir"]).unwrap();
        assert_eq!(args.verbosity(), 1);

        let args = PtableArgs::try_parse_from(["ptable", "-vv", "stats", "dir"]).unwrap();
        assert_eq!(args.verbosity(), 2);

        let args = PtableArgs::try_parse_from(["ptable", "--quiet", "stats", "dir"]).unwrap();
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_output_format() {
        let args =
            PtableArgs::try_parse_from(["ptable", "lookup", "dir", "das haus", "--format", "json"])
                .unwrap();
        assert_eq!(args.output_format, OutputFormat::Json);
    }
}
