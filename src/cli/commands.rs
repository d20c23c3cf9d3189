//! Command implementations for the ptable CLI.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::engine::{EngineConfig, EnginePaths, QueryEngine};
use crate::error::Result;
use crate::index::builder::TableBuilder;
use crate::index::manifest::TableManifest;

/// Execute a CLI command.
pub fn execute_command(args: PtableArgs) -> Result<()> {
    match &args.command {
        Command::Query(query_args) => interactive_query(query_args, &args),
        Command::Build(build_args) => build_table(build_args, &args),
        Command::Lookup(lookup_args) => lookup_phrase(lookup_args, &args),
        Command::Stats(stats_args) => show_stats(stats_args, &args),
    }
}

/// Open the engine described by the query tool's positional arguments.
///
/// The manifest next to the blob supplies the encoding mode, the score count
/// and the symbol maps.
pub fn open_query_engine(args: &QueryArgs) -> Result<QueryEngine> {
    let table_dir = args
        .data_bin
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let manifest = TableManifest::load(&table_dir)?;

    let paths = EnginePaths {
        index: args.hash_table.clone(),
        blob: args.data_bin.clone(),
        vocab: args.vocab.clone(),
        symbols: table_dir.join(&manifest.files.symbols),
    };
    let config = EngineConfig {
        mode: manifest.mode,
        num_scores: manifest.num_scores,
        max_entry_size: args.max_entry_size,
        table_size: Some(args.table_size),
    };
    QueryEngine::open(&paths, config)
}

/// Answer queries read from `input` until `exit` or end of input.
///
/// A query that fails to decode is reported and the loop goes on. Bytes that
/// are not UTF-8 are replaced, so such a query is answered as a miss. Only an
/// I/O error on `input` or `out` ends the loop early.
pub fn run_query_loop<R: BufRead, W: Write>(
    engine: &QueryEngine,
    mut input: R,
    out: &mut W,
    args: &PtableArgs,
) -> Result<usize> {
    let mut answered = 0;
    let mut buffer = Vec::new();
    writeln!(out, "{QUERY_PROMPT}")?;
    out.flush()?;

    loop {
        buffer.clear();
        if input.read_until(b'\n', &mut buffer)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buffer);
        let query = line.trim();
        if query == "exit" {
            break;
        }

        let start_time = Instant::now();
        match engine.query(query) {
            Ok(result) => {
                let elapsed_us = start_time.elapsed().as_micros() as u64;
                write_lookup(out, &LookupOutput::new(query, result, elapsed_us), args)?;
            }
            Err(e) => {
                error!("Query {query:?} failed: {e}");
                writeln!(out, "Error: {e}")?;
            }
        }
        answered += 1;
        out.flush()?;
    }

    Ok(answered)
}

fn interactive_query(args: &QueryArgs, cli_args: &PtableArgs) -> Result<()> {
    let engine = open_query_engine(args)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let answered = run_query_loop(&engine, stdin.lock(), &mut out, cli_args)?;
    info!("Answered {answered} queries");
    Ok(())
}

fn build_table(args: &BuildArgs, cli_args: &PtableArgs) -> Result<()> {
    if cli_args.verbosity() > 1 {
        println!("Building phrase table from: {}", args.input.display());
        println!("Into: {}", args.out_dir.display());
    }

    let builder = TableBuilder::new(args.to_config());
    let summary = builder.build_from_path(&args.input, &args.out_dir)?;
    output_build_summary(&summary, cli_args)
}

fn lookup_phrase(args: &LookupArgs, cli_args: &PtableArgs) -> Result<()> {
    let engine = QueryEngine::open_dir(&args.table_dir)?;

    let start_time = Instant::now();
    let result = engine.query(&args.phrase)?;
    let elapsed_us = start_time.elapsed().as_micros() as u64;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_lookup(
        &mut out,
        &LookupOutput::new(&args.phrase, result, elapsed_us),
        cli_args,
    )
}

fn show_stats(args: &StatsArgs, cli_args: &PtableArgs) -> Result<()> {
    let engine = QueryEngine::open_dir(&args.table_dir)?;
    let manifest = TableManifest::load(&args.table_dir)?;
    let index_bytes = fs::metadata(args.table_dir.join(&manifest.files.index))?.len();

    let load_factor = if manifest.slot_count == 0 {
        0.0
    } else {
        manifest.entries as f64 / manifest.slot_count as f64
    };

    output_result(
        "Phrase table statistics",
        &TableStats {
            path: args.table_dir.to_string_lossy().to_string(),
            vocabulary: engine.vocabulary().len(),
            manifest,
            index_bytes,
            load_factor,
        },
        cli_args,
    )
}
