//! Output formatting for CLI commands.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::cli::args::{OutputFormat, PtableArgs};
use crate::engine::QueryResult;
use crate::error::Result;
use crate::index::builder::BuildSummary;
use crate::index::manifest::TableManifest;
use crate::phrase::decoder::TargetText;

/// Prompt printed by the interactive query tool.
pub const QUERY_PROMPT: &str = "Please enter a string to be searched, or exit to exit.";

/// Result of one lookup, with its timing.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupOutput {
    pub query: String,
    pub found: bool,
    pub targets: Vec<TargetText>,
    pub elapsed_us: u64,
}

impl LookupOutput {
    pub fn new(query: &str, result: QueryResult, elapsed_us: u64) -> Self {
        LookupOutput {
            query: query.to_string(),
            found: result.found,
            targets: result.targets,
            elapsed_us,
        }
    }
}

/// Table statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableStats {
    pub path: String,
    pub manifest: TableManifest,
    pub index_bytes: u64,
    pub vocabulary: usize,
    pub load_factor: f64,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &PtableArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Write a lookup result in the specified format.
pub fn write_lookup<W: Write>(out: &mut W, lookup: &LookupOutput, args: &PtableArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if lookup.found {
                writeln!(out, "Key found!")?;
                for target in &lookup.targets {
                    writeln!(out, "{}", format_target(target))?;
                }
            } else {
                writeln!(out, "Key not found!")?;
            }
            writeln!(out, "Took {} microseconds.", lookup.elapsed_us)?;
        }
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(lookup)?
            } else {
                serde_json::to_string(lookup)?
            };
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}

/// Output a build summary.
pub fn output_build_summary(summary: &BuildSummary, args: &PtableArgs) -> Result<()> {
    if args.output_format == OutputFormat::Json {
        return output_json(summary, args);
    }
    if args.verbosity() > 0 {
        println!("Phrase table built");
        println!();
    }
    let manifest = &summary.manifest;
    println!("Lines: {}", summary.lines);
    println!("Source phrases: {}", manifest.entries);
    println!("Target records: {}", manifest.records);
    println!(
        "Symbols: {} phrases, {} words, {} alignments",
        summary.target_phrases, summary.word_tokens, summary.alignments
    );
    println!("Source vocabulary: {}", summary.vocabulary);
    println!("Blob size: {}", format_bytes(manifest.blob_bytes));
    println!("Build time: {}ms", summary.duration_ms);
    Ok(())
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &PtableArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }
    let value = serde_json::to_value(result)?;
    print_value(&value, 0);
    Ok(())
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &PtableArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Print nested objects as indented `key: value` lines.
fn print_value(value: &serde_json::Value, indent: usize) {
    let spaces = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                if val.is_object() {
                    println!("{spaces}{key}:");
                    print_value(val, indent + 1);
                } else {
                    let formatted_val = format_value(val);
                    println!("{spaces}{key}: {formatted_val}");
                }
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{spaces}{formatted_value}");
        }
    }
}

/// Format a target the way phrase tables are written.
pub fn format_target(target: &TargetText) -> String {
    let scores = target
        .scores
        .iter()
        .map(|score| score.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    if target.alignment.is_empty() {
        format!("{} ||| {scores}", target.text)
    } else {
        let alignment = target
            .alignment_pairs()
            .iter()
            .map(|(s, t)| format!("{s}-{t}"))
            .collect::<Vec<_>>()
            .join(" ");
        format!("{} ||| {scores} ||| {alignment}", target.text)
    }
}

/// Format a JSON value for display.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "null".to_string(),
    }
}

/// Format bytes into human-readable format.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let unit = UNITS[unit_index];
    if unit_index == 0 {
        format!("{bytes} {unit}")
    } else {
        format!("{size:.1} {unit}")
    }
}
