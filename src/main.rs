//! ptable CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use ptable::cli::args::*;
use ptable::cli::commands::*;

fn main() {
    // Usage errors exit with 1; --help and --version exit normally
    let args = match PtableArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            process::exit(parse_exit_code(&e));
        }
    };

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error, // Quiet mode
        1 => LevelFilter::Warn,  // Default
        2 => LevelFilter::Info,  // Verbose
        _ => LevelFilter::Debug, // Very verbose (3+)
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
