//! `data-inspector`: offline inspection of a storage instance.
//!
//! `info` prints per-key-type counts, `stats` adds sampled keys per type,
//! `dump` walks a prefix assembled from `--prefix "k1:v1;k2:v2;…"`.
//! Exit codes: 0 on success, 1 when the database cannot be opened, 255 on
//! bad arguments.

mod inspect;
mod prefix;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use quasar_types::tracing::error;

#[derive(Parser, Debug)]
#[command(name = "data-inspector")]
#[command(about = "Inspect the keys and rows of a storage instance", long_about = None)]
struct Cli {
    /// Path to the RocksDB instance to inspect.
    #[arg(global = true, long, default_value = "./")]
    db_path: String,

    /// Key/value pairs forming a dump prefix: "type:1;part:7;idlen:8;vid:abc".
    /// `vid` and `dst` accept `\x`-prefixed hex.
    #[arg(global = true, long, default_value = "")]
    prefix: String,

    /// Sample keys displayed per key type by `stats`.
    #[arg(global = true, long, default_value_t = 0)]
    num_samples: usize,

    /// Entries displayed by `dump`.
    #[arg(global = true, long, default_value_t = 10)]
    num_entries_to_dump: usize,

    #[clap(subcommand)]
    cmd: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Summarize key counts per type")]
    Info,
    #[command(about = "Key counts plus sampled keys per type")]
    Stats,
    #[command(about = "Dump entries matching the --prefix")]
    Dump,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are not argument errors.
            use clap::error::ErrorKind;
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            let _ = e.print();
            return ExitCode::from(255);
        }
    };

    let inspector = match inspect::Inspector::open(&cli.db_path) {
        Ok(inspector) => inspector,
        Err(e) => {
            error!("unable to open database '{}' for reading: {e}", cli.db_path);
            return ExitCode::from(1);
        }
    };

    let outcome = match cli.cmd {
        Commands::Info => inspector.info(),
        Commands::Stats => inspector.stats(cli.num_samples),
        Commands::Dump => match prefix::build_prefix(&cli.prefix) {
            Ok(spec) => inspector.dump(&spec, cli.num_entries_to_dump),
            Err(e) => {
                error!("invalid --prefix: {e}");
                return ExitCode::from(255);
            }
        },
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}
