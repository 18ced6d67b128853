//! Tiered memory controller trace driver.
//!
//! This binary replays request traces through the controller core. It performs:
//! 1. **Trace run:** Build a controller from defaults or a JSON config, replay a trace, print statistics.
//! 2. **Config dump:** Print the effective configuration as JSON.

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::process;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use tiersim_core::config::{Config, Scheme};
use tiersim_core::trace::TraceRecord;
use tiersim_core::{MemReq, MemoryController, ReqType};

#[derive(Parser, Debug)]
#[command(
    name = "tiersim",
    author,
    version,
    about = "Tiered memory controller trace driver",
    long_about = "Replay a request trace through a tiered memory controller.\n\nTrace lines are `cycle, line_address_hex, type` with type 1 for a dirty write-back.\n\nExamples:\n  tiersim run --trace memtrace.txt\n  tiersim run --trace memtrace.txt --scheme Bumblebee\n  tiersim config --config hbm.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace file and print statistics.
    Run {
        /// Trace file to replay.
        #[arg(short, long)]
        trace: String,

        /// JSON configuration file; defaults are used for missing fields.
        #[arg(short, long)]
        config: Option<String>,

        /// Placement scheme overriding the configuration (e.g. LruTable, HotCold, Ratio).
        #[arg(short, long)]
        scheme: Option<String>,

        /// Verify placement metadata invariants after the replay.
        #[arg(long)]
        check: bool,
    },

    /// Print the effective configuration as JSON.
    Config {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<String>,

        /// Placement scheme overriding the configuration.
        #[arg(short, long)]
        scheme: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            trace,
            config,
            scheme,
            check,
        } => cmd_run(&trace, config.as_deref(), scheme.as_deref(), check),
        Commands::Config { config, scheme } => {
            let config = load_config(config.as_deref(), scheme.as_deref());
            match serde_json::to_string_pretty(&config) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    eprintln!("Error serializing config: {e}");
                    process::exit(1);
                }
            }
        }
    }
}

/// Loads the configuration file (or defaults) and applies the scheme override.
///
/// Exits the process with code 1 if the file cannot be read or parsed.
fn load_config(path: Option<&str>, scheme: Option<&str>) -> Config {
    let mut config = match path {
        Some(p) => {
            let text = fs::read_to_string(p).unwrap_or_else(|e| {
                eprintln!("Error reading config {p}: {e}");
                process::exit(1);
            });
            serde_json::from_str(&text).unwrap_or_else(|e| {
                eprintln!("Error parsing config {p}: {e}");
                process::exit(1);
            })
        }
        None => Config::default(),
    };
    if let Some(name) = scheme {
        let value = serde_json::Value::String(name.to_string());
        config.scheme = serde_json::from_value::<Scheme>(value).unwrap_or_else(|_| {
            eprintln!("Error: unknown scheme '{name}'");
            eprintln!("  known: FarOnly, Flat, LruTable, HotCold, Ratio");
            eprintln!("  aliases: NoCache, DirectFlat, Hybrid2, Bumblebee, BATMAN");
            process::exit(1);
        });
    }
    config
}

/// Replays `trace` through a freshly built controller and prints its statistics.
fn cmd_run(trace: &str, config: Option<&str>, scheme: Option<&str>, check: bool) {
    let config = load_config(config, scheme);
    let mc = MemoryController::new(&config).unwrap_or_else(|e| {
        eprintln!("Error: invalid configuration: {e}");
        process::exit(1);
    });

    let file = File::open(trace).unwrap_or_else(|e| {
        eprintln!("Error opening trace {trace}: {e}");
        process::exit(1);
    });

    let mut replayed = 0u64;
    let mut skipped = 0u64;
    let mut last_ready = 0u64;
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(line = n + 1, error = %e, "stopping replay on read error");
                break;
            }
        };
        let Some(record) = TraceRecord::parse_line(&line) else {
            if n > 0 && !line.trim().is_empty() {
                debug!(line = n + 1, "skipping malformed trace line");
                skipped += 1;
            }
            continue;
        };
        let req_type = if record.write {
            ReqType::Putx
        } else {
            ReqType::Gets
        };
        let mut req = MemReq::new(record.line, req_type, record.cycle);
        match mc.try_access(&mut req) {
            Ok(ready) => last_ready = last_ready.max(ready),
            Err(e) => {
                eprintln!("\n[!] FATAL: {e} (trace line {})", n + 1);
                process::exit(1);
            }
        }
        replayed += 1;
    }
    mc.flush_trace();
    info!(replayed, skipped, last_ready, "trace replay finished");

    if check {
        if let Err(e) = mc.check_invariants() {
            eprintln!("\n[!] INVARIANT VIOLATION: {e}");
            process::exit(1);
        }
        println!("placement metadata invariants hold");
    }
    mc.print_stats();
}
