use clap::{crate_authors, crate_version, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wasm_memory_pack::packing::{PackStats, DEFAULT_MIN_SEGMENT};

#[derive(Parser)]
#[command(
version = crate_version!(),
author = crate_authors!(),
)]
struct Opts {
    /// Input Wasm file.
    input: PathBuf,

    /// Write the transformed Wasm file if provided.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    subcommand: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Split data segments around long zero runs and drop trailing zeros
    Pack {
        /// Shortest zero run, in bytes, that is split out of a segment
        #[arg(short, long, default_value_t = DEFAULT_MIN_SEGMENT)]
        min_segment: usize,
        /// Print the statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the data segments of the Wasm module
    Info {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn print_stats(stats: &PackStats, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        println!(
            "Data sections: {} -> {}",
            stats.segments_before, stats.segments_after
        );
        println!(
            "Size of data sections: {} -> {} bytes",
            stats.bytes_before, stats.bytes_after
        );
        if stats.memories_skipped > 0 {
            println!("Memories left unpacked: {}", stats.memories_skipped);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts: Opts = Opts::parse();
    let mut m = wasm_memory_pack::utils::parse_wasm_file(&opts.input, true)?;
    match &opts.subcommand {
        SubCommand::Info { json } => {
            let mut stdout = std::io::stdout();
            if *json {
                wasm_memory_pack::info::info_json(&m, &mut stdout)?;
            } else {
                wasm_memory_pack::info::info(&m, &mut stdout)?;
            }
        }
        SubCommand::Pack { min_segment, json } => {
            use wasm_memory_pack::packing::{pack_memory, Config};
            let config = Config {
                min_segment: *min_segment,
            };
            let stats = pack_memory(&mut m, &config);
            print_stats(&stats, *json)?;
        }
    };
    if let Some(output) = opts.output {
        m.emit_wasm_file(output)?;
    }
    Ok(())
}
