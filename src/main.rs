//! sardine-tools CLI - inspect sample libraries and stored performance state

use clap::{Parser, Subcommand};
use sardine_tools::config::ToolsConfig;
use sardine_tools::sample_lengths::{self, SampleLengths};
use sardine_tools::senders::ziff_sustains;
use sardine_tools::{KeyPattern, State, ToolsError, Value};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "sardine-tools")]
#[command(about = "Helpers for live-coding performances", long_about = None)]
struct Cli {
    /// Number of threads for sample scanning (default: 4)
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,

    /// Config file (default: <config dir>/sardine-tools/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan sample directories and list durations
    Scan {
        /// Sample directories (default: from config, then SuperDirt's)
        dirs: Vec<PathBuf>,

        /// Only scan these families
        #[arg(short, long = "family")]
        families: Vec<String>,

        /// Write the lengths as JSON instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look up the duration of one sample
    Length {
        /// Sample name, e.g. bd:0
        name: String,

        /// Lengths JSON written by `scan -o` (default: scan now)
        #[arg(short, long)]
        lengths: Option<PathBuf>,
    },

    /// Render a stored state snapshot as a tree
    Tree {
        /// TOML or JSON snapshot
        file: PathBuf,

        /// Collapse nodes at this depth and below
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Print the sound parameters of a node as JSON
    Params {
        /// TOML or JSON snapshot
        file: PathBuf,

        /// Dotted path to the node, e.g. drums.hh
        path: String,

        /// Additional keys to leave out
        #[arg(short, long = "skip")]
        skip: Vec<String>,

        /// Leave out keys starting with a match of this regex
        #[arg(short, long)]
        pattern: Option<String>,
    },

    /// Print mono sustains for a ziffers melody
    Ziff {
        /// Ziffers melody, e.g. "q 0 e 2 4"
        ziff: String,

        /// Fraction of each note to sustain (default: 0.5)
        #[arg(short, long, default_value = "0.5")]
        coef: f64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = ToolsConfig::resolve(cli.config.as_deref())?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads.or(config.threads).unwrap_or(4))
        .build_global()?;

    match cli.command {
        Commands::Scan {
            dirs,
            families,
            output,
        } => {
            let lengths = scan(&config, dirs, families)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, serde_json::to_string_pretty(&lengths)?)?;
                    info!("Wrote {} lengths to {}", lengths.len(), path.display());
                }
                None => {
                    for (name, seconds) in lengths.iter() {
                        println!("{}: {:.3}s", name, seconds);
                    }
                }
            }
        }

        Commands::Length { name, lengths } => {
            let lengths = match lengths {
                Some(path) => {
                    let content = std::fs::read_to_string(path)?;
                    serde_json::from_str::<SampleLengths>(&content)?
                }
                None => scan(&config, Vec::new(), Vec::new())?,
            };
            sample_lengths::set_lengths(lengths);
            println!("{}", sample_lengths::get_length(&name)?);
        }

        Commands::Tree { file, depth } => {
            let state = State::load(&file)?;
            state.show(depth.or(config.display.depth));
        }

        Commands::Params {
            file,
            path,
            skip,
            pattern,
        } => {
            let state = State::load(&file)?;
            let node = state
                .get_path(path.split('.'))
                .and_then(Value::as_node)
                .ok_or_else(|| ToolsError::Config(format!("no node at '{}'", path)))?;
            let pattern = pattern.as_deref().map(KeyPattern::new).transpose()?;
            let skip: Vec<&str> = skip.iter().map(String::as_str).collect();
            let params = node.params(&skip, pattern.as_ref());
            println!("{}", serde_json::to_string_pretty(&params)?);
        }

        Commands::Ziff { ziff, coef } => {
            println!("{}", ziff_sustains(&ziff, coef));
        }
    }

    Ok(())
}

/// Scan with CLI arguments taking precedence over the config file
fn scan(
    config: &ToolsConfig,
    dirs: Vec<PathBuf>,
    families: Vec<String>,
) -> Result<SampleLengths, ToolsError> {
    let dirs = if dirs.is_empty() {
        config.sample_dirs()
    } else {
        dirs
    };
    let families = if families.is_empty() {
        config.samples.families.clone()
    } else {
        Some(families)
    };
    SampleLengths::scan(&dirs, families.as_deref())
}
