// ========================================================================================
//
//                      THE COMMAND-LINE FRONT END: ASTROKERN
//
// ========================================================================================
//
// A thin driver over the library kernels, meant for spot-checking a buffer dumped from
// the pipeline. Every subcommand reads whitespace-separated numbers from a file (or
// stdin), runs exactly one kernel, and prints the result as text. Tuning that the
// pipeline normally owns (tile shape, worker count, default window) comes from an
// optional TOML file.

use astrokern::{
    FitError, KernelConfig, KernelError, TransposeEngine, TransposeMode, error_from_chisq_curve,
    sliding_median,
};
use astrokern::config::ConfigError;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;
use thiserror::Error;

// ========================================================================================
//                         COMMAND-LINE INTERFACE DEFINITION
// ========================================================================================

#[derive(Parser, Debug)]
#[clap(
    name = "astrokern",
    version,
    about = "Numeric kernels for radio-astronomy time-series buffers."
)]
struct Args {
    /// TOML file with transpose tiling, worker count, and the default median window.
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sliding-median baseline of a 1-D sample stream, one value per output line.
    Median {
        /// Window width in samples. Defaults to `median.window` from the config.
        #[clap(long)]
        window: Option<usize>,

        /// Input file; stdin when omitted.
        #[clap(long)]
        input: Option<PathBuf>,
    },

    /// Transpose of a row-major matrix, printed one output row per line.
    Transpose {
        #[clap(long)]
        rows: usize,

        #[clap(long)]
        cols: usize,

        #[clap(long, value_enum, default_value_t = ModeCli::Padded)]
        mode: ModeCli,

        /// Input file; stdin when omitted.
        #[clap(long)]
        input: Option<PathBuf>,
    },

    /// 1-sigma error of a parameter from `x chisq` pairs.
    CurveError {
        /// Input file; stdin when omitted.
        #[clap(long)]
        input: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeCli {
    Exact,
    Padded,
    Uniform,
}

impl From<ModeCli> for TransposeMode {
    fn from(value: ModeCli) -> Self {
        match value {
            ModeCli::Exact => TransposeMode::Exact,
            ModeCli::Padded => TransposeMode::Padded,
            ModeCli::Uniform => TransposeMode::PaddedUniform,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Kernel(#[from] KernelError),
    #[error("{0}")]
    Fit(#[from] FitError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Could not parse '{token}' (value #{position}) as a number.")]
    Parse { token: String, position: usize },
    #[error("Expected `x chisq` pairs, but found an odd number of values ({0}).")]
    UnpairedValues(usize),
}

// ========================================================================================
//                           THE MAIN ORCHESTRATION LOGIC
// ========================================================================================

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::default(),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match args.command {
        Command::Median { window, input } => {
            let samples = read_values(input.as_deref())?;
            let window = window.unwrap_or(config.median.window);
            log::info!("Median filtering {} samples, window {window}", samples.len());
            for value in sliding_median(&samples, window)? {
                writeln!(out, "{value}")?;
            }
        }
        Command::Transpose {
            rows,
            cols,
            mode,
            input,
        } => {
            let matrix = read_values(input.as_deref())?;
            let mut transposed = vec![0.0f64; matrix.len()];
            let mut engine = TransposeEngine::from_config(&config.transpose)?;
            log::info!(
                "Transposing {rows}x{cols} with {}x{} tiles on {} workers",
                engine.shape().rows,
                engine.shape().cols,
                engine.workers()
            );
            engine.transpose(&matrix, &mut transposed, rows, cols, mode.into())?;
            for row in transposed.chunks(rows.max(1)) {
                let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                writeln!(out, "{}", line.join(" "))?;
            }
        }
        Command::CurveError { input } => {
            let values = read_values(input.as_deref())?;
            if values.len() % 2 != 0 {
                return Err(CliError::UnpairedValues(values.len()));
            }
            let (x, chisq): (Vec<f64>, Vec<f64>) =
                values.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip();
            let error = error_from_chisq_curve(&x, &chisq)?;
            writeln!(out, "{error}")?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Reads whitespace-separated numbers from `path`, or from stdin when `None`.
fn read_values(path: Option<&Path>) -> Result<Vec<f64>, CliError> {
    let text = match path {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    text.split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            token.parse::<f64>().map_err(|_| CliError::Parse {
                token: token.to_string(),
                position: i + 1,
            })
        })
        .collect()
}
