//! OText Bench CLI
//!
//! Command-line driver for the OT extension engine:
//! - Single verified runs with per-phase timings
//! - Timing sweeps over the number of OT instances, written as CSV
//! - Naive versus Eklundh transpose timings, written as CSV

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use otext_core::{
    protocol,
    transpose::{transpose, transpose_naive},
    types::{random_message_pairs, random_selection_bits},
    BaseOt, BitMatrix, IdealBaseOt, MatrixStrategy, MessagePair, ProtocolConfig, SimplestOt,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// OText Bench - OT extension driver
#[derive(Parser)]
#[command(name = "otext-bench")]
#[command(about = "Run and time IKNP oblivious transfer extension")]
#[command(version)]
struct Cli {
    /// JSON protocol configuration; replaces the protocol flags below
    #[arg(short, long, env = "OTEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Security parameter κ (power of two)
    #[arg(short, long, env = "OTEXT_KAPPA", default_value_t = 128)]
    kappa: usize,

    /// Message length l in bits
    #[arg(short = 'l', long, env = "OTEXT_MESSAGE_BITS", default_value_t = 128)]
    message_bits: usize,

    /// Matrix strategy (naive, transpose, eklundh)
    #[arg(short, long, env = "OTEXT_STRATEGY", default_value = "eklundh")]
    strategy: MatrixStrategy,

    /// Transpose Eklundh blocks in parallel
    #[arg(long, env = "OTEXT_MULTITHREADED")]
    multithreaded: bool,

    /// Base OT used for the κ seed transfers
    #[arg(short, long, env = "OTEXT_BASE_OT", value_enum, default_value_t = BaseOtKind::Simplest)]
    base_ot: BaseOtKind,

    /// Seed for the generated selection bits and messages
    #[arg(long, env = "OTEXT_SEED")]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BaseOtKind {
    /// Chou-Orlandi OT over secp256k1
    Simplest,
    /// Insecure ideal functionality
    Ideal,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one OT extension and check every output
    Run {
        /// Number of OT instances m
        #[arg(short, long, default_value_t = 4096)]
        count: usize,

        /// Print the phase report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Time every strategy for m = 2^min-exp .. 2^max-exp
    Sweep {
        /// Smallest exponent
        #[arg(long, default_value_t = 7, value_parser = exponent_parser())]
        min_exp: u32,

        /// Largest exponent
        #[arg(long, default_value_t = 16, value_parser = exponent_parser())]
        max_exp: u32,

        /// Output CSV file
        #[arg(short, long, default_value = "sweep.csv")]
        output: PathBuf,

        /// Also time m direct base OTs
        #[arg(long)]
        basic: bool,
    },

    /// Time transposes of κ×2^i matrices
    Transpose {
        /// Smallest exponent
        #[arg(long, default_value_t = 10, value_parser = exponent_parser())]
        min_exp: u32,

        /// Largest exponent
        #[arg(long, default_value_t = 20, value_parser = exponent_parser())]
        max_exp: u32,

        /// Output CSV file
        #[arg(short, long, default_value = "transpose.csv")]
        output: PathBuf,
    },
}

/// Largest accepted size exponent
const MAX_EXP: u32 = 32;

fn exponent_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(0..=MAX_EXP as i64)
}

#[derive(Debug, Serialize)]
struct SweepRow {
    m: usize,
    kappa: usize,
    l: usize,
    strategy: String,
    nanos: u64,
}

#[derive(Debug, Serialize)]
struct TransposeRow {
    rows: usize,
    cols: usize,
    method: &'static str,
    nanos: u64,
}

fn main() -> Result<()> {
    // Logs go to stderr so JSON and CSV output stay clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.base_ot {
        BaseOtKind::Simplest => dispatch(&cli, &config, &SimplestOt::new()),
        BaseOtKind::Ideal => dispatch(&cli, &config, &IdealBaseOt::new()),
    }
}

fn dispatch<B: BaseOt + Clone>(cli: &Cli, config: &ProtocolConfig, base_ot: &B) -> Result<()> {
    match cli.command {
        Commands::Run { count, json } => run_once(cli, config, base_ot, count, json),
        Commands::Sweep {
            min_exp,
            max_exp,
            ref output,
            basic,
        } => run_sweep(cli, config, base_ot, min_exp, max_exp, output, basic),
        Commands::Transpose {
            min_exp,
            max_exp,
            ref output,
        } => run_transpose(cli, config, min_exp, max_exp, output),
    }
}

fn load_config(cli: &Cli) -> Result<ProtocolConfig> {
    let config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: ProtocolConfig = serde_json::from_str(&json)?;
            config.validate()?;
            config
        }
        None => ProtocolConfig::new(cli.kappa, cli.message_bits)?
            .with_strategy(cli.strategy)
            .with_multithreaded(cli.multithreaded),
    };

    info!(
        kappa = config.security_parameter,
        l = config.message_bits,
        strategy = %config.strategy,
        multithreaded = config.multithreaded,
        "Loaded configuration"
    );
    Ok(config)
}

fn input_rng(seed: Option<u64>) -> ChaCha20Rng {
    seed.map_or_else(ChaCha20Rng::from_entropy, ChaCha20Rng::seed_from_u64)
}

fn run_once<B: BaseOt + Clone>(
    cli: &Cli,
    config: &ProtocolConfig,
    base_ot: &B,
    count: usize,
    json: bool,
) -> Result<()> {
    let mut rng = input_rng(cli.seed);
    let bits = random_selection_bits(&mut rng, count);
    let messages = random_message_pairs(&mut rng, count, config.message_bits);

    let (output, report) = protocol::run_ot_extension_timed(config, base_ot, &bits, &messages)?;
    let wrong = count_wrong(&bits, &messages, &output);
    ensure!(wrong == 0, "{} of {} outputs differ from the chosen messages", wrong, count);

    info!(m = count, base_ot = ?cli.base_ot, "All outputs verified");

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("OT extension: m = {}, κ = {}, l = {}", count, report.security_parameter, report.message_bits);
        println!("  Strategy:    {}", report.strategy);
        println!("  Base OT:     {:?}", report.base_ot);
        println!("  Matrix:      {:?}", report.matrix);
        println!("  Ciphertexts: {:?}", report.ciphertexts);
        println!("  Total:       {:?}", report.total);
        println!("  Output[0]:   {}", hex::encode(&output[0]));
    }

    Ok(())
}

fn run_sweep<B: BaseOt + Clone>(
    cli: &Cli,
    config: &ProtocolConfig,
    base_ot: &B,
    min_exp: u32,
    max_exp: u32,
    output: &Path,
    basic: bool,
) -> Result<()> {
    ensure!(min_exp <= max_exp, "min-exp must not exceed max-exp");

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut rng = input_rng(cli.seed);

    let variants = [
        (MatrixStrategy::Naive, false),
        (MatrixStrategy::Transpose, false),
        (MatrixStrategy::Eklundh, false),
        (MatrixStrategy::Eklundh, true),
    ];

    for exp in min_exp..=max_exp {
        let m = 1usize << exp;
        if m < config.security_parameter {
            warn!(m, kappa = config.security_parameter, "Skipping m below κ");
            continue;
        }

        let bits = random_selection_bits(&mut rng, m);
        let messages = random_message_pairs(&mut rng, m, config.message_bits);

        if basic {
            let start = Instant::now();
            let result = protocol::run_basic_ot(base_ot, &bits, &messages)?;
            let nanos = start.elapsed().as_nanos() as u64;
            ensure!(count_wrong(&bits, &messages, &result) == 0, "basic OT failed at m = {}", m);
            writer.serialize(SweepRow {
                m,
                kappa: config.security_parameter,
                l: config.message_bits,
                strategy: "basic".into(),
                nanos,
            })?;
        }

        for (strategy, multithreaded) in variants {
            let run_config = config
                .clone()
                .with_strategy(strategy)
                .with_multithreaded(multithreaded);

            let start = Instant::now();
            let result = protocol::run_ot_extension(&run_config, base_ot, &bits, &messages)?;
            let nanos = start.elapsed().as_nanos() as u64;
            ensure!(
                count_wrong(&bits, &messages, &result) == 0,
                "{} failed at m = {}",
                strategy,
                m
            );

            let label = if multithreaded {
                format!("{}-parallel", strategy)
            } else {
                strategy.to_string()
            };
            writer.serialize(SweepRow {
                m,
                kappa: config.security_parameter,
                l: config.message_bits,
                strategy: label,
                nanos,
            })?;
        }

        writer.flush()?;
        info!(m, "Sweep step done");
    }

    info!(path = ?output, "Sweep written");
    Ok(())
}

fn run_transpose(
    cli: &Cli,
    config: &ProtocolConfig,
    min_exp: u32,
    max_exp: u32,
    output: &Path,
) -> Result<()> {
    ensure!(min_exp <= max_exp, "min-exp must not exceed max-exp");

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut rng = input_rng(cli.seed);
    let rows = config.security_parameter;

    for exp in min_exp..=max_exp {
        let cols = 1usize << exp;
        let bits = (0..rows * cols).map(|_| rng.gen::<bool>() as u8).collect();
        let matrix = BitMatrix::from_bits(rows, cols, bits)?;

        let start = Instant::now();
        let reference = transpose_naive(&matrix);
        let naive = start.elapsed();

        let start = Instant::now();
        let sequential = transpose(&matrix, false)?;
        let eklundh = start.elapsed();

        let start = Instant::now();
        let parallel = transpose(&matrix, true)?;
        let eklundh_parallel = start.elapsed();

        ensure!(
            sequential == reference && parallel == reference,
            "transposes disagree for {}x{}",
            rows,
            cols
        );

        for (method, elapsed) in [
            ("naive", naive),
            ("eklundh", eklundh),
            ("eklundh-parallel", eklundh_parallel),
        ] {
            writer.serialize(TransposeRow {
                rows,
                cols,
                method,
                nanos: elapsed.as_nanos() as u64,
            })?;
        }
        writer.flush()?;
        info!(rows, cols, "Transpose step done");
    }

    info!(path = ?output, "Transpose timings written");
    Ok(())
}

fn count_wrong(bits: &[bool], messages: &[MessagePair], output: &[Vec<u8>]) -> usize {
    bits.iter()
        .zip(messages)
        .zip(output)
        .filter(|((bit, pair), out)| out.as_slice() != pair.get(**bit))
        .count()
}
