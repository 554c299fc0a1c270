use anyhow::{bail, Result};
use byte_unit::Byte;
use clap::{ArgAction, Args, Parser, Subcommand};
use linecount::generate::{make_file, FileSpec};
use linecount::harness::{count_with_mode, run_suite, CountMode, Method, SuiteOptions};
use linecount::settings::Settings;
use linecount::{count_lines_exact_reader, EstimateParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(
    name = "linecount",
    version,
    about = "Count or estimate the lines in large files",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Settings file (TOML); LINECOUNT_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output, repeat for more
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,

    // Counting options used when no subcommand is given.
    #[command(flatten)]
    count: CountArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Count the lines of a file, or of stdin with '-'
    Count(CountArgs),
    /// Write a synthetic file of lines with random lengths
    Generate(GenerateArgs),
    /// Time counting methods against each other
    Bench(BenchArgs),
}

#[derive(Args, Debug)]
struct SamplingArgs {
    /// Bytes per chunk (e.g. 64kB, 64KiB, 1.5MiB)
    #[arg(long, value_parser = parse_size)]
    chunk_size: Option<usize>,

    /// Chunks read per sample
    #[arg(long)]
    sample_length: Option<usize>,

    /// Number of samples
    #[arg(long)]
    samples: Option<usize>,

    /// RNG seed for reproducible estimates
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct CountArgs {
    /// File to read; '-' or nothing reads stdin
    file: Option<PathBuf>,

    /// Always scan the whole file
    #[arg(long, conflicts_with = "estimate")]
    exact: bool,

    /// Always sample, even small files
    #[arg(long, conflicts_with = "exact")]
    estimate: bool,

    #[command(flatten)]
    sampling: SamplingArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Output path
    output: PathBuf,

    /// Number of lines
    #[arg(long)]
    lines: u64,

    /// Shortest line in bytes, newline excluded
    #[arg(long, default_value_t = 0)]
    min_len: usize,

    /// Longest line in bytes, newline excluded
    #[arg(long)]
    max_len: usize,

    /// Leave the last line unterminated
    #[arg(long)]
    no_final_newline: bool,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct BenchArgs {
    /// Files to count; defaults to the configured bench file
    files: Vec<PathBuf>,

    /// Methods to run, all by default
    #[arg(long = "method")]
    methods: Vec<Method>,

    /// Drop the page cache before every run (needs sudo)
    #[arg(long)]
    drop_caches: bool,

    #[command(flatten)]
    sampling: SamplingArgs,
}

fn parse_size(src: &str) -> std::result::Result<usize, String> {
    let bytes = Byte::from_str(src).map_err(|e| format!("invalid size '{src}': {e}"))?;
    usize::try_from(bytes.as_u128()).map_err(|_| format!("size '{src}' is too large"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Count(args)) => count(&settings, args),
        Some(Commands::Generate(args)) => generate(args),
        Some(Commands::Bench(args)) => bench(&settings, args),
        None => count(&settings, cli.count),
    }
}

fn params_from(settings: &Settings, args: &SamplingArgs) -> EstimateParams {
    let defaults = settings.estimate_params();
    EstimateParams {
        n_samples: args.samples.unwrap_or(defaults.n_samples),
        chunk_size: args.chunk_size.unwrap_or(defaults.chunk_size),
        sample_length: args.sample_length.unwrap_or(defaults.sample_length),
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn count(settings: &Settings, args: CountArgs) -> Result<()> {
    let mode = match (args.exact, args.estimate) {
        (true, _) => CountMode::Exact,
        (_, true) => CountMode::Estimate,
        _ => CountMode::Auto,
    };

    let path = match args.file {
        Some(path) if path != Path::new("-") => path,
        _ => {
            if mode == CountMode::Estimate {
                warn!("estimation needs a seekable file, counting stdin exactly");
            }
            let count = count_lines_exact_reader(&mut io::stdin().lock())?;
            println!("{count}");
            return Ok(());
        }
    };

    let params = params_from(settings, &args.sampling);
    let mut rng = make_rng(args.sampling.seed.or(settings.seed));
    let count = count_with_mode(
        &path,
        mode,
        settings.small_file_threshold,
        &params,
        &mut rng,
    )?;

    println!("{count}");
    Ok(())
}

fn generate(args: GenerateArgs) -> Result<()> {
    if args.min_len > args.max_len {
        bail!("--min-len {} exceeds --max-len {}", args.min_len, args.max_len);
    }
    let mut spec = FileSpec::new(args.lines, args.min_len..=args.max_len);
    if args.no_final_newline {
        spec = spec.without_final_newline();
    }

    let written = make_file(&args.output, &spec, &mut make_rng(args.seed))?;
    info!(path = %args.output.display(), written, "file written");
    Ok(())
}

fn bench(settings: &Settings, args: BenchArgs) -> Result<()> {
    let files = if args.files.is_empty() {
        match &settings.bench_file {
            Some(path) => vec![path.clone()],
            None => bail!("no files given and LINECOUNT_BENCH_FILE is not set"),
        }
    } else {
        args.files
    };
    let methods = if args.methods.is_empty() {
        Method::ALL.to_vec()
    } else {
        args.methods
    };

    let options = SuiteOptions {
        params: params_from(settings, &args.sampling),
        drop_caches: args.drop_caches || settings.drop_caches,
    };
    let mut rng = make_rng(args.sampling.seed.or(settings.seed));

    for m in run_suite(&files, &methods, &options, &mut rng) {
        let result = match m.result {
            Ok(count) => count.to_string(),
            Err(e) => format!("error: {e}"),
        };
        println!(
            "{}\t{}\t{}\t{:.6}s",
            m.file.display(),
            m.method,
            result,
            m.elapsed.as_secs_f64()
        );
    }
    Ok(())
}
