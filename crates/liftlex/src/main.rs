use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{Level, debug};
use tracing_subscriber::EnvFilter;

use lift_db::{DEFAULT_INNER_SEP, Lexicon, LoadMode};
use lift_table::DEFAULT_AGGREGATE_SEP;

mod commands;

#[derive(Parser)]
#[command(name = "liftlex", version)]
#[command(about = "Extract, count and export fields of LIFT lexicons")]
struct Cli {
    /// Log debug messages.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Write to this file instead of stdout.
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    /// How the lexicon file is read (mmap or owned).
    #[arg(
        long,
        global = true,
        env = "LIFTLEX_LOAD_MODE",
        value_parser = parse_load_mode,
        default_value = "mmap"
    )]
    mode: LoadMode,
    /// Separator joining repeated values of a field.
    #[arg(long, global = true, env = "LIFTLEX_INNER_SEP", default_value = DEFAULT_INNER_SEP)]
    inner_sep: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Occurrence counts per level and the languages in use.
    Summary { file: PathBuf },
    /// Values of one field, one row per occurrence of its level.
    Values {
        #[arg(short, long)]
        field: String,
        file: PathBuf,
    },
    /// Observed subfields (language or type tags) of a field.
    Subfield {
        #[arg(short, long)]
        field: String,
        file: PathBuf,
    },
    /// Frequency of each value of a field.
    Count {
        #[arg(short, long)]
        field: String,
        #[arg(short, long)]
        subfield: Option<String>,
        file: PathBuf,
    },
    /// Join several fields, across levels, into one table.
    Convert {
        /// Comma-separated field names.
        #[arg(short, long, value_delimiter = ',', required = true)]
        field: Vec<String>,
        /// One row per entry instead of one row per lowest-level occurrence.
        #[arg(short = 'g', long)]
        aggregate: bool,
        /// Separator of aggregated values.
        #[arg(
            short = 'p',
            long,
            env = "LIFTLEX_AGGREGATE_SEP",
            default_value = DEFAULT_AGGREGATE_SEP
        )]
        aggresep: String,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
        /// Output directory of a CLDF dataset.
        #[arg(long)]
        dir: Option<PathBuf>,
        file: PathBuf,
    },
    /// The field vocabulary.
    Fields,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum Format {
    Csv,
    CldfWordlist,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let out = open_output(cli.output.as_deref())?;
    let load = |file: &PathBuf| load_lexicon(&cli, file);

    match &cli.command {
        Command::Summary { file } => commands::summary(&load(file)?, out),
        Command::Values { field, file } => commands::values(&load(file)?, field, out),
        Command::Subfield { field, file } => commands::subfields(&load(file)?, field, out),
        Command::Count {
            field,
            subfield,
            file,
        } => commands::count(&load(file)?, field, subfield.as_deref(), out),
        Command::Convert {
            field,
            aggregate,
            aggresep,
            format,
            dir,
            file,
        } => {
            let lexicon = load(file)?;
            let table = commands::convert(&lexicon, field, *aggregate, aggresep)?;
            match format {
                Format::Csv => commands::write_table(&table, out),
                Format::CldfWordlist => {
                    let dir = dir
                        .as_deref()
                        .context("--dir is required with --format cldf-wordlist")?;
                    commands::write_cldf(&table, dir, out)
                }
            }
        }
        Command::Fields => commands::fields(out),
    }
}

fn load_lexicon(cli: &Cli, file: &Path) -> anyhow::Result<Lexicon> {
    debug!("loading {} (mode: {:?})", file.display(), cli.mode);
    let lexicon = Lexicon::load_with_mode(file, cli.mode)
        .with_context(|| format!("cannot load lexicon {}", file.display()))?;
    Ok(lexicon.with_inner_sep(cli.inner_sep.as_str()))
}

fn open_output(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

fn parse_load_mode(raw: &str) -> Result<LoadMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "mmap" => Ok(LoadMode::Mmap),
        "owned" => Ok(LoadMode::Owned),
        other => Err(format!("unknown load mode '{other}' (expected mmap or owned)")),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();
}
