//! Command-line interface for corpus2sql
//! Loads one corpus dump into a SQLite database in a single transaction.
//!
//! Usage:
//!   corpus2sql [--config `<file>`] [--gzip | --bz2] wiki `<input>` `<db>` `<prefix>` [--min-date `<date>`]
//!   corpus2sql [--config `<file>`] [--gzip | --bz2] clusters `<input>` `<db>` `<prefix>`
//!   corpus2sql [--config `<file>`] [--gzip | --bz2] memes `<input>` `<db>` `<prefix>`
//!   corpus2sql [--config `<file>`] [--gzip | --bz2] amazon `<input>` `<db>`
//!   corpus2sql [--config `<file>`] [--gzip | --bz2] json `<input>` `<db>` `<table>` [--headers `<file>`]

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use corpus2sql::corpus::config::{self, ConfigError, CorpusConfig};
use corpus2sql::corpus::formats::{self, amazon, clusters, json_lines, memes, wiki, Format};
use corpus2sql::corpus::pipeline::{ingest_file, IngestOptions, IngestReport};
use corpus2sql::corpus::sink::SqliteSink;
use corpus2sql::corpus::source::{Compression, InputSpec};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn Error>>;

fn positional(name: &'static str, help: &'static str, index: usize) -> Arg {
    Arg::new(name).help(help).required(true).index(index)
}

fn input_and_db() -> [Arg; 2] {
    [
        positional("input", "Path to the corpus dump", 1),
        positional("db", "Path to the SQLite database (created if missing)", 2),
    ]
}

fn prefixed(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .args(input_and_db())
        .arg(positional("prefix", "Prefix for the created table names", 3))
}

fn build_cli() -> Command {
    Command::new("corpus2sql")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Load line-oriented corpus dumps into normalized SQLite tables")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_name("FILE")
                .help("TOML file layered over the built-in defaults and ./corpus2sql.toml"),
        )
        .arg(
            Arg::new("checkpoint-interval")
                .long("checkpoint-interval")
                .global(true)
                .value_name("BLOCKS")
                .value_parser(value_parser!(u32))
                .help("Log progress every BLOCKS blocks (0 disables)"),
        )
        .arg(
            Arg::new("gzip")
                .long("gzip")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Input is gzip-compressed"),
        )
        .arg(
            Arg::new("bz2")
                .long("bz2")
                .global(true)
                .action(ArgAction::SetTrue)
                .conflicts_with("gzip")
                .help("Input is bzip2-compressed"),
        )
        .subcommand(
            prefixed("wiki", "Load an encyclopedia revision log").arg(
                Arg::new("min-date")
                    .long("min-date")
                    .value_name("DATE")
                    .help("Keep only revisions whose timestamp sorts after DATE"),
            ),
        )
        .subcommand(
            prefixed("clusters", "Load a phrase-cluster log").arg(
                Arg::new("header-lines")
                    .long("header-lines")
                    .value_name("LINES")
                    .value_parser(value_parser!(u32))
                    .help("Preamble lines before the first cluster"),
            ),
        )
        .subcommand(prefixed("memes", "Load a quote propagation log"))
        .subcommand(
            Command::new("amazon")
                .about("Load product metadata into the amz_* tables")
                .args(input_and_db()),
        )
        .subcommand(
            Command::new("json")
                .about("Load JSON lines into one table with guessed column types")
                .args(input_and_db())
                .arg(positional("table", "Name of the table to create", 3))
                .arg(
                    Arg::new("headers")
                        .long("headers")
                        .value_name("FILE")
                        .help("Column names, one per line, instead of the first record's keys"),
                ),
        )
}

fn main() {
    let matches = build_cli().get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    match run(&matches, &config) {
        Ok(report) => {
            info!(
                blocks = report.blocks_read,
                loaded = report.blocks_loaded,
                filtered = report.blocks_filtered,
                failed = report.blocks_failed,
                rows = report.rows_inserted,
                tables_created = report.tables_created,
                tables_existing = report.tables_existing,
                checkpoints = report.checkpoints,
                "done"
            );
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Global flags are read from the subcommand, where clap makes them visible
/// wherever they were typed.
fn load_config(matches: &ArgMatches) -> Result<CorpusConfig, ConfigError> {
    let leaf = matches.subcommand().map_or(matches, |(_, sub)| sub);
    let explicit = leaf.get_one::<String>("config").map(Path::new);
    let mut overrides = Vec::new();
    if let Some(blocks) = leaf.get_one::<u32>("checkpoint-interval") {
        overrides.push(("ingest.checkpoint_interval", i64::from(*blocks)));
    }
    if let Ok(Some(lines)) = leaf.try_get_one::<u32>("header-lines") {
        overrides.push(("clusters.header_lines", i64::from(*lines)));
    }
    config::load(Path::new("."), explicit, &overrides)
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(config: &CorpusConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(matches: &ArgMatches, config: &CorpusConfig) -> CliResult<IngestReport> {
    let (name, sub) = matches
        .subcommand()
        .ok_or("a format subcommand is required")?;
    let compression = Compression::from_flags(sub.get_flag("gzip"), sub.get_flag("bz2"));
    let input = InputSpec::new(required(sub, "input")?, compression);
    let db = PathBuf::from(required(sub, "db")?);

    let mut options = IngestOptions {
        checkpoint_interval: config.ingest.checkpoint_interval,
        ..IngestOptions::default()
    };
    let format = match name {
        "wiki" => {
            options.min_date = sub.get_one::<String>("min-date").cloned();
            wiki::format(required(sub, "prefix")?)
        }
        "clusters" => clusters::format(required(sub, "prefix")?, config.clusters.header_lines),
        "memes" => memes::format(required(sub, "prefix")?),
        "amazon" => amazon::format(),
        "json" => prepare_json(sub, &input, config)?,
        other => {
            return Err(format!(
                "unknown format '{other}' (expected one of {})",
                formats::FORMAT_NAMES.join(", ")
            )
            .into())
        }
    };

    load(&format, &input, &db, &options)
}

fn prepare_json(sub: &ArgMatches, input: &InputSpec, config: &CorpusConfig) -> CliResult<Format> {
    let headers = sub
        .get_one::<String>("headers")
        .map(json_lines::read_headers)
        .transpose()?;
    Ok(json_lines::prepare(
        input,
        required(sub, "table")?,
        headers,
        config.json.sample_size,
    )?)
}

fn load(
    format: &Format,
    input: &InputSpec,
    db: &Path,
    options: &IngestOptions,
) -> CliResult<IngestReport> {
    info!(
        format = format.name,
        input = %input.path.display(),
        compression = %input.compression,
        db = %db.display(),
        "loading"
    );
    let mut sink = SqliteSink::open(db)?;
    Ok(ingest_file(format, &mut sink, input, options)?)
}

fn required<'a>(sub: &'a ArgMatches, name: &str) -> CliResult<&'a str> {
    sub.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument <{name}>").into())
}
