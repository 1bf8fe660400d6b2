//! slidoc - Compile slide-markdown lectures
//!
//! slidoc turns markdown lectures into HTML slides with embedded questions,
//! writes a per-file record used to verify later edits, and builds a
//! concept index across all files of a run.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eyre::Result;
use owo_colors::OwoColorize;
use slidoc::config::{DEFAULT_CONFIG_PATH, load_config, load_config_or_default};
use slidoc::output::{OutputFormat, render_report};
use slidoc::{build, collect_sources, verify_file, write_outputs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "slidoc")]
#[command(version, about = "Compile slide-markdown lectures", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "EXAMPLES:
    slidoc lectures/                       Compile every lecture under lectures/
    slidoc -o site intro.md loops.md       Compile two files into site/
    slidoc verify intro.md site/intro.record.json 3 5
                                           Print slides 3 to 5 if intro.md is unchanged")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Markdown files or directories to compile
    #[arg(value_name = "FILE_OR_DIR")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: .config/slidoc/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory (overrides the config)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Report format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// List every question in the report
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Check a file against its record, optionally printing a slide range
    Verify {
        /// Markdown source
        source: PathBuf,

        /// Record written by a previous build
        record: PathBuf,

        /// First slide to extract
        first: Option<usize>,

        /// Last slide to extract
        #[arg(requires = "first")]
        last: Option<usize>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Command::Verify {
            ref source,
            ref record,
            first,
            last,
        }) => run_verify_command(source, record, first, last),
        None => run_build_command(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:?}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run_build_command(cli: &Cli) -> Result<()> {
    let Some(format) = OutputFormat::parse(&cli.format) else {
        eyre::bail!("Unknown format '{}' (expected text or json)", cli.format);
    };

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_config_or_default(Path::new(DEFAULT_CONFIG_PATH))?,
    };

    let sources = collect_sources(&cli.paths, &config)?;
    eprintln!(
        "{} Compiling {} files...",
        "->".blue().bold(),
        sources.len()
    );

    let run = build(&config, &sources)?;
    let out_dir = cli.out_dir.clone().unwrap_or_else(|| config.out_dir());
    let written = write_outputs(&out_dir, &config, &run)?;

    let report = render_report(&run, format, cli.verbose)?;
    match format {
        OutputFormat::Text => eprint!("{report}"),
        OutputFormat::Json => println!("{report}"),
    }
    eprintln!(
        "{} Wrote {} files to {}",
        "OK".green().bold(),
        written.len(),
        out_dir.display()
    );
    Ok(())
}

fn run_verify_command(
    source: &Path,
    record: &Path,
    first: Option<usize>,
    last: Option<usize>,
) -> Result<()> {
    let range = first.map(|first| (first, last.unwrap_or(first)));
    let text = verify_file(source, record, range)?;
    match range {
        Some(_) => print!("{text}"),
        None => eprintln!(
            "{} {} matches its record",
            "OK".green().bold(),
            source.display()
        ),
    }
    Ok(())
}
