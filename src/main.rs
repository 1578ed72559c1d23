//! wikidump: stream paragraphs out of Wikipedia XML dumps
//!
//! Reads plain or bzip2-compressed MediaWiki exports and writes cleaned
//! paragraph records, page listings or run statistics.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use wikidump::{
    config::{Config, LogFormat, ParserOptions},
    import::ByteRange,
};

mod commands;

#[derive(Parser)]
#[command(name = "wikidump")]
#[command(about = "Streaming paragraph extraction from Wikipedia XML dumps")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "wikidump.toml", global = true)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors, no progress display
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write paragraphs as JSON lines
    Paragraphs {
        /// Path to the dump (.xml, .bz2 or .xml.bz2)
        path: PathBuf,

        /// Byte range START:END of a multistream dump (repeatable, ranges run in parallel)
        #[arg(short, long = "range")]
        ranges: Vec<ByteRange>,

        /// Minimum paragraph length in characters
        #[arg(long)]
        min_length: Option<usize>,

        /// Emit paragraphs of redirect pages too
        #[arg(long)]
        include_redirects: bool,

        /// Only keep pages of these namespaces (repeatable)
        #[arg(short, long = "namespace")]
        namespaces: Vec<i32>,

        /// Stop after this many paragraphs
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the pages of a dump
    Pages {
        /// Path to the dump
        path: PathBuf,

        /// Byte range START:END of a multistream dump
        #[arg(short, long)]
        range: Option<ByteRange>,
    },

    /// Run the pipeline and print a summary
    Stats {
        /// Path to the dump
        path: PathBuf,

        /// Byte range START:END of a multistream dump
        #[arg(short, long)]
        range: Option<ByteRange>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Init {
        /// Directory to create the file in
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn init_logging(config: &Config, verbose: u8, quiet: bool) -> Result<()> {
    let log_level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (false, 0) => config.logging.level.as_tracing_level(),
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };

    // stdout carries records, logs go to stderr
    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)?;
    init_logging(&config, cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Paragraphs {
            path,
            ranges,
            min_length,
            include_redirects,
            namespaces,
            limit,
            output,
        } => {
            let options = apply_overrides(
                config.parser,
                min_length,
                include_redirects,
                namespaces,
            );
            commands::export_paragraphs(options, path, ranges, output, limit).await
        }
        Commands::Pages { path, range } => commands::list_pages(config.parser, path, range).await,
        Commands::Stats { path, range, json } => {
            commands::show_stats(config.parser, path, range, cli.quiet, json).await
        }
        Commands::Init { path, force } => commands::init_config(path, force).await,
    }
}

/// Command line flags take precedence over the config file
fn apply_overrides(
    mut options: ParserOptions,
    min_length: Option<usize>,
    include_redirects: bool,
    namespaces: Vec<i32>,
) -> ParserOptions {
    if let Some(min_length) = min_length {
        options = options.with_min_paragraph_length(min_length);
    }
    if include_redirects {
        options = options.with_skip_redirects(false);
    }
    if !namespaces.is_empty() {
        options = options.with_namespaces(Some(namespaces));
    }
    options
}
