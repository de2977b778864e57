//! Lodestone Tool - CLI for building and querying lodestone indexes
//!
//! # Commands
//!
//! - `generate` - Write a synthetic factor-based posting journal
//! - `build` - Build the forward, full and priority indexes from a journal
//! - `info` - Display index information
//! - `query` - Run a term-id query against a built index
//!
//! # Examples
//!
//! ```bash
//! lodestone-tool generate -j ./journal --docs 100000 --shards 8
//! lodestone-tool build -j ./journal -i ./index --skip-failed
//! lodestone-tool query -i ./index --terms 6,10 --exclude 7 --limit 20
//! ```

mod index_ops;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use index_ops::QueryOptions;

#[derive(Parser)]
#[command(name = "lodestone-tool")]
#[command(version, about = "CLI for building and querying lodestone indexes")]
#[command(after_help = "Use 'lodestone-tool <command> --help' for more information.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic journal; document i holds one term per divisor of i
    Generate {
        /// Journal directory
        #[arg(short, long)]
        journal: PathBuf,

        /// Number of documents
        #[arg(short, long, default_value = "10000")]
        docs: u64,

        /// Number of shards
        #[arg(short, long, default_value = "4")]
        shards: u32,
    },

    /// Build the index files from a journal directory
    Build {
        /// Journal directory
        #[arg(short, long)]
        journal: PathBuf,

        /// Index output directory
        #[arg(short, long)]
        index: PathBuf,

        /// Domain rankings JSON file
        #[arg(short, long)]
        rankings: Option<PathBuf>,

        /// Construction threads (default: number of CPUs)
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// Directory for intermediate files (default: <index>/work)
        #[arg(short, long)]
        work_dir: Option<PathBuf>,

        /// Skip unreadable shards instead of failing the build
        #[arg(long, default_value = "false")]
        skip_failed: bool,
    },

    /// Display index information
    Info {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,
    },

    /// Run a query; every include term must match
    Query {
        /// Index directory
        #[arg(short, long)]
        index: PathBuf,

        /// Include term ids, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        terms: Vec<u64>,

        /// Exclude term ids, comma separated
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<u64>,

        /// Priority term ids, comma separated
        #[arg(long, value_delimiter = ',')]
        priority: Vec<u64>,

        /// Maximum results
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Maximum results per domain
        #[arg(long, default_value = "4")]
        per_domain: usize,

        /// Time budget in milliseconds
        #[arg(long, default_value = "250")]
        timeout_ms: u64,

        /// Evaluation threads (default: number of CPUs)
        #[arg(short = 't', long)]
        threads: Option<usize>,

        /// Print per-factor ranking details
        #[arg(long, default_value = "false")]
        debug: bool,

        /// Print results as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lodestone_tool=info".parse()?)
                .add_directive("lodestone_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            journal,
            docs,
            shards,
        } => {
            index_ops::generate_journal(&journal, docs, shards)?;
        }
        Commands::Build {
            journal,
            index,
            rankings,
            threads,
            work_dir,
            skip_failed,
        } => {
            index_ops::build(&journal, &index, rankings, threads, work_dir, skip_failed)?;
        }
        Commands::Info { index } => {
            index_ops::show_info(&index)?;
        }
        Commands::Query {
            index,
            terms,
            exclude,
            priority,
            limit,
            per_domain,
            timeout_ms,
            threads,
            debug,
            json,
        } => {
            let opts = QueryOptions {
                terms,
                exclude,
                priority,
                limit,
                per_domain,
                timeout: Duration::from_millis(timeout_ms),
                debug,
                json,
            };
            index_ops::run_query(&index, threads, opts)?;
        }
    }

    Ok(())
}
