//! CLI for Benchwatch.
//!
//! The `benchwatch` binary is the publishing step of a nightly benchmark
//! job: it appends the new run to the benchmark data file, evaluates it for
//! regressions and delivers alerts.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commands;
pub mod logging;
pub mod settings;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{RunInput, RunSource};
use crate::settings::Settings;

/// Benchwatch CLI.
#[derive(Parser, Debug)]
#[command(name = "benchwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to an optional `benchwatch.toml`).
    #[arg(short, long, global = true, env = "BENCHWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Options describing the run to publish or check.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Benchmark data file (`.js` wrapper or plain JSON).
    #[arg(short, long)]
    pub data: PathBuf,

    /// Benchmark suite name, e.g. `customSmallerIsBetter`.
    #[arg(short, long)]
    pub tool: String,

    /// Harness output in the custom JSON format.
    #[arg(short, long, required_unless_present = "run", requires = "commit")]
    pub output: Option<PathBuf>,

    /// Commit metadata as JSON.
    #[arg(long, requires = "output")]
    pub commit: Option<PathBuf>,

    /// Complete run document, instead of `--output` and `--commit`.
    #[arg(long, conflicts_with_all = ["output", "commit"])]
    pub run: Option<PathBuf>,

    /// Publish date in epoch milliseconds. Defaults to now, or to the date
    /// of the latest run when this run repeats it (a retried publish).
    #[arg(long)]
    pub date: Option<i64>,
}

impl RunArgs {
    fn into_input(self) -> anyhow::Result<RunInput> {
        let source = match (self.run, self.output, self.commit) {
            (Some(run), _, _) => RunSource::Run(run),
            (None, Some(output), Some(commit)) => RunSource::Harness { output, commit },
            _ => anyhow::bail!("either --run or both --output and --commit are required"),
        };
        Ok(RunInput {
            data: self.data,
            tool: self.tool,
            source,
            date: self.date,
        })
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Append a run to the data file, evaluate it and emit alerts.
    Publish {
        /// Run to publish.
        #[command(flatten)]
        run: RunArgs,

        /// Repository URL recorded in a new data file.
        #[arg(long)]
        repo_url: Option<String>,
    },

    /// Evaluate a run without writing the data file or emitting alerts.
    Check {
        /// Run to check.
        #[command(flatten)]
        run: RunArgs,
    },

    /// Print the observations of one series.
    Query {
        /// Benchmark data file.
        #[arg(short, long)]
        data: PathBuf,

        /// Benchmark suite name.
        #[arg(short, long)]
        tool: String,

        /// Metric name.
        #[arg(short, long)]
        name: String,

        /// Scenario label.
        #[arg(short, long)]
        extra: Option<String>,

        /// Print one JSON object per observation.
        #[arg(long)]
        json: bool,
    },

    /// Print metrics added, retired or re-united across a tool's history.
    Schema {
        /// Benchmark data file.
        #[arg(short, long)]
        data: PathBuf,

        /// Benchmark suite name.
        #[arg(short, long)]
        tool: String,
    },

    /// Show tools, run counts and last update of a data file.
    Status {
        /// Benchmark data file.
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Run the CLI with the process arguments.
///
/// # Returns
///
/// The process exit code on success, or an error if the command fails.
pub async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    logging::init(&settings.log)?;
    execute(cli.command, &settings).await
}

/// Execute one command with already-loaded settings.
pub async fn execute(command: Commands, settings: &Settings) -> anyhow::Result<i32> {
    match command {
        Commands::Publish { run, repo_url } => {
            commands::publish(settings, &run.into_input()?, repo_url.as_deref()).await
        }
        Commands::Check { run } => commands::check(settings, &run.into_input()?),
        Commands::Query {
            data,
            tool,
            name,
            extra,
            json,
        } => print(commands::query(&data, &tool, &name, extra.as_deref(), json)?),
        Commands::Schema { data, tool } => print(commands::schema(&data, &tool)?),
        Commands::Status { data } => print(commands::status(&data)?),
    }
}

fn print(output: String) -> anyhow::Result<i32> {
    print!("{}", output);
    Ok(0)
}
