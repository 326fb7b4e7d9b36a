use anyhow::Result;
use clap::{Parser, Subcommand};
use corpus_tester::commands::{
    analyse_command, apply_command, history_command, init_project_command, populate_command,
    project_info_command, replay_events_command, AnalyseArgs, ApplyArgs,
};
use tracing_subscriber::EnvFilter;

/// Compiler test-corpus orchestration CLI.
///
/// This CLI is a thin wrapper around `corpus-core` (exposed in code as `corpus_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "corpus-tester",
    version,
    about = "Concurrent compiler test-corpus builder and classifier",
    long_about = None
)]
struct Cli {
    /// Emit debug logs on stderr (RUST_LOG overrides the level).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new corpus project at the given root.
    ///
    /// This will:
    /// - Create a `.corpus` metadata directory and the ledger database.
    /// - Create `corpora` and `reports` directories.
    /// - Write a `.corpus/project.json` config file.
    InitProject {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional project name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,

        /// Default worker count stored in the project config.
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Show basic information about an existing project.
    ProjectInfo {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Create a corpus with one subject per file in an input directory.
    Populate {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Directory of test inputs (relative to the project root unless absolute).
        #[arg(long)]
        inputs: String,

        /// Output corpus file. Defaults to `corpora/<inputs dir name>.json`.
        #[arg(long)]
        out: Option<String>,

        /// Worker threads. Defaults to the project setting, then the host's parallelism.
        #[arg(long)]
        workers: Option<usize>,

        /// Print `batch [done/total]` progress on stderr.
        #[arg(long, default_value_t = false)]
        progress: bool,
    },

    /// Apply a JSON-lines stream of mutation requests to a corpus.
    Apply {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Corpus to start from. If omitted, the batch starts from an empty corpus.
        #[arg(long)]
        corpus: Option<String>,

        /// JSON-lines file of requests.
        #[arg(long)]
        requests: String,

        /// Where to write the result. Defaults to overwriting `--corpus`.
        #[arg(long)]
        out: Option<String>,

        /// Write every builder event as JSON lines to this file.
        #[arg(long)]
        events: Option<String>,

        /// Worker threads. Defaults to the project setting, then the host's parallelism.
        #[arg(long)]
        workers: Option<usize>,

        /// Print `batch [done/total]` progress on stderr.
        #[arg(long, default_value_t = false)]
        progress: bool,
    },

    /// Render an event log written by `apply --events` as progress lines.
    ReplayEvents {
        /// JSON-lines event log.
        #[arg(long)]
        file: String,
    },

    /// Classify a finished corpus by outcome and record the result.
    Analyse {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Corpus file to analyse.
        #[arg(long)]
        corpus: String,

        /// Worker threads. Defaults to the project setting, then the host's parallelism.
        #[arg(long)]
        workers: Option<usize>,

        /// Only count results from these compilers (repeatable).
        #[arg(long = "compiler")]
        compilers: Vec<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Do not record the analysis in the ledger.
        #[arg(long, default_value_t = false)]
        no_record: bool,

        /// Also write the full analysis to `reports/<batch>.analysis.json`.
        #[arg(long, default_value_t = false)]
        report: bool,
    },

    /// List analyses recorded in the ledger.
    History {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Only show analyses of this batch.
        #[arg(long)]
        batch: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Install a stderr `fmt` subscriber when asked to, or when `RUST_LOG` is set.
fn init_tracing(verbose: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => return,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::InitProject { root, name, workers } => {
            init_project_command(&root, name, workers)?
        }
        Command::ProjectInfo { root, json } => project_info_command(&root, json)?,
        Command::Populate { root, inputs, out, workers, progress } => {
            populate_command(&root, &inputs, out.as_deref(), workers, progress)?
        }
        Command::Apply { root, corpus, requests, out, events, workers, progress } => {
            apply_command(
                &root,
                ApplyArgs {
                    corpus: corpus.as_deref(),
                    requests: &requests,
                    out: out.as_deref(),
                    events: events.as_deref(),
                    workers,
                    progress,
                },
            )?
        }
        Command::ReplayEvents { file } => replay_events_command(&file)?,
        Command::Analyse { root, corpus, workers, compilers, json, no_record, report } => {
            analyse_command(
                &root,
                AnalyseArgs {
                    corpus: &corpus,
                    workers,
                    compilers,
                    json,
                    record: !no_record,
                    report,
                },
            )?
        }
        Command::History { root, batch, json } => history_command(&root, batch.as_deref(), json)?,
    }

    Ok(())
}
