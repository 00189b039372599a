//! CodeMentor CLI - Command-line interface for the local code assistant.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// CodeMentor - code generation and explanation backed by a local model
#[derive(Parser)]
#[command(name = "codementor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a short code snippet for a task
    Generate {
        /// Task description
        task: String,
        /// Target language
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Suggest a continuation of existing code
    Autocomplete {
        /// Code file (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Target language
        #[arg(short, long, default_value = "python")]
        language: String,
    },

    /// Explain code step by step
    Explain {
        /// What to focus the explanation on
        task: String,
        /// Code file (default: stdin)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Target language
        #[arg(short, long, default_value = "python")]
        language: String,
        /// beginner, intermediate or advanced
        #[arg(long, default_value = "intermediate")]
        level: String,
        /// Caller identity for logs
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Produce code only, ending with an end marker
    Regenerate {
        /// Task description
        task: String,
        /// Existing code file (default: none)
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Target language
        #[arg(short, long, default_value = "python")]
        language: String,
        /// Caller identity for logs
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Interactive session: pick a mode, language and question per turn
    Interactive,

    /// Classify the sentiment of a text
    Classify {
        /// Text to classify
        text: String,
    },

    /// Show a unified diff between two versions of a file
    Diff {
        original: PathBuf,
        refactored: PathBuf,
    },

    /// Dedent a file and drop repeated comment lines
    Tidy {
        file: PathBuf,
    },

    /// Manage local models
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },

    /// Check that the model loads and the server answers
    Health,

    /// Show information about the CodeMentor installation
    Info,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Download the configured model, or install a local .gguf file
    Pull {
        /// Local .gguf file to install instead of downloading
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// List installed models
    List,
    /// Print the path of the configured model
    Path,
    /// Remove an installed model
    Remove {
        /// Model filename
        filename: String,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "warn" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let runtime = || {
        tokio::runtime::Runtime::new()
            .map_err(|e| miette::miette!("Failed to create async runtime: {}", e))
    };
    let json = cli.json;

    match cli.command {
        Commands::Generate { task, language } => {
            runtime()?.block_on(commands::assist::generate(&task, &language, json))
        }
        Commands::Autocomplete { file, language } => runtime()?.block_on(
            commands::assist::autocomplete(file.as_deref(), &language, json),
        ),
        Commands::Explain {
            task,
            file,
            language,
            level,
            user,
        } => runtime()?.block_on(commands::assist::explain(
            &task,
            file.as_deref(),
            &language,
            &level,
            &user,
            json,
        )),
        Commands::Regenerate {
            task,
            file,
            language,
            user,
        } => runtime()?.block_on(commands::assist::regenerate(
            &task,
            file.as_deref(),
            &language,
            &user,
            json,
        )),
        Commands::Interactive => runtime()?.block_on(commands::interactive::run()),
        Commands::Classify { text } => commands::tools::classify(&text, json),
        Commands::Diff {
            original,
            refactored,
        } => commands::tools::diff(&original, &refactored),
        Commands::Tidy { file } => commands::tools::tidy(&file),
        Commands::Model { action } => match action {
            ModelCommands::Pull { path } => {
                runtime()?.block_on(commands::model::pull(path.as_deref()))
            }
            ModelCommands::List => commands::model::list(),
            ModelCommands::Path => commands::model::path(),
            ModelCommands::Remove { filename } => commands::model::remove(&filename),
        },
        Commands::Health => runtime()?.block_on(commands::info::health(json)),
        Commands::Info => commands::info::run(),
    }
}
