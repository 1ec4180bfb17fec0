use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gradebook_merge::io::SheetFormat;
use gradebook_merge::sync;
use gradebook_merge::{ClassifierRules, ColumnClassifier, MergeError, Result};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| MergeError::Logging(err.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| MergeError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    let classifier = match &cli.rules {
        Some(path) => ColumnClassifier::new(ClassifierRules::from_path(path)?),
        None => ColumnClassifier::default(),
    };

    match cli.command {
        Command::Classify(args) => {
            let assignments = sync::classify_file(
                &args.input,
                args.sheet.as_deref(),
                args.categories.as_deref(),
                &classifier,
            )?;
            for (header, category) in assignments {
                println!("{header}\t{category}");
            }
            Ok(())
        }
        Command::Plan(args) => {
            let decision = sync::plan_files(
                &args.current,
                &args.incoming,
                args.categories.as_deref(),
                &classifier,
                &args.output,
            )?;
            let summary = decision.summary();
            println!(
                "matched {} / unmatched {} / needs review {}; {} duplicate and {} new columns",
                summary.matched,
                summary.unmatched,
                summary.needs_review,
                summary.duplicate_columns,
                summary.new_columns
            );
            Ok(())
        }
        Command::Apply(args) => {
            sync::apply_files(
                &args.decision,
                &args.current,
                &args.incoming,
                args.categories.as_deref(),
                &classifier,
                &args.output,
                args.format.map(SheetFormat::from),
                args.categories_out.as_deref(),
            )?;
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Classify, plan, and merge gradebook spreadsheets."
)]
struct Cli {
    /// JSON file overriding the column classification keywords.
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the category of every column in a gradebook.
    Classify(ClassifyArgs),
    /// Compare an imported sheet with a gradebook and write a merge decision.
    Plan(PlanArgs),
    /// Apply a reviewed merge decision.
    Apply(ApplyArgs),
}

#[derive(clap::Args)]
struct ClassifyArgs {
    /// Gradebook file (.xlsx or .json).
    #[arg(long)]
    input: PathBuf,

    /// Worksheet to read; defaults to the first data sheet.
    #[arg(long)]
    sheet: Option<String>,

    /// Persisted category mapping (JSON).
    #[arg(long)]
    categories: Option<PathBuf>,
}

#[derive(clap::Args)]
struct PlanArgs {
    /// Existing gradebook.
    #[arg(long)]
    current: PathBuf,

    /// Newly imported sheet.
    #[arg(long)]
    incoming: PathBuf,

    /// Persisted category mapping for the existing gradebook.
    #[arg(long)]
    categories: Option<PathBuf>,

    /// Where to write the merge decision (JSON).
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct ApplyArgs {
    /// Reviewed merge decision (JSON).
    #[arg(long)]
    decision: PathBuf,

    /// Existing gradebook.
    #[arg(long)]
    current: PathBuf,

    /// Newly imported sheet.
    #[arg(long)]
    incoming: PathBuf,

    /// Persisted category mapping for the existing gradebook.
    #[arg(long)]
    categories: Option<PathBuf>,

    /// Merged gradebook output (.xlsx or .json).
    #[arg(long)]
    output: PathBuf,

    /// Output format; inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Where to write the updated category mapping (JSON).
    #[arg(long)]
    categories_out: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Xlsx,
    Json,
}

impl From<OutputFormat> for SheetFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Xlsx => SheetFormat::Excel,
            OutputFormat::Json => SheetFormat::Json,
        }
    }
}
