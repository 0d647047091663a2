use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use compound_library_builder::batch::{BatchOptions, BatchRunner};
use compound_library_builder::chebi::ChebiHttpClient;
use compound_library_builder::config::{ConfigLoader, ResolvedConfig};
use compound_library_builder::dispatch::TaskDispatcher;
use compound_library_builder::domain::{CompoundId, SourceName};
use compound_library_builder::error::BuilderError;
use compound_library_builder::http::HttpSession;
use compound_library_builder::legacy::{LegacyClient, LegacyHttpClient};
use compound_library_builder::output::{JsonOutput, LogSink, OutputMode, print_summary_text};
use compound_library_builder::references::References;
use compound_library_builder::sources::SourceSet;
use compound_library_builder::store::Store;

#[derive(Parser)]
#[command(name = "compound-builder")]
#[command(about = "Build a reference directory of compound records from ChEBI and external providers")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Build compound.json documents")]
    Build(BuildArgs),
    #[command(about = "Show which sources are enabled")]
    Sources(SourcesArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Output directory; one subdirectory per compound.
    #[arg(long)]
    destination: Utf8PathBuf,

    /// Directory holding mapping.json and reactome.json (optionally gzipped).
    #[arg(long = "ref")]
    reference_dir: Utf8PathBuf,

    #[arg(long)]
    config: Option<String>,

    /// Comma-separated ids (MTBLC15366, CHEBI:15366 or 15366).
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,

    /// File with one id per line.
    #[arg(long)]
    ids_file: Option<Utf8PathBuf>,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_enum)]
    disable: Vec<SourceName>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SourcesArgs {
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<BuilderError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &BuilderError) -> u8 {
    match error {
        BuilderError::ConfigRead(_)
        | BuilderError::ConfigParse(_)
        | BuilderError::InvalidConfig(_)
        | BuilderError::InvalidSource(_)
        | BuilderError::InvalidCompoundId(_)
        | BuilderError::Reference { .. } => 2,
        BuilderError::Http { .. } | BuilderError::Status { .. } | BuilderError::Payload { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Sources(args) => {
            let config = ConfigLoader::resolve(args.config.as_deref())?;
            JsonOutput::print_sources(&config.sources).into_diagnostic()?;
            Ok(())
        }
    }
}

fn run_build(args: BuildArgs) -> miette::Result<()> {
    let output_mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let mut config = ConfigLoader::resolve(args.config.as_deref())?;
    apply_overrides(&mut config, args.workers, &args.disable)?;

    let references = Arc::new(References::load(&args.reference_dir)?);
    let store = Store::new(args.destination);
    store.ensure_destination()?;

    let session = HttpSession::new(config.source_timeout)?;
    let legacy = LegacyHttpClient::new(session.clone(), &config.endpoints.metabolights_ws);
    let ids = resolve_ids(&args.ids, args.ids_file.as_ref(), &legacy)?;

    let sources = SourceSet::http(&session, &config.endpoints);
    let dispatcher = TaskDispatcher::new(sources, config.workers, config.compound_deadline)?;
    let chebi = ChebiHttpClient::new(session, &config.endpoints.chebi);
    let runner = BatchRunner::new(
        store,
        dispatcher,
        chebi,
        legacy,
        references,
        BatchOptions::from_config(&config),
    );

    match output_mode {
        OutputMode::Json => {
            let summary = runner.run(&ids, &JsonOutput);
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Text => {
            let summary = runner.run(&ids, &LogSink);
            print_summary_text(&summary);
        }
    }
    Ok(())
}

fn apply_overrides(
    config: &mut ResolvedConfig,
    workers: Option<usize>,
    disable: &[SourceName],
) -> Result<(), BuilderError> {
    if let Some(workers) = workers {
        if workers == 0 {
            return Err(BuilderError::InvalidConfig(
                "--workers must be at least 1".to_string(),
            ));
        }
        config.workers = workers;
    }
    for source in disable {
        config.sources.set(*source, false);
    }
    Ok(())
}

/// `--ids` wins over `--ids-file`; with neither, the legacy service's
/// compound list is used.
fn resolve_ids(
    ids: &[String],
    ids_file: Option<&Utf8PathBuf>,
    legacy: &impl LegacyClient,
) -> Result<Vec<CompoundId>, BuilderError> {
    if !ids.is_empty() {
        return ids.iter().map(|id| id.parse()).collect();
    }
    if let Some(path) = ids_file {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| BuilderError::Filesystem(format!("{path}: {err}")))?;
        return content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::parse)
            .collect();
    }
    let ids = legacy.list_compound_ids()?;
    tracing::info!(count = ids.len(), "compound ids from legacy service");
    Ok(ids)
}
