use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use marker_refdb::app::{App, BuildResult, LogSink, ProgressSink, RunSettings};
use marker_refdb::catalog::{Catalog, CatalogSet};
use marker_refdb::config::{ConfigLoader, ResolvedConfig};
use marker_refdb::error::RefDbError;
use marker_refdb::output::{JsonOutput, OutputNames, OutputPaths};
use marker_refdb::uniprot::UniprotHttpClient;

#[derive(Parser)]
#[command(name = "marker-refdb")]
#[command(about = "Build archaeological protein reference databases from UniProt")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Search marker proteins for every species in a species list")]
    Build(BuildArgs),
    #[command(about = "Fetch curated accessions from a built-in or external table")]
    Catalog(CatalogArgs),
}

#[derive(Args)]
struct OutputArgs {
    #[arg(long, default_value = ".")]
    output_dir: Utf8PathBuf,

    /// Replaces the configured file names with `<prefix>_...` names.
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Args)]
struct BuildArgs {
    #[arg(long)]
    config: Option<String>,

    /// JSON section object or tab-separated sheet; overrides the config's species.
    #[arg(long)]
    species: Option<Utf8PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct CatalogArgs {
    #[arg(long, value_enum, default_value = "northeast")]
    set: CatalogSet,

    /// External table replacing the built-in set.
    #[arg(long)]
    catalog: Option<Utf8PathBuf>,

    #[arg(long)]
    config: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<RefDbError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RefDbError) -> u8 {
    match error {
        RefDbError::MissingConfig
        | RefDbError::ConfigRead(_)
        | RefDbError::ConfigParse(_)
        | RefDbError::SpeciesListRead(_)
        | RefDbError::SpeciesListParse(_)
        | RefDbError::CatalogParse(_)
        | RefDbError::InvalidAccession(_)
        | RefDbError::InvalidCategory(_) => 2,
        RefDbError::UniprotHttp(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let sink: &dyn ProgressSink = if cli.non_interactive {
        &JsonOutput
    } else {
        &LogSink
    };

    let result = match cli.command {
        Commands::Build(args) => run_build(args, sink)?,
        Commands::Catalog(args) => run_catalog(args, sink)?,
    };

    if cli.non_interactive {
        JsonOutput::print_build(&result).into_diagnostic()?;
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn run_build(args: BuildArgs, sink: &dyn ProgressSink) -> miette::Result<BuildResult> {
    let mut config = load_config(args.config.as_deref(), args.species.is_some())?;
    if let Some(path) = &args.species {
        config.species = ConfigLoader::load_species(path.as_std_path())?;
    }

    let uniprot = UniprotHttpClient::new()?;
    let mut app = App::new(uniprot, RunSettings::from(&config));
    app.process_species_list(&config.species, sink);

    let paths = output_paths(&args.output, &config);
    Ok(app.finish(&paths, "Archaeological Protein Reference Database")?)
}

fn run_catalog(args: CatalogArgs, sink: &dyn ProgressSink) -> miette::Result<BuildResult> {
    let config = load_config(args.config.as_deref(), true)?;
    let catalog = match &args.catalog {
        Some(path) => Catalog::from_path(path.as_std_path())?,
        None => Catalog::embedded(args.set)?,
    };

    let uniprot = UniprotHttpClient::new()?;
    let mut app = App::new(uniprot, RunSettings::from(&config));
    app.process_catalog(&catalog, sink);

    let paths = output_paths(&args.output, &config);
    Ok(app.finish(&paths, "Archaeological Protein Reference Database (curated accessions)")?)
}

/// A missing default config falls back to built-in settings when the run
/// does not need its species sections.
fn load_config(path: Option<&str>, optional: bool) -> Result<ResolvedConfig, RefDbError> {
    match ConfigLoader::resolve(path) {
        Err(RefDbError::MissingConfig) if optional => Ok(ResolvedConfig::default()),
        other => other,
    }
}

fn output_paths(args: &OutputArgs, config: &ResolvedConfig) -> OutputPaths {
    let names = match &args.prefix {
        Some(prefix) => OutputNames::with_prefix(prefix),
        None => config.output.clone(),
    };
    OutputPaths::in_dir(&args.output_dir, &names)
}

fn print_summary(result: &BuildResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}marker-refdb summary{reset}");
    println!("{green}Sequences: {}{reset}", result.sequences);
    println!("Requests: {}", result.requests);
    println!(
        "Species: {} ({} without records)",
        result.species_processed, result.species_without_records
    );
    let failed_color = if result.failed_queries > 0 { yellow } else { green };
    println!("{failed_color}Failed queries: {}{reset}", result.failed_queries);
    if result.replaced_records > 0 {
        println!("{yellow}Replaced records: {}{reset}", result.replaced_records);
    }
    println!("{cyan}  fasta:    {}{reset}", result.fasta_path);
    println!("{cyan}  taxonomy: {}{reset}", result.taxonomy_path);
    println!("{cyan}  report:   {}{reset}", result.report_path);
}
