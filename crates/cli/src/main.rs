use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::env;
use std::path::{Path, PathBuf};
use tgi_codec::{name_instance_id, PackageIndex, RootKind};
use tgi_model::{format_hex, parse_hex};
use tgi_project::{
    destination_has_content, materialize_folder, override_key_comment, rename_or_clone,
    CompanionOutcome, ConversionReport, OverrideKind, ProjectConfig, ProjectError, Prompter,
    ResolvedConfig, RewriteMode, RewriteOutcome, CONFIG_ENV_VAR, CONFIG_FILE_NAME,
};

mod prompt;

use prompt::TerminalPrompter;

#[derive(Parser)]
#[command(name = "tgi")]
#[command(about = "Reclassify game resources into a project tree", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Project config file (overrides TGI_CONFIG; default: ./tgi.config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a folder of packages and loose T-G-I files into a project
    Convert(ConvertArgs),

    /// Rename a tuning file (and its SimData) and rehash its instance
    Rename(RewriteArgs),

    /// Copy a tuning file (and its SimData) under a new name and instance
    Clone(RewriteArgs),

    /// List the resources in a package by category
    Summarize(SummarizeArgs),

    /// Pin a type, group or instance in a tuning file's override comment
    Override(OverrideArgs),

    /// Print the instance id a name hashes to
    Hash(HashArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Folder containing packages and/or loose resource files
    source: PathBuf,

    /// Project folder to write into
    dest: PathBuf,

    /// Glob, relative to the source folder, selecting the files to convert
    #[arg(long, default_value = "**/*")]
    pattern: String,

    /// Do not ask before writing into a non-empty destination
    #[arg(short, long)]
    yes: bool,

    /// Print the conversion report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RewriteArgs {
    /// Tuning file to rewrite
    path: PathBuf,

    /// New name (skips the prompt)
    #[arg(long)]
    name: Option<String>,

    /// Overwrite an existing file without asking
    #[arg(short, long)]
    yes: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SummarizeArgs {
    /// Package to read
    package: PathBuf,

    /// Print the index as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct OverrideArgs {
    /// Tuning file to annotate
    path: PathBuf,

    /// Key field to pin
    #[arg(value_enum)]
    kind: OverrideField,

    /// Hex value (with or without 0x)
    value: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum OverrideField {
    Type,
    Group,
    Instance,
}

impl OverrideField {
    const fn as_kind(self) -> OverrideKind {
        match self {
            Self::Type => OverrideKind::Type,
            Self::Group => OverrideKind::Group,
            Self::Instance => OverrideKind::Instance,
        }
    }
}

#[derive(Args)]
struct HashArgs {
    /// Name to hash
    name: String,

    /// Tuning class, for classes with a narrowed id space
    #[arg(long, conflicts_with = "module")]
    class: Option<String>,

    /// Hash as module tuning (dots normalized, full width)
    #[arg(long)]
    module: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Convert(args) => args.json,
        Commands::Rename(args) | Commands::Clone(args) => args.json,
        Commands::Summarize(args) => args.json,
        Commands::Override(_) | Commands::Hash(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Convert(args) => run_convert(args, config).await?,
        Commands::Rename(args) => run_rewrite(args, RewriteMode::Rename, &config).await?,
        Commands::Clone(args) => run_rewrite(args, RewriteMode::Clone, &config).await?,
        Commands::Summarize(args) => run_summarize(args).await?,
        Commands::Override(args) => run_override(args).await?,
        Commands::Hash(args) => run_hash(&args, &config),
    }

    Ok(())
}

async fn load_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let config = ProjectConfig::load(&path)
        .await
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    Ok(config.apply_defaults())
}

async fn run_convert(args: ConvertArgs, config: ResolvedConfig) -> Result<()> {
    if !args.source.is_dir() {
        bail!("Source folder {} does not exist", args.source.display());
    }

    if destination_has_content(&args.dest).await? {
        let prompter = TerminalPrompter {
            name: None,
            assume_yes: args.yes,
        };
        let choice = prompter
            .choose(
                "The chosen output directory is not empty. Are you sure you want to generate your project files here?",
                &["Yes", "Cancel"],
            )
            .await;
        if choice != Some(0) {
            bail!(ProjectError::UserCancelled);
        }
    }

    let pattern = args.source.join(&args.pattern);
    let pattern = pattern.to_string_lossy().replace('\\', "/");
    let report = materialize_folder(&pattern, &args.dest, config)
        .await
        .context("Conversion failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ConversionReport) {
    for source in &report.sources {
        match &source.skipped {
            Some(reason) => println!("skipped {}: {reason}", source.source.display()),
            None => println!(
                "{}: {} file(s)",
                source.source.display(),
                source.written.len()
            ),
        }
        for warning in &source.warnings {
            println!("  warning: {warning}");
        }
    }
    println!(
        "{} written, {} skipped, {} warning(s)",
        report.written(),
        report.skipped(),
        report.warnings()
    );
}

async fn run_rewrite(args: RewriteArgs, mode: RewriteMode, config: &ResolvedConfig) -> Result<()> {
    let prompter = TerminalPrompter {
        name: args.name,
        assume_yes: args.yes,
    };
    let outcome = rename_or_clone(&args.path, mode, &config.bit_widths, &prompter)
        .await
        .with_context(|| format!("Could not {mode} {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &RewriteOutcome) {
    println!(
        "{} -> {} ({})",
        outcome.previous_name,
        outcome.new_name,
        outcome.path.display()
    );
    println!("instance: {}", format_hex(outcome.instance, 16, true));
    match &outcome.companion {
        CompanionOutcome::None => {}
        CompanionOutcome::Written { path } => println!("SimData: {}", path.display()),
        CompanionOutcome::Failed { path, error } => {
            log::warn!("Tuning was written but SimData {} was not: {error}", path.display());
        }
    }
}

async fn run_summarize(args: SummarizeArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.package)
        .await
        .with_context(|| format!("Failed to read {}", args.package.display()))?;
    let index = PackageIndex::from_container(&bytes)
        .with_context(|| format!("{} is not a readable package", args.package.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }

    println!(
        "{} ({} bytes, {} resources)",
        args.package.display(),
        index.size,
        index.entry_count()
    );
    for group in &index.groups {
        println!("{} ({})", group.category, group.entries.len());
        for entry in &group.entries {
            println!("  [{}] {}  {}", entry.id, entry.key, entry.details);
            for warning in entry.warnings.iter().flatten() {
                println!("      ! {warning}");
            }
        }
    }
    Ok(())
}

async fn run_override(args: OverrideArgs) -> Result<()> {
    let Some(value) = parse_hex(&args.value) else {
        bail!("{} is not a hex value", args.value);
    };
    let written = override_key_comment(&args.path, args.kind.as_kind(), value)
        .await
        .with_context(|| format!("Could not annotate {}", args.path.display()))?;
    if !written {
        bail!("{} has no root element to annotate", args.path.display());
    }
    println!("Updated {}", args.path.display());
    Ok(())
}

fn run_hash(args: &HashArgs, config: &ResolvedConfig) {
    let root = if args.module {
        RootKind::Module
    } else {
        RootKind::Instance
    };
    let instance = name_instance_id(root, args.class.as_deref(), &args.name, &config.bit_widths);
    println!("{}", format_hex(instance, 16, true));
}
