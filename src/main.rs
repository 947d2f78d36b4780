/*!
 * Siteport CLI
 *
 * Inspects migration plans and manifests. Runs themselves are driven by
 * embedding the library with concrete endpoint clients.
 */

use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use siteport::error::{EXIT_FATAL, EXIT_INTEGRITY, EXIT_SUCCESS};
use siteport::manifest::{validate_manifest_file, Manifest};
use siteport::{build_actions, logging, LogLevel, MigrationConfig, MigrationError, PipelineProfile, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "siteport")]
#[command(version, about = "Content migration planning and manifest inspection", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write logs to a file as JSON instead of stdout
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose output (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ordered action list for a profile
    Plan {
        /// Pipeline profile (defaults to the configured one)
        #[arg(long, value_enum)]
        profile: Option<PipelineProfile>,
    },

    /// Manifest inspection
    #[command(subcommand)]
    Manifest(ManifestCommands),
}

#[derive(Subcommand)]
enum ManifestCommands {
    /// Per content type statistics
    Summary {
        /// Manifest file
        file: PathBuf,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a manifest file against the manifest schema
    Validate {
        /// Manifest file
        file: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => MigrationConfig::from_file(path)?,
        None => MigrationConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    match cli.command {
        Commands::Plan { profile } => {
            print_plan(&config, profile.unwrap_or(config.profile));
            Ok(EXIT_SUCCESS)
        }
        Commands::Manifest(ManifestCommands::Summary { file, json }) => {
            let manifest = Manifest::load(&file)?;
            if json {
                let stats = serde_json::to_string_pretty(&manifest.stats())
                    .map_err(|e| MigrationError::Config(format!("Failed to serialize statistics: {}", e)))?;
                println!("{}", stats);
            } else {
                print_summary(&manifest);
            }
            Ok(EXIT_SUCCESS)
        }
        Commands::Manifest(ManifestCommands::Validate { file }) => match validate_manifest_file(&file) {
            Ok(()) => {
                println!("{}: valid", file.display());
                Ok(EXIT_SUCCESS)
            }
            Err(siteport::manifest::Error::ManifestNotFound { path }) => {
                eprintln!("Manifest not found: {}", path.display());
                Ok(EXIT_FATAL)
            }
            Err(e) => {
                eprintln!("{}: {}", file.display(), MigrationError::from(e));
                Ok(EXIT_INTEGRITY)
            }
        },
    }
}

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn print_plan(config: &MigrationConfig, profile: PipelineProfile) {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Action").add_attribute(Attribute::Bold),
    ]);
    for (index, action) in build_actions(profile).iter().enumerate() {
        table.add_row(vec![Cell::new(index + 1), Cell::new(action.name()).fg(Color::Cyan)]);
    }

    println!("Profile: {}", profile);
    println!("{table}");
    for skipped in profile.content_types().iter().filter(|ct| !config.includes(ct)) {
        println!("Skipped by configuration: {}", skipped);
    }
}

fn print_summary(manifest: &Manifest) {
    let mut table = create_table();
    table.set_header(
        ["Content type", "Total", "Pending", "Migrated", "Skipped", "Failed", "Canceled", "Complete"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for (content_type, stats) in manifest.stats() {
        let failed = if stats.has_failures() {
            Cell::new(stats.failed).fg(Color::Red)
        } else {
            Cell::new(stats.failed)
        };
        table.add_row(vec![
            Cell::new(content_type).fg(Color::Cyan),
            Cell::new(stats.total),
            Cell::new(stats.pending),
            Cell::new(stats.migrated).fg(Color::Green),
            Cell::new(stats.skipped),
            failed,
            Cell::new(stats.canceled),
            Cell::new(format!("{:.1}%", stats.completion_percent())),
        ]);
    }

    println!("Plan: {}", manifest.plan_id());
    println!("Created: {}", manifest.created_utc().to_rfc3339());
    println!("{table}");

    let errors = manifest.errors();
    if !errors.is_empty() {
        println!("Run errors:");
        for e in errors {
            println!("  - {}", e);
        }
    }
}
