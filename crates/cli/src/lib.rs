pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use costcalc_core::config::{AppConfig, LoadOptions, LogFormat};
use costcalc_core::CustomLineField;

#[derive(Debug, Parser)]
#[command(
    name = "costcalc",
    about = "Observability cost calculator",
    long_about = "Price a stack of observability services against a catalog, edit saved \
                  configuration files, and review cost breakdowns with recommendations.",
    after_help = concat!(
        "Examples:\n",
        "  costcalc init --output estimate.json\n",
        "  costcalc set estimate.json Metrics 0 1,500\n",
        "  costcalc summary estimate.json --json"
    )
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a costcalc.toml file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List the pricing categories and their options")]
    Catalog {
        #[arg(long, help = "Emit the catalog as JSON")]
        json: bool,
    },
    #[command(about = "Write an empty configuration file for the active catalog")]
    Init {
        #[arg(long, help = "Target file (defaults to the export directory and dated name)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
    #[command(about = "Show the cost breakdown and recommendations for a configuration file")]
    Summary {
        file: PathBuf,
        #[arg(long, help = "Emit the full evaluation as JSON")]
        json: bool,
    },
    #[command(about = "Select an option in an exclusive category")]
    Select { file: PathBuf, category: String, index: usize },
    #[command(about = "Set the quantity of a category option")]
    Set { file: PathBuf, category: String, index: usize, quantity: String },
    #[command(name = "add-line", about = "Append a custom line to a category")]
    AddLine {
        file: PathBuf,
        category: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        ingestion: Option<String>,
        #[arg(long)]
        retention: Option<String>,
    },
    #[command(name = "remove-line", about = "Remove a custom line from a category")]
    RemoveLine { file: PathBuf, category: String, index: usize },
    #[command(name = "update-line", about = "Change one field of a custom line")]
    UpdateLine {
        file: PathBuf,
        category: String,
        index: usize,
        #[arg(help = "name | ingestion | retentionMonths")]
        field: CustomLineField,
        value: String,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions { config_path: cli.config, ..LoadOptions::default() };

    // A broken config is reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Catalog { json } => commands::catalog::run(&options, json),
        Command::Init { output, force } => commands::init::run(&options, output, force),
        Command::Summary { file, json } => commands::summary::run(&options, &file, json),
        Command::Select { file, category, index } => {
            commands::edit::select(&options, &file, &category, index)
        }
        Command::Set { file, category, index, quantity } => {
            commands::edit::set(&options, &file, &category, index, &quantity)
        }
        Command::AddLine { file, category, name, ingestion, retention } => {
            let line = commands::edit::NewLine { name, ingestion, retention };
            commands::edit::add_line(&options, &file, &category, line)
        }
        Command::RemoveLine { file, category, index } => {
            commands::edit::remove_line(&options, &file, &category, index)
        }
        Command::UpdateLine { file, category, index, field, value } => {
            commands::edit::update_line(&options, &file, &category, index, field, &value)
        }
        Command::Config => commands::config::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON document.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
