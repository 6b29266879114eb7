pub mod catalog;
pub mod config;
pub mod edit;
pub mod init;
pub mod summary;

use std::fs;
use std::path::Path;

use anyhow::Context;
use costcalc_core::config::{AppConfig, LoadOptions};
use costcalc_core::{
    ApplicationError, Calculator, DeterministicCostEngine, PricingCatalog, RecommendationEngine,
    ReconcileReport,
};
use serde::Serialize;
use tracing::debug;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_CATALOG: u8 = 3;
pub const EXIT_IO: u8 = 4;
pub const EXIT_SNAPSHOT: u8 = 5;
pub const EXIT_DOMAIN: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// A typed failure with its stable class and a user-safe lead message.
    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        let exit_code = match error {
            ApplicationError::Configuration(_) => EXIT_CONFIG,
            ApplicationError::Catalog(_) => EXIT_CATALOG,
            ApplicationError::Snapshot(_) => EXIT_SNAPSHOT,
            ApplicationError::Domain(_) => EXIT_DOMAIN,
        };
        Self::failure(
            command,
            error.error_class(),
            format!("{} ({error})", error.user_message()),
            exit_code,
        )
    }

    /// A document printed as-is instead of the outcome envelope.
    pub fn document<T: Serialize>(command: &str, document: &T) -> Self {
        match serde_json::to_string_pretty(document) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Adapter for `map_err` on any error the core can raise.
pub(crate) fn failed<E>(command: &str) -> impl Fn(E) -> CommandResult + '_
where
    E: Into<ApplicationError>,
{
    move |error| CommandResult::from_error(command, &error.into())
}

pub(crate) fn load_config(
    command: &str,
    options: &LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(failed(command))
}

pub(crate) fn load_catalog(
    command: &str,
    config: &AppConfig,
) -> Result<PricingCatalog, CommandResult> {
    let catalog = match &config.catalog.path {
        Some(path) => PricingCatalog::load(path),
        None => PricingCatalog::builtin(),
    };
    catalog.map_err(failed(command))
}

/// Calculator over the configured catalog with the configured rules disabled.
pub(crate) fn open_calculator(
    command: &str,
    options: &LoadOptions,
) -> Result<(AppConfig, Calculator), CommandResult> {
    let config = load_config(command, options)?;
    let catalog = load_catalog(command, &config)?;
    let rules =
        RecommendationEngine::canonical().without(config.recommendations.disabled_rules.as_slice());
    debug!(categories = catalog.len(), rules = rules.rules().len(), "calculator opened");

    let calculator = Calculator::with_engines(catalog, DeterministicCostEngine, rules);
    Ok((config, calculator))
}

pub(crate) fn read_configuration(
    command: &str,
    calculator: &mut Calculator,
    path: &Path,
) -> Result<ReconcileReport, CommandResult> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read configuration file `{}`", path.display()))
        .map_err(|error| CommandResult::failure(command, "io", format!("{error:#}"), EXIT_IO))?;

    calculator.load(&raw).map_err(failed(command))
}

pub(crate) fn write_configuration(
    command: &str,
    calculator: &Calculator,
    path: &Path,
) -> Result<(), CommandResult> {
    let json = calculator.save().map_err(failed(command))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create directory `{}`", parent.display()))
            .map_err(|error| {
                CommandResult::failure(command, "io", format!("{error:#}"), EXIT_IO)
            })?;
    }

    fs::write(path, json)
        .with_context(|| format!("could not write configuration file `{}`", path.display()))
        .map_err(|error| CommandResult::failure(command, "io", format!("{error:#}"), EXIT_IO))
}

/// Human summary of what reconciliation had to repair, if anything.
pub(crate) fn describe_report(report: &ReconcileReport) -> Option<String> {
    if report.is_clean() {
        return None;
    }

    let mut notes = Vec::new();
    if !report.added.is_empty() {
        notes.push(format!("added {}", report.added.join(", ")));
    }
    if !report.reset.is_empty() {
        notes.push(format!("reset {}", report.reset.join(", ")));
    }
    if !report.repaired.is_empty() {
        notes.push(format!("repaired {}", report.repaired.join(", ")));
    }
    if !report.orphaned.is_empty() {
        notes.push(format!("unknown to the catalog {}", report.orphaned.join(", ")));
    }
    Some(format!("reconciled with catalog: {}", notes.join("; ")))
}
