use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recommendations::canonical_rule_ids;
use crate::snapshot::DEFAULT_FILE_PREFIX;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub export: ExportConfig,
    pub recommendations: RecommendationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogConfig {
    /// JSON catalog to price against; the built-in catalog when unset.
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationConfig {
    pub disabled_rules: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub catalog_path: Option<PathBuf>,
    pub export_directory: Option<PathBuf>,
    pub export_file_prefix: Option<String>,
    pub disabled_rules: Option<Vec<String>>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            export: ExportConfig {
                directory: PathBuf::from("."),
                file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            },
            recommendations: RecommendationConfig::default(),
            logging: LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("costcalc.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(path) = catalog.path {
                self.catalog.path = Some(path);
            }
        }

        if let Some(export) = patch.export {
            if let Some(directory) = export.directory {
                self.export.directory = directory;
            }
            if let Some(file_prefix) = export.file_prefix {
                self.export.file_prefix = file_prefix;
            }
        }

        if let Some(recommendations) = patch.recommendations {
            if let Some(disabled_rules) = recommendations.disabled_rules {
                self.recommendations.disabled_rules = disabled_rules;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COSTCALC_CATALOG_PATH") {
            self.catalog.path = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("COSTCALC_EXPORT_DIRECTORY") {
            self.export.directory = PathBuf::from(value);
        }
        if let Some(value) = read_env("COSTCALC_EXPORT_FILE_PREFIX") {
            self.export.file_prefix = value;
        }

        if let Some(value) = read_env("COSTCALC_DISABLED_RULES") {
            self.recommendations.disabled_rules = parse_list("COSTCALC_DISABLED_RULES", &value)?;
        }

        let log_level =
            read_env("COSTCALC_LOGGING_LEVEL").or_else(|| read_env("COSTCALC_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COSTCALC_LOGGING_FORMAT").or_else(|| read_env("COSTCALC_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(catalog_path) = overrides.catalog_path {
            self.catalog.path = Some(catalog_path);
        }
        if let Some(export_directory) = overrides.export_directory {
            self.export.directory = export_directory;
        }
        if let Some(export_file_prefix) = overrides.export_file_prefix {
            self.export.file_prefix = export_file_prefix;
        }
        if let Some(disabled_rules) = overrides.disabled_rules {
            self.recommendations.disabled_rules = disabled_rules;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_export(&self.export)?;
        validate_recommendations(&self.recommendations)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("costcalc.toml"), PathBuf::from("config/costcalc.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            output.push(ch);
            continue;
        }

        chars.next();
        let mut key = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(next) => key.push(next),
                None => return Err(ConfigError::UnterminatedInterpolation),
            }
        }

        let value =
            env::var(&key).map_err(|_| ConfigError::MissingEnvInterpolation { var: key })?;
        output.push_str(&value);
    }

    Ok(output)
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    let Some(path) = &catalog.path else {
        return Ok(());
    };

    if path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("catalog.path must not be empty when set".to_string()));
    }
    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        return Err(ConfigError::Validation(format!(
            "catalog.path must point to a `.json` catalog, got `{}`",
            path.display()
        )));
    }

    Ok(())
}

fn validate_export(export: &ExportConfig) -> Result<(), ConfigError> {
    if export.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation("export.directory must not be empty".to_string()));
    }

    let prefix = export.file_prefix.trim();
    if prefix.is_empty() {
        return Err(ConfigError::Validation("export.file_prefix must not be empty".to_string()));
    }
    if prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(
            "export.file_prefix must be a file name, not a path".to_string(),
        ));
    }

    Ok(())
}

fn validate_recommendations(recommendations: &RecommendationConfig) -> Result<(), ConfigError> {
    let unknown: Vec<&str> = recommendations
        .disabled_rules
        .iter()
        .map(String::as_str)
        .filter(|id| !canonical_rule_ids().any(|known| known == *id))
        .collect();

    if unknown.is_empty() {
        return Ok(());
    }

    let known = canonical_rule_ids().collect::<Vec<_>>().join("|");
    Err(ConfigError::Validation(format!(
        "recommendations.disabled_rules contains unknown rule ids `{}` (expected {known})",
        unknown.join(", ")
    )))
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_list(key: &str, value: &str) -> Result<Vec<String>, ConfigError> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(items)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    export: Option<ExportPatch>,
    recommendations: Option<RecommendationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    directory: Option<PathBuf>,
    file_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    disabled_rules: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
