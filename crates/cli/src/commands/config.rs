use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use costcalc_core::config::LoadOptions;
use toml::Value;

use crate::commands::{load_config, CommandResult};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config("config", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let config_file_path = detect_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let catalog_path = config
        .catalog
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());
    let disabled_rules = if config.recommendations.disabled_rules.is_empty() {
        "<none>".to_string()
    } else {
        config.recommendations.disabled_rules.join(",")
    };

    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "catalog.path",
            &catalog_path,
            source("catalog.path", &["COSTCALC_CATALOG_PATH"]),
        ),
        render_line(
            "export.directory",
            &config.export.directory.display().to_string(),
            source("export.directory", &["COSTCALC_EXPORT_DIRECTORY"]),
        ),
        render_line(
            "export.file_prefix",
            &config.export.file_prefix,
            source("export.file_prefix", &["COSTCALC_EXPORT_FILE_PREFIX"]),
        ),
        render_line(
            "recommendations.disabled_rules",
            &disabled_rules,
            source("recommendations.disabled_rules", &["COSTCALC_DISABLED_RULES"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["COSTCALC_LOGGING_LEVEL", "COSTCALC_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format).to_lowercase(),
            source("logging.format", &["COSTCALC_LOGGING_FORMAT", "COSTCALC_LOG_FORMAT"]),
        ),
    ];

    CommandResult::success("config", lines.join("\n"))
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    [PathBuf::from("costcalc.toml"), PathBuf::from("config/costcalc.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let from_env = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()));
    if let Some(env_key) = from_env {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
