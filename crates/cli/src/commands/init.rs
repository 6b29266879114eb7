use std::path::PathBuf;

use chrono::Utc;
use costcalc_core::config::LoadOptions;
use costcalc_core::snapshot::default_file_name;

use crate::commands::{open_calculator, write_configuration, CommandResult, EXIT_IO};

/// Writes a configuration with every category at its fresh state.
pub fn run(options: &LoadOptions, output: Option<PathBuf>, force: bool) -> CommandResult {
    let (config, calculator) = match open_calculator("init", options) {
        Ok(opened) => opened,
        Err(failure) => return failure,
    };

    let path = output.unwrap_or_else(|| {
        let today = Utc::now().date_naive();
        config.export.directory.join(default_file_name(&config.export.file_prefix, today))
    });

    if path.exists() && !force {
        return CommandResult::failure(
            "init",
            "file_exists",
            format!("`{}` already exists (pass --force to overwrite)", path.display()),
            EXIT_IO,
        );
    }

    if let Err(failure) = write_configuration("init", &calculator, &path) {
        return failure;
    }

    CommandResult::success(
        "init",
        format!(
            "wrote a fresh configuration with {} categories to `{}`",
            calculator.catalog().len(),
            path.display()
        ),
    )
}
