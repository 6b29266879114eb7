//! Commands that load a configuration file, apply one change and write it back.

use std::path::Path;

use costcalc_core::config::LoadOptions;
use costcalc_core::{format_currency, format_number, Calculator, CustomLineField, DomainError};

use crate::commands::{
    describe_report, failed, open_calculator, read_configuration, write_configuration,
    CommandResult,
};

/// Initial values for `add-line`; anything left out starts at zero.
#[derive(Clone, Debug, Default)]
pub struct NewLine {
    pub name: Option<String>,
    pub ingestion: Option<String>,
    pub retention: Option<String>,
}

pub fn select(options: &LoadOptions, file: &Path, category: &str, index: usize) -> CommandResult {
    apply("select", options, file, |calculator| {
        calculator.select_exclusive_option(category, index)?;
        Ok(format!("selected option {index} of {category}"))
    })
}

pub fn set(
    options: &LoadOptions,
    file: &Path,
    category: &str,
    index: usize,
    quantity: &str,
) -> CommandResult {
    apply("set", options, file, |calculator| {
        let stored = calculator.set_option_quantity(category, index, quantity)?;
        Ok(format!("set {category} option {index} to {}", format_number(stored)))
    })
}

pub fn add_line(
    options: &LoadOptions,
    file: &Path,
    category: &str,
    line: NewLine,
) -> CommandResult {
    apply("add-line", options, file, |calculator| {
        let index = calculator.add_custom_line(category)?;
        let fields = [
            (CustomLineField::Name, line.name),
            (CustomLineField::Ingestion, line.ingestion),
            (CustomLineField::RetentionMonths, line.retention),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                calculator.update_custom_line(category, index, field, &value)?;
            }
        }
        Ok(format!("added line {index} to {category}"))
    })
}

pub fn remove_line(
    options: &LoadOptions,
    file: &Path,
    category: &str,
    index: usize,
) -> CommandResult {
    apply("remove-line", options, file, |calculator| {
        let removed = calculator.remove_custom_line(category, index)?;
        Ok(format!("removed line {index} ({}) from {category}", removed.display_name()))
    })
}

pub fn update_line(
    options: &LoadOptions,
    file: &Path,
    category: &str,
    index: usize,
    field: CustomLineField,
    value: &str,
) -> CommandResult {
    apply("update-line", options, file, |calculator| {
        calculator.update_custom_line(category, index, field, value)?;
        Ok(format!("updated {field:?} of {category} line {index}"))
    })
}

/// The file is only rewritten when the change succeeds.
fn apply<F>(command: &str, options: &LoadOptions, file: &Path, change: F) -> CommandResult
where
    F: FnOnce(&mut Calculator) -> Result<String, DomainError>,
{
    let (_, mut calculator) = match open_calculator(command, options) {
        Ok(opened) => opened,
        Err(failure) => return failure,
    };
    let report = match read_configuration(command, &mut calculator, file) {
        Ok(report) => report,
        Err(failure) => return failure,
    };

    let mut message = match change(&mut calculator).map_err(failed(command)) {
        Ok(message) => message,
        Err(failure) => return failure,
    };

    if let Err(failure) = write_configuration(command, &calculator, file) {
        return failure;
    }

    let total = calculator.summary().total_cost;
    message.push_str(&format!("; monthly total {}", format_currency(total)));
    if let Some(note) = describe_report(&report) {
        message.push_str("; ");
        message.push_str(&note);
    }
    CommandResult::success(command, message)
}
