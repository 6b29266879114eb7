use costcalc_core::config::LoadOptions;
use costcalc_core::{format_currency, format_number, BillingMode, PricingCategory};
use rust_decimal::Decimal;

use crate::commands::{load_catalog, load_config, CommandResult};

pub fn run(options: &LoadOptions, json: bool) -> CommandResult {
    let config = match load_config("catalog", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let catalog = match load_catalog("catalog", &config) {
        Ok(catalog) => catalog,
        Err(failure) => return failure,
    };

    if json {
        return CommandResult::document("catalog", &catalog);
    }

    let mut lines = vec![format!("{} pricing categories:", catalog.len())];
    for category in catalog.categories() {
        lines.extend(render_category(category));
    }
    CommandResult::success("catalog", lines.join("\n"))
}

fn render_category(category: &PricingCategory) -> Vec<String> {
    let mut lines = Vec::new();
    let mode = match &category.billing {
        BillingMode::Standard { options_exclusive: true, .. } => " [pick one]",
        BillingMode::Standard { .. } => "",
        BillingMode::CustomLines { .. } => " [custom lines]",
    };
    lines.push(format!("- {}{mode}", category.name));

    match &category.billing {
        BillingMode::Standard { options, .. } => {
            for (index, option) in options.iter().enumerate() {
                let unit = category.option_unit(option).unwrap_or("each");
                let pack = option
                    .pack_size()
                    .map(|pack| format!(" in packs of {}", format_number(Decimal::from(pack))))
                    .unwrap_or_default();
                lines.push(format!(
                    "  {index}: {} at {} {unit}{pack}",
                    option.display_name(),
                    format_currency(option.price)
                ));
            }
        }
        BillingMode::CustomLines { ingest_price, retention_price } => {
            let noun = category.ingestion_noun().unwrap_or("unit");
            lines.push(format!(
                "  ingestion {} per {noun}, retention {} per {noun}-month",
                format_currency(*ingest_price),
                format_currency(*retention_price)
            ));
        }
    }

    if let Some(description) = &category.description {
        lines.push(format!("  note: {description}"));
    }
    lines
}
