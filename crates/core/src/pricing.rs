use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{BillingMode, PricingCatalog, PricingCategory, PricingOption};
use crate::format::format_number;
use crate::state::{CalculatorState, CategoryEntries, CategoryState, CustomLine, OptionState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: Decimal,
    pub quantity_display: String,
    /// `None` for custom lines, which are billed at two rates.
    pub unit_price: Option<Decimal>,
    pub unit: Option<String>,
    pub pack: Option<u64>,
    pub cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub cost: Decimal,
    pub items: Vec<LineItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_cost: Decimal,
    pub categories: Vec<CategoryBreakdown>,
}

pub trait CostEngine: Send + Sync {
    fn summarize(&self, catalog: &PricingCatalog, state: &CalculatorState) -> CostSummary;
}

#[derive(Default)]
pub struct DeterministicCostEngine;

impl CostEngine for DeterministicCostEngine {
    fn summarize(&self, catalog: &PricingCatalog, state: &CalculatorState) -> CostSummary {
        compute_summary(catalog, state)
    }
}

/// Number of packs needed to cover `quantity`. Partial packs count as whole ones.
pub fn packs_needed(quantity: Decimal, pack: u64) -> Decimal {
    if pack == 0 || quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (quantity / Decimal::from(pack)).ceil()
}

pub fn cost_of_option(quantity: Decimal, price: Decimal, pack: Option<u64>) -> Decimal {
    match pack.filter(|pack| *pack > 0) {
        Some(pack) => packs_needed(quantity, pack).saturating_mul(price),
        None => quantity.saturating_mul(price),
    }
}

pub fn cost_of_custom_line(
    line: &CustomLine,
    ingest_price: Decimal,
    retention_price: Decimal,
) -> Decimal {
    if line.ingestion.is_zero() {
        return Decimal::ZERO;
    }

    let ingestion = line.ingestion.saturating_mul(ingest_price);
    let retention =
        line.ingestion.saturating_mul(line.retention_months).saturating_mul(retention_price);
    ingestion.saturating_add(retention)
}

pub fn cost_of_category(category: &PricingCategory, state: Option<&CategoryState>) -> Decimal {
    category_items(category, state)
        .iter()
        .fold(Decimal::ZERO, |total, item| total.saturating_add(item.cost))
}

pub fn compute_summary(catalog: &PricingCatalog, state: &CalculatorState) -> CostSummary {
    let mut summary = CostSummary::default();

    for category in catalog.categories() {
        let items = category_items(category, state.category(&category.name));
        let cost = items.iter().fold(Decimal::ZERO, |total, item| total.saturating_add(item.cost));
        summary.total_cost = summary.total_cost.saturating_add(cost);

        if cost > Decimal::ZERO {
            summary.categories.push(CategoryBreakdown {
                category: category.name.clone(),
                cost,
                items,
            });
        }
    }

    summary
}

fn category_items(category: &PricingCategory, state: Option<&CategoryState>) -> Vec<LineItem> {
    let Some(state) = state else {
        return Vec::new();
    };

    match (&category.billing, &state.entries) {
        (
            BillingMode::Standard { options_exclusive, options },
            CategoryEntries::Options { options: entries },
        ) => options
            .iter()
            .zip(entries)
            .filter(|(_, entry)| !options_exclusive || entry.selected)
            .filter(|(_, entry)| entry.quantity > Decimal::ZERO)
            .map(|(option, entry)| option_item(category, option, entry))
            .collect(),
        (
            BillingMode::CustomLines { ingest_price, retention_price },
            CategoryEntries::CustomLines { custom_lines },
        ) => custom_lines
            .iter()
            .map(|line| custom_line_item(category, line, *ingest_price, *retention_price))
            .filter(|item| item.cost > Decimal::ZERO)
            .collect(),
        _ => Vec::new(),
    }
}

fn option_item(
    category: &PricingCategory,
    option: &PricingOption,
    entry: &OptionState,
) -> LineItem {
    let quantity = entry.quantity;
    let pack = option.pack_size();
    let quantity_display = match pack {
        Some(pack) => {
            let packs = packs_needed(quantity, pack);
            let noun = if packs > Decimal::ONE { "packs" } else { "pack" };
            format!(
                "{} ({} {noun} of {})",
                format_number(quantity),
                format_number(packs),
                format_number(Decimal::from(pack))
            )
        }
        None => format_number(quantity),
    };

    LineItem {
        name: option.display_name().to_owned(),
        quantity,
        quantity_display,
        unit_price: Some(option.price),
        unit: category.option_unit(option).map(str::to_owned),
        pack,
        cost: cost_of_option(quantity, option.price, pack),
    }
}

fn custom_line_item(
    category: &PricingCategory,
    line: &CustomLine,
    ingest_price: Decimal,
    retention_price: Decimal,
) -> LineItem {
    let volume = match category.ingestion_noun() {
        Some(noun) => format!("{} {noun} ingested", format_number(line.ingestion)),
        None => format!("{} ingested", format_number(line.ingestion)),
    };
    let months = if line.retention_months == Decimal::ONE { "month" } else { "months" };

    LineItem {
        name: line.display_name().to_owned(),
        quantity: line.ingestion,
        quantity_display: format!(
            "{volume}, {} {months} retention",
            format_number(line.retention_months)
        ),
        unit_price: None,
        unit: category.unit.clone(),
        pack: None,
        cost: cost_of_custom_line(line, ingest_price, retention_price),
    }
}
