use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{BillingMode, PricingCatalog, PricingCategory};
use crate::errors::DomainError;
use crate::format::{parse_quantity, sanitize_quantity, serialize_wire_number};

pub const DEFAULT_LINE_NAME: &str = "Unnamed";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionState {
    #[serde(default, serialize_with = "serialize_wire_number")]
    pub quantity: Decimal,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLine {
    #[serde(default)]
    pub name: String,
    #[serde(default, serialize_with = "serialize_wire_number")]
    pub ingestion: Decimal,
    #[serde(default, serialize_with = "serialize_wire_number")]
    pub retention_months: Decimal,
}

impl CustomLine {
    pub fn display_name(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            DEFAULT_LINE_NAME
        } else {
            name
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomLineField {
    Name,
    Ingestion,
    RetentionMonths,
}

impl FromStr for CustomLineField {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "name" => Ok(Self::Name),
            "ingestion" => Ok(Self::Ingestion),
            "retentionMonths" | "retention_months" | "retention" => Ok(Self::RetentionMonths),
            other => Err(format!(
                "unsupported custom line field `{other}` (expected name|ingestion|retentionMonths)"
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryEntries {
    CustomLines {
        #[serde(rename = "customLines")]
        custom_lines: Vec<CustomLine>,
    },
    Options {
        options: Vec<OptionState>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryState {
    #[serde(default)]
    pub collapsed: bool,
    #[serde(flatten)]
    pub entries: CategoryEntries,
}

impl CategoryState {
    /// Fresh state for one catalog category: zero quantities, first option selected.
    pub fn fresh(category: &PricingCategory) -> Self {
        let entries = match &category.billing {
            BillingMode::Standard { options, .. } => CategoryEntries::Options {
                options: (0..options.len())
                    .map(|index| OptionState { quantity: Decimal::ZERO, selected: index == 0 })
                    .collect(),
            },
            BillingMode::CustomLines { .. } => {
                CategoryEntries::CustomLines { custom_lines: Vec::new() }
            }
        };

        Self { collapsed: true, entries }
    }

    pub fn options(&self) -> Option<&[OptionState]> {
        match &self.entries {
            CategoryEntries::Options { options } => Some(options),
            CategoryEntries::CustomLines { .. } => None,
        }
    }

    pub fn custom_lines(&self) -> Option<&[CustomLine]> {
        match &self.entries {
            CategoryEntries::CustomLines { custom_lines } => Some(custom_lines),
            CategoryEntries::Options { .. } => None,
        }
    }

    /// Whether the entry shape agrees with the catalog billing mode and option count.
    pub fn matches(&self, category: &PricingCategory) -> bool {
        match (&self.entries, &category.billing) {
            (CategoryEntries::Options { options }, BillingMode::Standard { .. }) => {
                options.len() == category.options().len()
            }
            (CategoryEntries::CustomLines { .. }, BillingMode::CustomLines { .. }) => true,
            _ => false,
        }
    }

    /// Clamps every number to a stored quantity and, for exclusive categories, keeps
    /// exactly one selected option (the first selected one, else the first) with all
    /// other quantities zeroed. Returns whether anything changed.
    pub fn repair(&mut self, category: &PricingCategory) -> bool {
        let mut changed = false;
        match &mut self.entries {
            CategoryEntries::Options { options } => {
                for option in options.iter_mut() {
                    changed |= sanitize(&mut option.quantity);
                }
                if category.is_exclusive() {
                    let keep = options.iter().position(|option| option.selected).unwrap_or(0);
                    for (position, option) in options.iter_mut().enumerate() {
                        let selected = position == keep;
                        if option.selected != selected {
                            option.selected = selected;
                            changed = true;
                        }
                        if !selected && !option.quantity.is_zero() {
                            option.quantity = Decimal::ZERO;
                            changed = true;
                        }
                    }
                }
            }
            CategoryEntries::CustomLines { custom_lines } => {
                for line in custom_lines.iter_mut() {
                    changed |= sanitize(&mut line.ingestion);
                    changed |= sanitize(&mut line.retention_months);
                }
            }
        }
        changed
    }
}

fn sanitize(value: &mut Decimal) -> bool {
    let sanitized = sanitize_quantity(*value);
    let changed = sanitized != *value;
    *value = sanitized;
    changed
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub reset: Vec<String>,
    /// Kept, but with negative values clamped or the option selection fixed.
    pub repaired: Vec<String>,
    pub orphaned: Vec<String>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.added.is_empty()
            && self.reset.is_empty()
            && self.repaired.is_empty()
            && self.orphaned.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculatorState {
    categories: BTreeMap<String, CategoryState>,
}

impl CalculatorState {
    pub fn from_catalog(catalog: &PricingCatalog) -> Self {
        let categories = catalog
            .categories()
            .iter()
            .map(|category| (category.name.clone(), CategoryState::fresh(category)))
            .collect();

        Self { categories }
    }

    pub fn category(&self, name: &str) -> Option<&CategoryState> {
        self.categories.get(name)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryState)> {
        self.categories.iter().map(|(name, state)| (name.as_str(), state))
    }

    pub fn insert(&mut self, name: impl Into<String>, state: CategoryState) {
        self.categories.insert(name.into(), state);
    }

    pub fn options(&self, name: &str) -> Option<&[OptionState]> {
        self.category(name)?.options()
    }

    pub fn custom_lines(&self, name: &str) -> Option<&[CustomLine]> {
        self.category(name)?.custom_lines()
    }

    pub fn selected_option(&self, name: &str) -> Option<&OptionState> {
        self.options(name)?.iter().find(|option| option.selected)
    }

    /// True once anything billable has been entered.
    pub fn has_data(&self) -> bool {
        self.categories.values().any(|state| match &state.entries {
            CategoryEntries::Options { options } => {
                options.iter().any(|option| option.quantity > Decimal::ZERO)
            }
            CategoryEntries::CustomLines { custom_lines } => {
                custom_lines.iter().any(|line| line.ingestion > Decimal::ZERO)
            }
        })
    }

    pub fn toggle_collapsed(&mut self, category: &str) -> Result<bool, DomainError> {
        let state = self
            .categories
            .get_mut(category)
            .ok_or_else(|| DomainError::invalid_category(category, "unknown category"))?;
        state.collapsed = !state.collapsed;
        Ok(state.collapsed)
    }

    pub fn select_exclusive_option(
        &mut self,
        catalog: &PricingCatalog,
        category: &str,
        index: usize,
    ) -> Result<(), DomainError> {
        let definition = catalog
            .find(category)
            .ok_or_else(|| DomainError::invalid_category(category, "unknown category"))?;
        if !definition.is_exclusive() {
            return Err(DomainError::invalid_category(category, "options are not exclusive"));
        }

        let options = self.options_mut(category)?;
        if index >= options.len() {
            return Err(DomainError::out_of_range(category, index, options.len()));
        }

        for (position, option) in options.iter_mut().enumerate() {
            option.selected = position == index;
            if position != index {
                option.quantity = Decimal::ZERO;
            }
        }

        debug!(category, index, "exclusive option selected");
        Ok(())
    }

    /// Parses `raw` and stores it as the option quantity. Returns the stored value.
    pub fn set_option_quantity(
        &mut self,
        catalog: &PricingCatalog,
        category: &str,
        index: usize,
        raw: &str,
    ) -> Result<Decimal, DomainError> {
        let exclusive = catalog
            .find(category)
            .ok_or_else(|| DomainError::invalid_category(category, "unknown category"))?
            .is_exclusive();

        let options = self.options_mut(category)?;
        let len = options.len();
        let option =
            options.get_mut(index).ok_or_else(|| DomainError::out_of_range(category, index, len))?;

        let quantity = parse_quantity(raw);
        if exclusive && !option.selected && quantity > Decimal::ZERO {
            return Err(DomainError::UnselectedOption { category: category.to_owned(), index });
        }

        option.quantity = quantity;
        debug!(category, index, %quantity, "option quantity updated");
        Ok(quantity)
    }

    /// Appends an empty line and returns its index.
    pub fn add_custom_line(&mut self, category: &str) -> Result<usize, DomainError> {
        let lines = self.custom_lines_mut(category)?;
        lines.push(CustomLine::default());
        debug!(category, lines = lines.len(), "custom line added");
        Ok(lines.len() - 1)
    }

    pub fn remove_custom_line(
        &mut self,
        category: &str,
        index: usize,
    ) -> Result<CustomLine, DomainError> {
        let lines = self.custom_lines_mut(category)?;
        if index >= lines.len() {
            return Err(DomainError::out_of_range(category, index, lines.len()));
        }

        let removed = lines.remove(index);
        debug!(category, index, "custom line removed");
        Ok(removed)
    }

    pub fn update_custom_line(
        &mut self,
        category: &str,
        index: usize,
        field: CustomLineField,
        raw: &str,
    ) -> Result<(), DomainError> {
        let lines = self.custom_lines_mut(category)?;
        let len = lines.len();
        let line =
            lines.get_mut(index).ok_or_else(|| DomainError::out_of_range(category, index, len))?;

        match field {
            CustomLineField::Name => line.name = raw.trim().to_owned(),
            CustomLineField::Ingestion => line.ingestion = parse_quantity(raw),
            CustomLineField::RetentionMonths => line.retention_months = parse_quantity(raw),
        }

        debug!(category, index, ?field, "custom line updated");
        Ok(())
    }

    /// Aligns a loaded state with `catalog`: missing categories are added fresh, entries
    /// with the wrong billing shape or option count are reset, out-of-range values and
    /// broken selections are repaired, and unknown categories are kept but reported.
    pub fn reconcile(&mut self, catalog: &PricingCatalog) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for category in catalog.categories() {
            match self.categories.get_mut(&category.name) {
                None => {
                    self.categories.insert(category.name.clone(), CategoryState::fresh(category));
                    report.added.push(category.name.clone());
                }
                Some(state) if !state.matches(category) => {
                    *state = CategoryState::fresh(category);
                    report.reset.push(category.name.clone());
                }
                Some(state) => {
                    if state.repair(category) {
                        report.repaired.push(category.name.clone());
                    }
                }
            }
        }

        report.orphaned = self
            .categories
            .keys()
            .filter(|name| catalog.find(name).is_none())
            .cloned()
            .collect();

        if !report.is_clean() {
            warn!(
                added = ?report.added,
                reset = ?report.reset,
                repaired = ?report.repaired,
                orphaned = ?report.orphaned,
                "loaded configuration does not match the pricing catalog"
            );
        }

        report
    }

    fn options_mut(&mut self, category: &str) -> Result<&mut Vec<OptionState>, DomainError> {
        match self.categories.get_mut(category).map(|state| &mut state.entries) {
            Some(CategoryEntries::Options { options }) => Ok(options),
            Some(CategoryEntries::CustomLines { .. }) => {
                Err(DomainError::invalid_category(category, "category uses custom line items"))
            }
            None => Err(DomainError::invalid_category(category, "category has no state")),
        }
    }

    fn custom_lines_mut(&mut self, category: &str) -> Result<&mut Vec<CustomLine>, DomainError> {
        match self.categories.get_mut(category).map(|state| &mut state.entries) {
            Some(CategoryEntries::CustomLines { custom_lines }) => Ok(custom_lines),
            Some(CategoryEntries::Options { .. }) => {
                Err(DomainError::invalid_category(category, "category has no custom line items"))
            }
            None => Err(DomainError::invalid_category(category, "category has no state")),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::catalog::PricingCatalog;
    use crate::errors::DomainError;

    use super::{CalculatorState, CategoryEntries, CategoryState, CustomLineField, OptionState};

    fn catalog() -> PricingCatalog {
        PricingCatalog::builtin().expect("builtin catalog parses")
    }

    #[test]
    fn fresh_state_selects_first_option_with_zero_quantities() {
        let catalog = catalog();
        let state = CalculatorState::from_catalog(&catalog);

        let visualization = state.options("Visualization").expect("options");
        assert_eq!(visualization.len(), 3);
        assert!(visualization[0].selected);
        assert!(visualization[1..].iter().all(|option| !option.selected));
        assert!(visualization.iter().all(|option| option.quantity.is_zero()));

        assert_eq!(state.custom_lines("Logs").map(<[_]>::len), Some(0));
        assert!(state.category("Logs").expect("logs").collapsed);
        assert!(!state.has_data());
    }

    #[test]
    fn selecting_exclusive_option_resets_other_quantities() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);
        state.set_option_quantity(&catalog, "Visualization", 0, "25").expect("set quantity");

        state.select_exclusive_option(&catalog, "Visualization", 2).expect("select");
        state.set_option_quantity(&catalog, "Visualization", 2, "40").expect("set quantity");
        state.select_exclusive_option(&catalog, "Visualization", 2).expect("reselect");

        let options = state.options("Visualization").expect("options");
        assert_eq!(options.iter().filter(|option| option.selected).count(), 1);
        assert!(options[2].selected);
        assert_eq!(options[2].quantity, Decimal::from(40));
        assert!(options[0].quantity.is_zero());
        assert!(options[1].quantity.is_zero());
    }

    #[test]
    fn selecting_in_non_exclusive_or_unknown_category_fails() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);

        assert!(matches!(
            state.select_exclusive_option(&catalog, "IRM", 0),
            Err(DomainError::InvalidCategory { .. })
        ));
        assert!(matches!(
            state.select_exclusive_option(&catalog, "Nope", 0),
            Err(DomainError::InvalidCategory { .. })
        ));
        assert!(matches!(
            state.select_exclusive_option(&catalog, "Metrics", 2),
            Err(DomainError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
    }

    #[test]
    fn quantity_input_is_parsed_and_clamped() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);

        let stored = state.set_option_quantity(&catalog, "Metrics", 0, "1,234.5").expect("set");
        assert_eq!(stored, Decimal::new(12_345, 1));

        state.set_option_quantity(&catalog, "IRM", 0, "-12").expect("set");
        assert!(state.options("IRM").expect("irm")[0].quantity.is_zero());

        state.set_option_quantity(&catalog, "Traces", 0, "abc").expect("set");
        assert!(state.options("Traces").expect("traces")[0].quantity.is_zero());
        assert!(state.has_data());
    }

    #[test]
    fn quantity_on_unselected_exclusive_option_is_rejected() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);

        let error = state.set_option_quantity(&catalog, "Metrics", 1, "5000").expect_err("reject");
        assert_eq!(error, DomainError::UnselectedOption { category: "Metrics".into(), index: 1 });

        state.set_option_quantity(&catalog, "Metrics", 1, "0").expect("zero is always allowed");
        assert!(matches!(
            state.set_option_quantity(&catalog, "Logs", 0, "1"),
            Err(DomainError::InvalidCategory { .. })
        ));
        assert!(matches!(
            state.set_option_quantity(&catalog, "IRM", 3, "1"),
            Err(DomainError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn custom_lines_can_be_added_updated_and_removed() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);

        let first = state.add_custom_line("Logs").expect("add");
        let second = state.add_custom_line("Logs").expect("add");
        assert_eq!((first, second), (0, 1));

        state.update_custom_line("Logs", 0, CustomLineField::Name, "  production ").expect("name");
        state.update_custom_line("Logs", 0, CustomLineField::Ingestion, "1,000").expect("ingest");
        state.update_custom_line("Logs", 0, CustomLineField::RetentionMonths, "-3").expect("ret");

        let lines = state.custom_lines("Logs").expect("lines");
        assert_eq!(lines[0].name, "production");
        assert_eq!(lines[0].ingestion, Decimal::from(1_000));
        assert!(lines[0].retention_months.is_zero());
        assert_eq!(lines[1].display_name(), "Unnamed");

        let removed = state.remove_custom_line("Logs", 1).expect("remove");
        assert_eq!(removed.display_name(), "Unnamed");
        assert!(matches!(
            state.remove_custom_line("Logs", 1),
            Err(DomainError::IndexOutOfRange { index: 1, len: 1, .. })
        ));
        assert!(matches!(
            state.add_custom_line("Metrics"),
            Err(DomainError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn reconcile_fills_missing_resets_misshaped_and_reports_orphans() {
        let catalog = catalog();
        let mut state = CalculatorState::default();
        state.insert(
            "Logs",
            CategoryState {
                collapsed: false,
                entries: CategoryEntries::Options { options: Vec::new() },
            },
        );
        state.insert("Retired Product", CategoryState::fresh(&catalog.categories()[1]));

        let report = state.reconcile(&catalog);

        assert_eq!(report.reset, vec!["Logs".to_string()]);
        assert_eq!(report.orphaned, vec!["Retired Product".to_string()]);
        assert_eq!(report.added.len(), catalog.len() - 1);
        assert!(state.custom_lines("Logs").is_some());
        assert!(state.category("Retired Product").is_some());
    }

    #[test]
    fn reconcile_resets_wrong_option_counts_and_restores_single_selection() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);
        state.insert(
            "Metrics",
            CategoryState {
                collapsed: true,
                entries: CategoryEntries::Options { options: Vec::new() },
            },
        );
        let unselected =
            |quantity: i64| OptionState { quantity: Decimal::from(quantity), selected: false };
        state.insert(
            "Visualization",
            CategoryState {
                collapsed: false,
                entries: CategoryEntries::Options {
                    options: vec![unselected(0), unselected(5), unselected(7)],
                },
            },
        );

        let report = state.reconcile(&catalog);

        assert_eq!(report.reset, vec!["Metrics".to_string()]);
        assert_eq!(report.repaired, vec!["Visualization".to_string()]);
        let visualization = state.options("Visualization").expect("options");
        assert_eq!(visualization.iter().filter(|option| option.selected).count(), 1);
        assert!(visualization[0].selected);
        assert!(visualization.iter().all(|option| option.quantity.is_zero()));

        state.select_exclusive_option(&catalog, "Metrics", 0).expect("metrics editable");
        state.set_option_quantity(&catalog, "Visualization", 0, "3").expect("viz editable");
    }

    #[test]
    fn reconcile_keeps_the_selected_option_and_drops_stray_quantities() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);
        let option = |quantity: i64, selected: bool| OptionState {
            quantity: Decimal::from(quantity),
            selected,
        };
        state.insert(
            "Visualization",
            CategoryState {
                collapsed: true,
                entries: CategoryEntries::Options {
                    options: vec![option(4, false), option(9, true), option(2, true)],
                },
            },
        );

        let report = state.reconcile(&catalog);

        assert_eq!(report.repaired, vec!["Visualization".to_string()]);
        let visualization = state.options("Visualization").expect("options");
        assert_eq!(visualization[1], option(9, true));
        assert_eq!(visualization[0], option(0, false));
        assert_eq!(visualization[2], option(0, false));
    }

    #[test]
    fn reconcile_clamps_negative_loaded_values() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);
        let line = state.add_custom_line("Logs").expect("line");
        state.update_custom_line("Logs", line, CustomLineField::Ingestion, "100").expect("ing");
        let mut logs = state.category("Logs").expect("logs").clone();
        if let CategoryEntries::CustomLines { custom_lines } = &mut logs.entries {
            custom_lines[0].retention_months = Decimal::from(-10);
        }
        state.insert("Logs", logs);
        let mut irm = state.category("IRM").expect("irm").clone();
        if let CategoryEntries::Options { options } = &mut irm.entries {
            options[0].quantity = Decimal::from(-3);
        }
        state.insert("IRM", irm);

        let report = state.reconcile(&catalog);

        assert_eq!(report.repaired, vec!["IRM".to_string(), "Logs".to_string()]);
        assert!(report.reset.is_empty());
        let lines = state.custom_lines("Logs").expect("lines");
        assert_eq!(lines[0].ingestion, Decimal::from(100));
        assert!(lines[0].retention_months.is_zero());
        assert!(state.options("IRM").expect("irm")[0].quantity.is_zero());
        assert!(state.reconcile(&catalog).is_clean());
    }

    #[test]
    fn toggling_collapsed_flips_the_flag() {
        let catalog = catalog();
        let mut state = CalculatorState::from_catalog(&catalog);

        assert_eq!(state.toggle_collapsed("Metrics"), Ok(false));
        assert_eq!(state.toggle_collapsed("Metrics"), Ok(true));
        assert!(state.toggle_collapsed("Unknown").is_err());
    }
}
