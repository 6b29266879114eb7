use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::PricingCatalog;
use crate::errors::{DomainError, SnapshotError};
use crate::pricing::{CostEngine, CostSummary, DeterministicCostEngine};
use crate::recommendations::{Recommendation, RecommendationEngine};
use crate::snapshot::{self, ConfigSnapshot};
use crate::state::{CalculatorState, CustomLine, CustomLineField, ReconcileReport};

/// Everything the presentation layer renders after a change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub summary: CostSummary,
    pub recommendations: Vec<Recommendation>,
}

/// One calculator session: a catalog, the state entered against it and the rule set.
pub struct Calculator<E = DeterministicCostEngine> {
    catalog: PricingCatalog,
    state: CalculatorState,
    cost_engine: E,
    recommendations: RecommendationEngine,
}

impl Calculator<DeterministicCostEngine> {
    pub fn new(catalog: PricingCatalog) -> Self {
        Self::with_engines(catalog, DeterministicCostEngine, RecommendationEngine::canonical())
    }
}

impl<E: CostEngine> Calculator<E> {
    pub fn with_engines(
        catalog: PricingCatalog,
        cost_engine: E,
        recommendations: RecommendationEngine,
    ) -> Self {
        let state = CalculatorState::from_catalog(&catalog);
        Self { catalog, state, cost_engine, recommendations }
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &CalculatorState {
        &self.state
    }

    pub fn has_data(&self) -> bool {
        self.state.has_data()
    }

    /// Discards everything entered so far.
    pub fn reset(&mut self) {
        self.state = CalculatorState::from_catalog(&self.catalog);
    }

    pub fn select_exclusive_option(
        &mut self,
        category: &str,
        index: usize,
    ) -> Result<(), DomainError> {
        self.state.select_exclusive_option(&self.catalog, category, index)
    }

    pub fn set_option_quantity(
        &mut self,
        category: &str,
        index: usize,
        raw: &str,
    ) -> Result<Decimal, DomainError> {
        self.state.set_option_quantity(&self.catalog, category, index, raw)
    }

    pub fn add_custom_line(&mut self, category: &str) -> Result<usize, DomainError> {
        self.state.add_custom_line(category)
    }

    pub fn remove_custom_line(
        &mut self,
        category: &str,
        index: usize,
    ) -> Result<CustomLine, DomainError> {
        self.state.remove_custom_line(category, index)
    }

    pub fn update_custom_line(
        &mut self,
        category: &str,
        index: usize,
        field: CustomLineField,
        raw: &str,
    ) -> Result<(), DomainError> {
        self.state.update_custom_line(category, index, field, raw)
    }

    pub fn toggle_collapsed(&mut self, category: &str) -> Result<bool, DomainError> {
        self.state.toggle_collapsed(category)
    }

    pub fn summary(&self) -> CostSummary {
        self.cost_engine.summarize(&self.catalog, &self.state)
    }

    pub fn evaluate(&self) -> Evaluation {
        let summary = self.summary();
        let recommendations = self.recommendations.evaluate(&self.state, summary.total_cost);
        Evaluation { summary, recommendations }
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        snapshot::serialize(&self.state)
    }

    pub fn save(&self) -> Result<String, SnapshotError> {
        snapshot::to_json(&self.snapshot())
    }

    /// Replaces the session state with the one in `raw`.
    ///
    /// The loaded state is reconciled against the catalog before it is installed. On
    /// error the current state is left exactly as it was.
    pub fn load(&mut self, raw: &str) -> Result<ReconcileReport, SnapshotError> {
        let mut loaded = snapshot::deserialize(raw)?.state;
        let report = loaded.reconcile(&self.catalog);
        self.state = loaded;

        info!(
            added = report.added.len(),
            reset = report.reset.len(),
            repaired = report.repaired.len(),
            orphaned = report.orphaned.len(),
            "configuration loaded"
        );
        Ok(report)
    }
}
