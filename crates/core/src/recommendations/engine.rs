//! Recommendation engine implementation

use rust_decimal::Decimal;
use tracing::debug;

use super::rules::CANONICAL_RULES;
use super::types::{Recommendation, RecommendationRule};
use crate::state::CalculatorState;

/// Evaluates every rule in declared order and materializes the ones that match.
pub fn evaluate(
    rules: &[RecommendationRule],
    state: &CalculatorState,
    total_cost: Decimal,
) -> Vec<Recommendation> {
    rules
        .iter()
        .filter(|rule| rule.matches(state, total_cost))
        .inspect(|rule| {
            debug!(rule_id = rule.id, severity = ?rule.severity, "recommendation rule matched")
        })
        .map(|rule| rule.materialize(total_cost))
        .collect()
}

/// Ordered rule registry.
#[derive(Clone, Debug)]
pub struct RecommendationEngine {
    rules: Vec<RecommendationRule>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::canonical()
    }
}

impl RecommendationEngine {
    pub fn new(rules: Vec<RecommendationRule>) -> Self {
        Self { rules }
    }

    pub fn canonical() -> Self {
        Self::new(CANONICAL_RULES.to_vec())
    }

    /// Drops the rules whose id appears in `disabled`.
    pub fn without<S: AsRef<str>>(mut self, disabled: &[S]) -> Self {
        self.rules.retain(|rule| !disabled.iter().any(|id| id.as_ref() == rule.id));
        self
    }

    pub fn rules(&self) -> &[RecommendationRule] {
        &self.rules
    }

    pub fn evaluate(&self, state: &CalculatorState, total_cost: Decimal) -> Vec<Recommendation> {
        evaluate(&self.rules, state, total_cost)
    }
}

/// Ids of the rules shipped with the crate, in display order.
pub fn canonical_rule_ids() -> impl Iterator<Item = &'static str> {
    CANONICAL_RULES.iter().map(|rule| rule.id)
}
