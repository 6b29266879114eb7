//! Types for the recommendation engine

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::CalculatorState;

/// Read-only check over the state and the current total.
pub type RulePredicate = fn(&CalculatorState, Decimal) -> bool;

/// Builds the rule message from the current total.
pub type RuleMessage = fn(Decimal) -> String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Info => "ℹ️",
            Severity::Error => "⛔",
        }
    }
}

/// A declarative rule: a predicate plus the payload shown when it matches.
#[derive(Clone, Copy)]
pub struct RecommendationRule {
    pub id: &'static str,
    pub severity: Severity,
    pub predicate: RulePredicate,
    pub message: RuleMessage,
    pub suggestions: &'static [&'static str],
}

impl RecommendationRule {
    pub fn matches(&self, state: &CalculatorState, total_cost: Decimal) -> bool {
        (self.predicate)(state, total_cost)
    }

    pub fn materialize(&self, total_cost: Decimal) -> Recommendation {
        Recommendation {
            id: self.id.to_owned(),
            severity: self.severity,
            icon: self.severity.icon().to_owned(),
            message: (self.message)(total_cost),
            suggestions: self.suggestions.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

impl std::fmt::Debug for RecommendationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationRule")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("suggestions", &self.suggestions)
            .finish_non_exhaustive()
    }
}

/// A matched rule, ready for display
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    #[serde(rename = "type")]
    pub severity: Severity,
    pub icon: String,
    pub message: String,
    pub suggestions: Vec<String>,
}
