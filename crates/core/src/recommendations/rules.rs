//! Canonical rule set for the built-in catalog.

use rust_decimal::Decimal;

use super::types::{RecommendationRule, Severity};
use crate::state::{CalculatorState, CategoryEntries, CustomLine};

pub const VISUALIZATION: &str = "Visualization";
pub const IRM: &str = "IRM";
pub const ASSISTANT: &str = "Grafana Assistant";
pub const METRICS: &str = "Metrics";
pub const LOGS: &str = "Logs";
pub const KUBERNETES_HOST: &str = "Kubernetes Monitoring - Host";
pub const KUBERNETES_CONTAINER: &str = "Kubernetes Monitoring - Container";

const HIGH_RESOLUTION_OPTION: usize = 1;
const HIGH_RESOLUTION_MIN_SERIES: u32 = 200_000;
const MAX_RETENTION_MONTHS: u32 = 12;

pub const CANONICAL_RULES: &[RecommendationRule] = &[
    RecommendationRule {
        id: "metrics-resolution-mismatch",
        severity: Severity::Info,
        predicate: metrics_resolution_mismatch,
        message: |_| "High-resolution metrics selected with relatively low volume".to_owned(),
        suggestions: &[
            "Low-resolution is recommended for most use cases",
            "High-resolution metrics are more expensive",
        ],
    },
    RecommendationRule {
        id: "too-many-irm",
        severity: Severity::Error,
        predicate: too_many_irm_users,
        message: |_| "More IRM users than Visualization users".to_owned(),
        suggestions: &[
            "Although it is possible, it is unlikely to happen",
            "Verify your IRM and Visualization users assumptions",
        ],
    },
    RecommendationRule {
        id: "too-many-assistant",
        severity: Severity::Error,
        predicate: too_many_assistant_users,
        message: |_| "More Grafana Assistant users than Visualization users".to_owned(),
        suggestions: &[
            "Although it is possible, it is unlikely to happen",
            "Verify your Grafana Assistant and Visualization users assumptions",
        ],
    },
    RecommendationRule {
        id: "kubernetes-without-logs",
        severity: Severity::Info,
        predicate: kubernetes_without_logs,
        message: |_| "Kubernetes monitoring configured without logs".to_owned(),
        suggestions: &[
            "Kubernetes monitoring typically requires logs to provide better results",
            "Consider adding Logs service for complete observability",
        ],
    },
    RecommendationRule {
        id: "logs-no-retention",
        severity: Severity::Error,
        predicate: logs_without_retention,
        message: |_| "Logs ingestion configured without any retention".to_owned(),
        suggestions: &[
            "Ingested logs are only queryable while they are retained",
            "Set a retention period for every environment that ingests logs",
        ],
    },
    RecommendationRule {
        id: "logs-long-retention",
        severity: Severity::Info,
        predicate: logs_long_retention,
        message: |_| "Logs retention configured above 12 months".to_owned(),
        suggestions: &[
            "Retention is billed every month for the whole retained volume",
            "Consider exporting older logs to cheaper long-term storage",
        ],
    },
];

fn metrics_resolution_mismatch(state: &CalculatorState, _total_cost: Decimal) -> bool {
    let Some(options) = state.options(METRICS) else {
        return false;
    };

    let high_resolution = options.get(HIGH_RESOLUTION_OPTION).is_some_and(|option| option.selected);
    let quantity = state.selected_option(METRICS).map_or(Decimal::ZERO, |option| option.quantity);
    high_resolution && quantity < Decimal::from(HIGH_RESOLUTION_MIN_SERIES)
}

fn too_many_irm_users(state: &CalculatorState, _total_cost: Decimal) -> bool {
    exceeds_visualization_users(state, IRM)
}

fn too_many_assistant_users(state: &CalculatorState, _total_cost: Decimal) -> bool {
    exceeds_visualization_users(state, ASSISTANT)
}

fn kubernetes_without_logs(state: &CalculatorState, _total_cost: Decimal) -> bool {
    let Some(logs) = state.category(LOGS) else {
        return false;
    };

    let monitored = [KUBERNETES_HOST, KUBERNETES_CONTAINER]
        .into_iter()
        .filter_map(|category| first_quantity(state, category))
        .any(|quantity| quantity > Decimal::ZERO);

    let with_logs = match &logs.entries {
        CategoryEntries::CustomLines { custom_lines } => {
            custom_lines.iter().any(|line| line.ingestion > Decimal::ZERO)
        }
        CategoryEntries::Options { options } => {
            options.iter().any(|option| option.quantity > Decimal::ZERO)
        }
    };

    monitored && !with_logs
}

fn logs_without_retention(state: &CalculatorState, _total_cost: Decimal) -> bool {
    ingesting_log_lines(state).any(|line| line.retention_months.is_zero())
}

fn logs_long_retention(state: &CalculatorState, _total_cost: Decimal) -> bool {
    ingesting_log_lines(state)
        .any(|line| line.retention_months > Decimal::from(MAX_RETENTION_MONTHS))
}

fn exceeds_visualization_users(state: &CalculatorState, category: &str) -> bool {
    let users = first_quantity(state, category);
    let viewers = state.selected_option(VISUALIZATION).map(|option| option.quantity);
    matches!((users, viewers), (Some(users), Some(viewers)) if users > viewers)
}

fn first_quantity(state: &CalculatorState, category: &str) -> Option<Decimal> {
    state.options(category)?.first().map(|option| option.quantity)
}

fn ingesting_log_lines(state: &CalculatorState) -> impl Iterator<Item = &CustomLine> {
    state
        .custom_lines(LOGS)
        .unwrap_or_default()
        .iter()
        .filter(|line| line.ingestion > Decimal::ZERO)
}
