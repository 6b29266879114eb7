pub mod catalog;
pub mod config;
pub mod errors;
pub mod format;
pub mod pricing;
pub mod recommendations;
pub mod session;
pub mod snapshot;
pub mod state;

pub use catalog::{BillingMode, CatalogError, PricingCatalog, PricingCategory, PricingOption};
pub use errors::{ApplicationError, DomainError, SnapshotError};
pub use format::{format_currency, format_number, parse_formatted_number, parse_quantity};
pub use pricing::{
    CategoryBreakdown, CostEngine, CostSummary, DeterministicCostEngine, LineItem,
};
pub use recommendations::{
    Recommendation, RecommendationEngine, RecommendationRule, Severity, CANONICAL_RULES,
};
pub use session::{Calculator, Evaluation};
pub use snapshot::ConfigSnapshot;
pub use state::{
    CalculatorState, CategoryEntries, CategoryState, CustomLine, CustomLineField, OptionState,
    ReconcileReport,
};
