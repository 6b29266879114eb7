//! Recommendation engine
//!
//! Rules are plain records: a read-only predicate over the calculator state and the
//! current total, plus the message and suggestions shown when it matches. The engine
//! evaluates every rule in declared order; it never short-circuits.

mod engine;
pub mod rules;
mod types;

pub use engine::{canonical_rule_ids, evaluate, RecommendationEngine};
pub use rules::CANONICAL_RULES;
pub use types::*;
