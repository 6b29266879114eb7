use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::SnapshotError;
use crate::state::CalculatorState;

pub const DEFAULT_FILE_PREFIX: &str = "grafana-pricing-config";

/// The saved configuration file: the only persisted artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Absent when a loaded file carried no usable timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub state: CalculatorState,
}

pub fn serialize(state: &CalculatorState) -> ConfigSnapshot {
    snapshot_at(state, Utc::now())
}

pub fn snapshot_at(state: &CalculatorState, timestamp: DateTime<Utc>) -> ConfigSnapshot {
    ConfigSnapshot { timestamp: Some(timestamp.trunc_subsecs(3)), state: state.clone() }
}

pub fn to_json(snapshot: &ConfigSnapshot) -> Result<String, SnapshotError> {
    serde_json::to_string_pretty(snapshot).map_err(|error| SnapshotError::Encode(error.to_string()))
}

pub fn deserialize(raw: &str) -> Result<ConfigSnapshot, SnapshotError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|error| SnapshotError::ParseError(error.to_string()))?;

    let Value::Object(mut fields) = document else {
        return Err(SnapshotError::InvalidFormat("expected a JSON object".to_string()));
    };

    let state = match fields.remove("state") {
        Some(Value::Null) | None => {
            return Err(SnapshotError::InvalidFormat("missing `state` field".to_string()));
        }
        Some(state) => serde_json::from_value::<CalculatorState>(state).map_err(|error| {
            SnapshotError::InvalidFormat(format!("`state` is not a calculator state: {error}"))
        })?,
    };

    let timestamp = match fields.remove("timestamp") {
        Some(Value::String(text)) => match DateTime::parse_from_rfc3339(&text) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(error) => {
                warn!(%error, timestamp = %text, "ignoring unparseable snapshot timestamp");
                None
            }
        },
        Some(other) => {
            warn!(timestamp = %other, "ignoring non-string snapshot timestamp");
            None
        }
        None => None,
    };

    Ok(ConfigSnapshot { timestamp, state })
}

/// `grafana-pricing-config-2026-10-18.json` style name for an export made on `date`.
pub fn default_file_name(prefix: &str, date: NaiveDate) -> String {
    let prefix = prefix.trim();
    let prefix = if prefix.is_empty() { DEFAULT_FILE_PREFIX } else { prefix };
    format!("{prefix}-{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::catalog::PricingCatalog;
    use crate::errors::SnapshotError;
    use crate::state::{CalculatorState, CustomLineField};

    use super::{default_file_name, deserialize, serialize, snapshot_at, to_json};

    fn populated_state() -> CalculatorState {
        let catalog = PricingCatalog::builtin().expect("catalog");
        let mut state = CalculatorState::from_catalog(&catalog);
        state.select_exclusive_option(&catalog, "Visualization", 1).expect("select");
        state.set_option_quantity(&catalog, "Visualization", 1, "42").expect("viz");
        state.set_option_quantity(&catalog, "Metrics", 0, "1,234.5").expect("metrics");
        state.set_option_quantity(&catalog, "k6", 0, "0.15").expect("k6");
        let line = state.add_custom_line("Logs").expect("line");
        state.update_custom_line("Logs", line, CustomLineField::Name, "prod").expect("name");
        state.update_custom_line("Logs", line, CustomLineField::Ingestion, "250").expect("ing");
        state.update_custom_line("Logs", line, CustomLineField::RetentionMonths, "3").expect("ret");
        state.toggle_collapsed("Logs").expect("toggle");
        state
    }

    #[test]
    fn round_trip_preserves_populated_state() {
        let state = populated_state();

        let raw = to_json(&serialize(&state)).expect("encode");
        let loaded = deserialize(&raw).expect("decode");

        assert_eq!(loaded.state, state);
        assert!(loaded.timestamp.is_some());
    }

    #[test]
    fn round_trip_preserves_high_precision_input() {
        let catalog = PricingCatalog::builtin().expect("catalog");
        let mut state = populated_state();
        state.set_option_quantity(&catalog, "Traces", 0, "1234567890.123456789").expect("traces");
        state.set_option_quantity(&catalog, "Profiles", 0, "99999999999999999999999").expect("big");
        state.update_custom_line("Logs", 0, CustomLineField::RetentionMonths, "1.1").expect("ret");

        let raw = to_json(&serialize(&state)).expect("encode");
        let loaded = deserialize(&raw).expect("decode");

        assert_eq!(loaded.state, state);
    }

    #[test]
    fn snapshot_uses_camel_case_fields_and_iso_timestamps() {
        let state = populated_state();
        let timestamp = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).single().expect("time");

        let raw = to_json(&snapshot_at(&state, timestamp)).expect("encode");
        let document: serde_json::Value = serde_json::from_str(&raw).expect("json");

        assert_eq!(document["timestamp"], "2026-10-18T09:30:00Z");
        assert_eq!(document["state"]["Logs"]["customLines"][0]["retentionMonths"], 3.0);
        assert_eq!(document["state"]["Logs"]["collapsed"], false);
        assert_eq!(document["state"]["Visualization"]["options"][1]["selected"], true);
    }

    #[test]
    fn missing_state_is_an_invalid_format() {
        assert!(matches!(
            deserialize(r#"{ "timestamp": "2026-10-18T00:00:00.000Z" }"#),
            Err(SnapshotError::InvalidFormat(_))
        ));
        assert!(matches!(
            deserialize(r#"{ "state": null }"#),
            Err(SnapshotError::InvalidFormat(_))
        ));
        assert!(matches!(deserialize("[1, 2, 3]"), Err(SnapshotError::InvalidFormat(_))));
        assert!(matches!(
            deserialize(r#"{ "state": { "Metrics": { "collapsed": true } } }"#),
            Err(SnapshotError::InvalidFormat(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(deserialize("{ not json"), Err(SnapshotError::ParseError(_))));
        assert!(matches!(deserialize(""), Err(SnapshotError::ParseError(_))));
    }

    #[test]
    fn loads_files_written_by_the_browser_calculator() {
        let raw = r#"{
            "timestamp": "2025-03-01T10:15:30.123Z",
            "state": {
                "Metrics": { "collapsed": true, "options": [
                    { "quantity": 1500, "selected": true },
                    { "quantity": 0, "selected": false }
                ] },
                "Logs": { "collapsed": true, "options": [] }
            }
        }"#;

        let snapshot = deserialize(raw).expect("legacy file loads");
        let metrics = snapshot.state.options("Metrics").expect("metrics options");
        assert_eq!(metrics[0].quantity, rust_decimal::Decimal::from(1_500));
        assert_eq!(snapshot.state.options("Logs").map(<[_]>::len), Some(0));
        assert!(snapshot.timestamp.is_some());
    }

    #[test]
    fn bad_timestamp_is_tolerated() {
        let snapshot = deserialize(r#"{ "timestamp": "yesterday", "state": {} }"#).expect("loads");
        assert!(snapshot.timestamp.is_none());
        assert_eq!(snapshot.state, CalculatorState::default());
    }

    #[test]
    fn default_file_name_embeds_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).expect("date");
        assert_eq!(default_file_name("pricing-config", date), "pricing-config-2026-10-18.json");
        assert_eq!(default_file_name("  ", date), "grafana-pricing-config-2026-10-18.json");
        assert_eq!(default_file_name("acme", date), "acme-2026-10-18.json");
    }
}
