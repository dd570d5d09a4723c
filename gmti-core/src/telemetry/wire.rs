//! JSON bodies exchanged with the engine.

use std::fmt;

use gmti_model::{RunConfiguration, TelemetrySnapshot};
use rand::Rng;
use serde::Serialize;
use serde_json::Value;

use crate::error::TelemetryParseError;

/// Read a telemetry body leniently.
///
/// The body must be a JSON object. `power_profile` and `detection_count`
/// default to empty and zero when absent or of the wrong type, and
/// non-numeric profile entries read as `0.0`.
pub fn parse_snapshot(
    body: &[u8],
) -> Result<TelemetrySnapshot, TelemetryParseError> {
    let value: Value = serde_json::from_slice(body)?;
    let object = value.as_object().ok_or(TelemetryParseError::NotAnObject {
        found: json_kind(&value),
    })?;

    let profile = object
        .get("power_profile")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|v| v.as_f64().unwrap_or(0.0)).collect())
        .unwrap_or_default();
    let detection_count = object
        .get("detection_count")
        .and_then(read_count)
        .unwrap_or(0);

    Ok(TelemetrySnapshot::new(profile, detection_count))
}

fn read_count(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Body of `POST /ingest-config`. Built fresh for each submission and
/// dropped once sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionPayload {
    pub taps: u32,
    pub range_bins: u32,
    pub doppler_bins: u32,
    pub frequency: f64,
    pub noise: f64,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SubmissionPayload {
    /// Snapshot `config`, drawing a random non-zero seed when none is set.
    pub fn from_run(config: &RunConfiguration) -> Self {
        Self::with_seed_source(config, random_seed)
    }

    pub fn with_seed_source<F>(config: &RunConfiguration, mut seed: F) -> Self
    where
        F: FnMut() -> u64,
    {
        let seed = match config.seed() {
            0 => seed(),
            chosen => chosen,
        };
        Self {
            taps: config.taps(),
            range_bins: config.range_bins(),
            doppler_bins: config.doppler_bins(),
            frequency: config.frequency(),
            noise: config.noise(),
            seed,
            scenario: config.scenario().map(str::to_string),
            description: config.description().map(str::to_string),
        }
    }
}

/// Non-zero 64-bit seed.
pub fn random_seed() -> u64 {
    let mut rng = rand::rng();
    loop {
        let seed = rng.random::<u64>();
        if seed != 0 {
            return seed;
        }
    }
}

/// What the engine said about an accepted submission. Every field is
/// optional; an unparsable reply is an empty receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status: Option<String>,
    pub detections: Option<i64>,
    pub description: Option<String>,
}

impl SubmissionReceipt {
    pub fn parse(body: &[u8]) -> Self {
        let Ok(Value::Object(object)) = serde_json::from_slice::<Value>(body)
        else {
            return Self::default();
        };
        Self {
            status: object
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_string),
            detections: object.get("detections").and_then(read_count),
            description: object
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

impl fmt::Display for SubmissionReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.status.as_deref().unwrap_or("n/a"))?;
        match self.detections {
            Some(n) => write!(f, ", {n} detections"),
            None => f.write_str(", n/a detections"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_payload() {
        let snapshot = parse_snapshot(
            br#"{"power_profile":[1,2,4,2,1],"detection_count":3,"extra":true}"#,
        )
        .unwrap();
        assert_eq!(snapshot.profile, vec![1.0, 2.0, 4.0, 2.0, 1.0]);
        assert_eq!(snapshot.detection_count, 3);
    }

    #[test]
    fn wrong_types_fall_back_to_empty_and_zero() {
        let snapshot =
            parse_snapshot(br#"{"power_profile":"loud","detection_count":"3"}"#)
                .unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.detection_count, 0);

        let snapshot =
            parse_snapshot(br#"{"power_profile":[1,"x",null,2.5]}"#).unwrap();
        assert_eq!(snapshot.profile, vec![1.0, 0.0, 0.0, 2.5]);
    }

    #[test]
    fn non_object_bodies_are_malformed() {
        assert!(matches!(
            parse_snapshot(b"[1,2,3]"),
            Err(TelemetryParseError::NotAnObject { found: "an array" })
        ));
        assert!(matches!(
            parse_snapshot(b"<html>"),
            Err(TelemetryParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn zero_seed_is_replaced_and_optionals_omitted() {
        let config = RunConfiguration::default();
        let payload = SubmissionPayload::with_seed_source(&config, || 77);
        assert_eq!(payload.seed, 77);

        let json = serde_json::to_value(&payload).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object["taps"], 4);
        assert_eq!(object["range_bins"], 2048);
        assert_eq!(object["seed"], 77);
        assert!(!object.contains_key("scenario"));
        assert!(!object.contains_key("description"));
    }

    #[test]
    fn chosen_seed_is_kept() {
        let mut config = RunConfiguration::default();
        config.set_seed(u64::MAX);
        let payload = SubmissionPayload::with_seed_source(&config, || {
            panic!("seed source must not be consulted")
        });
        assert_eq!(payload.seed, u64::MAX);
    }

    #[test]
    fn random_seed_is_never_zero() {
        assert!((0..64).all(|_| random_seed() != 0));
    }

    #[test]
    fn receipt_parsing_is_lenient() {
        let receipt = SubmissionReceipt::parse(
            br#"{"status":"ok","detections":12,"description":"urban"}"#,
        );
        assert_eq!(receipt.status.as_deref(), Some("ok"));
        assert_eq!(receipt.detections, Some(12));
        assert_eq!(receipt.to_string(), "status ok, 12 detections");

        assert_eq!(SubmissionReceipt::parse(b""), SubmissionReceipt::default());
    }
}
