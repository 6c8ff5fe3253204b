//! Feature derivation: raw weather observations to the ordered model input.
//!
//! The classifier was fit against the column order in [`FEATURE_NAMES`].
//! Every vector handed to a classifier is built through this module so that
//! order cannot drift.

use crate::errors::{FireRiskError, FireRiskResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of features the classifier expects.
pub const FEATURE_COUNT: usize = 11;

/// Column order the classifier was trained on.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "temperature",
    "wind_speed",
    "humidity",
    "month",
    "day",
    "FFMC",
    "DMC",
    "DC",
    "ISI",
    "BUI",
    "FWI",
];

/// Fields a form submission must carry.
pub const RAW_FIELDS: [&str; 6] = ["temperature", "wind_speed", "humidity", "FFMC", "DMC", "DC"];

/// Placeholder month; calendar input is not collected.
pub const PLACEHOLDER_MONTH: f64 = 6.0;
/// Placeholder day of month; calendar input is not collected.
pub const PLACEHOLDER_DAY: f64 = 15.0;

const ISI_INDEX: usize = 8;
const FWI_INDEX: usize = 10;

/// User-supplied weather observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub temperature: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    #[serde(rename = "FFMC")]
    pub ffmc: f64,
    #[serde(rename = "DMC")]
    pub dmc: f64,
    #[serde(rename = "DC")]
    pub dc: f64,
}

impl RawObservation {
    /// Parse the six raw fields out of a submitted form.
    ///
    /// Fails on the first field that is missing, empty or not a finite number.
    pub fn from_fields(fields: &HashMap<String, String>) -> FireRiskResult<Self> {
        let get = |name: &str| -> FireRiskResult<f64> {
            let raw = fields
                .get(name)
                .ok_or_else(|| FireRiskError::validation(name, "field is required"))?;
            parse_finite(name, raw)
        };

        Ok(Self {
            temperature: get("temperature")?,
            wind_speed: get("wind_speed")?,
            humidity: get("humidity")?,
            ffmc: get("FFMC")?,
            dmc: get("DMC")?,
            dc: get("DC")?,
        })
    }

    /// Reject observations carrying NaN or infinite values.
    pub fn validate(&self) -> FireRiskResult<()> {
        let values = [
            ("temperature", self.temperature),
            ("wind_speed", self.wind_speed),
            ("humidity", self.humidity),
            ("FFMC", self.ffmc),
            ("DMC", self.dmc),
            ("DC", self.dc),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(FireRiskError::validation(name, "value must be a finite number"));
            }
        }
        Ok(())
    }
}

fn parse_finite(field: &str, raw: &str) -> FireRiskResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FireRiskError::validation(field, "field is required"));
    }
    let value: f64 = trimmed.parse().map_err(|_| {
        FireRiskError::validation(field, format!("could not convert '{trimmed}' to a number"))
    })?;
    if !value.is_finite() {
        return Err(FireRiskError::validation(field, "value must be a finite number"));
    }
    Ok(value)
}

/// Fire-behavior indices computed from a raw observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DerivedIndices {
    #[serde(rename = "ISI")]
    pub isi: f64,
    #[serde(rename = "BUI")]
    pub bui: f64,
    #[serde(rename = "FWI")]
    pub fwi: f64,
}

impl DerivedIndices {
    pub fn compute(raw: &RawObservation) -> Self {
        let isi = raw.ffmc * raw.wind_speed / 100.0;
        let bui = raw.dmc * 0.8 + raw.dc * 0.2;
        let fwi = isi * 0.3 + bui * 0.7;
        Self { isi, bui, fwi }
    }
}

/// Model input in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    /// Read all eleven features from a caller-supplied JSON object.
    ///
    /// No derivation happens here: ISI, BUI and FWI are taken as given.
    pub fn from_json_object(value: &serde_json::Value) -> FireRiskResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| FireRiskError::validation("body", "expected a JSON object"))?;

        let mut values = [0.0; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            let field = object
                .get(name)
                .ok_or_else(|| FireRiskError::validation(name, "field is required"))?;
            let number = field
                .as_f64()
                .ok_or_else(|| FireRiskError::validation(name, "expected a numeric value"))?;
            if !number.is_finite() {
                return Err(FireRiskError::validation(name, "value must be a finite number"));
            }
            *slot = number;
        }
        Ok(Self { values })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }

    pub fn isi(&self) -> f64 {
        self.values[ISI_INDEX]
    }

    pub fn fwi(&self) -> f64 {
        self.values[FWI_INDEX]
    }

    /// Feature name/value pairs in model order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Echo of the vector as name/value records, in model order.
    pub fn to_records(&self) -> Vec<FeatureValue> {
        self.named()
            .map(|(name, value)| FeatureValue {
                name: name.to_string(),
                value,
            })
            .collect()
    }
}

/// A single named feature value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureValue {
    pub name: String,
    pub value: f64,
}

/// Build the full model input from a raw observation.
pub fn derive(raw: &RawObservation) -> FeatureVector {
    let derived = DerivedIndices::compute(raw);
    FeatureVector::from_values([
        raw.temperature,
        raw.wind_speed,
        raw.humidity,
        PLACEHOLDER_MONTH,
        PLACEHOLDER_DAY,
        raw.ffmc,
        raw.dmc,
        raw.dc,
        derived.isi,
        derived.bui,
        derived.fwi,
    ])
}
