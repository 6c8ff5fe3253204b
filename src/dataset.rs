//! Training data: the forest-fires CSV reshaped into model-ordered rows.
//!
//! Expected source columns (headers are trimmed): `day, month, Temperature,
//! RH, Ws, FFMC, DMC, DC, ISI, BUI, FWI, Classes`. Lowercase feature names
//! are accepted as well. Rows that fail to parse are skipped with a warning,
//! which also drops the region banner and repeated header found in the
//! public dataset.

use crate::errors::{FireRiskError, FireRiskResult};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

pub type FeatureRow = [f64; FEATURE_COUNT];

const TARGET_COLUMN: &str = "Classes";
const NO_FIRE: &str = "not fire";
const MONTH: usize = 3;
const DAY: usize = 4;

/// Source column aliases for each model feature, in model order.
const SOURCE_COLUMNS: [&[&str]; FEATURE_COUNT] = [
    &["Temperature", "temperature"],
    &["Ws", "wind_speed"],
    &["RH", "humidity"],
    &["month"],
    &["day"],
    &["FFMC"],
    &["DMC"],
    &["DC"],
    &["ISI"],
    &["BUI"],
    &["FWI"],
];

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub rows: Vec<FeatureRow>,
    /// 1 for fire, 0 for no fire.
    pub labels: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    pub fn positive_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().filter(|&&l| l == 1).count() as f64 / self.labels.len() as f64
    }
}

pub fn load_csv<P: AsRef<Path>>(path: P) -> FireRiskResult<Dataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| FireRiskError::io(format!("opening {}", path.display()), e))?;
    let dataset = from_reader(file)?;
    info!(
        "Loaded {} rows from {} ({:.1}% fire)",
        dataset.len(),
        path.display(),
        dataset.positive_rate() * 100.0
    );
    Ok(dataset)
}

struct ParsedRow {
    values: FeatureRow,
    month: String,
    day: String,
    label: u8,
}

pub fn from_reader<R: Read>(reader: R) -> FireRiskResult<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();

    let mut columns = [0usize; FEATURE_COUNT];
    for (slot, (aliases, name)) in columns
        .iter_mut()
        .zip(SOURCE_COLUMNS.into_iter().zip(FEATURE_NAMES))
    {
        *slot = find_column(&headers, aliases)
            .ok_or_else(|| FireRiskError::dataset(format!("missing column for feature '{name}'")))?;
    }
    let target = find_column(&headers, &[TARGET_COLUMN])
        .ok_or_else(|| FireRiskError::dataset(format!("missing target column '{TARGET_COLUMN}'")))?;

    let mut parsed = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping unreadable row {}: {e}", line + 2);
                continue;
            }
        };
        match parse_row(&record, &columns, target) {
            Ok(row) => parsed.push(row),
            Err(msg) => warn!("skipping row {}: {msg}", line + 2),
        }
    }

    if parsed.is_empty() {
        return Err(FireRiskError::dataset("no usable rows"));
    }

    let months = label_encode(parsed.iter().map(|r| r.month.as_str()));
    let days = label_encode(parsed.iter().map(|r| r.day.as_str()));

    let mut dataset = Dataset::default();
    for (row, (month, day)) in parsed.into_iter().zip(months.into_iter().zip(days)) {
        let mut values = row.values;
        values[MONTH] = month;
        values[DAY] = day;
        dataset.rows.push(values);
        dataset.labels.push(row.label);
    }
    Ok(dataset)
}

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| aliases.contains(&h))
}

fn parse_row(record: &csv::StringRecord, columns: &[usize; FEATURE_COUNT], target: usize) -> Result<ParsedRow, String> {
    let cell = |idx: usize| record.get(idx).filter(|s| !s.is_empty());

    let mut values = [0.0; FEATURE_COUNT];
    for (i, (&col, name)) in columns.iter().zip(FEATURE_NAMES).enumerate() {
        if i == MONTH || i == DAY {
            continue;
        }
        let raw = cell(col).ok_or_else(|| format!("empty '{name}'"))?;
        let value: f64 = raw.parse().map_err(|_| format!("'{name}' is not numeric: '{raw}'"))?;
        if !value.is_finite() {
            return Err(format!("'{name}' is not finite"));
        }
        values[i] = value;
    }

    let month = cell(columns[MONTH]).ok_or("empty 'month'")?.to_string();
    let day = cell(columns[DAY]).ok_or("empty 'day'")?.to_string();
    let class = cell(target).ok_or("empty 'Classes'")?;
    let label = u8::from(!class.eq_ignore_ascii_case(NO_FIRE));

    Ok(ParsedRow { values, month, day, label })
}

/// Numeric labels sort numerically, anything else lexically.
fn compare_labels(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

/// Replace each label with its index among the sorted distinct labels.
pub fn label_encode<'a, I>(values: I) -> Vec<f64>
where
    I: Iterator<Item = &'a str> + Clone,
{
    let mut unique: Vec<&str> = values.clone().collect();
    unique.sort_by(|a, b| compare_labels(a, b));
    unique.dedup();
    let index: HashMap<&str, usize> = unique.iter().enumerate().map(|(i, v)| (*v, i)).collect();
    values.map(|v| index.get(v).copied().unwrap_or_default() as f64).collect()
}

/// Shuffle row indices with a fixed seed and hold out `test_fraction` of them.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let n_test = ((n as f64) * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let train = indices.split_off(n_test.min(n));
    (train, indices)
}
