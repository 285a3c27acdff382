use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::features::{FeatureVector, FEATURE_NAMES};

#[derive(Debug)]
pub enum DatasetError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidLabel { line: u64, value: u8 },
    NonFinite { line: u64, feature: &'static str },
    Empty,
}

impl std::fmt::Display for DatasetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatasetError::Io(err) => write!(f, "failed to read training data: {}", err),
            DatasetError::Csv(err) => write!(f, "invalid training CSV: {}", err),
            DatasetError::InvalidLabel { line, value } => {
                write!(f, "line {}: label must be 0 or 1, found {}", line, value)
            }
            DatasetError::NonFinite { line, feature } => {
                write!(f, "line {}: feature '{}' is not finite", line, feature)
            }
            DatasetError::Empty => write!(f, "training data contains no rows"),
        }
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Io(err) => Some(err),
            DatasetError::Csv(err) => Some(err),
            DatasetError::InvalidLabel { .. } | DatasetError::NonFinite { .. } | DatasetError::Empty => {
                None
            }
        }
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Labeled rows read from the fixed training resource.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    pub rows: Vec<FeatureVector>,
    pub labels: Vec<bool>,
    /// FNV-1a hash of the raw file, recorded in the artifact bundle.
    pub fingerprint: u64,
}

impl TrainingSet {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, DatasetError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        let fingerprint = fnv1a(&raw);

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(raw.as_slice());

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for record in csv_reader.deserialize::<TrainingRow>() {
            let row = record?;
            let line = rows.len() as u64 + 2;
            let (features, label) = row.into_parts(line)?;
            rows.push(features);
            labels.push(label);
        }

        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            rows,
            labels,
            fingerprint,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|label| **label).count()
    }
}

#[derive(Debug, Deserialize)]
struct TrainingRow {
    flood_exposure: f64,
    flood_boundary_distance: f64,
    easement_encroachment_pct: f64,
    lot_coverage_ratio: f64,
    property_age: f64,
    num_transfers_5yr: f64,
    avg_holding_period_years: f64,
    ownership_anomaly_score: f64,
    cv_vs_recorded_area_delta: f64,
    label: u8,
}

impl TrainingRow {
    fn into_parts(self, line: u64) -> Result<(FeatureVector, bool), DatasetError> {
        let features = FeatureVector([
            self.flood_exposure,
            self.flood_boundary_distance,
            self.easement_encroachment_pct,
            self.lot_coverage_ratio,
            self.property_age,
            self.num_transfers_5yr,
            self.avg_holding_period_years,
            self.ownership_anomaly_score,
            self.cv_vs_recorded_area_delta,
        ]);
        if let Some(index) = features.0.iter().position(|value| !value.is_finite()) {
            return Err(DatasetError::NonFinite {
                line,
                feature: FEATURE_NAMES[index],
            });
        }

        let label = match self.label {
            0 => false,
            1 => true,
            value => return Err(DatasetError::InvalidLabel { line, value }),
        };

        Ok((features, label))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
