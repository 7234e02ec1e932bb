use ndarray::{Array3, Array4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense event identifier, also the first axis of the travel-time table
pub type EventId = u32;

/// Correlation coefficients per [channel, station, pick]
pub type ScoreCube = Array3<f32>;

/// Integer lags (coarse samples) per [channel, station, pick]
pub type LagCube = Array3<i32>;

/// Neighbor-score profiles per [channel, station, pick, profile]
pub type ProfileCube = Array4<f32>;

/// Ordered pair of events sharing correlation measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventPair {
    pub id_a: EventId,
    pub id_b: EventId,
}

impl EventPair {
    pub fn new(id_a: EventId, id_b: EventId) -> Self {
        Self { id_a, id_b }
    }

    /// Only pairs with id_a < id_b are retained; the symmetric half is skipped
    pub fn is_canonical(&self) -> bool {
        self.id_a < self.id_b
    }
}

impl fmt::Display for EventPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.id_a, self.id_b)
    }
}

/// Seismic phase carried by a channel block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    P,
    S,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::P => write!(f, "P"),
            Phase::S => write!(f, "S"),
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = CcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "P" => Ok(Phase::P),
            "S" => Ok(Phase::S),
            other => Err(CcError::Config(format!("Unknown phase label: {:?}", other))),
        }
    }
}

/// The four parallel arrays measured for one event pair
#[derive(Debug, Clone)]
pub struct CorrelationMeasurement {
    pub cc_score: ScoreCube,
    pub cc_index: LagCube,
    pub cc_weight: ScoreCube,
    pub neighbor_score: ProfileCube,
}

impl CorrelationMeasurement {
    /// Build a measurement, checking that all four arrays agree on
    /// [channel, station, pick]
    pub fn new(
        pair: EventPair,
        cc_score: ScoreCube,
        cc_index: LagCube,
        cc_weight: ScoreCube,
        neighbor_score: ProfileCube,
    ) -> CcResult<Self> {
        let shape = cc_score.dim();
        if cc_index.dim() != shape {
            return Err(CcError::CorruptGroup {
                pair,
                reason: format!("cc_index shape {:?} != cc_score shape {:?}", cc_index.dim(), shape),
            });
        }
        if cc_weight.dim() != shape {
            return Err(CcError::CorruptGroup {
                pair,
                reason: format!("cc_weight shape {:?} != cc_score shape {:?}", cc_weight.dim(), shape),
            });
        }
        let (nch, nsta, npick, nprof) = neighbor_score.dim();
        if (nch, nsta, npick) != shape {
            return Err(CcError::CorruptGroup {
                pair,
                reason: format!(
                    "neighbor_score prefix shape {:?} != cc_score shape {:?}",
                    (nch, nsta, npick),
                    shape
                ),
            });
        }
        if nprof == 0 {
            return Err(CcError::CorruptGroup {
                pair,
                reason: "neighbor_score profile is empty".to_string(),
            });
        }

        Ok(Self { cc_score, cc_index, cc_weight, neighbor_score })
    }

    /// (channels, stations, picks)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.cc_score.dim()
    }

    pub fn profile_len(&self) -> usize {
        self.neighbor_score.dim().3
    }
}

/// All measurements stored under one (id1, id2) group
#[derive(Debug, Clone)]
pub struct PairGroup {
    pub pair: EventPair,
    pub measurement: CorrelationMeasurement,
}

/// One accepted differential-time observation
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialPick {
    pub station: String,
    /// Emitted differential time (seconds)
    pub time: f64,
    /// Emitted quality
    pub quality: f64,
    pub phase: Phase,
    /// Model-only differential travel time
    pub model_time: f64,
    /// Refined correlation lag: cc_index * dt + sub-sample offset
    pub refined_lag: f64,
    pub cc_score: f64,
    pub cc_weight: f64,
}

/// Station table row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub code: String,
    pub network: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl StationRecord {
    /// Station code as written to stlist/xcordata, left-justified to 4 chars
    pub fn label(&self, with_network: bool) -> String {
        match (&self.network, with_network) {
            (Some(network), true) => format!("{}{:<4}", network, self.code),
            _ => format!("{:<4}", self.code),
        }
    }
}

/// Catalog event, origin time already decomposed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEvent {
    pub event_id: i64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: f64,
    pub latitude: f64,
    pub longitude: f64,
    /// meters
    pub depth_m: f64,
    pub magnitude: f64,
}

/// Error types for differential-time conversion
#[derive(Debug, thiserror::Error)]
pub enum CcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(
        "Travel-time shape mismatch: shape {shape:?} needs {expected_bytes} bytes, file has {actual_bytes}"
    )]
    ShapeMismatch {
        shape: [usize; 3],
        expected_bytes: u64,
        actual_bytes: u64,
    },

    #[error("Index out of range: {axis} index {index} >= bound {bound}")]
    IndexOutOfRange {
        axis: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("Corrupt correlation group {pair}: {reason}")]
    CorruptGroup { pair: EventPair, reason: String },

    /// A group whose keys or nesting do not name an event pair
    #[error("Malformed correlation group {key}: {reason}")]
    MalformedGroup { key: String, reason: String },

    #[error("Malformed row {row} in {source_name}: {reason}")]
    MalformedRow {
        source_name: String,
        row: usize,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CcError {
    /// Errors that only invalidate a single pair and leave the run intact
    pub fn is_pair_local(&self) -> bool {
        matches!(
            self,
            CcError::CorruptGroup { .. }
                | CcError::MalformedGroup { .. }
                | CcError::IndexOutOfRange { .. }
        )
    }
}

/// Result type for conversion operations
pub type CcResult<T> = Result<T, CcError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, Array4};

    #[test]
    fn test_measurement_shape_check() {
        let pair = EventPair::new(1, 2);
        let ok = CorrelationMeasurement::new(
            pair,
            Array3::zeros((3, 2, 1)),
            Array3::zeros((3, 2, 1)),
            Array3::zeros((3, 2, 1)),
            Array4::zeros((3, 2, 1, 3)),
        );
        assert!(ok.is_ok());

        let bad = CorrelationMeasurement::new(
            pair,
            Array3::zeros((3, 2, 1)),
            Array3::zeros((3, 3, 1)),
            Array3::zeros((3, 2, 1)),
            Array4::zeros((3, 2, 1, 3)),
        );
        assert!(matches!(bad, Err(CcError::CorruptGroup { .. })));
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!("p".parse::<Phase>().unwrap(), Phase::P);
        assert_eq!("S".parse::<Phase>().unwrap(), Phase::S);
        assert!("Pn".parse::<Phase>().is_err());
    }
}
