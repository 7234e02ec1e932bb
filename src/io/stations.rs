use crate::types::{CcError, CcResult, StationRecord};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct StationRow {
    station: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    network: Option<String>,
}

/// Station table read from CSV, in row order
///
/// Row position is the station index shared with the travel-time table
/// and the correlation arrays.
#[derive(Debug, Clone, Default)]
pub struct StationTable {
    stations: Vec<StationRecord>,
}

impl StationTable {
    pub fn new(stations: Vec<StationRecord>) -> Self {
        Self { stations }
    }

    /// Read `station,latitude,longitude[,network]` rows
    ///
    /// A malformed row aborts the read: dropping it would shift every
    /// following station index.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> CcResult<Self> {
        log::info!("Reading station table: {}", path.as_ref().display());
        let file = std::fs::File::open(path.as_ref())?;
        let name = path.as_ref().display().to_string();
        Self::from_reader(file, &name)
    }

    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> CcResult<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut stations = Vec::new();

        for (row, result) in csv_reader.deserialize::<StationRow>().enumerate() {
            let malformed = |reason: String| CcError::MalformedRow {
                source_name: source_name.to_string(),
                row,
                reason,
            };
            let raw = result.map_err(|e| malformed(e.to_string()))?;

            let code = raw
                .station
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| malformed("missing station".to_string()))?;
            let latitude = raw.latitude.ok_or_else(|| malformed("missing latitude".to_string()))?;
            let longitude = raw.longitude.ok_or_else(|| malformed("missing longitude".to_string()))?;

            stations.push(StationRecord {
                code: code.trim().to_string(),
                network: raw.network.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                latitude,
                longitude,
            });
        }

        log::debug!("Loaded {} stations", stations.len());
        Ok(Self { stations })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, index: usize) -> CcResult<&StationRecord> {
        self.stations.get(index).ok_or(CcError::IndexOutOfRange {
            axis: "station",
            index,
            bound: self.stations.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationRecord> {
        self.stations.iter()
    }
}
