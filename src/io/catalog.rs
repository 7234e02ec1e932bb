use crate::types::{CatalogEvent, CcError, CcResult};
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    time: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(rename = "depth(m)")]
    depth_m: Option<f64>,
    magnitude: Option<f64>,
    event_index: Option<i64>,
}

/// Parse an ISO-8601 origin time, with or without an offset
pub fn parse_origin_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

fn decompose(time: NaiveDateTime) -> (i32, u32, u32, u32, u32, f64) {
    let second = time.second() as f64 + time.nanosecond() as f64 / 1e9;
    (time.year(), time.month(), time.day(), time.hour(), time.minute(), second)
}

/// Event catalog read from CSV
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<CatalogEvent>,
    skipped_rows: usize,
}

impl EventCatalog {
    pub fn new(events: Vec<CatalogEvent>) -> Self {
        Self { events, skipped_rows: 0 }
    }

    pub fn from_csv<P: AsRef<Path>>(path: P) -> CcResult<Self> {
        log::info!("Reading event catalog: {}", path.as_ref().display());
        let file = std::fs::File::open(path.as_ref())?;
        let name = path.as_ref().display().to_string();
        Self::from_reader(file, &name)
    }

    /// Read catalog rows; malformed rows are logged and skipped
    pub fn from_reader<R: Read>(reader: R, source_name: &str) -> CcResult<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut events = Vec::new();
        let mut skipped_rows = 0;

        for (row, result) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(Self::convert_row)
                .map_err(|reason| CcError::MalformedRow {
                    source_name: source_name.to_string(),
                    row,
                    reason,
                });

            match parsed {
                Ok(event) => events.push(event),
                Err(e) => {
                    log::warn!("Skipping catalog row: {}", e);
                    skipped_rows += 1;
                }
            }
        }

        log::debug!("Loaded {} events ({} rows skipped)", events.len(), skipped_rows);
        Ok(Self { events, skipped_rows })
    }

    fn convert_row(raw: CatalogRow) -> Result<CatalogEvent, String> {
        let time_text = raw.time.ok_or("missing time")?;
        let time = parse_origin_time(&time_text)
            .ok_or_else(|| format!("unparseable time {:?}", time_text))?;
        let (year, month, day, hour, minute, second) = decompose(time);

        Ok(CatalogEvent {
            event_id: raw.event_index.ok_or("missing event_index")?,
            year,
            month,
            day,
            hour,
            minute,
            second,
            latitude: raw.latitude.ok_or("missing latitude")?,
            longitude: raw.longitude.ok_or("missing longitude")?,
            depth_m: raw.depth_m.ok_or("missing depth(m)")?,
            magnitude: raw.magnitude.ok_or("missing magnitude")?,
        })
    }

    pub fn events(&self) -> &[CatalogEvent] {
        &self.events
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_parse_origin_time_variants() {
        let a = parse_origin_time("2023-01-01T00:00:00.500000").unwrap();
        let b = parse_origin_time("2023-01-01T00:00:00.500+00:00").unwrap();
        let c = parse_origin_time("2023-01-01T00:00:00.5Z").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(parse_origin_time("yesterday").is_none());
    }

    #[test]
    fn test_read_catalog_and_skip_bad_rows() {
        let csv = "time,latitude,longitude,depth(m),magnitude,event_index\n\
                   2023-01-01T00:00:00.500000,35.5,-117.6,5000,2.1,7\n\
                   not-a-time,35.5,-117.6,5000,2.1,8\n\
                   2023-01-02T12:30:59.250,35.6,-117.7,,1.0,9\n";
        let catalog = EventCatalog::from_reader(csv.as_bytes(), "memory").unwrap();
        assert_eq!(catalog.events().len(), 1);
        assert_eq!(catalog.skipped_rows(), 2);

        let event = &catalog.events()[0];
        assert_eq!(event.event_id, 7);
        assert_eq!((event.year, event.month, event.day), (2023, 1, 1));
        assert_abs_diff_eq!(event.second, 0.5, epsilon = 1e-9);
    }
}
