use crate::io::stations::StationTable;
use crate::types::{CatalogEvent, CcResult, StationRecord};
use std::io::Write;

/// `yr mon day hr min sec lat lon dep mag eh ez rms evid` line of evlist.txt
pub fn event_line(event: &CatalogEvent) -> String {
    format!(
        "{:04} {:02} {:02} {:02} {:02} {:06.3} {:.4} {:.4} {:7.3} {:.2} 0.000 0.000 0.000 {:6}",
        event.year,
        event.month,
        event.day,
        event.hour,
        event.minute,
        event.second,
        event.latitude,
        event.longitude,
        event.depth_m / 1e3,
        event.magnitude,
        event.event_id
    )
}

/// `code lat lon` line of stlist.txt
pub fn station_line(station: &StationRecord, with_network: bool) -> String {
    format!(
        "{} {:.4} {:.4}",
        station.label(with_network),
        station.latitude,
        station.longitude
    )
}

/// Write one evlist line per event, in catalog order
pub fn write_event_list<W: Write>(writer: &mut W, events: &[CatalogEvent]) -> CcResult<()> {
    log::debug!("Writing {} event lines", events.len());
    for event in events {
        writeln!(writer, "{}", event_line(event))?;
    }
    Ok(())
}

/// Write one stlist line per station, in table order
pub fn write_station_list<W: Write>(
    writer: &mut W,
    stations: &StationTable,
    with_network: bool,
) -> CcResult<()> {
    log::debug!("Writing {} station lines", stations.len());
    for station in stations.iter() {
        writeln!(writer, "{}", station_line(station, with_network))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_line() {
        let event = CatalogEvent {
            event_id: 7,
            year: 2023,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0.5,
            latitude: 35.71234,
            longitude: -117.50001,
            depth_m: 5000.0,
            magnitude: 2.1,
        };
        assert_eq!(
            event_line(&event),
            "2023 01 01 00 00 00.500 35.7123 -117.5000   5.000 2.10 0.000 0.000 0.000      7"
        );
    }

    #[test]
    fn test_station_line_padding() {
        let station = StationRecord {
            code: "KCT".to_string(),
            network: Some("NC".to_string()),
            latitude: 40.5,
            longitude: -124.25,
        };
        assert_eq!(station_line(&station, false), "KCT  40.5000 -124.2500");
        assert_eq!(station_line(&station, true), "NCKCT  40.5000 -124.2500");
    }
}
