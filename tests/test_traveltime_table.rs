use ccreloc::io::{MappedTravelTimeTable, TravelTimeSource};
use ccreloc::CcError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_table(values: &[f32]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    for v in values {
        file.write_all(&v.to_le_bytes()).expect("Failed to write table");
    }
    file.flush().expect("Failed to flush table");
    file
}

#[test]
fn test_mapped_table_lookup() {
    // shape [2 events, 2 channels, 3 stations]
    let values: Vec<f32> = (0..12).map(|v| v as f32 * 0.5).collect();
    let file = write_table(&values);

    let table = MappedTravelTimeTable::open(file.path(), [2, 2, 3]).expect("Failed to open table");
    assert_eq!(table.shape(), [2, 2, 3]);
    assert_eq!(table.travel_time(0, 0, 0).unwrap(), 0.0);
    assert_eq!(table.travel_time(0, 1, 2).unwrap(), 2.5);
    assert_eq!(table.travel_time(1, 0, 1).unwrap(), 3.5);
    assert_eq!(table.travel_time(1, 1, 2).unwrap(), 5.5);
}

#[test]
fn test_mapped_table_shape_mismatch() {
    let file = write_table(&[1.0; 10]);

    match MappedTravelTimeTable::open(file.path(), [2, 2, 3]) {
        Err(CcError::ShapeMismatch { shape, expected_bytes, actual_bytes }) => {
            assert_eq!(shape, [2, 2, 3]);
            assert_eq!(expected_bytes, 48);
            assert_eq!(actual_bytes, 40);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("mismatched shape was accepted"),
    }
}

#[test]
fn test_mapped_table_bounds() {
    let file = write_table(&[1.0; 12]);
    let table = MappedTravelTimeTable::open(file.path(), [2, 2, 3]).unwrap();

    let err = table.travel_time(2, 0, 0).unwrap_err();
    assert!(matches!(err, CcError::IndexOutOfRange { axis: "event", index: 2, bound: 2 }));
    assert!(table.travel_time(0, 2, 0).is_err());
    assert!(table.travel_time(0, 0, 3).is_err());

    // the diagnostic names the offending bound
    assert!(err.to_string().contains("event index 2 >= bound 2"));
}

#[test]
fn test_missing_table_file() {
    let result = MappedTravelTimeTable::open("nonexistent_travel_time.dat", [1, 1, 1]);
    assert!(matches!(result, Err(CcError::Io(_))));
}
