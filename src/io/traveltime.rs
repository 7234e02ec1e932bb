use crate::types::{CcError, CcResult, EventId};
use memmap2::Mmap;
use ndarray::Array3;
use std::fs::File;
use std::path::Path;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Read-only, bounds-checked access to precomputed travel times
pub trait TravelTimeSource: Sync {
    /// [events, channels, stations]
    fn shape(&self) -> [usize; 3];

    /// Travel time in seconds, at storage precision
    fn travel_time(&self, event: EventId, channel: usize, station: usize) -> CcResult<f32>;
}

/// Row-major offset after checking every index against the shape
fn flat_index(shape: [usize; 3], event: EventId, channel: usize, station: usize) -> CcResult<usize> {
    let event = event as usize;
    let axes = [("event", event), ("channel", channel), ("station", station)];
    for (&(axis, index), &bound) in axes.iter().zip(shape.iter()) {
        if index >= bound {
            return Err(CcError::IndexOutOfRange { axis, index, bound });
        }
    }
    Ok((event * shape[1] + channel) * shape[2] + station)
}

/// Travel-time table backed by a memory-mapped flat file of
/// little-endian f32 values
pub struct MappedTravelTimeTable {
    mmap: Mmap,
    shape: [usize; 3],
}

impl MappedTravelTimeTable {
    /// Map the file read-only and check its size against `shape`
    pub fn open<P: AsRef<Path>>(path: P, shape: [usize; 3]) -> CcResult<Self> {
        log::info!("Opening travel-time table: {}", path.as_ref().display());
        log::debug!("Configured shape: {:?}", shape);

        let file = File::open(path.as_ref())?;
        let actual_bytes = file.metadata()?.len();
        let expected_bytes = shape
            .iter()
            .try_fold(F32_BYTES as u64, |acc, &n| acc.checked_mul(n as u64))
            .unwrap_or(u64::MAX);

        if actual_bytes != expected_bytes {
            return Err(CcError::ShapeMismatch {
                shape,
                expected_bytes,
                actual_bytes,
            });
        }

        // SAFETY: the mapping is read-only and the file is not modified by this process
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self { mmap, shape })
    }
}

impl TravelTimeSource for MappedTravelTimeTable {
    fn shape(&self) -> [usize; 3] {
        self.shape
    }

    fn travel_time(&self, event: EventId, channel: usize, station: usize) -> CcResult<f32> {
        let offset = flat_index(self.shape, event, channel, station)? * F32_BYTES;
        let bytes: [u8; F32_BYTES] = self.mmap[offset..offset + F32_BYTES]
            .try_into()
            .map_err(|_| CcError::IndexOutOfRange {
                axis: "byte offset",
                index: offset,
                bound: self.mmap.len(),
            })?;
        Ok(f32::from_le_bytes(bytes))
    }
}

/// In-memory travel-time table, for small models and tests
pub struct ArrayTravelTimeTable {
    data: Array3<f32>,
}

impl ArrayTravelTimeTable {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }
}

impl TravelTimeSource for ArrayTravelTimeTable {
    fn shape(&self) -> [usize; 3] {
        let (e, c, s) = self.data.dim();
        [e, c, s]
    }

    fn travel_time(&self, event: EventId, channel: usize, station: usize) -> CcResult<f32> {
        flat_index(self.shape(), event, channel, station)?;
        Ok(self.data[[event as usize, channel, station]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_index_row_major() {
        let shape = [4, 2, 3];
        assert_eq!(flat_index(shape, 0, 0, 0).unwrap(), 0);
        assert_eq!(flat_index(shape, 0, 1, 0).unwrap(), 3);
        assert_eq!(flat_index(shape, 1, 0, 2).unwrap(), 8);
        assert_eq!(flat_index(shape, 3, 1, 2).unwrap(), 23);
    }

    #[test]
    fn test_flat_index_bounds() {
        let err = flat_index([4, 2, 3], 4, 0, 0).unwrap_err();
        match err {
            CcError::IndexOutOfRange { axis, index, bound } => {
                assert_eq!(axis, "event");
                assert_eq!(index, 4);
                assert_eq!(bound, 4);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(flat_index([4, 2, 3], 0, 0, 3).is_err());
    }

    #[test]
    fn test_array_table_lookup() {
        let mut data = Array3::<f32>::zeros((2, 2, 2));
        data[[1, 0, 1]] = 4.5;
        let table = ArrayTravelTimeTable::new(data);
        assert_eq!(table.travel_time(1, 0, 1).unwrap(), 4.5);
        assert!(table.travel_time(2, 0, 0).is_err());
    }
}
