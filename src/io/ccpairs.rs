use crate::types::{
    CcError, CcResult, CorrelationMeasurement, EventId, EventPair, PairGroup,
};
use ndarray::{Array3, Array4};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Lazy source of per-pair correlation groups
///
/// Groups come out in backing order: first-seen id1, then its nested id2
/// entries. Symmetric duplicates are not filtered here.
pub trait PairStore {
    fn groups(&self) -> Box<dyn Iterator<Item = CcResult<PairGroup>> + '_>;
}

/// Store holding already-built groups
#[derive(Debug, Clone, Default)]
pub struct InMemoryPairStore {
    groups: Vec<PairGroup>,
}

impl InMemoryPairStore {
    pub fn new(groups: Vec<PairGroup>) -> Self {
        Self { groups }
    }

    pub fn push(&mut self, group: PairGroup) {
        self.groups.push(group);
    }
}

impl PairStore for InMemoryPairStore {
    fn groups(&self) -> Box<dyn Iterator<Item = CcResult<PairGroup>> + '_> {
        Box::new(self.groups.iter().cloned().map(Ok))
    }
}

/// Raw leaf group as stored on disk
#[derive(Debug, Deserialize)]
struct RawGroup {
    cc_score: Vec<Vec<Vec<f32>>>,
    cc_index: Vec<Vec<Vec<i32>>>,
    cc_weight: Vec<Vec<Vec<f32>>>,
    neighbor_score: Vec<Vec<Vec<Vec<f32>>>>,
}

/// Store over one or more JSON files shaped `{id1: {id2: {arrays}}}`
///
/// Files are parsed one at a time as iteration reaches them, so only a
/// single file's worth of groups is resident.
#[derive(Debug, Clone)]
pub struct JsonPairStore {
    files: Vec<PathBuf>,
}

impl JsonPairStore {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Collect every `*.json` file below `root`, sorted by path
    pub fn discover<P: AsRef<Path>>(root: P) -> CcResult<Self> {
        let root = root.as_ref();
        log::info!("Searching correlation pair files under: {}", root.display());

        let mut files = Vec::new();
        collect_json_files(root, &mut files)?;
        files.sort();

        log::info!("Found {} correlation pair files", files.len());
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    fn read_file(path: &Path) -> CcResult<Vec<CcResult<PairGroup>>> {
        log::info!("Reading correlation pairs: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let root: Map<String, Value> = serde_json::from_str(&text)?;

        let mut groups = Vec::new();
        for (key1, level2) in root {
            log::debug!("Event {}: reading neighbor groups", key1);
            let id1 = match parse_event_id(&key1) {
                Ok(id) => id,
                Err(e) => {
                    groups.push(Err(e));
                    continue;
                }
            };
            let Value::Object(level2) = level2 else {
                groups.push(Err(CcError::MalformedGroup {
                    key: key1,
                    reason: format!("not an object in {}", path.display()),
                }));
                continue;
            };
            for (key2, leaf) in level2 {
                groups.push(parse_event_id(&key2).and_then(|id2| {
                    build_group(EventPair::new(id1, id2), leaf)
                }));
            }
        }

        log::debug!("{} groups in {}", groups.len(), path.display());
        Ok(groups)
    }
}

impl PairStore for JsonPairStore {
    fn groups(&self) -> Box<dyn Iterator<Item = CcResult<PairGroup>> + '_> {
        Box::new(self.files.iter().flat_map(|path| {
            match Self::read_file(path) {
                Ok(groups) => groups,
                Err(e) => vec![Err(e)],
            }
        }))
    }
}

fn collect_json_files(dir: &Path, out: &mut Vec<PathBuf>) -> CcResult<()> {
    if dir.is_file() {
        out.push(dir.to_path_buf());
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
            out.push(path);
        }
    }
    Ok(())
}

fn parse_event_id(key: &str) -> CcResult<EventId> {
    key.trim()
        .parse()
        .map_err(|_| CcError::MalformedGroup {
            key: key.to_string(),
            reason: "not an event id".to_string(),
        })
}

fn build_group(pair: EventPair, leaf: Value) -> CcResult<PairGroup> {
    let raw: RawGroup = serde_json::from_value(leaf).map_err(|e| CcError::CorruptGroup {
        pair,
        reason: e.to_string(),
    })?;

    let cc_score = nested3(pair, "cc_score", raw.cc_score)?;
    let cc_index = nested3(pair, "cc_index", raw.cc_index)?;
    let cc_weight = nested3(pair, "cc_weight", raw.cc_weight)?;
    let neighbor_score = nested4(pair, raw.neighbor_score)?;

    let measurement =
        CorrelationMeasurement::new(pair, cc_score, cc_index, cc_weight, neighbor_score)?;
    Ok(PairGroup { pair, measurement })
}

fn ragged(pair: EventPair, name: &str) -> CcError {
    CcError::CorruptGroup {
        pair,
        reason: format!("{} is ragged", name),
    }
}

/// Convert nested lists into a 3-D array, rejecting ragged input
fn nested3<T: Clone>(pair: EventPair, name: &str, rows: Vec<Vec<Vec<T>>>) -> CcResult<Array3<T>> {
    let d0 = rows.len();
    let d1 = rows.first().map_or(0, |r| r.len());
    let d2 = rows.first().and_then(|r| r.first()).map_or(0, |r| r.len());

    let mut flat = Vec::with_capacity(d0 * d1 * d2);
    for plane in rows {
        if plane.len() != d1 {
            return Err(ragged(pair, name));
        }
        for line in plane {
            if line.len() != d2 {
                return Err(ragged(pair, name));
            }
            flat.extend(line);
        }
    }

    Array3::from_shape_vec((d0, d1, d2), flat).map_err(|e| CcError::CorruptGroup {
        pair,
        reason: format!("{}: {}", name, e),
    })
}

fn nested4(pair: EventPair, rows: Vec<Vec<Vec<Vec<f32>>>>) -> CcResult<Array4<f32>> {
    let name = "neighbor_score";
    let d0 = rows.len();
    let d1 = rows.first().map_or(0, |r| r.len());
    let d2 = rows.first().and_then(|r| r.first()).map_or(0, |r| r.len());
    let d3 = rows
        .first()
        .and_then(|r| r.first())
        .and_then(|r| r.first())
        .map_or(0, |r| r.len());

    let mut flat = Vec::with_capacity(d0 * d1 * d2 * d3);
    for cube in rows {
        if cube.len() != d1 {
            return Err(ragged(pair, name));
        }
        for plane in cube {
            if plane.len() != d2 {
                return Err(ragged(pair, name));
            }
            for line in plane {
                if line.len() != d3 {
                    return Err(ragged(pair, name));
                }
                flat.extend(line);
            }
        }
    }

    Array4::from_shape_vec((d0, d1, d2, d3), flat).map_err(|e| CcError::CorruptGroup {
        pair,
        reason: format!("{}: {}", name, e),
    })
}
