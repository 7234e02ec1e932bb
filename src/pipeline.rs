use crate::config::ConversionConfig;
use crate::core::catalog_export::{write_event_list, write_station_list};
use crate::core::dd_assembly::{DifferentialTimeAssembler, PairBlock};
use crate::core::lag_refine::LagRefiner;
use crate::core::pick_select::PickSelector;
use crate::io::catalog::EventCatalog;
use crate::io::ccpairs::{JsonPairStore, PairStore};
use crate::io::stations::StationTable;
use crate::io::traveltime::{MappedTravelTimeTable, TravelTimeSource};
use crate::types::{CcError, CcResult, PairGroup};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const STATION_LIST_FILE: &str = "stlist.txt";
pub const DIFFERENTIAL_TIME_FILE: &str = "xcordata.txt";
pub const EVENT_LIST_FILE: &str = "evlist.txt";

/// Groups buffered from the store before they are processed together
const PAIR_BATCH: usize = 1024;

/// Input and output locations for one conversion run
#[derive(Debug, Clone)]
pub struct ConversionInputs {
    pub traveltime: PathBuf,
    /// Correlation pair files, or directories searched for `*.json`
    pub ccpairs: Vec<PathBuf>,
    pub stations: PathBuf,
    pub catalog: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub pairs_seen: usize,
    pub pairs_written: usize,
    pub pairs_symmetric: usize,
    pub pairs_replaced: usize,
    pub pairs_skipped: usize,
    pub picks_written: usize,
    pub stations_written: usize,
    pub events_written: usize,
    pub catalog_rows_skipped: usize,
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pairs seen, {} written ({} picks), {} symmetric, {} repeated, {} skipped; \
             {} stations; {} events ({} catalog rows skipped)",
            self.pairs_seen,
            self.pairs_written,
            self.picks_written,
            self.pairs_symmetric,
            self.pairs_replaced,
            self.pairs_skipped,
            self.stations_written,
            self.events_written,
            self.catalog_rows_skipped
        )
    }
}

/// Single forward pass from correlation pairs to the relocation dataset
pub struct ConversionPipeline {
    config: ConversionConfig,
    selector: PickSelector,
}

impl ConversionPipeline {
    pub fn new(config: ConversionConfig) -> CcResult<Self> {
        config.validate()?;
        let refiner = LagRefiner::with_params(config.lag_refiner_params());
        let selector = PickSelector::with_params(config.pick_selector_params()?, refiner)
            .with_network_codes(config.station_code_with_network);
        Ok(Self { config, selector })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Read every input, then write stlist/xcordata/evlist
    ///
    /// Nothing is written until all inputs have been processed, and no
    /// output is renamed into place until every output has been staged.
    pub fn run(&self, inputs: &ConversionInputs) -> CcResult<ConversionSummary> {
        log::info!("Starting differential-time conversion");

        let shape = self.config.require_traveltime_shape()?;
        let travel_times = MappedTravelTimeTable::open(&inputs.traveltime, shape)?;
        let stations = StationTable::from_csv(&inputs.stations)?;

        let store = JsonPairStore::new(discover_pair_files(&inputs.ccpairs)?);
        let (assembler, mut summary) =
            self.build_differential_times(&store, &travel_times, &stations)?;

        let catalog = match &inputs.catalog {
            Some(path) => Some(EventCatalog::from_csv(path)?),
            None => None,
        };

        std::fs::create_dir_all(&inputs.output_dir)?;

        let out = &inputs.output_dir;
        let mut staged = vec![
            StagedOutput::write(&out.join(STATION_LIST_FILE), |w| {
                write_station_list(w, &stations, self.config.station_code_with_network)
            })?,
            StagedOutput::write(&out.join(DIFFERENTIAL_TIME_FILE), |w| assembler.write_to(w))?,
        ];
        if let Some(catalog) = &catalog {
            staged.push(StagedOutput::write(&out.join(EVENT_LIST_FILE), |w| {
                write_event_list(w, catalog.events())
            })?);
        }
        persist_all(staged)?;

        summary.stations_written = stations.len();
        if let Some(catalog) = &catalog {
            summary.events_written = catalog.events().len();
            summary.catalog_rows_skipped = catalog.skipped_rows();
        }

        log::info!("Conversion finished: {}", summary);
        Ok(summary)
    }

    /// Select picks for every pair in the store
    ///
    /// Pair-local failures (corrupt groups, out-of-range indices) drop
    /// that pair with a warning; anything else aborts.
    pub fn build_differential_times(
        &self,
        store: &dyn PairStore,
        travel_times: &dyn TravelTimeSource,
        stations: &StationTable,
    ) -> CcResult<(DifferentialTimeAssembler, ConversionSummary)> {
        log::info!("Selecting differential-time picks");
        log::debug!(
            "min_cc_score={}, mode={:?}",
            self.config.min_cc_score,
            self.config.differential_time_mode
        );

        let mut assembler = DifferentialTimeAssembler::new();
        let mut summary = ConversionSummary::default();
        let mut batch = Vec::with_capacity(PAIR_BATCH);

        for item in store.groups() {
            summary.pairs_seen += 1;
            match item {
                Ok(group) if !group.pair.is_canonical() => summary.pairs_symmetric += 1,
                Ok(group) => {
                    batch.push(group);
                    if batch.len() == PAIR_BATCH {
                        self.flush_batch(&mut batch, travel_times, stations, &mut assembler, &mut summary)?;
                    }
                }
                Err(e) if e.is_pair_local() => {
                    log::warn!("Skipping pair: {}", e);
                    summary.pairs_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        self.flush_batch(&mut batch, travel_times, stations, &mut assembler, &mut summary)?;

        summary.pairs_replaced = assembler.replaced();
        summary.pairs_written = assembler.blocks().len();
        summary.picks_written = assembler.pick_count();

        log::info!(
            "{} pairs, {} picks above cc {}",
            summary.pairs_written,
            summary.picks_written,
            self.config.min_cc_score
        );
        Ok((assembler, summary))
    }

    fn flush_batch(
        &self,
        batch: &mut Vec<PairGroup>,
        travel_times: &dyn TravelTimeSource,
        stations: &StationTable,
        assembler: &mut DifferentialTimeAssembler,
        summary: &mut ConversionSummary,
    ) -> CcResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        log::debug!("Processing batch of {} pairs", batch.len());

        let select = |group: &PairGroup| {
            self.selector
                .select(group, travel_times, stations)
                .map(|picks| PairBlock { pair: group.pair, picks })
        };

        #[cfg(feature = "parallel")]
        let results: Vec<CcResult<PairBlock>> = batch.par_iter().map(select).collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<CcResult<PairBlock>> = batch.iter().map(select).collect();

        for result in results {
            match result {
                Ok(block) => {
                    assembler.insert(block);
                }
                Err(e) if e.is_pair_local() => {
                    log::warn!("Skipping pair: {}", e);
                    summary.pairs_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        batch.clear();
        Ok(())
    }
}

/// Expand directories into their `*.json` files; explicit files are kept as given
pub fn discover_pair_files(paths: &[PathBuf]) -> CcResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(JsonPairStore::discover(path)?.files().iter().cloned());
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            return Err(CcError::Config(format!(
                "Correlation pair path does not exist: {}",
                path.display()
            )));
        }
    }
    Ok(files)
}

/// Output fully written to a temporary file beside its target, waiting
/// to be renamed into place
pub struct StagedOutput {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedOutput {
    /// Run `write` against a fresh temp file in the target directory.
    /// On error the temp file is removed and the target is untouched.
    pub fn write<F>(path: &Path, write: F) -> CcResult<Self>
    where
        F: FnOnce(&mut BufWriter<&mut NamedTempFile>) -> CcResult<()>,
    {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(&mut temp);
            write(&mut writer)?;
            writer.flush()?;
        }
        log::debug!("Staged {} at {}", path.display(), temp.path().display());
        Ok(Self {
            temp,
            target: path.to_path_buf(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn persist(self) -> CcResult<()> {
        self.temp
            .persist(&self.target)
            .map_err(|e| CcError::Io(e.error))?;
        log::info!("Wrote {}", self.target.display());
        Ok(())
    }
}

/// Rename every staged output into place, in order
pub fn persist_all(staged: Vec<StagedOutput>) -> CcResult<()> {
    staged.into_iter().try_for_each(StagedOutput::persist)
}
