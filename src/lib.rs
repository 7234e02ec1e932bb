//! ccreloc: cross-correlation differential times for double-difference relocation
//!
//! Turns per-event-pair waveform cross-correlation measurements and a
//! precomputed travel-time table into the station list, differential-time
//! pairs and event list read by GrowClust-style relocation codes.

pub mod types;
pub mod config;
pub mod io;
pub mod core;
pub mod pipeline;

// Re-export main types and functions for easier access
pub use types::{
    CatalogEvent, CcError, CcResult, CorrelationMeasurement, DifferentialPick, EventId,
    EventPair, PairGroup, Phase, StationRecord,
};

pub use config::{ConversionConfig, DifferentialTimeMode, TravelTimeChannelAxis};
pub use io::{
    ArrayTravelTimeTable, EventCatalog, InMemoryPairStore, JsonPairStore, MappedTravelTimeTable,
    PairStore, StationTable, TravelTimeSource,
};
pub use pipeline::{ConversionInputs, ConversionPipeline, ConversionSummary};
