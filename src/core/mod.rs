//! Core differential-time processing stages

pub mod lag_refine;
pub mod pick_select;
pub mod dd_assembly;
pub mod catalog_export;

// Re-export main types
pub use lag_refine::{LagRefiner, LagRefinerParams, RefinedLag};
pub use pick_select::{PickSelector, PickSelectorParams};
pub use dd_assembly::{DifferentialTimeAssembler, PairBlock};
pub use catalog_export::{write_event_list, write_station_list};
