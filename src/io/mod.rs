//! I/O modules for travel times, correlation pairs, stations and catalogs

pub mod traveltime;
pub mod ccpairs;
pub mod stations;
pub mod catalog;

pub use traveltime::{ArrayTravelTimeTable, MappedTravelTimeTable, TravelTimeSource};
pub use ccpairs::{InMemoryPairStore, JsonPairStore, PairStore};
pub use stations::StationTable;
pub use catalog::EventCatalog;
