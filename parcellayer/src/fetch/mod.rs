//! Viewport fetch scheduling module
//!
//! Debounces viewport-change notifications into a single outstanding
//! bounding-box query and applies responses to the parcel registry.

mod scheduler;

pub use scheduler::{
    FetchConfig, FetchNotice, FetchRequest, FetchScheduler, FetchStats, FetchStatsSnapshot,
};
