//! Occupancy counting: the translator from raw head counts to flow events
//! and the reducer folding those events into stats, alerts, and config.

mod state;
mod translator;

pub use state::{
    Alert, CounterConfig, CounterConfigPatch, CounterEvent, CounterState, OccupancyStats, Severity,
};
pub use translator::{Flow, OccupancyTranslator};
