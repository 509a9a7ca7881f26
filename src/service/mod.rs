pub mod aggregator;
pub mod analysis;
pub mod recorder;
pub mod roster;
