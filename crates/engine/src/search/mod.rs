pub mod flood;
pub mod pattern;

pub use flood::{SearchLimits, SearchOutcome, SearchStop, Vein, find_vein, iteration_cap};
pub use pattern::{MiningPattern, NeighborPattern, PatternSpec};
