mod config;
mod policy;

pub use config::{ThresholdError, TriageThresholds};
pub use policy::{ScoreBand, TriageDecision};
