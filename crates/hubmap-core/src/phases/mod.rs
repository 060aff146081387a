//! Analysis phases, run in order by the pipeline.

pub mod features;
pub mod hubs;
pub mod imports;
pub mod parsing;
pub mod reachability;
pub mod structure;
