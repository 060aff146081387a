//! Hubmap Core: import-hub analysis for JavaScript/TypeScript codebases.
//!
//! This crate contains all analysis logic: source discovery, tree-sitter fact
//! extraction, import resolution, importer reachability, hub classification
//! and feature mapping.

pub mod config;
pub mod error;
pub mod graph;
pub mod languages;
pub mod output;
pub mod phases;
pub mod pipeline;

pub use config::{AnalysisConfig, AnalysisResult, FileFacts};
pub use error::AnalysisError;
