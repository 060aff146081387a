//! Graph data structures and path helpers.

pub mod aliases;
pub mod import_graph;
pub mod naming;
pub mod paths;
