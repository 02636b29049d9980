pub mod agent;
pub mod algorithm;
pub mod channel;
pub mod config;
pub mod graph;
pub mod heuristics;
pub mod log;
pub mod signal_handling;
pub mod solution;
pub mod supervisor;
