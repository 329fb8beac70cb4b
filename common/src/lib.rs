// Common library for the grid monitoring engine and its daemon

pub mod cache;
pub mod conditions;
pub mod config;
pub mod diff;
pub mod dispatch;
pub mod errors;
pub mod models;
pub mod owner;
pub mod persist;
pub mod range;
pub mod registry;
pub mod source;
pub mod telemetry;
