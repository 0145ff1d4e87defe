//! Shared building blocks for the query dashboard gateway and console.

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod telemetry;
pub mod utils;
