pub mod config;
pub mod database;
pub mod metrics;
pub mod reset_scheduler;
pub mod telemetry;
