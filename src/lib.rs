//! Dialer attendance ETL: normalizes call-center exports from five telephony
//! vendors into one canonical call log and rolls it up into per-agent
//! attendance reports. The `etl` module is the pure batch pipeline; the rest
//! is the service shell around it.

pub mod config;
pub mod error;
pub mod etl;
pub mod telemetry;
