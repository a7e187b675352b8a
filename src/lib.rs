//! Telemetry collection and reporting for server BMCs.
//!
//! Two batch programs share this crate: `bmc-collect` polls the BMC's
//! Redfish API on a fixed interval and appends readings to per-category
//! JSON files, and `bmc-report` turns those files into time-series plots
//! and a summary document. The JSON files are the only hand-off between
//! the two.

pub mod bmc;
pub mod collector;
pub mod report;
pub mod store;
