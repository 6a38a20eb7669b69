//! Air quality monitor for UBA station 1671 (Leipziger Straße, Chemnitz).
//!
//! Fetches the newest hourly air quality index from the Umweltbundesamt API,
//! renders it as a short text report, and posts the report to Bluesky when
//! any component is at or above the configured severity.
//!
//! Modules, leaf-first:
//! - `catalog`: pollutant registry (ids, symbols, units, ranges)
//! - `model`: snapshot, reading, report and error types
//! - `scale`: ten-segment scale bar
//! - `alert`: severity levels, alert threshold, staleness
//! - `ingest`: UBA API client and query window
//! - `report`: report rendering
//! - `publish`: Bluesky client
//! - `pipeline`: one fetch → render → publish run
//! - `trigger`: HTTP endpoint that starts a run
//! - `config`, `logging`: settings and structured logs

pub mod alert;
pub mod catalog;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod scale;
pub mod trigger;
