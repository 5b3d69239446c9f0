//! Audits street names in an `.osm` XML dump and reshapes its nodes and ways
//! into CSV tables ready for bulk loading.

pub mod config;
pub mod data;
pub mod errors;
pub mod etl;

pub use config::Config;
pub use errors::{Error, Result};
pub use etl::audit_clean::{audit, process, RunReport};
pub use etl::{Etl, EtlSummary};
