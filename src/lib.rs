pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, slurm::JobScript, AcquisitionConfig};

pub use core::{etl::EtlEngine, pipeline::HistoricalPipeline, schedule::AcquisitionSchedule};
pub use utils::error::{EtlError, Result};
