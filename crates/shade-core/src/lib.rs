//! Pipeline driver and batch orchestrator.
//!
//! A batch turns a [`BatchConfig`] into sorted [`WorkItem`]s (one per
//! source, target and variant), drives each through a [`PipelineDriver`]
//! (front end, back end, map composition) on a worker pool, writes the
//! output and composed source map of every success, and aggregates
//! everything into a [`BatchReport`].
//!
//! [`WorkItem`]: shade_model::WorkItem

pub mod artifact;
pub mod batch;
pub mod cancel;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod plan;
pub mod report;

pub use artifact::{
    ArtifactOptions, WrittenArtifacts, WrittenFile, dependency_file, sha256_hex, write_atomic,
    write_translation,
};
pub use batch::BatchOrchestrator;
pub use cancel::CancelToken;
pub use config::BatchConfig;
pub use discovery::{ShaderSource, discover_sources, list_shader_files};
pub use driver::{
    DriverState, Outcome, PipelineDriver, PipelineOptions, PipelineResult, Translation,
    remap_diagnostics,
};
pub use error::{ArtifactError, ConfigError, DiscoveryError};
pub use plan::{artifact_name_clashes, expand_variants, plan_work_items};
pub use report::{BatchReport, ItemReport, ItemStatus};

use shade_back::DialectBackEnd;
use shade_front::ReferenceFrontEnd;

/// Runs a batch with the built-in front and back ends.
pub fn run_batch(config: &BatchConfig, cancel: CancelToken) -> Result<BatchReport, DiscoveryError> {
    BatchOrchestrator::new(&ReferenceFrontEnd, &DialectBackEnd, config)
        .with_cancel(cancel)
        .run()
}
