//! Point cloud registration pipeline.
//!
//! Drives one registration run from two files to a validated transform:
//!
//! 1. load source and target
//! 2. resolve the source-to-target scale ([`estimate_scale`])
//! 3. voxel-downsample both clouds ([`prepare`])
//! 4. fine-align with the configured method
//! 5. reject non-finite transforms ([`validate_transform`])
//! 6. log the per-stage [`Timeline`]
//! 7. write the transformed full-resolution source ([`export_transformed`])
//!
//! Every stage returns a [`PipelineResult`]; the first error stops the run and
//! names its [`Stage`]. An alignment that does not converge is not an error.
//!
//! # Example
//!
//! ```no_run
//! use cloud_pipeline::{RegistrationConfig, RegistrationPipeline};
//! use cloud_registration::AlignmentMethod;
//!
//! let config = RegistrationConfig::new("source.xyz", "target.ply")
//!     .with_method(AlignmentMethod::IcpNormals)
//!     .with_voxel_size(0.05)
//!     .with_scale_ratio(2.0);
//!
//! let report = RegistrationPipeline::new(config).unwrap().run().unwrap();
//! println!("{}", report.matrix);
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod config;
mod error;
mod export;
#[cfg(test)]
mod log_capture;
mod pipeline;
mod preprocess;
mod scale;
mod store;
mod timeline;

pub use config::{RegistrationConfig, DEFAULT_VOXEL_SIZE};
pub use error::{CloudRole, PipelineError, PipelineResult};
pub use export::{export_transformed, ExportOutcome};
pub use pipeline::{validate_transform, RegistrationPipeline, RegistrationReport};
pub use preprocess::prepare;
pub use scale::{estimate_scale, resolve_scale};
pub use store::{CloudStore, FileStore};
pub use timeline::{Stage, StageTiming, Timeline};
