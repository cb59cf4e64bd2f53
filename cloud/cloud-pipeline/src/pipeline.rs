//! The registration orchestrator.

use cloud_registration::{AlignmentMethod, AlignmentStatus, AlignmentStrategy, SimilarityTransform};
use cloud_types::PointCloud;
use nalgebra::{Matrix4, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::export::{export_transformed, ExportOutcome};
use crate::preprocess::prepare;
use crate::scale::estimate_scale;
use crate::store::{CloudStore, FileStore};
use crate::{CloudRole, PipelineError, PipelineResult, RegistrationConfig, Stage, Timeline};

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegistrationReport {
    /// Method that ran.
    pub method: AlignmentMethod,
    /// Source-to-target transform as a homogeneous matrix.
    pub matrix: Matrix4<f64>,
    /// The same transform decomposed.
    pub transform: SimilarityTransform,
    /// Scale ratio used for the initial estimate.
    pub initial_scale: f64,
    /// Terminal alignment status.
    pub status: AlignmentStatus,
    /// Solver iterations.
    pub iterations: u32,
    /// RMS correspondence distance of the transform.
    pub rms_error: f64,
    /// Correspondences behind `rms_error`.
    pub correspondence_count: usize,
    /// Source points after downsampling.
    pub source_points: usize,
    /// Target points after downsampling.
    pub target_points: usize,
    /// What the export stage did.
    pub export: ExportOutcome,
    /// Stage durations of this run.
    pub timeline: Timeline,
}

impl RegistrationReport {
    /// Rotation part of the transform as a matrix.
    #[must_use]
    pub fn rotation(&self) -> nalgebra::Matrix3<f64> {
        self.transform.rotation_matrix()
    }

    /// Translation part of the transform.
    #[must_use]
    pub const fn translation(&self) -> Vector3<f64> {
        self.transform.translation
    }

    /// Scale part of the transform.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.transform.scale
    }
}

/// Rejects transforms with a NaN or infinite entry.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidTransform`].
pub fn validate_transform(transform: &SimilarityTransform) -> PipelineResult<()> {
    let matrix_ok = transform.to_matrix4().iter().all(|v| v.is_finite());
    if matrix_ok && transform.is_finite() {
        Ok(())
    } else {
        Err(PipelineError::InvalidTransform)
    }
}

/// Runs load, scale estimation, downsampling, alignment, validation and
/// export for one configuration.
///
/// One pipeline owns its clouds for the duration of a run; use one pipeline
/// per concurrent request.
///
/// # Example
///
/// ```no_run
/// use cloud_pipeline::{RegistrationConfig, RegistrationPipeline};
///
/// let config = RegistrationConfig::new("photo.ply", "lidar.ply")
///     .with_measurements(0.42, 1.26)
///     .with_output_path("photo_aligned.ply");
///
/// let mut pipeline = RegistrationPipeline::new(config).unwrap();
/// let report = pipeline.run().unwrap();
/// println!("{}", report.transform);
/// ```
#[derive(Debug)]
pub struct RegistrationPipeline<S: CloudStore = FileStore> {
    config: RegistrationConfig,
    store: S,
    timeline: Timeline,
}

impl RegistrationPipeline<FileStore> {
    /// A pipeline reading and writing files.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is rejected
    /// by [`RegistrationConfig::validate`].
    pub fn new(config: RegistrationConfig) -> PipelineResult<Self> {
        Self::with_store(config, FileStore)
    }
}

impl<S: CloudStore> RegistrationPipeline<S> {
    /// A pipeline over a custom store.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the configuration is rejected
    /// by [`RegistrationConfig::validate`].
    pub fn with_store(config: RegistrationConfig, store: S) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            timeline: Timeline::new(),
        })
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Timeline of the latest run.
    #[must_use]
    pub const fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// The store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Runs the configured method.
    ///
    /// # Errors
    ///
    /// See [`run_with_strategy`](Self::run_with_strategy).
    pub fn run(&mut self) -> PipelineResult<RegistrationReport> {
        let aligner = self.config.aligner();
        self.run_with_strategy(&aligner)
    }

    /// Runs the pipeline with an explicit alignment strategy.
    ///
    /// Non-convergence is logged as a warning and the best transform is used.
    /// The transform is logged at warning level before export, so a write
    /// failure still leaves it in the log at any verbosity short of errors
    /// only.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by a stage; later stages do
    /// not run.
    pub fn run_with_strategy(
        &mut self,
        strategy: &dyn AlignmentStrategy,
    ) -> PipelineResult<RegistrationReport> {
        self.timeline.reset();
        let config = &self.config;
        info!(
            source = %config.source_path.display(),
            target = %config.target_path.display(),
            method = %config.method,
            "starting registration"
        );

        let (source, target) = self
            .timeline
            .time(Stage::Loading, || load_pair(&self.store, config))?;

        let scale = self
            .timeline
            .time(Stage::ScaleEstimation, || estimate_scale(config))?;
        info!(scale, "scale ratio");

        if !config.downsampling_enabled() {
            info!(voxel_size = config.voxel_size, "downsampling skipped");
        }
        let (source_down, target_down) = self.timeline.time(Stage::Downsampling, || {
            prepare(&source, &target, config.voxel_size)
        })?;
        info!(
            source = source_down.len(),
            target = target_down.len(),
            "clouds after downsampling"
        );

        let outcome = self.timeline.time(Stage::Alignment, || {
            strategy.align(&source_down, &target_down, scale)
        });
        if !outcome.converged() {
            warn!(
                status = %outcome.status,
                iterations = outcome.iterations,
                rms = outcome.rms_error,
                "alignment did not converge, using the best transform found"
            );
        }

        validate_transform(&outcome.transform)?;

        if config.show_timeline {
            self.timeline.log();
        }

        let transform = outcome.transform;
        report_transform(&transform);

        let export = export_transformed(
            &mut self.store,
            &source,
            &transform,
            self.config.output_path(),
        )?;

        Ok(RegistrationReport {
            method: self.config.method,
            matrix: outcome.matrix(),
            transform,
            initial_scale: scale,
            status: outcome.status,
            iterations: outcome.iterations,
            rms_error: outcome.rms_error,
            correspondence_count: outcome.correspondence_count,
            source_points: source_down.len(),
            target_points: target_down.len(),
            export,
            timeline: self.timeline.clone(),
        })
    }
}

fn load_pair<S: CloudStore>(
    store: &S,
    config: &RegistrationConfig,
) -> PipelineResult<(PointCloud, PointCloud)> {
    let source = load_one(store, CloudRole::Source, &config.source_path)?;
    let target = load_one(store, CloudRole::Target, &config.target_path)?;
    Ok((source, target))
}

fn load_one<S: CloudStore>(
    store: &S,
    role: CloudRole,
    path: &std::path::Path,
) -> PipelineResult<PointCloud> {
    let cloud = store
        .load(path)
        .map_err(|source| PipelineError::LoadFailure {
            role,
            path: path.to_path_buf(),
            source,
        })?;
    info!(%role, path = %path.display(), points = cloud.len(), "loaded cloud");
    Ok(cloud)
}

fn report_transform(transform: &SimilarityTransform) {
    let t = transform.translation;
    let (roll, pitch, yaw) = transform.rotation.euler_angles();
    warn!("transform matrix:\n{transform}");
    warn!(
        roll_deg = roll.to_degrees(),
        pitch_deg = pitch.to_degrees(),
        yaw_deg = yaw.to_degrees(),
        "rotation"
    );
    warn!(x = t.x, y = t.y, z = t.z, "translation");
    warn!(scale = transform.scale, "scale");
}
