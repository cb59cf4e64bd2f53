//! Run configuration.

use std::path::{Path, PathBuf};

use cloud_registration::{Aligner, AlignmentMethod};

use crate::{PipelineError, PipelineResult};

/// Default voxel edge length for downsampling.
pub const DEFAULT_VOXEL_SIZE: f64 = 0.1;

/// Everything one registration run needs.
///
/// A `scale_ratio` other than 1.0 takes precedence over the two measurements;
/// otherwise the ratio is `target_measurement / source_measurement`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationConfig {
    /// Moving cloud.
    pub source_path: PathBuf,
    /// Fixed cloud.
    pub target_path: PathBuf,
    /// Where to write the transformed source; `None` skips export.
    pub output_path: Option<PathBuf>,
    /// Fine-alignment method (default: GICP).
    pub method: AlignmentMethod,
    /// Voxel edge length; non-positive skips downsampling (default: 0.1).
    pub voxel_size: f64,
    /// Explicit source-to-target scale (default: 1.0).
    pub scale_ratio: f64,
    /// A length measured in the source cloud (default: 1.0).
    pub source_measurement: f64,
    /// The same length measured in the target cloud (default: 1.0).
    pub target_measurement: f64,
    /// Log per-stage durations after alignment (default: true).
    pub show_timeline: bool,
    /// Overrides the method's iteration cap.
    pub max_iterations: Option<u32>,
    /// Overrides the method's correspondence rejection distance.
    pub max_correspondence_distance: Option<f64>,
}

impl RegistrationConfig {
    /// Creates a configuration with defaults for everything but the inputs.
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>, target_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            target_path: target_path.into(),
            output_path: None,
            method: AlignmentMethod::default(),
            voxel_size: DEFAULT_VOXEL_SIZE,
            scale_ratio: 1.0,
            source_measurement: 1.0,
            target_measurement: 1.0,
            show_timeline: true,
            max_iterations: None,
            max_correspondence_distance: None,
        }
    }

    /// Sets the output path.
    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Sets the alignment method.
    #[must_use]
    pub const fn with_method(mut self, method: AlignmentMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the alignment method from its name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an unknown name.
    pub fn with_method_name(mut self, name: &str) -> PipelineResult<Self> {
        self.method = name
            .parse::<AlignmentMethod>()
            .map_err(|e| PipelineError::invalid_config(e.to_string()))?;
        Ok(self)
    }

    /// Sets the voxel size.
    #[must_use]
    pub const fn with_voxel_size(mut self, voxel_size: f64) -> Self {
        self.voxel_size = voxel_size;
        self
    }

    /// Sets the explicit scale ratio.
    #[must_use]
    pub const fn with_scale_ratio(mut self, ratio: f64) -> Self {
        self.scale_ratio = ratio;
        self
    }

    /// Sets the source and target measurements of the same length.
    #[must_use]
    pub const fn with_measurements(mut self, source: f64, target: f64) -> Self {
        self.source_measurement = source;
        self.target_measurement = target;
        self
    }

    /// Enables or disables the timeline log.
    #[must_use]
    pub const fn with_show_timeline(mut self, show: bool) -> Self {
        self.show_timeline = show;
        self
    }

    /// Overrides the iteration cap.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Overrides the correspondence rejection distance.
    #[must_use]
    pub const fn with_max_correspondence_distance(mut self, distance: f64) -> Self {
        self.max_correspondence_distance = Some(distance);
        self
    }

    /// The output path, if export is requested.
    #[must_use]
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// True when downsampling will run.
    #[must_use]
    pub fn downsampling_enabled(&self) -> bool {
        self.voxel_size.is_finite() && self.voxel_size > 0.0
    }

    /// Checks the solver overrides.
    ///
    /// Scale settings are checked later, by the scale estimation stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for a zero iteration cap or a
    /// non-positive correspondence distance.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.max_iterations == Some(0) {
            return Err(PipelineError::invalid_config(
                "max iterations must be at least 1",
            ));
        }
        if let Some(d) = self.max_correspondence_distance {
            if !d.is_finite() || d <= 0.0 {
                return Err(PipelineError::invalid_config(format!(
                    "max correspondence distance must be positive, got {d}"
                )));
            }
        }
        Ok(())
    }

    /// The configured aligner, with overrides applied.
    #[must_use]
    pub fn aligner(&self) -> Aligner {
        let mut aligner = Aligner::from_method(self.method);
        if let Some(n) = self.max_iterations {
            aligner = aligner.with_max_iterations(n);
        }
        if let Some(d) = self.max_correspondence_distance {
            aligner = aligner.with_max_correspondence_distance(d);
        }
        aligner
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloud_registration::{GicpParams, IcpParams};

    #[test]
    fn test_defaults() {
        let config = RegistrationConfig::new("a.ply", "b.ply");

        assert_eq!(config.method, AlignmentMethod::Gicp);
        assert_relative_eq!(config.voxel_size, 0.1);
        assert_relative_eq!(config.scale_ratio, 1.0);
        assert!(config.show_timeline);
        assert!(config.output_path().is_none());
        assert!(config.validate().is_ok());
        assert_eq!(config.aligner(), Aligner::Gicp(GicpParams::default()));
    }

    #[test]
    fn test_method_name() {
        let config = RegistrationConfig::new("a", "b")
            .with_method_name("icp_normals")
            .unwrap();
        assert_eq!(config.method, AlignmentMethod::IcpNormals);

        let err = RegistrationConfig::new("a", "b")
            .with_method_name("NDT")
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig { .. }));
    }

    #[test]
    fn test_overrides_reach_aligner() {
        let config = RegistrationConfig::new("a", "b")
            .with_method(AlignmentMethod::Icp)
            .with_max_iterations(3)
            .with_max_correspondence_distance(0.5);

        assert_eq!(
            config.aligner(),
            Aligner::Icp(
                IcpParams::new()
                    .with_max_iterations(3)
                    .with_max_correspondence_distance(0.5)
            )
        );
    }

    #[test]
    fn test_validate_rejects_bad_overrides() {
        let zero = RegistrationConfig::new("a", "b").with_max_iterations(0);
        assert!(zero.validate().is_err());

        let negative = RegistrationConfig::new("a", "b").with_max_correspondence_distance(-1.0);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_downsampling_switch() {
        let config = RegistrationConfig::new("a", "b");
        assert!(config.downsampling_enabled());
        assert!(!config.clone().with_voxel_size(0.0).downsampling_enabled());
        assert!(!config.with_voxel_size(f64::NAN).downsampling_enabled());
    }
}
