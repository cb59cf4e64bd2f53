//! Writing the transformed full-resolution source.

use std::path::{Path, PathBuf};

use cloud_registration::SimilarityTransform;
use cloud_types::PointCloud;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{CloudStore, PipelineError, PipelineResult};

/// What the export stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExportOutcome {
    /// No output path was configured.
    Skipped,
    /// The transformed cloud was written.
    Written {
        /// Output path.
        path: PathBuf,
        /// Points written.
        points: usize,
    },
}

impl ExportOutcome {
    /// True if a file was written.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// Applies `transform` to `source` and saves the result to `output`.
///
/// Positions are transformed and normals rotated. Without an output path
/// nothing is written.
///
/// # Errors
///
/// Returns [`PipelineError::WriteFailure`] if the store rejects the write.
pub fn export_transformed<S: CloudStore + ?Sized>(
    store: &mut S,
    source: &PointCloud,
    transform: &SimilarityTransform,
    output: Option<&Path>,
) -> PipelineResult<ExportOutcome> {
    let Some(path) = output else {
        info!("no output file requested, nothing to export");
        return Ok(ExportOutcome::Skipped);
    };

    let moved = transform.apply_to_cloud(source);
    store
        .save(&moved, path)
        .map_err(|source| PipelineError::WriteFailure {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), points = moved.len(), "wrote transformed cloud");
    Ok(ExportOutcome::Written {
        path: path.to_path_buf(),
        points: moved.len(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloud_io::{IoError, IoResult};
    use cloud_types::{CloudPoint, Point3, Vector3};
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_2;

    #[derive(Default)]
    struct Recorder {
        saved: Vec<(PathBuf, PointCloud)>,
        fail: bool,
    }

    impl CloudStore for Recorder {
        fn load(&self, path: &Path) -> IoResult<PointCloud> {
            Err(IoError::FileNotFound {
                path: path.to_path_buf(),
            })
        }

        fn save(&mut self, cloud: &PointCloud, path: &Path) -> IoResult<()> {
            if self.fail {
                return Err(IoError::invalid_content("read-only"));
            }
            self.saved.push((path.to_path_buf(), cloud.clone()));
            Ok(())
        }
    }

    fn source() -> PointCloud {
        PointCloud {
            points: vec![CloudPoint::new(Point3::new(1.0, 0.0, 0.0)).with_normal(Vector3::x())],
        }
    }

    #[test]
    fn test_skipped_without_path() {
        let mut store = Recorder::default();
        let outcome =
            export_transformed(&mut store, &source(), &SimilarityTransform::identity(), None)
                .unwrap();

        assert_eq!(outcome, ExportOutcome::Skipped);
        assert!(store.saved.is_empty());
    }

    #[test]
    fn test_writes_transformed_points_and_normals() {
        let mut store = Recorder::default();
        let transform = SimilarityTransform::with_scale(
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            Vector3::new(0.0, 0.0, 1.0),
            2.0,
        );

        let outcome = export_transformed(
            &mut store,
            &source(),
            &transform,
            Some(Path::new("out.ply")),
        )
        .unwrap();

        assert!(outcome.is_written());
        let (path, cloud) = &store.saved[0];
        assert_eq!(path, Path::new("out.ply"));
        let p = &cloud.points[0];
        assert_relative_eq!(p.position, Point3::new(0.0, 2.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(p.normal.unwrap(), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_write_failure() {
        let mut store = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let err = export_transformed(
            &mut store,
            &source(),
            &SimilarityTransform::identity(),
            Some(Path::new("out.xyz")),
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::WriteFailure { .. }));
    }
}
