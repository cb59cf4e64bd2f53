//! File-backed runs of the whole pipeline.

#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use cloud_io::{load_cloud, save_cloud};
use cloud_pipeline::{
    ExportOutcome, PipelineError, RegistrationConfig, RegistrationPipeline, Stage,
};
use cloud_registration::{AlignmentMethod, SimilarityTransform};
use cloud_types::{Point3, PointCloud};
use nalgebra::{UnitQuaternion, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

fn random_cloud(n: usize, seed: u64) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Point3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            )
        })
        .collect()
}

#[test]
fn aligns_scaled_and_shifted_copy_and_writes_output() {
    let dir = tempdir().unwrap();
    let source_path = dir.path().join("source.xyz");
    let target_path = dir.path().join("target.ply");
    let output_path = dir.path().join("aligned.xyz");

    let source = random_cloud(200, 3);
    let truth = SimilarityTransform::with_scale(
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0_f64.to_radians()),
        Vector3::new(5.0, 1.0, -2.0),
        2.0,
    );
    let target = truth.apply_to_cloud(&source);
    save_cloud(&source, &source_path).unwrap();
    save_cloud(&target, &target_path).unwrap();

    let config = RegistrationConfig::new(&source_path, &target_path)
        .with_method(AlignmentMethod::Icp)
        .with_voxel_size(0.0)
        .with_measurements(1.5, 3.0)
        .with_output_path(&output_path);
    let mut pipeline = RegistrationPipeline::new(config).unwrap();
    let report = pipeline.run().unwrap();

    assert!(report.status.is_converged());
    assert_relative_eq!(report.translation(), truth.translation, epsilon = 1e-4);
    assert!(report.transform.rotation.angle_to(&truth.rotation) < 1e-4);
    assert_eq!(
        report.export,
        ExportOutcome::Written {
            path: output_path.clone(),
            points: 200,
        }
    );

    let written = load_cloud(&output_path).unwrap();
    assert_eq!(written.len(), 200);
    for (w, t) in written.points.iter().zip(&target.points) {
        assert_relative_eq!(w.position, t.position, epsilon = 1e-3);
    }
}

#[test]
fn missing_source_file_fails_at_loading() {
    let dir = tempdir().unwrap();
    let config = RegistrationConfig::new(dir.path().join("nope.ply"), dir.path().join("also.ply"));

    let err = RegistrationPipeline::new(config).unwrap().run().unwrap_err();

    assert!(matches!(err, PipelineError::LoadFailure { .. }));
    assert_eq!(err.stage(), Stage::Loading);
}

#[test]
fn unwritable_output_is_write_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cloud.xyz");
    save_cloud(&random_cloud(50, 4), &path).unwrap();

    let config = RegistrationConfig::new(&path, &path)
        .with_voxel_size(0.0)
        .with_output_path(dir.path().join("missing_dir").join("out.xyz"));
    let err = RegistrationPipeline::new(config).unwrap().run().unwrap_err();

    assert!(matches!(err, PipelineError::WriteFailure { .. }));
}
