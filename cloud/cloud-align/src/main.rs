//! `cloud-align`: register a source point cloud onto a target point cloud.
//!
//! ```text
//! cloud-align -s photo.ply -t lidar.ply --source-measurement 0.42 \
//!     --target-measurement 1.26 -o photo_aligned.ply
//! ```
//!
//! The transform is printed on stdout; progress, warnings and the stage
//! timeline go to stderr through `tracing`. Exit code 0 on success, 1 on any
//! pipeline failure, 2 on bad arguments.

mod cli;

use std::fmt::Write as _;
use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cloud_pipeline::{RegistrationPipeline, RegistrationReport};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::{Cli, VerboseLevel};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: VerboseLevel) {
    fmt()
        .with_env_filter(EnvFilter::new(level.directive()))
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut pipeline =
        RegistrationPipeline::new(cli.to_config()).context("invalid configuration")?;

    let report = pipeline.run().map_err(|err| {
        let stage = err.stage();
        anyhow::Error::new(err).context(format!("registration failed during {stage}"))
    })?;

    print!("{}", render_report(&report));

    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report).context("serializing report")?;
        fs::write(path, json)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }
    Ok(())
}

/// The transform block printed on stdout.
fn render_report(report: &RegistrationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Transformation matrix:");
    let _ = writeln!(out, "{}", report.transform);

    let r = report.rotation();
    let _ = writeln!(out, "Rotation:");
    for row in 0..3 {
        let _ = writeln!(
            out,
            "{:>14.6} {:>14.6} {:>14.6}",
            r[(row, 0)],
            r[(row, 1)],
            r[(row, 2)]
        );
    }

    let t = report.translation();
    let _ = writeln!(out, "Translation: {:.6} {:.6} {:.6}", t.x, t.y, t.z);
    let _ = writeln!(out, "Scale: {:.6}", report.scale());
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cloud_pipeline::{RegistrationConfig, Stage};
    use std::path::Path;
    use tempfile::tempdir;

    fn write_cloud(path: &Path) {
        let mut text = String::new();
        for i in 0..40_u32 {
            let f = f64::from(i);
            let _ = writeln!(
                text,
                "{} {} {}",
                (f * 0.37).sin(),
                (f * 0.91).cos(),
                (f * 0.13).sin() * 0.5
            );
        }
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_report_rendering() {
        let dir = tempdir().unwrap();
        let cloud = dir.path().join("cloud.xyz");
        write_cloud(&cloud);

        let config = RegistrationConfig::new(&cloud, &cloud)
            .with_voxel_size(0.0)
            .with_show_timeline(false);
        let report = RegistrationPipeline::new(config).unwrap().run().unwrap();
        let text = render_report(&report);

        assert!(text.starts_with("Transformation matrix:\n"));
        assert!(text.contains("Rotation:\n"));
        assert!(text.contains("Translation: 0.000000 0.000000 0.000000"));
        assert!(text.contains("Scale: 1.000000"));
        assert_eq!(text.lines().count(), 1 + 4 + 1 + 3 + 2);
        assert_eq!(report.timeline.position(Stage::Loading), Some(0));
    }

    #[test]
    fn test_run_writes_json_report() {
        let dir = tempdir().unwrap();
        let cloud = dir.path().join("cloud.xyz");
        let report_path = dir.path().join("report.json");
        write_cloud(&cloud);

        let cloud_arg = cloud.to_str().unwrap();
        let cli = Cli::try_parse_from([
            "cloud-align",
            "-s",
            cloud_arg,
            "-t",
            cloud_arg,
            "--voxel-size",
            "0",
            "--report",
            report_path.to_str().unwrap(),
        ])
        .unwrap();
        run(&cli).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(json["method"], "GICP");
        assert_eq!(json["status"], "converged");
        assert_eq!(json["export"], "skipped");
    }

    #[test]
    fn test_run_fails_on_missing_input() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.ply");
        let missing_arg = missing.to_str().unwrap();
        let cli = Cli::try_parse_from(["cloud-align", "-s", missing_arg, "-t", missing_arg])
            .unwrap();

        let err = run(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("loading"));
    }
}
