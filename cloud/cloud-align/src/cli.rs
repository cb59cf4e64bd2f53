//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use cloud_pipeline::{RegistrationConfig, DEFAULT_VOXEL_SIZE};
use cloud_registration::AlignmentMethod;

/// Register a source point cloud onto a target point cloud.
///
/// Prints the 4x4 source-to-target transform and, when an output file is
/// given, writes the transformed full-resolution source there.
#[derive(Debug, Parser)]
#[command(name = "cloud-align")]
#[command(version, about, long_about = None)]
#[command(allow_negative_numbers = true)]
pub struct Cli {
    /// Moving cloud (PLY or XYZ)
    #[arg(short = 's', long, alias = "sourceFile")]
    pub source_file: PathBuf,

    /// Fixed cloud (PLY or XYZ)
    #[arg(short = 't', long, alias = "targetFile")]
    pub target_file: PathBuf,

    /// Where to write the transformed source; omit to only print the transform
    #[arg(short = 'o', long, alias = "outputFile")]
    pub output_file: Option<PathBuf>,

    /// Alignment method: GICP, ICP or ICP_NORMALS
    #[arg(short = 'm', long, default_value = "GICP")]
    pub method: AlignmentMethod,

    /// Explicit source-to-target scale; wins over the measurements unless 1.0
    #[arg(long, alias = "scaleRatio", default_value_t = 1.0)]
    pub scale_ratio: f64,

    /// A length measured in the source cloud
    #[arg(long, alias = "sourceMeasurement", default_value_t = 1.0)]
    pub source_measurement: f64,

    /// The same length measured in the target cloud
    #[arg(long, alias = "targetMeasurement", default_value_t = 1.0)]
    pub target_measurement: f64,

    /// Voxel edge length for downsampling; 0 or less disables it
    #[arg(long, alias = "voxelSize", default_value_t = DEFAULT_VOXEL_SIZE)]
    pub voxel_size: f64,

    /// Log per-stage durations
    #[arg(long, alias = "showTimeline", default_value_t = true, action = ArgAction::Set)]
    pub show_timeline: bool,

    /// Log verbosity
    #[arg(
        short = 'v',
        long,
        alias = "verboseLevel",
        value_enum,
        default_value_t = VerboseLevel::Info
    )]
    pub verbose_level: VerboseLevel,

    /// Override the method's iteration cap
    #[arg(long, alias = "maxIterations")]
    pub max_iterations: Option<u32>,

    /// Reject correspondences farther apart than this
    #[arg(long, alias = "maxCorrespondenceDistance")]
    pub max_correspondence_distance: Option<f64>,

    /// Also write the full run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Log verbosity names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerboseLevel {
    /// Only unrecoverable failures.
    Fatal,
    /// Errors.
    Error,
    /// Errors and warnings, such as non-convergence.
    Warning,
    /// Stage progress and the timeline.
    Info,
    /// Per-cloud details.
    Debug,
    /// Per-iteration solver output.
    Trace,
}

impl VerboseLevel {
    /// `tracing` filter directive for this level.
    ///
    /// `tracing` has no level above error, so `fatal` maps to `error`.
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Fatal | Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Cli {
    /// Builds the pipeline configuration.
    #[must_use]
    pub fn to_config(&self) -> RegistrationConfig {
        let mut config = RegistrationConfig::new(&self.source_file, &self.target_file)
            .with_method(self.method)
            .with_voxel_size(self.voxel_size)
            .with_scale_ratio(self.scale_ratio)
            .with_measurements(self.source_measurement, self.target_measurement)
            .with_show_timeline(self.show_timeline);
        if let Some(path) = &self.output_file {
            config = config.with_output_path(path);
        }
        if let Some(n) = self.max_iterations {
            config = config.with_max_iterations(n);
        }
        if let Some(d) = self.max_correspondence_distance {
            config = config.with_max_correspondence_distance(d);
        }
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["cloud-align", "-s", "a.ply", "-t", "b.ply"]).unwrap();

        assert_eq!(cli.method, AlignmentMethod::Gicp);
        assert_eq!(cli.scale_ratio, 1.0);
        assert_eq!(cli.voxel_size, 0.1);
        assert!(cli.show_timeline);
        assert_eq!(cli.verbose_level, VerboseLevel::Info);
        assert!(cli.output_file.is_none());
        assert!(cli.report.is_none());
    }

    #[test]
    fn test_camel_case_aliases() {
        let cli = Cli::try_parse_from([
            "cloud-align",
            "--sourceFile",
            "a.xyz",
            "--targetFile",
            "b.xyz",
            "--outputFile",
            "c.ply",
            "--sourceMeasurement",
            "2",
            "--targetMeasurement",
            "6",
            "--voxelSize",
            "0.25",
            "--showTimeline",
            "false",
            "--verboseLevel",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.source_file, PathBuf::from("a.xyz"));
        assert_eq!(cli.output_file, Some(PathBuf::from("c.ply")));
        assert_eq!(cli.source_measurement, 2.0);
        assert_eq!(cli.target_measurement, 6.0);
        assert_eq!(cli.voxel_size, 0.25);
        assert!(!cli.show_timeline);
        assert_eq!(cli.verbose_level, VerboseLevel::Debug);
    }

    #[test]
    fn test_method_names() {
        for (name, method) in [
            ("icp", AlignmentMethod::Icp),
            ("ICP_NORMALS", AlignmentMethod::IcpNormals),
            ("Gicp", AlignmentMethod::Gicp),
        ] {
            let cli =
                Cli::try_parse_from(["cloud-align", "-s", "a", "-t", "b", "-m", name]).unwrap();
            assert_eq!(cli.method, method);
        }
        assert!(Cli::try_parse_from(["cloud-align", "-s", "a", "-t", "b", "-m", "ndt"]).is_err());
    }

    #[test]
    fn test_required_files() {
        assert!(Cli::try_parse_from(["cloud-align", "-s", "a.ply"]).is_err());
        assert!(Cli::try_parse_from(["cloud-align", "-t", "b.ply"]).is_err());
    }

    #[test]
    fn test_negative_voxel_size() {
        let cli = Cli::try_parse_from(["cloud-align", "-s", "a", "-t", "b", "--voxel-size", "-1"])
            .unwrap();
        let config = cli.to_config();
        assert!(!config.downsampling_enabled());
    }

    #[test]
    fn test_verbose_levels() {
        let cli =
            Cli::try_parse_from(["cloud-align", "-s", "a", "-t", "b", "-v", "warning"]).unwrap();
        assert_eq!(cli.verbose_level.directive(), "warn");
        assert_eq!(VerboseLevel::Fatal.directive(), "error");
        assert!(Cli::try_parse_from(["cloud-align", "-s", "a", "-t", "b", "-v", "loud"]).is_err());
    }

    #[test]
    fn test_to_config() {
        let cli = Cli::try_parse_from([
            "cloud-align",
            "-s",
            "a.ply",
            "-t",
            "b.ply",
            "-o",
            "out.xyz",
            "-m",
            "icp",
            "--scale-ratio",
            "2.5",
            "--max-iterations",
            "12",
            "--max-correspondence-distance",
            "0.3",
        ])
        .unwrap();

        let config = cli.to_config();

        assert_eq!(config.source_path, PathBuf::from("a.ply"));
        assert_eq!(config.output_path, Some(PathBuf::from("out.xyz")));
        assert_eq!(config.method, AlignmentMethod::Icp);
        assert_eq!(config.scale_ratio, 2.5);
        assert_eq!(config.max_iterations, Some(12));
        assert_eq!(config.max_correspondence_distance, Some(0.3));
    }
}
