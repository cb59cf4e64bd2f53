//! Point cloud file I/O.
//!
//! Loading and saving of point clouds in two formats:
//!
//! - **PLY** (Polygon File Format) - ASCII and binary; only the `vertex`
//!   element is used
//! - **XYZ** - line-oriented ASCII (`.xyz`, `.txt`, `.pts`)
//!
//! [`load_cloud`] and [`save_cloud`] pick the format from the file extension.
//! [`load_cloud`] also guarantees the returned cloud is non-empty and finite.
//!
//! # Example
//!
//! ```no_run
//! use cloud_io::{load_cloud, save_cloud};
//!
//! let cloud = load_cloud("scan.ply").unwrap();
//! save_cloud(&cloud, "scan.xyz").unwrap();
//! ```

#![warn(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod error;
mod ply;
mod xyz;

pub use error::{IoError, IoResult};
pub use ply::{load_ply, save_ply};
pub use xyz::{load_xyz, save_xyz};

use std::path::Path;

use cloud_types::PointCloud;
use tracing::debug;

/// Supported point cloud file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudFormat {
    /// PLY (Polygon File Format), ASCII or binary.
    Ply,
    /// Whitespace-separated ASCII columns.
    Xyz,
}

impl CloudFormat {
    /// Detect the format from a bare extension (case-insensitive).
    ///
    /// ```
    /// use cloud_io::CloudFormat;
    ///
    /// assert_eq!(CloudFormat::from_extension("PLY"), Some(CloudFormat::Ply));
    /// assert_eq!(CloudFormat::from_extension("pts"), Some(CloudFormat::Xyz));
    /// assert_eq!(CloudFormat::from_extension("obj"), None);
    /// ```
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ply" => Some(Self::Ply),
            "xyz" | "txt" | "pts" => Some(Self::Xyz),
            _ => None,
        }
    }

    /// Detect the format from a file path.
    #[must_use]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the canonical file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Ply => "ply",
            Self::Xyz => "xyz",
        }
    }
}

fn detect(path: &Path) -> IoResult<CloudFormat> {
    CloudFormat::from_path(path).ok_or_else(|| IoError::UnknownFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a point cloud, detecting the format from the extension.
///
/// # Errors
///
/// Returns an error if:
/// - The extension is not a known format
/// - The file is missing or cannot be read
/// - The content does not parse, or holds a NaN/infinite coordinate
/// - The file contains no points
pub fn load_cloud<P: AsRef<Path>>(path: P) -> IoResult<PointCloud> {
    let path = path.as_ref();
    let format = detect(path)?;

    let cloud = match format {
        CloudFormat::Ply => load_ply(path)?,
        CloudFormat::Xyz => load_xyz(path)?,
    };

    if cloud.is_empty() {
        return Err(IoError::EmptyCloud {
            path: path.to_path_buf(),
        });
    }
    if let Some(index) = cloud.points.iter().position(|p| !p.is_finite()) {
        return Err(IoError::invalid_content(format!(
            "point {index} has a non-finite coordinate"
        )));
    }

    debug!(
        path = %path.display(),
        ?format,
        points = cloud.len(),
        normals = cloud.has_normals(),
        "loaded point cloud"
    );
    Ok(cloud)
}

/// Save a point cloud, detecting the format from the extension.
///
/// PLY output is binary little-endian.
///
/// # Errors
///
/// Returns an error if the extension is not a known format or the file cannot
/// be written.
pub fn save_cloud<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> IoResult<()> {
    let path = path.as_ref();
    match detect(path)? {
        CloudFormat::Ply => save_ply(cloud, path, true)?,
        CloudFormat::Xyz => save_xyz(cloud, path)?,
    }
    debug!(path = %path.display(), points = cloud.len(), "saved point cloud");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cloud_types::Point3;
    use tempfile::tempdir;

    #[test]
    fn format_from_path() {
        assert_eq!(CloudFormat::from_path("a/b/scan.ply"), Some(CloudFormat::Ply));
        assert_eq!(CloudFormat::from_path("scan.XYZ"), Some(CloudFormat::Xyz));
        assert_eq!(CloudFormat::from_path("scan.txt"), Some(CloudFormat::Xyz));
        assert_eq!(CloudFormat::from_path("noextension"), None);
    }

    #[test]
    fn extension_roundtrip() {
        for format in [CloudFormat::Ply, CloudFormat::Xyz] {
            assert_eq!(CloudFormat::from_extension(format.extension()), Some(format));
        }
    }

    #[test]
    fn unknown_extension() {
        let result = load_cloud("model.stl");
        assert!(matches!(result, Err(IoError::UnknownFormat { extension }) if extension == "stl"));
    }

    #[test]
    fn missing_file() {
        let result = load_cloud("/no/such/dir/scan.ply");
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xyz");
        std::fs::write(&path, "# nothing here\n").unwrap();

        assert!(matches!(load_cloud(&path), Err(IoError::EmptyCloud { .. })));
    }

    #[test]
    fn non_finite_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nan.xyz");
        std::fs::write(&path, "0 0 0\nNaN 1 2\n").unwrap();

        let err = load_cloud(&path).unwrap_err();
        assert!(err.to_string().contains("point 1"));
    }

    #[test]
    fn save_then_load_both_formats() {
        let dir = tempdir().unwrap();
        let cloud = PointCloud::from_positions(&[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 3.0),
        ]);

        for name in ["out.ply", "out.xyz"] {
            let path = dir.path().join(name);
            save_cloud(&cloud, &path).unwrap();
            let loaded = load_cloud(&path).unwrap();
            assert_eq!(loaded.positions(), cloud.positions());
        }
    }

    #[test]
    fn save_unknown_extension() {
        let dir = tempdir().unwrap();
        let cloud = PointCloud::from_positions(&[Point3::origin()]);
        let result = save_cloud(&cloud, dir.path().join("out.obj"));
        assert!(matches!(result, Err(IoError::UnknownFormat { .. })));
    }
}
