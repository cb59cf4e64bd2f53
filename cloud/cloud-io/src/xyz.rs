//! XYZ ASCII point cloud support.
//!
//! One point per line: `x y z [nx ny nz] [r g b]`. Blank lines and lines
//! starting with `#` or `//` are ignored, as are lines with fewer than three
//! fields (the point count header of `.pts` files).
//!
//! Six columns are read as a position plus a normal. Colors are only read
//! from nine-column lines; a zero normal in those columns means "no normal".

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use cloud_types::{CloudPoint, PointCloud, PointColor};
use nalgebra::{Point3, Vector3};

use crate::error::{IoError, IoResult};

/// Load a point cloud from an XYZ file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a coordinate fails to parse.
pub fn load_xyz<P: AsRef<Path>>(path: P) -> IoResult<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::from_open(e, path))?;
    read_xyz(BufReader::new(file))
}

fn read_xyz<R: BufRead>(reader: R) -> IoResult<PointCloud> {
    let mut cloud = PointCloud::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 3 {
            continue;
        }

        let [x, y, z] = parse_triple::<f64>(&parts[0..3]).ok_or_else(|| {
            IoError::invalid_content(format!("line {}: invalid coordinates", index + 1))
        })?;
        let mut point = CloudPoint::new(Point3::new(x, y, z));

        if parts.len() >= 6 {
            if let Some([nx, ny, nz]) = parse_triple::<f64>(&parts[3..6]) {
                let normal = Vector3::new(nx, ny, nz);
                if normal.norm_squared() > 0.0 {
                    point.normal = Some(normal);
                }
            }
        }

        if parts.len() >= 9 {
            if let Some([r, g, b]) = parse_triple::<u8>(&parts[6..9]) {
                point.color = Some(PointColor::new(r, g, b));
            }
        }

        cloud.push(point);
    }

    Ok(cloud)
}

fn parse_triple<T: std::str::FromStr>(fields: &[&str]) -> Option<[T; 3]> {
    match fields {
        [a, b, c] => Some([a.parse().ok()?, b.parse().ok()?, c.parse().ok()?]),
        _ => None,
    }
}

/// Save a point cloud to an XYZ file.
///
/// Normal columns are written when any point has a normal or a color; points
/// without one get `0 0 0`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_xyz<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> IoResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_xyz(cloud, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write_xyz<W: Write>(cloud: &PointCloud, writer: &mut W) -> IoResult<()> {
    let has_colors = cloud.points.iter().any(CloudPoint::has_color);
    let has_normals = has_colors || cloud.points.iter().any(CloudPoint::has_normal);

    writeln!(writer, "# cloud-io xyz")?;
    match (has_normals, has_colors) {
        (_, true) => writeln!(writer, "# x y z nx ny nz r g b")?,
        (true, false) => writeln!(writer, "# x y z nx ny nz")?,
        (false, false) => writeln!(writer, "# x y z")?,
    }

    for point in &cloud.points {
        let p = &point.position;
        write!(writer, "{} {} {}", p.x, p.y, p.z)?;

        if has_normals {
            let n = point.normal.unwrap_or_else(Vector3::zeros);
            write!(writer, " {} {} {}", n.x, n.y, n.z)?;
        }

        if has_colors {
            let c = point.color.unwrap_or_default();
            write!(writer, " {} {} {}", c.r, c.g, c.b)?;
        }

        writeln!(writer)?;
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn parse(text: &str) -> IoResult<PointCloud> {
        read_xyz(text.as_bytes())
    }

    #[test]
    fn test_plain_positions() {
        let cloud = parse("0 0 0\n1.5 -2 3e2\n").unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[1].position, Point3::new(1.5, -2.0, 300.0));
        assert!(!cloud.points[0].has_normal());
    }

    #[test]
    fn test_comments_and_count_header() {
        let text = "# comment\n// another\n\n2\n0 0 0\n1 1 1\n";
        let cloud = parse(text).unwrap();
        assert_eq!(cloud.len(), 2);
    }

    #[test]
    fn test_normals_and_colors() {
        let cloud = parse("0 0 0 0 0 1 255 128 0\n1 0 0 0 0 0 10 20 30\n").unwrap();

        assert_eq!(cloud.points[0].normal, Some(Vector3::z()));
        assert_eq!(cloud.points[0].color, Some(PointColor::new(255, 128, 0)));
        assert!(cloud.points[1].normal.is_none());
        assert_eq!(cloud.points[1].color, Some(PointColor::new(10, 20, 30)));
    }

    #[test]
    fn test_six_columns_are_normals() {
        let cloud = parse("0 0 0 0 1 0\n").unwrap();
        assert_eq!(cloud.points[0].normal, Some(Vector3::y()));
        assert!(cloud.points[0].color.is_none());
    }

    #[test]
    fn test_bad_coordinate_reports_line() {
        let err = parse("0 0 0\n1 abc 2\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_roundtrip_with_colors_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("colors.xyz");

        let mut point = CloudPoint::from_coords(0.25, 0.5, 0.75);
        point.color = Some(PointColor::new(1, 2, 3));
        let cloud: PointCloud = vec![point].into_iter().collect();

        save_xyz(&cloud, &path).unwrap();
        let loaded = load_xyz(&path).unwrap();

        assert_eq!(loaded.points[0].color, Some(PointColor::new(1, 2, 3)));
        assert!(loaded.points[0].normal.is_none());
    }

    #[test]
    fn test_roundtrip_positions_and_normals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("normals.xyz");

        let cloud: PointCloud = vec![
            CloudPoint::new(Point3::new(0.1, 0.2, 0.3)).with_normal(Vector3::x()),
            CloudPoint::new(Point3::new(-4.0, 5.5, 6.25)).with_normal(Vector3::z()),
        ]
        .into_iter()
        .collect();

        save_xyz(&cloud, &path).unwrap();
        let loaded = load_xyz(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        for (a, b) in cloud.points.iter().zip(&loaded.points) {
            assert_relative_eq!(a.position.coords, b.position.coords, epsilon = 1e-12);
            assert_eq!(a.normal, b.normal);
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load_xyz("definitely_missing_cloud.xyz");
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }
}
