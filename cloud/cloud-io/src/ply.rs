//! PLY (Polygon File Format) point cloud support.
//!
//! Only the `vertex` element is read. Recognized properties:
//!
//! - `x`, `y`, `z` - required, any numeric scalar type
//! - `nx`, `ny`, `nz` - optional normal
//! - `red`, `green`, `blue` - optional 8-bit color
//!
//! Faces and other elements are ignored, so meshes load as their vertex cloud.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use cloud_types::{CloudPoint, PointCloud, PointColor};
use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{
    Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
    ScalarType,
};
use ply_rs::writer::Writer;

use crate::error::{IoError, IoResult};

const COMMENT: &str = "Generated by cloud-io";

/// Load a point cloud from a PLY file.
///
/// Supports ASCII, binary little-endian, and binary big-endian encodings.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid PLY, or a
/// vertex lacks one of `x`, `y`, `z`.
pub fn load_ply<P: AsRef<Path>>(path: P) -> IoResult<PointCloud> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::from_open(e, path))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();
    let header = parser
        .read_header(&mut reader)
        .map_err(|e| IoError::invalid_content(format!("failed to parse PLY header: {e}")))?;
    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| IoError::invalid_content(format!("failed to read PLY payload: {e}")))?;

    let Some(vertices) = payload.get("vertex") else {
        return Ok(PointCloud::new());
    };

    let mut cloud = PointCloud::with_capacity(vertices.len());
    for (index, element) in vertices.iter().enumerate() {
        let position = read_vector(element, ["x", "y", "z"]).ok_or_else(|| {
            IoError::invalid_content(format!("vertex {index}: missing x, y or z"))
        })?;

        let mut point = CloudPoint::new(Point3::from(position));
        point.normal = read_vector(element, ["nx", "ny", "nz"]);
        point.color = read_color(element);
        cloud.push(point);
    }

    Ok(cloud)
}

fn read_vector(element: &DefaultElement, keys: [&str; 3]) -> Option<Vector3<f64>> {
    Some(Vector3::new(
        scalar(element.get(keys[0])?)?,
        scalar(element.get(keys[1])?)?,
        scalar(element.get(keys[2])?)?,
    ))
}

fn read_color(element: &DefaultElement) -> Option<PointColor> {
    let channel = |key: &str| match element.get(key)? {
        Property::UChar(v) => Some(*v),
        _ => None,
    };
    Some(PointColor::new(
        channel("red")?,
        channel("green")?,
        channel("blue")?,
    ))
}

fn scalar(property: &Property) -> Option<f64> {
    match property {
        Property::Char(v) => Some(f64::from(*v)),
        Property::UChar(v) => Some(f64::from(*v)),
        Property::Short(v) => Some(f64::from(*v)),
        Property::UShort(v) => Some(f64::from(*v)),
        Property::Int(v) => Some(f64::from(*v)),
        Property::UInt(v) => Some(f64::from(*v)),
        Property::Float(v) => Some(f64::from(*v)),
        Property::Double(v) => Some(*v),
        _ => None,
    }
}

/// Save a point cloud to a PLY file.
///
/// Positions are written as `double`, normals as `float` and colors as
/// `uchar`. Normal and color properties are only declared when every point
/// carries them.
///
/// # Arguments
///
/// * `cloud` - The cloud to save
/// * `path` - Output file path
/// * `binary` - If true, save as binary little-endian; if false, save as ASCII
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_ply<P: AsRef<Path>>(cloud: &PointCloud, path: P, binary: bool) -> IoResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    if binary {
        save_ply_binary(cloud, &mut writer)?;
    } else {
        save_ply_ascii(cloud, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Binary little-endian writer.
///
/// Written by hand so the property layout matches the header exactly.
#[allow(clippy::cast_possible_truncation)]
fn save_ply_binary<W: Write>(cloud: &PointCloud, writer: &mut W) -> IoResult<()> {
    let with_normals = cloud.has_normals();
    let with_colors = cloud.has_colors();

    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "comment {COMMENT}")?;
    writeln!(writer, "element vertex {}", cloud.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(writer, "property double {axis}")?;
    }
    if with_normals {
        for axis in ["nx", "ny", "nz"] {
            writeln!(writer, "property float {axis}")?;
        }
    }
    if with_colors {
        for channel in ["red", "green", "blue"] {
            writeln!(writer, "property uchar {channel}")?;
        }
    }
    writeln!(writer, "end_header")?;

    for point in &cloud.points {
        for c in point.position.iter() {
            writer.write_all(&c.to_le_bytes())?;
        }
        if let (true, Some(n)) = (with_normals, point.normal) {
            for c in n.iter() {
                writer.write_all(&(*c as f32).to_le_bytes())?;
            }
        }
        if let (true, Some(color)) = (with_colors, point.color) {
            writer.write_all(&[color.r, color.g, color.b])?;
        }
    }

    Ok(())
}

/// ASCII writer on top of ply-rs.
#[allow(clippy::cast_possible_truncation)]
fn save_ply_ascii<W: Write>(cloud: &PointCloud, writer: &mut W) -> IoResult<()> {
    let with_normals = cloud.has_normals();
    let with_colors = cloud.has_colors();

    let mut ply = Ply::<DefaultElement>::new();
    ply.header.encoding = Encoding::Ascii;
    ply.header.comments.push(COMMENT.to_string());

    let mut vertex_def = ElementDef::new("vertex".to_string());
    let mut declare = |name: &str, ty: ScalarType| {
        vertex_def
            .properties
            .add(PropertyDef::new(name.to_string(), PropertyType::Scalar(ty)));
    };
    for axis in ["x", "y", "z"] {
        declare(axis, ScalarType::Double);
    }
    if with_normals {
        for axis in ["nx", "ny", "nz"] {
            declare(axis, ScalarType::Float);
        }
    }
    if with_colors {
        for channel in ["red", "green", "blue"] {
            declare(channel, ScalarType::UChar);
        }
    }
    vertex_def.count = cloud.len();
    ply.header.elements.add(vertex_def);

    let mut elements = Vec::with_capacity(cloud.len());
    for point in &cloud.points {
        let mut element = DefaultElement::new();
        let p = &point.position;
        element.insert("x".to_string(), Property::Double(p.x));
        element.insert("y".to_string(), Property::Double(p.y));
        element.insert("z".to_string(), Property::Double(p.z));

        if let (true, Some(n)) = (with_normals, point.normal) {
            element.insert("nx".to_string(), Property::Float(n.x as f32));
            element.insert("ny".to_string(), Property::Float(n.y as f32));
            element.insert("nz".to_string(), Property::Float(n.z as f32));
        }
        if let (true, Some(c)) = (with_colors, point.color) {
            element.insert("red".to_string(), Property::UChar(c.r));
            element.insert("green".to_string(), Property::UChar(c.g));
            element.insert("blue".to_string(), Property::UChar(c.b));
        }
        elements.push(element);
    }
    ply.payload.insert("vertex".to_string(), elements);

    Writer::new()
        .write_ply(writer, &mut ply)
        .map_err(|e| IoError::invalid_content(format!("failed to write PLY: {e}")))?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    fn sample_cloud() -> PointCloud {
        let normals = [Vector3::x(), Vector3::y(), Vector3::z()];
        (0_u8..3)
            .zip(normals)
            .map(|(i, normal)| {
                let position = Point3::new(f64::from(i), 123_456.789, -0.125);
                CloudPoint::new(position)
                    .with_normal(normal)
                    .with_color(PointColor::new(10 * i, 200, 255))
            })
            .collect()
    }

    fn assert_same(original: &PointCloud, loaded: &PointCloud) {
        assert_eq!(original.len(), loaded.len());
        for (a, b) in original.points.iter().zip(&loaded.points) {
            assert_relative_eq!(a.position.coords, b.position.coords, epsilon = 1e-9);
            assert_relative_eq!(a.normal.unwrap(), b.normal.unwrap(), epsilon = 1e-6);
            assert_eq!(a.color, b.color);
        }
    }

    #[test]
    fn roundtrip_binary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        let cloud = sample_cloud();

        save_ply(&cloud, &path, true).unwrap();
        assert_same(&cloud, &load_ply(&path).unwrap());
    }

    #[test]
    fn roundtrip_ascii() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud_ascii.ply");
        let cloud = sample_cloud();

        save_ply(&cloud, &path, false).unwrap();
        assert_same(&cloud, &load_ply(&path).unwrap());
    }

    #[test]
    fn positions_only_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bare.ply");
        let cloud = PointCloud::from_positions(&[Point3::new(1.0, 2.0, 3.0)]);

        save_ply(&cloud, &path, true).unwrap();
        let loaded = load_ply(&path).unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(loaded.points[0].normal.is_none());
        assert!(loaded.points[0].color.is_none());
    }

    #[test]
    fn reads_float_mesh_vertices() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mesh.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar int vertex_indices\n\
             end_header\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n",
        )
        .unwrap();

        let cloud = load_ply(&path).unwrap();
        assert_eq!(cloud.len(), 3);
        assert_relative_eq!(cloud.points[1].position.x, 1.0);
    }

    #[test]
    fn missing_coordinate_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noz.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\n\
             end_header\n0 0\n",
        )
        .unwrap();

        assert!(matches!(
            load_ply(&path),
            Err(IoError::InvalidContent { .. })
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.ply");
        std::fs::write(&path, "this is not a ply file\n").unwrap();

        assert!(matches!(
            load_ply(&path),
            Err(IoError::InvalidContent { .. })
        ));
    }

    #[test]
    fn load_nonexistent_file() {
        let result = load_ply("nonexistent_file_12345.ply");
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }
}
