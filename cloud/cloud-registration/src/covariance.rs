//! Local surface statistics from k nearest neighbours.
//!
//! Both the point-to-plane and the generalized ICP solvers describe the
//! surface around each point through the covariance of its neighbourhood:
//! the eigenvector of the smallest eigenvalue is the normal, and the full
//! eigenbasis gives the plane-shaped covariance used by GICP.

use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use rayon::prelude::*;

use crate::PointIndex;

/// Default neighbourhood size.
pub const DEFAULT_K_NEIGHBORS: usize = 20;

/// Default eigenvalue assigned along the normal of a regularized covariance.
pub const DEFAULT_PLANE_EPSILON: f64 = 1e-3;

/// Sample covariance of the `k` nearest indexed points around `query`.
///
/// Returns `None` when fewer than three neighbours exist.
#[must_use]
pub fn local_covariance(
    index: &PointIndex,
    query: &Point3<f64>,
    k: usize,
) -> Option<Matrix3<f64>> {
    let neighbors = index.nearest_n(query, k);
    if neighbors.len() < 3 {
        return None;
    }

    let points = index.points();
    let sum: Vector3<f64> = neighbors.iter().map(|&i| points[i].coords).sum();
    #[allow(clippy::cast_precision_loss)]
    let n = neighbors.len() as f64;
    let mean = sum / n;

    let mut cov = Matrix3::zeros();
    for &i in &neighbors {
        let diff = points[i].coords - mean;
        cov += diff * diff.transpose();
    }
    Some(cov / n)
}

/// Eigenvectors as columns, ordered by ascending eigenvalue.
fn sorted_eigenvectors(cov: &Matrix3<f64>) -> Matrix3<f64> {
    let eigen = SymmetricEigen::new(*cov);
    let mut order = [0_usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let columns = order.map(|i| eigen.eigenvectors.column(i).into_owned());
    Matrix3::from_columns(&columns)
}

/// Unit normal of a neighbourhood covariance (eigenvector of the smallest
/// eigenvalue). Falls back to +Z for degenerate input.
#[must_use]
pub fn normal_from_covariance(cov: &Matrix3<f64>) -> Vector3<f64> {
    let vectors = sorted_eigenvectors(cov);
    vectors
        .column(0)
        .into_owned()
        .try_normalize(1e-10)
        .unwrap_or_else(Vector3::z)
}

/// Replaces the eigenvalues of `cov` by `(epsilon, 1, 1)`, keeping its
/// eigenvectors, so every neighbourhood becomes a thin disc of the same size.
#[must_use]
pub fn regularize_to_plane(cov: &Matrix3<f64>, epsilon: f64) -> Matrix3<f64> {
    let vectors = sorted_eigenvectors(cov);
    let diag = Matrix3::from_diagonal(&Vector3::new(epsilon, 1.0, 1.0));
    vectors * diag * vectors.transpose()
}

/// Estimates a unit normal for every point of `points` from its `k` nearest
/// neighbours in `index`.
#[must_use]
pub fn estimate_normals(
    points: &[Point3<f64>],
    index: &PointIndex,
    k: usize,
) -> Vec<Vector3<f64>> {
    points
        .par_iter()
        .map(|p| {
            local_covariance(index, p, k)
                .map_or_else(Vector3::z, |cov| normal_from_covariance(&cov))
        })
        .collect()
}

/// Plane-regularized covariance for every point of `points`.
///
/// Points with fewer than three neighbours get the identity, which treats them
/// as isotropic.
#[must_use]
pub fn plane_covariances(
    points: &[Point3<f64>],
    index: &PointIndex,
    k: usize,
    epsilon: f64,
) -> Vec<Matrix3<f64>> {
    points
        .par_iter()
        .map(|p| {
            local_covariance(index, p, k).map_or_else(Matrix3::identity, |cov| {
                regularize_to_plane(&cov, epsilon)
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Noisy samples of the tilted plane z = 0.3x - 0.2y.
    fn tilted_plane(n: usize) -> Vec<Point3<f64>> {
        let mut rng = StdRng::seed_from_u64(5);
        (0..n)
            .map(|_| {
                let x: f64 = rng.gen_range(-1.0..1.0);
                let y: f64 = rng.gen_range(-1.0..1.0);
                let noise: f64 = rng.gen_range(-1e-4..1e-4);
                Point3::new(x, y, 0.3 * x - 0.2 * y + noise)
            })
            .collect()
    }

    fn plane_normal() -> Vector3<f64> {
        Vector3::new(-0.3, 0.2, 1.0).normalize()
    }

    #[test]
    fn test_normals_on_plane() {
        let points = tilted_plane(300);
        let index = PointIndex::new(&points);
        let normals = estimate_normals(&points, &index, DEFAULT_K_NEIGHBORS);

        for normal in &normals {
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-9);
            assert!(normal.dot(&plane_normal()).abs() > 0.99);
        }
    }

    #[test]
    fn test_regularized_covariance_shape() {
        let points = tilted_plane(300);
        let index = PointIndex::new(&points);
        let covs =
            plane_covariances(&points, &index, DEFAULT_K_NEIGHBORS, DEFAULT_PLANE_EPSILON);

        let n = plane_normal();
        let cov = &covs[0];
        assert!((cov * n).norm() < 1e-2);
        assert_relative_eq!(cov.trace(), 2.0 + DEFAULT_PLANE_EPSILON, epsilon = 1e-9);
        assert_relative_eq!(*cov, cov.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_too_few_neighbours() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.5, 0.25)];
        let index = PointIndex::new(&points);

        assert!(local_covariance(&index, &points[0], 10).is_none());
        assert_eq!(estimate_normals(&points, &index, 10), vec![Vector3::z(); 2]);
        assert_eq!(
            plane_covariances(&points, &index, 10, 1e-3),
            vec![Matrix3::identity(); 2]
        );
    }
}
