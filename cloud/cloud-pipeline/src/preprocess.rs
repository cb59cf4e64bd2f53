//! Downsampling of both clouds at one resolution.

use cloud_types::PointCloud;
use tracing::debug;

use crate::{CloudRole, PipelineError, PipelineResult};

/// Voxel-filters `source` and `target` with the same `voxel_size`.
///
/// A non-positive or non-finite size returns copies of the inputs.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyCloudAfterDownsample`] naming the first cloud
/// that has no points left.
pub fn prepare(
    source: &PointCloud,
    target: &PointCloud,
    voxel_size: f64,
) -> PipelineResult<(PointCloud, PointCloud)> {
    let source_down = downsample_one(source, voxel_size, CloudRole::Source)?;
    let target_down = downsample_one(target, voxel_size, CloudRole::Target)?;
    Ok((source_down, target_down))
}

fn downsample_one(
    cloud: &PointCloud,
    voxel_size: f64,
    role: CloudRole,
) -> PipelineResult<PointCloud> {
    let down = cloud.downsample(voxel_size);
    if down.is_empty() {
        return Err(PipelineError::EmptyCloudAfterDownsample { role, voxel_size });
    }
    debug!(%role, before = cloud.len(), after = down.len(), voxel_size, "downsampled");
    Ok(down)
}
