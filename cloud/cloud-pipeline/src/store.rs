//! Where clouds are read from and written to.

use std::path::Path;

use cloud_io::IoResult;
use cloud_types::PointCloud;

/// Cloud persistence used by the pipeline.
///
/// [`FileStore`] reads and writes files; tests substitute an in-memory store
/// to observe writes.
pub trait CloudStore {
    /// Loads the cloud at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cloud cannot be read or is empty.
    fn load(&self, path: &Path) -> IoResult<PointCloud>;

    /// Saves `cloud` to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the cloud cannot be written.
    fn save(&mut self, cloud: &PointCloud, path: &Path) -> IoResult<()>;
}

/// Filesystem store; the format follows the file extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl CloudStore for FileStore {
    fn load(&self, path: &Path) -> IoResult<PointCloud> {
        cloud_io::load_cloud(path)
    }

    fn save(&mut self, cloud: &PointCloud, path: &Path) -> IoResult<()> {
        cloud_io::save_cloud(cloud, path)
    }
}
