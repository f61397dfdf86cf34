//! File handles returned by the image store.
//!
//! A handle is either a local EPS file that was written for the event, or a
//! reference to an object already held by the remote object store. Handles
//! are owned by the caller; releasing them is scoped:
//!
//! - [`LocalFile::persist`] keeps the file on disk and gives back its path
//! - [`LocalFile::destroy`] removes it and reports any error
//! - dropping a scratch [`LocalFile`] removes it silently

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handle to a stored event image
#[derive(Debug)]
pub enum FileHandle {
    Local(LocalFile),
    Remote(RemoteFile),
}

impl FileHandle {
    /// Logical file name: the local file name, or the remote object id
    pub fn name(&self) -> &str {
        match self {
            FileHandle::Local(file) => file.name(),
            FileHandle::Remote(file) => file.name(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, FileHandle::Local(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, FileHandle::Remote(_))
    }

    pub fn as_local(&self) -> Option<&LocalFile> {
        match self {
            FileHandle::Local(file) => Some(file),
            FileHandle::Remote(_) => None,
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteFile> {
        match self {
            FileHandle::Remote(file) => Some(file),
            FileHandle::Local(_) => None,
        }
    }

    /// Release the handle and its underlying resource
    pub fn destroy(self) -> io::Result<()> {
        match self {
            FileHandle::Local(file) => file.destroy(),
            FileHandle::Remote(file) => {
                file.destroy();
                Ok(())
            }
        }
    }
}

/// Image bytes written to local disk
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    len: u64,
    /// Whether the file outlives this handle
    keep: bool,
}

impl LocalFile {
    pub(crate) fn new(path: PathBuf, len: u64, keep: bool) -> Self {
        Self { path, len, keep }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Number of image bytes written
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the stored bytes back
    pub fn read(&self) -> io::Result<Vec<u8>> {
        fs::read(&self.path)
    }

    /// Keep the file after the handle is gone and return its path
    pub fn persist(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }

    /// Remove the file from disk
    pub fn destroy(mut self) -> io::Result<()> {
        // Drop must not try a second removal
        self.keep = true;
        fs::remove_file(&self.path)?;
        debug!(path = %self.path.display(), "Local image file removed");
        Ok(())
    }
}

impl Drop for LocalFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }

        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove scratch image file"
                );
            }
        }
    }
}

/// Reference to an image object in the remote object store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    object_id: String,
    bucket_id: String,
}

impl RemoteFile {
    pub(crate) fn new(object_id: String, bucket_id: String) -> Self {
        Self {
            object_id,
            bucket_id,
        }
    }

    /// Object id within the bucket
    pub fn name(&self) -> &str {
        &self.object_id
    }

    pub fn bucket(&self) -> &str {
        &self.bucket_id
    }

    /// Resource locator in `bucket/object` form
    pub fn resource(&self) -> String {
        format!("{}/{}", self.bucket_id, self.object_id)
    }

    pub fn s3_uri(&self) -> String {
        format!("s3://{}", self.resource())
    }

    /// Release the reference. No object store I/O happens here.
    pub fn destroy(self) {
        debug!(resource = %self.resource(), "Remote image reference released");
    }
}
