//! The two external collaborators the Store consumes: a component-descriptor
//! model and remote blob retrieval. Both are deliberately out of scope for
//! this crate — only the interfaces the Store calls through are modeled
//! here, the same way a chunk-retrieval trait describes fetching bytes
//! without caring how a concrete reader gets them.

use std::io::Write;

use crate::context::CancelToken;
use crate::error::{Result, StoreError};

/// Metadata about a remote blob: digest, media type, and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub digest: String,
    pub media_type: String,
    pub size: u64,
}

/// A component version: the repository context it was resolved from, its
/// name and version, and the resources (including blueprints) attached to
/// it.
pub trait ComponentVersion {
    fn name(&self) -> &str;
    fn version(&self) -> &str;

    /// Raw repository-context bytes, if the component carries one.
    fn repository_context(&self) -> Option<&[u8]>;

    /// Locates the named blueprint resource on this component version.
    fn find_resource(&self, blueprint_name: &str) -> Option<&dyn Resource>;
}

/// A single resource attached to a component version: here, a blueprint's
/// blob.
///
/// `Send + Sync` because [`BlobPipeline::extract`](crate::pipeline::BlobPipeline::extract)
/// hands a `&dyn Resource` across the scoped thread boundary to its producer.
pub trait Resource: Send + Sync {
    fn name(&self) -> &str;
    fn version(&self) -> &str;

    /// Fetches blob metadata (digest, media type, size) without downloading
    /// the blob itself.
    fn blob_info(&self, cancel: &CancelToken) -> Result<BlobInfo>;

    /// Streams the raw blob bytes into `writer`. Implementations must check
    /// `cancel` between chunks so a cancelled fetch unwinds promptly.
    fn stream_blob(&self, writer: &mut dyn Write, cancel: &CancelToken) -> Result<()>;
}

/// Finds the blueprint resource named `blueprint_name` on `component_version`,
/// turning "resource absent" into [`StoreError::NotFound`].
pub fn find_blueprint_resource<'a>(
    component_version: &'a dyn ComponentVersion,
    blueprint_name: &str,
) -> Result<&'a dyn Resource> {
    component_version
        .find_resource(blueprint_name)
        .ok_or(StoreError::NotFound)
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// A fixed component version/resource pair used across tests.
    pub struct StaticComponentVersion {
        name: String,
        version: String,
        repository_context: Option<Vec<u8>>,
        resources: Vec<StaticResource>,
    }

    impl StaticComponentVersion {
        pub fn new(name: &str, version: &str, repository_context: Option<Vec<u8>>) -> Self {
            Self {
                name: name.to_string(),
                version: version.to_string(),
                repository_context,
                resources: Vec::new(),
            }
        }

        pub fn with_resource(mut self, resource: StaticResource) -> Self {
            self.resources.push(resource);
            self
        }
    }

    impl ComponentVersion for StaticComponentVersion {
        fn name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> &str {
            &self.version
        }

        fn repository_context(&self) -> Option<&[u8]> {
            self.repository_context.as_deref()
        }

        fn find_resource(&self, blueprint_name: &str) -> Option<&dyn Resource> {
            self.resources
                .iter()
                .find(|r| r.name == blueprint_name)
                .map(|r| r as &dyn Resource)
        }
    }

    /// A resource whose blob bytes are fixed in memory and whose fetch count
    /// is observable, so tests can assert `BlobPipeline` ran at most once.
    #[derive(Clone)]
    pub struct StaticResource {
        name: String,
        version: String,
        media_type: String,
        digest: String,
        blob: Arc<Vec<u8>>,
        fetch_count: Arc<AtomicUsize>,
    }

    impl StaticResource {
        pub fn new(name: &str, version: &str) -> Self {
            Self {
                name: name.to_string(),
                version: version.to_string(),
                media_type: "application/x-tar".to_string(),
                digest: "sha256:teststub".to_string(),
                blob: Arc::new(Vec::new()),
                fetch_count: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn with_blob(mut self, blob: Vec<u8>, media_type: &str, digest: &str) -> Self {
            self.blob = Arc::new(blob);
            self.media_type = media_type.to_string();
            self.digest = digest.to_string();
            self
        }

        pub fn fetch_count(&self) -> usize {
            self.fetch_count.load(Ordering::SeqCst)
        }
    }

    impl Resource for StaticResource {
        fn name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> &str {
            &self.version
        }

        fn blob_info(&self, _cancel: &CancelToken) -> Result<BlobInfo> {
            Ok(BlobInfo {
                digest: self.digest.clone(),
                media_type: self.media_type.clone(),
                size: self.blob.len() as u64,
            })
        }

        fn stream_blob(&self, writer: &mut dyn Write, cancel: &CancelToken) -> Result<()> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            let mut reader: &[u8] = &self.blob;
            let mut chunk = [0u8; 4096];
            loop {
                if cancel.is_cancelled() {
                    return Err(StoreError::remote_blob(anyhow::anyhow!(
                        "blob fetch cancelled"
                    )));
                }
                let n = reader
                    .read(&mut chunk)
                    .map_err(|e| StoreError::remote_blob(anyhow::Error::from(e)))?;
                if n == 0 {
                    break;
                }
                writer
                    .write_all(&chunk[..n])
                    .map_err(|e| StoreError::remote_blob(anyhow::Error::from(e)))?;
            }
            Ok(())
        }
    }
}
