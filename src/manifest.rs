//! The decoded `blueprint.yaml` manifest and the read-only handle consumers
//! get back from `fetch`/`get`/`store`: read the manifest file, decode it,
//! and hand back a value rooted at the cache entry's directory — the Store
//! treats the manifest body as opaque beyond that.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::filesystem::Filesystem;

pub const MANIFEST_FILE_NAME: &str = "blueprint.yaml";

/// The decoded contents of `blueprint.yaml`. Kept as an opaque YAML value —
/// the Store has no business interpreting blueprint schema.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintManifest {
    value: serde_yaml::Value,
}

impl BlueprintManifest {
    pub fn decode(raw: &[u8]) -> Result<Self> {
        let value = serde_yaml::from_slice(raw)
            .map_err(|e| StoreError::decoding(anyhow::Error::from(e)))?;
        Ok(Self { value })
    }

    pub fn as_value(&self) -> &serde_yaml::Value {
        &self.value
    }
}

/// A read-only view of a cache entry rooted at `/<id>/` on the backing
/// filesystem, plus its decoded manifest. Writes don't exist on this type
/// by construction: it only exposes reads.
#[derive(Clone)]
pub struct BlueprintHandle {
    id: String,
    root: PathBuf,
    fs: Arc<dyn Filesystem>,
    manifest: Arc<BlueprintManifest>,
}

impl BlueprintHandle {
    /// Builds a handle for `id`, reading and decoding `<id>/blueprint.yaml`
    /// eagerly. Fails if the manifest is missing or undecodable.
    pub fn open(fs: Arc<dyn Filesystem>, id: &str) -> Result<Self> {
        let root = PathBuf::from("/").join(id);
        let manifest_path = root.join(MANIFEST_FILE_NAME);
        let raw = fs
            .read_file(&manifest_path)
            .map_err(|e| StoreError::filesystem(manifest_path, e))?;
        let manifest = BlueprintManifest::decode(&raw)?;
        Ok(Self {
            id: id.to_string(),
            root,
            fs,
            manifest: Arc::new(manifest),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn manifest(&self) -> &BlueprintManifest {
        &self.manifest
    }

    /// Reads an arbitrary file below this handle's root, e.g.
    /// `handle.read_file(Path::new("values.yaml"))`.
    pub fn read_file(&self, relative: &Path) -> Result<Vec<u8>> {
        let full = self.root.join(relative);
        self.fs
            .read_file(&full)
            .map_err(|e| StoreError::filesystem(full, e))
    }
}
