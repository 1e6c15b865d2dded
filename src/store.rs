//! The Store: the public API (`fetch`, `get`, `store`, `close`) and the
//! process-wide singleton slot. A single `RwLock` couples the in-memory
//! index to the on-disk directory set: readers take the shared side,
//! `store` and garbage collection take the exclusive side.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use crossbeam_channel::Sender;
use once_cell::sync::OnceCell;

use crate::config::StoreConfig;
use crate::context::CancelToken;
use crate::error::{Result, StoreError};
use crate::filesystem::Filesystem;
use crate::gc::start_reset_worker;
use crate::identifier::{blob_digest_identity, descriptor_identity, IndexMethod};
use crate::index::Index;
use crate::manifest::BlueprintHandle;
use crate::model::{find_blueprint_resource, ComponentVersion, Resource};
use crate::pipeline::BlobPipeline;

static STORED_ITEMS: AtomicI64 = AtomicI64::new(0);
static DISK_USAGE_BYTES: AtomicI64 = AtomicI64::new(0);

/// Current value of the `StoredItems` observability gauge.
pub fn stored_items() -> i64 {
    STORED_ITEMS.load(Ordering::SeqCst)
}

/// Current value of the `DiskUsage` observability gauge, in bytes.
pub fn disk_usage_bytes() -> i64 {
    DISK_USAGE_BYTES.load(Ordering::SeqCst)
}

pub(crate) fn decrement_stored_items() {
    STORED_ITEMS.fetch_sub(1, Ordering::SeqCst);
}

pub(crate) fn set_disk_usage_bytes(bytes: i64) {
    DISK_USAGE_BYTES.store(bytes, Ordering::SeqCst);
}

static SINGLETON: OnceCell<Mutex<Option<Arc<Store>>>> = OnceCell::new();

/// Installs `store` as the process-wide singleton, closing and replacing
/// any prior instance. The predecessor's in-flight operations are allowed
/// to complete; its `close()` only stops new work from starting.
pub fn set_store(store: Arc<Store>) {
    let slot = SINGLETON.get_or_init(|| Mutex::new(None));
    let mut guard = slot.lock().unwrap();
    if let Some(previous) = guard.take() {
        previous.close();
    }
    *guard = Some(store);
}

/// The current process-wide Store, if one has been installed.
pub fn get_store() -> Option<Arc<Store>> {
    SINGLETON.get().and_then(|slot| slot.lock().unwrap().clone())
}

/// The content-addressed blueprint cache.
pub struct Store {
    pub(crate) config: StoreConfig,
    pub(crate) fs: Arc<dyn Filesystem>,
    pub(crate) index: Index,
    pub(crate) lock: RwLock<()>,
    closed: AtomicBool,
    pub(crate) current_size_bytes: AtomicI64,
    reset_stop: Mutex<Option<Sender<()>>>,
}

impl Store {
    /// Constructs a new Store from `config`. Does not install it as the
    /// process singleton — call [`set_store`] for that.
    pub fn new(config: StoreConfig) -> Result<Arc<Self>> {
        let path = if config.path.as_os_str().is_empty() {
            std::env::temp_dir().join(format!("blueprint-store-{}", uniq_suffix()))
        } else {
            config.path.clone()
        };
        let fs = config.base_fs.clone();
        fs.create_dir_all(&path)
            .map_err(|e| StoreError::filesystem(path.clone(), e))?;

        let reset_interval = config.reset_interval;
        let capacity_bytes = config.capacity_bytes;

        let store = Arc::new(Self {
            config: StoreConfig { path, ..config },
            fs,
            index: Index::new(),
            lock: RwLock::new(()),
            closed: AtomicBool::new(false),
            current_size_bytes: AtomicI64::new(0),
            reset_stop: Mutex::new(None),
        });

        if capacity_bytes > 0 {
            let stop = start_reset_worker(Arc::clone(&store), reset_interval);
            *store.reset_stop.lock().unwrap() = Some(stop);
        }

        Ok(store)
    }

    fn entry_root(&self) -> PathBuf {
        self.config.path.clone()
    }

    fn entry_path(&self, id: &str) -> PathBuf {
        self.entry_root().join(id)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn usage(&self) -> f64 {
        if self.config.capacity_bytes == 0 {
            return 0.0;
        }
        self.current_size_bytes.load(Ordering::SeqCst) as f64 / self.config.capacity_bytes as f64
    }

    /// Locates the blueprint resource, derives its identifier, and returns
    /// a handle — extracting the blob first if it isn't already cached.
    pub fn fetch(
        self: &Arc<Self>,
        component_version: &dyn ComponentVersion,
        blueprint_name: &str,
        cancel: &CancelToken,
    ) -> Result<BlueprintHandle> {
        self.check_open()?;
        let resource = find_blueprint_resource(component_version, blueprint_name)?;

        let (id, blob_info) = match self.config.index_method {
            IndexMethod::DescriptorIdentity => {
                (descriptor_identity(component_version, resource), None)
            }
            IndexMethod::BlobDigest => {
                let info = resource.blob_info(cancel)?;
                let id = blob_digest_identity(&info.digest);
                (id, Some(info))
            }
        };

        match self.get(&id, cancel) {
            Ok(handle) => Ok(handle),
            Err(StoreError::NotFound) => self.store(resource, &id, blob_info, cancel),
            Err(other) => Err(other),
        }
    }

    /// Returns a handle for `id` if it is cached. Fails with
    /// [`StoreError::NotFound`] on a miss or while `disabled`, and with
    /// [`StoreError::Closed`] after `close()`.
    pub fn get(&self, id: &str, _cancel: &CancelToken) -> Result<BlueprintHandle> {
        self.check_open()?;
        if self.config.disabled {
            return Err(StoreError::NotFound);
        }

        let _guard = self.lock.read().unwrap();
        let path = self.entry_path(id);
        let exists = self
            .fs
            .exists(&path)
            .map_err(|e| StoreError::filesystem(path.clone(), e))?;
        if !exists {
            return Err(StoreError::NotFound);
        }

        self.index.hit(id);
        log::debug!("cache hit id={}", id);
        BlueprintHandle::open(Arc::clone(&self.fs), id)
    }

    /// Extracts `resource`'s blob into `/<id>/`, records it in the index,
    /// and schedules GC asynchronously. Re-checks the cache first so a
    /// concurrent winner of the same id is not re-extracted.
    pub fn store(
        self: &Arc<Self>,
        resource: &dyn Resource,
        id: &str,
        blob_info: Option<crate::model::BlobInfo>,
        cancel: &CancelToken,
    ) -> Result<BlueprintHandle> {
        self.check_open()?;
        if let Ok(handle) = self.get(id, cancel) {
            return Ok(handle);
        }

        let _guard = self.lock.write().unwrap();
        let path = self.entry_path(id);

        let already_on_disk = self
            .fs
            .exists(&path)
            .map_err(|e| StoreError::filesystem(path.clone(), e))?;
        if already_on_disk && !self.index.contains(id) {
            log::warn!("removing dangling entry from a prior failed write id={}", id);
            self.fs
                .remove_all(&path)
                .map_err(|e| StoreError::filesystem(path.clone(), e))?;
        }

        let blob_info = match blob_info {
            Some(info) => info,
            None => resource.blob_info(cancel)?,
        };

        if let Err(err) = BlobPipeline::extract(self.fs.as_ref(), &path, resource, &blob_info, cancel) {
            log::error!("extraction failed id={} err={}", id, err);
            let _ = self.fs.remove_all(&path);
            return Err(err);
        }

        let size = self
            .fs
            .dir_size(&path)
            .map_err(|e| StoreError::filesystem(path.clone(), e))? as i64;

        self.index.add(id, size, SystemTime::now());
        self.current_size_bytes.fetch_add(size, Ordering::SeqCst);
        STORED_ITEMS.fetch_add(1, Ordering::SeqCst);
        DISK_USAGE_BYTES.store(self.current_size_bytes.load(Ordering::SeqCst), Ordering::SeqCst);
        log::debug!("stored new blueprint id={} size={}", id, size);

        drop(_guard);
        self.schedule_gc();

        BlueprintHandle::open(Arc::clone(&self.fs), id)
    }

    /// Spawns `run_gc` on a detached background thread. Fire-and-forget:
    /// callers never wait on this.
    fn schedule_gc(self: &Arc<Self>) {
        let store = Arc::clone(self);
        std::thread::spawn(move || {
            crate::gc::run_gc(&store);
        });
    }

    /// Idempotent. Marks the Store closed and stops the reset worker.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(stop) = self.reset_stop.lock().unwrap().take() {
            let _ = stop.send(());
        }
    }

    pub fn current_usage(&self) -> f64 {
        self.usage()
    }
}

fn uniq_suffix() -> String {
    use std::sync::atomic::AtomicU64;
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::SeqCst).to_string()
}
