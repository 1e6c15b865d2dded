//! `StoreConfig` and its builder. The Store is a library embedded in a
//! larger process, so configuration is assembled explicitly in code rather
//! than parsed from a config file format — the one piece of real parsing is
//! the capacity quantity string, handled with the same suffix grammar
//! Kubernetes resource quantities use.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::filesystem::Filesystem;
use crate::identifier::IndexMethod;

/// Immutable, validated configuration for a [`Store`](crate::store::Store).
/// Constructed only through [`StoreConfigBuilder`], so an invalid instance
/// can never exist.
pub struct StoreConfig {
    pub base_fs: Arc<dyn Filesystem>,
    pub path: PathBuf,
    pub disabled: bool,
    pub index_method: IndexMethod,
    pub capacity_bytes: u64,
    pub gc_high_watermark: f64,
    pub gc_low_watermark: f64,
    pub reset_interval: Duration,
}

/// Builds a [`StoreConfig`], validating the capacity quantity string and
/// watermark ordering at `build()` time. Any failure is a fatal
/// [`StoreError::Config`] — there is no silent fallback to a default.
pub struct StoreConfigBuilder {
    base_fs: Arc<dyn Filesystem>,
    path: PathBuf,
    disabled: bool,
    index_method: IndexMethod,
    capacity: String,
    gc_high_watermark: f64,
    gc_low_watermark: f64,
    reset_interval: Duration,
}

impl StoreConfigBuilder {
    pub fn new(base_fs: Arc<dyn Filesystem>) -> Self {
        Self {
            base_fs,
            path: PathBuf::new(),
            disabled: false,
            index_method: IndexMethod::DescriptorIdentity,
            capacity: "0".to_string(),
            gc_high_watermark: 0.9,
            gc_low_watermark: 0.5,
            reset_interval: Duration::from_secs(24 * 60 * 60),
        }
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn index_method(mut self, method: IndexMethod) -> Self {
        self.index_method = method;
        self
    }

    /// Accepts a Kubernetes-style quantity string: `"512Mi"`, `"2Gi"`,
    /// `"0"` (unbounded, disables GC).
    pub fn capacity(mut self, capacity: impl Into<String>) -> Self {
        self.capacity = capacity.into();
        self
    }

    pub fn gc_watermarks(mut self, low: f64, high: f64) -> Self {
        self.gc_low_watermark = low;
        self.gc_high_watermark = high;
        self
    }

    pub fn reset_interval(mut self, interval: Duration) -> Self {
        self.reset_interval = interval;
        self
    }

    pub fn build(self) -> Result<StoreConfig> {
        let capacity_bytes = if self.capacity.trim() == "0" {
            0
        } else {
            parse_size::parse_size(&self.capacity).map_err(|e| {
                StoreError::Config(format!(
                    "invalid capacity quantity {:?}: {}",
                    self.capacity, e
                ))
            })?
        };

        if !(0.0..=1.0).contains(&self.gc_low_watermark) || !(0.0..=1.0).contains(&self.gc_high_watermark)
        {
            return Err(StoreError::Config(format!(
                "gc watermarks must be within [0, 1], got low={} high={}",
                self.gc_low_watermark, self.gc_high_watermark
            )));
        }
        if self.gc_low_watermark >= self.gc_high_watermark {
            return Err(StoreError::Config(format!(
                "gc_low_watermark ({}) must be less than gc_high_watermark ({})",
                self.gc_low_watermark, self.gc_high_watermark
            )));
        }

        Ok(StoreConfig {
            base_fs: self.base_fs,
            path: self.path,
            disabled: self.disabled,
            index_method: self.index_method,
            capacity_bytes,
            gc_high_watermark: self.gc_high_watermark,
            gc_low_watermark: self.gc_low_watermark,
            reset_interval: self.reset_interval,
        })
    }
}
