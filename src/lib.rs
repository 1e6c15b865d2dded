//! This crate implements a content-addressed blueprint cache.
//!
//! A blueprint is an opaque directory tree, transported as a (optionally
//! gzip-compressed) tar archive, containing a canonical `blueprint.yaml`
//! manifest plus arbitrary additional files. The Store fetches a blueprint
//! once per identifier, extracts it under a stable directory name, and
//! serves every subsequent lookup straight off that directory.
//!
//! # Identifiers
//!
//! Two derivation modes are fixed at construction time and never change
//! for the Store's lifetime: `DescriptorIdentity` hashes the component and
//! resource coordinates (plus repository context, if any); `BlobDigest`
//! reuses the digest the remote already reports for the blob. See
//! [`identifier`].
//!
//! # Concurrency
//!
//! A single reader/writer lock couples the in-memory [`index::Index`] to
//! the on-disk directory set: `get` takes the shared side, `store` and the
//! garbage collector's reclamation pass take the exclusive side. Within a
//! single extraction, [`pipeline::BlobPipeline`] runs a producer and a
//! consumer on two OS threads, joined before the call returns — that
//! parallelism is internal to the operation and invisible to other
//! callers. The periodic hit-counter reset worker and each ad-hoc
//! collection pass run as detached background threads, not async tasks.
//!
//! # Garbage collection
//!
//! Capacity is a soft byte budget. Once usage crosses the high watermark,
//! entries are evicted in priority order — least-hit first, then oldest,
//! then by id as a deterministic tiebreak — until usage falls back to the
//! low watermark. A capacity of zero disables the collector entirely. See
//! [`gc`].

pub mod config;
pub mod context;
pub mod error;
pub mod filesystem;
pub mod gc;
pub mod identifier;
pub mod index;
pub mod manifest;
pub mod media_type;
pub mod model;
pub mod pipe;
pub mod pipeline;
pub mod store;

pub use config::{StoreConfig, StoreConfigBuilder};
pub use context::CancelToken;
pub use error::{Result, StoreError};
pub use identifier::IndexMethod;
pub use manifest::{BlueprintHandle, BlueprintManifest};
pub use model::{BlobInfo, ComponentVersion, Resource};
pub use store::{disk_usage_bytes, get_store, set_store, stored_items, Store};
