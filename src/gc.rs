//! Garbage collection: the watermark-driven reclamation pass and the
//! periodic hit-counter reset worker. The watermark check, priority-ordered
//! eviction, and "decrement the counter even if removal failed" behavior
//! run on a detached thread driven by a `crossbeam_channel` ticker and stop
//! signal.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

use crate::store::{decrement_stored_items, set_disk_usage_bytes, Store};

/// Runs one reclamation pass. No-op if capacity is unbounded or usage is
/// already at or below the high watermark. Otherwise evicts entries in
/// priority order until usage drops to the low watermark.
pub fn run_gc(store: &Arc<Store>) {
    if store.config.capacity_bytes == 0 {
        return;
    }

    let _guard = store.lock.write().unwrap();
    if store.current_usage() <= store.config.gc_high_watermark {
        log::debug!("gc skipped: usage below high watermark");
        return;
    }

    let mut priority_list = store.index.priority_list();
    log::debug!(
        "gc entered: usage={:.3} candidates={}",
        store.current_usage(),
        priority_list.len()
    );

    while store.current_usage() > store.config.gc_low_watermark && !priority_list.is_empty() {
        let entry = priority_list.remove(0);
        let path = store.config.path.join(&entry.id);

        if let Err(err) = store.fs.remove_all(&path) {
            log::warn!(
                "gc: failed to remove entry, leaving on disk id={} err={}",
                entry.id,
                err
            );
        } else {
            log::trace!("gc: evicted id={} size={} hits={}", entry.id, entry.size, entry.hits);
        }

        store
            .current_size_bytes
            .fetch_sub(entry.size, Ordering::SeqCst);
        store.index.remove(&entry.id);
        decrement_stored_items();
        set_disk_usage_bytes(store.current_size_bytes.load(Ordering::SeqCst));
    }
}

/// Starts the reset-interval worker on a detached thread: every
/// `interval`, call `Index.reset()`. Returns the stop sender; sending (or
/// dropping it) stops the worker. Holds no Store lock — `Index` operations
/// are individually atomic.
pub fn start_reset_worker(store: Arc<Store>, interval: Duration) -> Sender<()> {
    let (stop_tx, stop_rx) = bounded::<()>(0);
    std::thread::spawn(move || {
        let ticker = tick(interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    log::debug!("reset worker tick");
                    store.index.reset();
                }
                recv(stop_rx) -> _ => {
                    log::debug!("reset worker stopped");
                    return;
                }
            }
        }
    });
    stop_tx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfigBuilder;
    use crate::context::CancelToken;
    use crate::filesystem::MemFilesystem;
    use crate::model::test_support::{StaticComponentVersion, StaticResource};
    use std::time::SystemTime;

    fn build_tar(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *contents).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn zero_capacity_disables_gc() {
        let config = StoreConfigBuilder::new(Arc::new(MemFilesystem::new()))
            .capacity("0")
            .build()
            .unwrap();
        let store = Store::new(config).unwrap();
        store.index.add("a", 10_000_000, SystemTime::now());
        store.current_size_bytes.store(10_000_000, Ordering::SeqCst);

        run_gc(&store);
        assert!(store.index.contains("a"));
    }

    #[test]
    fn evicts_in_priority_order_down_to_low_watermark() {
        let config = StoreConfigBuilder::new(Arc::new(MemFilesystem::new()))
            .capacity("1000")
            .gc_watermarks(0.5, 0.9)
            .build()
            .unwrap();
        let store = Store::new(config).unwrap();

        let t0 = SystemTime::now();
        let t1 = t0 + Duration::from_secs(1);
        for (id, hits, ts) in [("A", 0u64, t0), ("B", 2, t0), ("C", 0, t1)] {
            let path = store.config.path.join(id);
            store.fs.write_file(&path.join("blueprint.yaml"), b"name: x\n").unwrap();
            store.index.add(id, 400, ts);
            for _ in 0..hits {
                store.index.hit(id);
            }
        }
        store.current_size_bytes.store(1200, Ordering::SeqCst);

        run_gc(&store);

        assert!(!store.index.contains("A"));
        assert!(!store.index.contains("C"));
        assert!(store.index.contains("B"));
        assert_eq!(store.current_size_bytes.load(Ordering::SeqCst), 400);
    }

    #[test]
    fn store_triggers_background_gc_past_watermark() {
        let config = StoreConfigBuilder::new(Arc::new(MemFilesystem::new()))
            .capacity("1")
            .gc_watermarks(0.0, 0.0000001)
            .build()
            .unwrap();
        let store = Store::new(config).unwrap();

        let tar_bytes = build_tar(&[("blueprint.yaml", b"name: demo\n")]);
        let resource =
            StaticResource::new("bp", "1.0.0").with_blob(tar_bytes, "application/x-tar", "d1");
        let cv = StaticComponentVersion::new("comp-a", "1.0.0", None).with_resource(resource);

        store.fetch(&cv, "bp", &CancelToken::none()).unwrap();

        // GC is fire-and-forget; give the detached thread a moment, then
        // force a synchronous pass to make the assertion deterministic.
        std::thread::sleep(Duration::from_millis(50));
        run_gc(&store);
        assert_eq!(store.index.len(), 0);
    }
}
