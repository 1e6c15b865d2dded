//! A small filesystem abstraction over local disk or an in-memory tree, so
//! the Store's directory-per-id contract is testable without touching real
//! disk: local disk and memory-backed variants sit behind one trait, with
//! the local backend jailing every path under its root.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

/// Filesystem operations the Store and [`BlobPipeline`](crate::pipeline::BlobPipeline)
/// need: create a directory, read/write a file, remove a subtree, check
/// existence, list a directory's immediate children, and walk a subtree to
/// total its size.
pub trait Filesystem: Send + Sync {
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn remove_all(&self, path: &Path) -> io::Result<()>;
    fn exists(&self, path: &Path) -> io::Result<bool>;
    fn is_dir(&self, path: &Path) -> io::Result<bool>;
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Total size in bytes of every regular file at or below `path`.
    fn dir_size(&self, path: &Path) -> io::Result<u64>;
}

/// Rejects absolute-looking escapes (`..`) so a malicious tar entry or
/// caller-supplied id can't write outside the root. Leading `/` is treated
/// as root-relative, matching the single `/<id>/...` layout each cache
/// entry is stored under.
fn sanitize(path: &Path) -> io::Result<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path escapes store root",
                ));
            }
        }
    }
    Ok(out)
}

/// A filesystem rooted at a real directory on local disk.
pub struct LocalFilesystem {
    root: PathBuf,
}

impl LocalFilesystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        Ok(self.root.join(sanitize(path)?))
    }
}

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path)?)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, contents)
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let full = self.resolve(path)?;
        match fs::metadata(&full) {
            Ok(_) => fs::remove_dir_all(&full).or_else(|_| fs::remove_file(&full)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::metadata(self.resolve(path)?) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::metadata(self.resolve(path)?)?.is_dir())
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.resolve(path)?)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn dir_size(&self, path: &Path) -> io::Result<u64> {
        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(self.resolve(path)?) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.file_type().is_file() {
                total += entry.metadata().map_err(io::Error::from)?.len();
            }
        }
        Ok(total)
    }
}

/// An in-memory filesystem tree, used in tests and by callers who don't want
/// the cache backed by real disk.
#[derive(Default)]
pub struct MemFilesystem {
    inner: Mutex<MemTree>,
}

#[derive(Default)]
struct MemTree {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: std::collections::BTreeSet<PathBuf>,
}

impl MemFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_ancestors(tree: &mut MemTree, path: &Path) {
        let mut ancestor = PathBuf::new();
        for component in path.components() {
            ancestor.push(component);
            tree.dirs.insert(ancestor.clone());
        }
    }
}

impl Filesystem for MemFilesystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = sanitize(path)?;
        let mut tree = self.inner.lock().unwrap();
        Self::ensure_ancestors(&mut tree, &path);
        tree.dirs.insert(path);
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let path = sanitize(path)?;
        let mut tree = self.inner.lock().unwrap();
        if let Some(parent) = path.parent() {
            Self::ensure_ancestors(&mut tree, parent);
        }
        tree.files.insert(path, contents.to_vec());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let path = sanitize(path)?;
        let tree = self.inner.lock().unwrap();
        tree.files
            .get(&path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
    }

    fn remove_all(&self, path: &Path) -> io::Result<()> {
        let path = sanitize(path)?;
        let mut tree = self.inner.lock().unwrap();
        tree.files.retain(|p, _| !p.starts_with(&path));
        tree.dirs.retain(|p| !p.starts_with(&path));
        Ok(())
    }

    fn exists(&self, path: &Path) -> io::Result<bool> {
        let path = sanitize(path)?;
        let tree = self.inner.lock().unwrap();
        Ok(tree.files.contains_key(&path) || tree.dirs.contains(&path))
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        let path = sanitize(path)?;
        let tree = self.inner.lock().unwrap();
        Ok(tree.dirs.contains(&path))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let path = sanitize(path)?;
        let tree = self.inner.lock().unwrap();
        if !tree.dirs.contains(&path) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "directory not found"));
        }
        let mut names: Vec<String> = tree
            .dirs
            .iter()
            .chain(tree.files.keys())
            .filter_map(|p| {
                if p.parent() == Some(path.as_path()) {
                    p.file_name().map(|n| n.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn dir_size(&self, path: &Path) -> io::Result<u64> {
        let path = sanitize(path)?;
        let tree = self.inner.lock().unwrap();
        Ok(tree
            .files
            .iter()
            .filter(|(p, _)| p.starts_with(&path))
            .map(|(_, data)| data.len() as u64)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(fs: &dyn Filesystem) {
        assert!(!fs.exists(Path::new("/a")).unwrap());
        fs.create_dir_all(Path::new("/a/b")).unwrap();
        assert!(fs.is_dir(Path::new("/a/b")).unwrap());
        fs.write_file(Path::new("/a/b/f.txt"), b"hello").unwrap();
        assert_eq!(fs.read_file(Path::new("/a/b/f.txt")).unwrap(), b"hello");
        assert_eq!(fs.dir_size(Path::new("/a")).unwrap(), 5);
        assert_eq!(fs.list_dir(Path::new("/a")).unwrap(), vec!["b".to_string()]);
        fs.remove_all(Path::new("/a")).unwrap();
        assert!(!fs.exists(Path::new("/a")).unwrap());
    }

    #[test]
    fn mem_filesystem_round_trip() {
        exercise(&MemFilesystem::new());
    }

    #[test]
    fn local_filesystem_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&LocalFilesystem::new(dir.path()));
    }

    #[test]
    fn sanitize_rejects_parent_traversal() {
        let fs = MemFilesystem::new();
        let err = fs.create_dir_all(Path::new("../escape")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
