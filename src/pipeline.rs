//! Streams a blob straight from its `Resource` into an extracted directory
//! tree, without ever materializing the whole blob on disk or in memory: a
//! producer thread streams the blob into a pipe, a consumer thread
//! decompresses (if needed) and unpacks the tar stream on the other end,
//! and both are joined before the call returns.

use std::io::Read;
use std::path::Path;
use std::thread;

use flate2::read::GzDecoder;

use crate::context::CancelToken;
use crate::error::{Result, StoreError};
use crate::filesystem::Filesystem;
use crate::media_type::MediaType;
use crate::model::{BlobInfo, Resource};
use crate::pipe::{pipe, PipeReader};

/// Fetches and unpacks a single blob into `target_path`.
pub struct BlobPipeline;

impl BlobPipeline {
    /// Streams `resource`'s blob into `target_path`, extracting it as a
    /// gzip+tar or plain tar archive depending on `blob_info.media_type`.
    ///
    /// `target_path` is created (tolerant of already existing) before the
    /// transfer starts. On failure, cleanup of any partially written
    /// content is the caller's responsibility, not this function's.
    pub fn extract(
        fs: &dyn Filesystem,
        target_path: &Path,
        resource: &dyn Resource,
        blob_info: &BlobInfo,
        cancel: &CancelToken,
    ) -> Result<()> {
        fs.create_dir_all(target_path)
            .map_err(|e| StoreError::filesystem(target_path, e))?;

        let media_type = MediaType::parse(&blob_info.media_type);
        let (reader, writer) = pipe();

        thread::scope(|scope| {
            let producer = scope.spawn(move || {
                let mut writer = writer;
                match resource.stream_blob(&mut writer, cancel) {
                    Ok(()) => Ok(()),
                    Err(store_err) => {
                        let io_err = std::io::Error::new(
                            std::io::ErrorKind::Other,
                            store_err.to_string(),
                        );
                        writer.close_with_error(io_err);
                        Err(store_err)
                    }
                }
            });

            let consumer_result = Self::unpack(fs, target_path, reader, &media_type, cancel);

            let producer_result = producer
                .join()
                .map_err(|_| StoreError::decoding(anyhow::anyhow!("blob producer thread panicked")))?;

            // The consumer sees the producer's failure first, since it's
            // the one blocked reading from the pipe when the producer
            // closes it with an error. Surface that one; fall back to the
            // producer's own error if the consumer somehow succeeded
            // despite a failing producer (shouldn't happen, but don't mask
            // it if it does).
            match (consumer_result, producer_result) {
                (Err(e), _) => Err(e),
                (Ok(()), Err(e)) => Err(e),
                (Ok(()), Ok(())) => Ok(()),
            }
        })
    }

    fn unpack(
        fs: &dyn Filesystem,
        target_path: &Path,
        reader: PipeReader,
        media_type: &MediaType,
        cancel: &CancelToken,
    ) -> Result<()> {
        let tar_source: Box<dyn Read> = if media_type.is_gzip_compressed() {
            Box::new(GzDecoder::new(reader))
        } else {
            Box::new(reader)
        };

        let expect_gzip = media_type.is_gzip_compressed();
        let mut archive = tar::Archive::new(tar_source);
        let entries = archive
            .entries()
            .map_err(|e| Self::tar_io_error(e, expect_gzip))?;

        for entry in entries {
            if cancel.is_cancelled() {
                return Err(StoreError::decoding(anyhow::anyhow!(
                    "blob extraction cancelled"
                )));
            }

            let mut entry = entry.map_err(|e| Self::tar_io_error(e, expect_gzip))?;
            let entry_path = entry
                .path()
                .map_err(|e| StoreError::decoding(anyhow::Error::from(e)))?
                .into_owned();
            let full_path = target_path.join(&entry_path);

            match entry.header().entry_type() {
                tar::EntryType::Directory => {
                    fs.create_dir_all(&full_path)
                        .map_err(|e| StoreError::filesystem(full_path.clone(), e))?;
                }
                tar::EntryType::Regular => {
                    let mut contents = Vec::new();
                    entry
                        .read_to_end(&mut contents)
                        .map_err(|e| Self::tar_io_error(e, expect_gzip))?;
                    fs.write_file(&full_path, &contents)
                        .map_err(|e| StoreError::filesystem(full_path.clone(), e))?;
                }
                other => {
                    log::trace!(
                        "skipping unsupported tar entry type {:?} at {:?}",
                        other,
                        entry_path
                    );
                }
            }
        }

        Ok(())
    }

    /// `GzDecoder` only validates the gzip header lazily, on the first read
    /// the tar reader makes into it. When the blob was declared gzip but
    /// isn't, that surfaces here as a plain `io::Error` indistinguishable
    /// from any other tar I/O failure unless we check for it explicitly.
    fn tar_io_error(err: std::io::Error, expect_gzip: bool) -> StoreError {
        if expect_gzip && is_gzip_header_error(&err) {
            return StoreError::decoding(anyhow::anyhow!("expected a gzip compressed tar"));
        }
        StoreError::decoding(anyhow::Error::from(err))
    }
}

/// `flate2`'s gzip header parser reports a malformed header as
/// `io::ErrorKind::InvalidInput` with "invalid gzip header" in the message;
/// matched on the message since flate2 doesn't expose a dedicated error type.
fn is_gzip_header_error(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::InvalidInput
        && err.to_string().to_ascii_lowercase().contains("gzip header")
}
