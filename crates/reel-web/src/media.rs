//! Video capture storage.
//!
//! The video channel is an opaque byte stream; chunks are appended verbatim
//! to `<dir>/<session id>.webm`.

use std::path::{Path, PathBuf};

use reel_core::SessionId;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// File extension of stored media assets.
pub const MEDIA_EXTENSION: &str = "webm";

/// Directory of per-session media assets.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session_id: SessionId) -> PathBuf {
        self.dir.join(format!("{session_id}.{MEDIA_EXTENSION}"))
    }

    /// Open the asset of `session_id` for appending, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory or file cannot be opened.
    pub async fn open_writer(&self, session_id: SessionId) -> std::io::Result<MediaWriter> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(session_id);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        tracing::info!(session_id = %session_id, path = %path.display(), "Writing video stream");
        Ok(MediaWriter {
            file,
            path,
            bytes_written: 0,
        })
    }
}

/// Append handle for one session's media asset.
#[derive(Debug)]
pub struct MediaWriter {
    file: File,
    path: PathBuf,
    bytes_written: u64,
}

impl MediaWriter {
    /// Append one chunk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the underlying write.
    pub async fn append(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.file.write_all(chunk).await?;
        self.bytes_written = self
            .bytes_written
            .saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        Ok(())
    }

    /// Flush buffered data to disk.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of the underlying flush.
    pub async fn finish(mut self) -> std::io::Result<u64> {
        self.file.flush().await?;
        tracing::debug!(path = %self.path.display(), bytes = self.bytes_written, "Video stream closed");
        Ok(self.bytes_written)
    }

    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
