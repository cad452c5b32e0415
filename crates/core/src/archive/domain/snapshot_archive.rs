use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use crate::archive::domain::image_writer::ImageWriter;
use crate::shared::constants::{ORIGINAL_SUFFIX, TRANSFORMED_SUFFIX};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to write snapshot {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Paths written for one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub token: u64,
    pub original: PathBuf,
    pub transformed: PathBuf,
}

/// Keeps a before/after pair of every successful cycle in one directory.
///
/// Files are named `<token>_orig.png` and `<token>_spooky.png`, where the
/// token is wall-clock time in tenths of a second. Two cycles landing in the
/// same tenth get consecutive tokens, so nothing is overwritten.
pub struct SnapshotArchive {
    dir: PathBuf,
    writer: Box<dyn ImageWriter>,
    last_token: Option<u64>,
}

impl SnapshotArchive {
    pub fn new(dir: impl Into<PathBuf>, writer: Box<dyn ImageWriter>) -> Self {
        Self {
            dir: dir.into(),
            writer,
            last_token: None,
        }
    }

    pub fn save(&mut self, original: &Frame, transformed: &Frame) -> Result<Snapshot, ArchiveError> {
        self.save_at(original, transformed, SystemTime::now())
    }

    pub fn save_at(
        &mut self,
        original: &Frame,
        transformed: &Frame,
        now: SystemTime,
    ) -> Result<Snapshot, ArchiveError> {
        let token = self.next_token(now);
        let snapshot = Snapshot {
            token,
            original: self.dir.join(format!("{token}{ORIGINAL_SUFFIX}")),
            transformed: self.dir.join(format!("{token}{TRANSFORMED_SUFFIX}")),
        };
        self.write(&snapshot.original, original)?;
        self.write(&snapshot.transformed, transformed)?;
        log::info!("Saved snapshot {token} to {}", self.dir.display());
        Ok(snapshot)
    }

    fn write(&self, path: &Path, frame: &Frame) -> Result<(), ArchiveError> {
        self.writer
            .write(path, frame)
            .map_err(|e| ArchiveError::Write {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn next_token(&mut self, now: SystemTime) -> u64 {
        let tenths = now
            .duration_since(UNIX_EPOCH)
            .map(|d| (d.as_millis() / 100) as u64)
            .unwrap_or(0);
        let token = match self.last_token {
            Some(last) if tenths <= last => last + 1,
            _ => tenths,
        };
        self.last_token = Some(token);
        token
    }
}
