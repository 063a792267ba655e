//! Per-date execution guard.
//!
//! An exclusive advisory lock on `<lock_dir>/summary_<YYYYMMDD>.lock` keeps
//! two generations of the same day from overlapping, whether they come from
//! the nightly timer, the manual trigger or a second process sharing the lock
//! directory. The lock belongs to the open file handle, so it is also released
//! by the OS if the holding process dies.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use fs2::FileExt;
use tracing::warn;

pub struct DateLock;

impl DateLock {
    pub fn path_for(lock_dir: &Path, date: NaiveDate) -> PathBuf {
        lock_dir.join(format!("summary_{}.lock", date.format("%Y%m%d")))
    }

    /// Non-blocking. `Ok(None)` means another invocation holds the lock.
    pub fn try_acquire(lock_dir: &Path, date: NaiveDate) -> io::Result<Option<DateLockGuard>> {
        fs::create_dir_all(lock_dir)?;
        let path = Self::path_for(lock_dir, date);
        // No truncate: the file is only a lock handle.
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(DateLockGuard { file, path, date })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Held for the whole generation. Unlocks on drop.
///
/// The lock file itself stays on disk: deleting it while another process has
/// it open would let a third process lock a fresh inode at the same path.
#[derive(Debug)]
pub struct DateLockGuard {
    file: File,
    path: PathBuf,
    date: NaiveDate,
}

impl DateLockGuard {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DateLockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(date = %self.date, path = %self.path.display(), "failed to unlock summary lock: {e}");
        }
    }
}
