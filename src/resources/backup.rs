//! Per-run backup session for entries displaced by the linker.
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDateTime;

use super::helpers::fs::{ensure_parent_dir, move_path};

/// Name of the backup root directory inside `$HOME`.
pub const BACKUP_DIR_NAME: &str = ".dotstrap-backups";

/// Timestamp format of session directory names.
const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// One run's backup directory.
///
/// The timestamp is fixed when the session is created; the directory itself
/// is only created on the first [`BackupSession::backup`] call. Entries are
/// stored under their path relative to `home`, so two displaced files with
/// the same base name never collide.
#[derive(Debug)]
pub struct BackupSession {
    root: PathBuf,
    home: PathBuf,
    stamp: String,
    dir: Mutex<Option<PathBuf>>,
}

impl BackupSession {
    /// Start a session stamped with the current local time.
    #[must_use]
    pub fn new(root: PathBuf, home: PathBuf) -> Self {
        let stamp = chrono::Local::now().format(STAMP_FORMAT).to_string();
        Self::with_stamp(root, home, stamp)
    }

    /// Start a session with an explicit stamp.
    #[must_use]
    pub const fn with_stamp(root: PathBuf, home: PathBuf, stamp: String) -> Self {
        Self {
            root,
            home,
            stamp,
            dir: Mutex::new(None),
        }
    }

    /// Backup root holding every session directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The session directory, if anything has been backed up yet.
    #[must_use]
    pub fn dir(&self) -> Option<PathBuf> {
        self.dir.lock().ok().and_then(|dir| dir.clone())
    }

    /// Move `path` into the session directory and return its new location.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be created or the
    /// entry cannot be moved. On error `path` is left in place.
    pub fn backup(&self, path: &Path) -> io::Result<PathBuf> {
        let dir = self.ensure_dir()?;
        let relative = path.strip_prefix(&self.home).map_or_else(
            |_| path.file_name().map(PathBuf::from).unwrap_or_default(),
            Path::to_path_buf,
        );
        if relative.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot back up {}", path.display()),
            ));
        }
        let target = dir.join(relative);
        ensure_parent_dir(&target)?;
        move_path(path, &target)?;
        Ok(target)
    }

    /// Create the session directory on first use.
    ///
    /// A directory left by an earlier run with the same stamp is never
    /// reused; a numeric suffix is appended instead.
    fn ensure_dir(&self) -> io::Result<PathBuf> {
        let mut guard = self
            .dir
            .lock()
            .map_err(|_| io::Error::other("backup session lock poisoned"))?;
        if let Some(dir) = guard.as_ref() {
            return Ok(dir.clone());
        }

        std::fs::create_dir_all(&self.root)?;
        let mut candidate = self.root.join(&self.stamp);
        let mut suffix = 1u32;
        loop {
            match std::fs::create_dir(&candidate) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    candidate = self.root.join(format!("{}-{suffix}", self.stamp));
                    suffix += 1;
                }
                Err(e) => return Err(e),
            }
        }
        *guard = Some(candidate.clone());
        Ok(candidate)
    }
}

/// Ordering key of a session directory name: its stamp, then the collision
/// suffix (`0` when there is none). `None` for names no session would use.
fn session_key(name: &str) -> Option<(NaiveDateTime, u32)> {
    if let Ok(stamp) = NaiveDateTime::parse_from_str(name, STAMP_FORMAT) {
        return Some((stamp, 0));
    }
    let (stamp, suffix) = name.rsplit_once('-')?;
    let suffix = suffix.parse::<u32>().ok().filter(|n| *n > 0)?;
    let stamp = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
    Some((stamp, suffix))
}

/// Most recent session directory under `root`, if any.
///
/// Directories whose names are not session stamps are ignored.
#[must_use]
pub fn latest_session(root: &Path) -> Option<PathBuf> {
    std::fs::read_dir(root)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| {
            let key = session_key(entry.file_name().to_str()?)?;
            Some((key, entry.path()))
        })
        .max_by_key(|(key, _)| *key)
        .map(|(_, path)| path)
}
