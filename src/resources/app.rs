//! GUI application bundles installed by direct download.
//!
//! Downloads land in a scoped temporary directory and disk images are
//! attached through a [`MountGuard`], so both are released on every exit
//! path. The cancel flag is consulted before every download attempt and
//! again before anything is copied into the applications directory.
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use sha2::{Digest as _, Sha256};

use super::error::ResourceError;
use super::{Resource, ResourceChange, ResourceState};
use crate::cancel::CancelFlag;
use crate::config::apps::{AppEntry, AppFormat};
use crate::exec::Executor;

/// Number of download attempts before giving up.
pub const DOWNLOAD_ATTEMPTS: u32 = 3;

/// Default location of installed applications.
pub const APPLICATIONS_DIR: &str = "/Applications";

/// An application bundle that can be checked and installed.
#[derive(Debug)]
pub struct AppResource<'a> {
    /// Configured application.
    pub entry: &'a AppEntry,
    applications_dir: &'a Path,
    executor: &'a dyn Executor,
    cancel: &'a CancelFlag,
}

impl<'a> AppResource<'a> {
    /// Create a new app resource installing into `applications_dir`.
    #[must_use]
    pub const fn new(
        entry: &'a AppEntry,
        applications_dir: &'a Path,
        executor: &'a dyn Executor,
        cancel: &'a CancelFlag,
    ) -> Self {
        Self {
            entry,
            applications_dir,
            executor,
            cancel,
        }
    }

    /// Installed location of the bundle.
    #[must_use]
    pub fn target(&self) -> PathBuf {
        self.applications_dir.join(&self.entry.bundle)
    }

    fn install_from_dmg(&self, image: &Path, work: &Path) -> Result<()> {
        let mountpoint = work.join("mount");
        std::fs::create_dir_all(&mountpoint)
            .with_context(|| format!("creating {}", mountpoint.display()))?;
        let mut mount = MountGuard::attach(self.executor, image, &mountpoint)?;
        self.cancel.ensure_running()?;
        let bundle = mountpoint.join(&self.entry.bundle);
        if !bundle.exists() {
            return Err(ResourceError::NotFound {
                resource: format!("{} in {}", self.entry.bundle, image.display()),
            }
            .into());
        }
        self.copy_bundle(&bundle)?;
        mount.detach()
    }

    fn install_from_zip(&self, archive: &Path, work: &Path) -> Result<()> {
        let extracted = work.join("extract");
        self.executor.run(
            "ditto",
            &[
                "-x",
                "-k",
                &archive.to_string_lossy(),
                &extracted.to_string_lossy(),
            ],
        )?;
        let bundle = find_bundle(&extracted, &self.entry.bundle)
            .with_context(|| format!("searching {}", extracted.display()))?
            .ok_or_else(|| ResourceError::NotFound {
                resource: format!("{} in {}", self.entry.bundle, archive.display()),
            })?;
        self.cancel.ensure_running()?;
        self.copy_bundle(&bundle)
    }

    fn copy_bundle(&self, bundle: &Path) -> Result<()> {
        self.executor.run(
            "ditto",
            &[&bundle.to_string_lossy(), &self.target().to_string_lossy()],
        )?;
        Ok(())
    }
}

impl Resource for AppResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.entry.name, self.entry.bundle)
    }

    fn current_state(&self) -> Result<ResourceState> {
        Ok(if self.target().exists() {
            ResourceState::Present
        } else {
            ResourceState::Missing
        })
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.current_state()? == ResourceState::Present {
            return Ok(ResourceChange::AlreadyPresent);
        }

        let work = tempfile::Builder::new()
            .prefix("dotstrap-app-")
            .tempdir()
            .context("creating download directory")?;
        let extension = match self.entry.format {
            AppFormat::Dmg => "dmg",
            AppFormat::Zip => "zip",
        };
        let archive = work.path().join(format!("download.{extension}"));

        download(self.executor, self.cancel, &self.entry.url, &archive)?;
        if let Some(expected) = &self.entry.sha256 {
            verify_checksum(&self.entry.name, &archive, expected)?;
        }
        self.cancel.ensure_running()?;

        match self.entry.format {
            AppFormat::Dmg => self.install_from_dmg(&archive, work.path())?,
            AppFormat::Zip => self.install_from_zip(&archive, work.path())?,
        }
        Ok(ResourceChange::Installed)
    }
}

/// Download `url` to `dest` with `curl`, retrying up to
/// [`DOWNLOAD_ATTEMPTS`] times.
///
/// A raised `cancel` flag stops the retries.
///
/// # Errors
///
/// Returns the last failure once every attempt has failed, or
/// [`crate::error::DotstrapError::Cancelled`] when interrupted.
pub fn download(
    executor: &dyn Executor,
    cancel: &CancelFlag,
    url: &str,
    dest: &Path,
) -> Result<()> {
    let dest_str = dest.to_string_lossy();
    let mut last_error = None;
    for attempt in 1..=DOWNLOAD_ATTEMPTS {
        cancel.ensure_running()?;
        match executor.run("curl", &["-fsSL", "-o", &dest_str, url]) {
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::debug!("download attempt {attempt}/{DOWNLOAD_ATTEMPTS}: {e:#}");
                last_error = Some(e);
            }
        }
    }
    cancel.ensure_running()?;
    let error = last_error.unwrap_or_else(|| anyhow::anyhow!("no download attempted"));
    Err(error.context(format!(
        "downloading {url} failed after {DOWNLOAD_ATTEMPTS} attempts"
    )))
}

/// Compare the SHA-256 of `path` with `expected` (hex, any case).
///
/// # Errors
///
/// Returns [`ResourceError::ChecksumMismatch`] on a mismatch, or an I/O
/// error if the file cannot be read.
pub fn verify_checksum(name: &str, path: &Path, expected: &str) -> Result<()> {
    let mut file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("hashing {}", path.display()))?;
    let actual = format!("{:x}", hasher.finalize());
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(ResourceError::ChecksumMismatch {
            name: name.to_string(),
            expected: expected.trim().to_lowercase(),
            actual,
        }
        .into())
    }
}

/// Look for `bundle` directly in `dir` or one level below it.
fn find_bundle(dir: &Path, bundle: &str) -> io::Result<Option<PathBuf>> {
    let direct = dir.join(bundle);
    if direct.exists() {
        return Ok(Some(direct));
    }
    if !dir.is_dir() {
        return Ok(None);
    }
    for entry in std::fs::read_dir(dir)? {
        let nested = entry?.path().join(bundle);
        if nested.exists() {
            return Ok(Some(nested));
        }
    }
    Ok(None)
}

/// An attached disk image, detached when dropped.
///
/// [`MountGuard::detach`] may be called explicitly to observe errors; a
/// second detach (including the one on drop) does nothing.
#[derive(Debug)]
pub struct MountGuard<'a> {
    executor: &'a dyn Executor,
    mountpoint: PathBuf,
    attached: bool,
}

impl<'a> MountGuard<'a> {
    /// Attach `image` read-only at `mountpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if `hdiutil attach` fails.
    pub fn attach(executor: &'a dyn Executor, image: &Path, mountpoint: &Path) -> Result<Self> {
        executor.run(
            "hdiutil",
            &[
                "attach",
                "-nobrowse",
                "-readonly",
                "-mountpoint",
                &mountpoint.to_string_lossy(),
                &image.to_string_lossy(),
            ],
        )?;
        Ok(Self {
            executor,
            mountpoint: mountpoint.to_path_buf(),
            attached: true,
        })
    }

    /// Detach the image.
    ///
    /// # Errors
    ///
    /// Returns an error if `hdiutil detach` fails; the guard then stays
    /// attached and retries on drop.
    pub fn detach(&mut self) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        self.executor.run(
            "hdiutil",
            &["detach", &self.mountpoint.to_string_lossy(), "-quiet"],
        )?;
        self.attached = false;
        Ok(())
    }
}

impl Drop for MountGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.detach() {
            tracing::warn!("failed to detach {}: {e:#}", self.mountpoint.display());
        }
    }
}
