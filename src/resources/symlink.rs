//! Backup-aware linker.
//!
//! [`Linker::ensure_link`] makes `dest` a symlink to `source`. Anything
//! already at `dest` that is not the correct link is moved into the run's
//! [`BackupSession`] first; if that move fails no link is attempted.
use std::io;
use std::path::{Path, PathBuf};

use super::backup::BackupSession;
use super::error::LinkError;
use super::helpers::fs::ensure_parent_dir;

/// Which set a [`LinkSpec`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkCategory {
    /// Fixed set, processed on every run.
    Core,
    /// Found by scanning the repository root; needs confirmation.
    Discovered,
}

/// A named mapping from a repository file to a home-directory destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    /// File name, e.g. `.zshrc`.
    pub name: String,
    /// Which set this spec belongs to.
    pub category: LinkCategory,
    /// Absolute path inside the repository.
    pub source: PathBuf,
    /// Absolute path inside the home directory.
    pub dest: PathBuf,
}

impl LinkSpec {
    /// Map `name` from `root` into `home`.
    #[must_use]
    pub fn new(name: &str, category: LinkCategory, root: &Path, home: &Path) -> Self {
        Self {
            name: name.to_string(),
            category,
            source: root.join(name),
            dest: home.join(name),
        }
    }
}

/// What is currently at a link destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing is there.
    Absent,
    /// A symlink pointing at the expected source.
    CorrectSymlink,
    /// A symlink pointing somewhere else.
    IncorrectSymlink {
        /// Where the link points now.
        current: PathBuf,
    },
    /// A regular file or directory.
    Occupied,
}

impl LinkState {
    /// Inspect `dest` without following a symlink there.
    #[must_use]
    pub fn classify(source: &Path, dest: &Path) -> Self {
        match std::fs::symlink_metadata(dest) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::Absent,
            Err(_) => Self::Occupied,
            Ok(meta) if meta.is_symlink() => match std::fs::read_link(dest) {
                Ok(current) if current == source => Self::CorrectSymlink,
                Ok(current) => Self::IncorrectSymlink { current },
                Err(_) => Self::Occupied,
            },
            Ok(_) => Self::Occupied,
        }
    }
}

/// Why a link was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The destination already points at the source.
    AlreadyCorrect,
}

/// Successful result of [`Linker::ensure_link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new link was created.
    Linked {
        /// Where the displaced entry was moved, if there was one.
        backup: Option<PathBuf>,
    },
    /// Nothing changed.
    Skipped(SkipReason),
}

/// Per-entry results of [`Linker::link_many`], in input order.
#[derive(Debug, Default)]
pub struct LinkReport {
    /// `(name, result)` for every spec.
    pub entries: Vec<(String, Result<LinkOutcome, LinkError>)>,
}

impl LinkReport {
    /// Number of newly created links.
    #[must_use]
    pub fn linked(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, r)| matches!(r, Ok(LinkOutcome::Linked { .. })))
            .count()
    }

    /// Number of links that were already correct.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, r)| matches!(r, Ok(LinkOutcome::Skipped(_))))
            .count()
    }

    /// Names and errors of failed entries.
    #[must_use]
    pub fn failed(&self) -> Vec<(&str, &LinkError)> {
        self.entries
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
            .collect()
    }
}

/// Creates links, backing up whatever is in the way.
#[derive(Debug)]
pub struct Linker<'a> {
    session: &'a BackupSession,
}

impl<'a> Linker<'a> {
    /// Create a linker that backs up into `session`.
    #[must_use]
    pub const fn new(session: &'a BackupSession) -> Self {
        Self { session }
    }

    /// Make `dest` a symlink to `source`.
    ///
    /// # Errors
    ///
    /// - [`LinkError::SourceMissing`] when `source` does not exist; nothing
    ///   is touched.
    /// - [`LinkError::BackupFailed`] when the existing entry cannot be moved
    ///   aside; it stays where it was and no link is created.
    /// - [`LinkError::LinkCreationFailed`] when the link cannot be created.
    pub fn ensure_link(&self, source: &Path, dest: &Path) -> Result<LinkOutcome, LinkError> {
        if !source.exists() {
            return Err(LinkError::SourceMissing {
                path: source.to_path_buf(),
            });
        }

        let backup = match LinkState::classify(source, dest) {
            LinkState::CorrectSymlink => {
                return Ok(LinkOutcome::Skipped(SkipReason::AlreadyCorrect));
            }
            LinkState::Absent => None,
            LinkState::IncorrectSymlink { .. } | LinkState::Occupied => Some(
                self.session
                    .backup(dest)
                    .map_err(|source| LinkError::BackupFailed {
                        path: dest.to_path_buf(),
                        source,
                    })?,
            ),
        };

        ensure_parent_dir(dest)
            .and_then(|()| create_symlink(source, dest))
            .map_err(|source| LinkError::LinkCreationFailed {
                path: dest.to_path_buf(),
                source,
            })?;

        Ok(LinkOutcome::Linked { backup })
    }

    /// Link every spec. A failure never stops the remaining entries.
    #[must_use]
    pub fn link_many(&self, specs: &[LinkSpec]) -> LinkReport {
        LinkReport {
            entries: specs
                .iter()
                .map(|spec| (spec.name.clone(), self.ensure_link(&spec.source, &spec.dest)))
                .collect(),
        }
    }
}

/// Hidden top-level entries of `root` that are neither version-control
/// files, Finder metadata, part of `core` nor listed in `exclude`.
///
/// Sorted by name. Does not recurse.
///
/// # Errors
///
/// Returns an error if `root` cannot be read.
pub fn discover(root: &Path, core: &[String], exclude: &[String]) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if is_candidate(&name) && !core.contains(&name) && !exclude.contains(&name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn is_candidate(name: &str) -> bool {
    name.starts_with('.') && !name.starts_with(".git") && name != ".DS_Store"
}

#[cfg(unix)]
fn create_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(not(unix))]
fn create_symlink(_source: &Path, _dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are only supported on Unix",
    ))
}

#[cfg(all(test, unix))]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::resources::backup::BACKUP_DIR_NAME;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        home: PathBuf,
        session: BackupSession,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let home = dir.path().join("home");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&home).unwrap();
        let session = BackupSession::with_stamp(
            home.join(BACKUP_DIR_NAME),
            home.clone(),
            "20240101-000000".to_string(),
        );
        Fixture {
            _dir: dir,
            root,
            home,
            session,
        }
    }

    #[test]
    fn classify_states() {
        let f = fixture();
        let source = f.root.join(".zshrc");
        let other = f.root.join(".other");
        std::fs::write(&source, "s").unwrap();
        std::fs::write(&other, "o").unwrap();

        let dest = f.home.join(".zshrc");
        assert_eq!(LinkState::classify(&source, &dest), LinkState::Absent);

        std::fs::write(&dest, "file").unwrap();
        assert_eq!(LinkState::classify(&source, &dest), LinkState::Occupied);
        std::fs::remove_file(&dest).unwrap();

        std::os::unix::fs::symlink(&other, &dest).unwrap();
        assert_eq!(
            LinkState::classify(&source, &dest),
            LinkState::IncorrectSymlink {
                current: other.clone()
            }
        );
        std::fs::remove_file(&dest).unwrap();

        std::os::unix::fs::symlink(&source, &dest).unwrap();
        assert_eq!(LinkState::classify(&source, &dest), LinkState::CorrectSymlink);
    }

    #[test]
    fn directory_destination_is_occupied() {
        let f = fixture();
        std::fs::create_dir(f.home.join(".vim")).unwrap();
        assert_eq!(
            LinkState::classify(&f.root.join(".vim"), &f.home.join(".vim")),
            LinkState::Occupied
        );
    }

    #[test]
    fn missing_source_touches_nothing() {
        let f = fixture();
        let dest = f.home.join(".zshrc");
        std::fs::write(&dest, "keep").unwrap();

        let err = Linker::new(&f.session)
            .ensure_link(&f.root.join(".zshrc"), &dest)
            .unwrap_err();

        assert!(matches!(err, LinkError::SourceMissing { .. }));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "keep");
        assert!(f.session.dir().is_none());
    }

    #[test]
    fn absent_destination_is_linked_without_backup() {
        let f = fixture();
        let source = f.root.join(".zshrc");
        std::fs::write(&source, "s").unwrap();
        let dest = f.home.join(".zshrc");

        let outcome = Linker::new(&f.session).ensure_link(&source, &dest).unwrap();

        assert_eq!(outcome, LinkOutcome::Linked { backup: None });
        assert_eq!(std::fs::read_link(&dest).unwrap(), source);
        assert!(f.session.dir().is_none());
    }

    #[test]
    fn regular_file_is_backed_up_then_linked() {
        let f = fixture();
        let source = f.root.join(".zshrc");
        std::fs::write(&source, "new").unwrap();
        let dest = f.home.join(".zshrc");
        std::fs::write(&dest, "precious").unwrap();

        let outcome = Linker::new(&f.session).ensure_link(&source, &dest).unwrap();

        let LinkOutcome::Linked { backup: Some(backup) } = outcome else {
            panic!("expected a backup, got {outcome:?}");
        };
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "precious");
        assert_eq!(std::fs::read_link(&dest).unwrap(), source);
    }

    #[test]
    fn incorrect_symlink_is_backed_up_as_symlink() {
        let f = fixture();
        let source = f.root.join(".zshrc");
        std::fs::write(&source, "new").unwrap();
        let dest = f.home.join(".zshrc");
        std::os::unix::fs::symlink("/elsewhere/.zshrc", &dest).unwrap();

        let outcome = Linker::new(&f.session).ensure_link(&source, &dest).unwrap();

        let LinkOutcome::Linked { backup: Some(backup) } = outcome else {
            panic!("expected a backup, got {outcome:?}");
        };
        assert_eq!(
            std::fs::read_link(backup).unwrap(),
            Path::new("/elsewhere/.zshrc")
        );
        assert_eq!(std::fs::read_link(&dest).unwrap(), source);
    }

    #[test]
    fn correct_symlink_is_skipped() {
        let f = fixture();
        let source = f.root.join(".zshrc");
        std::fs::write(&source, "s").unwrap();
        let dest = f.home.join(".zshrc");
        std::os::unix::fs::symlink(&source, &dest).unwrap();

        let outcome = Linker::new(&f.session).ensure_link(&source, &dest).unwrap();
        assert_eq!(outcome, LinkOutcome::Skipped(SkipReason::AlreadyCorrect));
    }

    #[test]
    fn missing_parent_is_created() {
        let f = fixture();
        let source = f.root.join("nvim");
        std::fs::create_dir(&source).unwrap();
        let dest = f.home.join(".config/nvim");

        Linker::new(&f.session).ensure_link(&source, &dest).unwrap();
        assert_eq!(std::fs::read_link(&dest).unwrap(), source);
    }

    #[test]
    fn backup_failure_prevents_link() {
        let f = fixture();
        let source = f.root.join(".zshrc");
        std::fs::write(&source, "s").unwrap();
        let dest = f.home.join(".zshrc");
        std::fs::write(&dest, "precious").unwrap();
        // A file where the backup root should be makes session creation fail.
        let blocked_root = f.home.join("blocked");
        std::fs::write(&blocked_root, "not a directory").unwrap();
        let session =
            BackupSession::with_stamp(blocked_root, f.home.clone(), "stamp".to_string());

        let err = Linker::new(&session).ensure_link(&source, &dest).unwrap_err();

        assert!(matches!(err, LinkError::BackupFailed { .. }));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "precious");
    }

    #[test]
    fn link_many_isolates_failures() {
        let f = fixture();
        for name in [".a", ".c"] {
            std::fs::write(f.root.join(name), name).unwrap();
        }
        let specs: Vec<LinkSpec> = [".a", ".b", ".c"]
            .iter()
            .map(|n| LinkSpec::new(n, LinkCategory::Core, &f.root, &f.home))
            .collect();

        let report = Linker::new(&f.session).link_many(&specs);

        assert_eq!(report.linked(), 2);
        assert_eq!(report.skipped(), 0);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, ".b");
        assert!(f.home.join(".c").symlink_metadata().is_ok());
    }

    #[test]
    fn discover_filters_and_sorts() {
        let f = fixture();
        for name in [
            ".zshrc",
            ".gitconfig",
            ".git",
            ".DS_Store",
            ".tmux.conf",
            ".env",
            ".aliases",
        ] {
            std::fs::write(f.root.join(name), "").unwrap();
        }
        std::fs::write(f.root.join("README.md"), "").unwrap();
        std::fs::create_dir(f.root.join(".hammerspoon")).unwrap();

        let found = discover(
            &f.root,
            &[".zshrc".to_string(), ".tmux.conf".to_string()],
            &[".env".to_string()],
        )
        .unwrap();

        assert_eq!(found, vec![".aliases", ".hammerspoon"]);
    }
}
