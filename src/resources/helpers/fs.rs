//! File-system helpers for moving displaced entries aside.
use std::io;
use std::path::Path;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Recursively copy a directory tree.
///
/// Symlinks inside the tree are recreated as symlinks rather than followed,
/// so a backup holds exactly what was on disk.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or an entry cannot be
/// read or copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            copy_symlink(&src_path, &dst_path)?;
        } else if file_type.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Remove whatever is at `path` without following a symlink there.
///
/// # Errors
///
/// Returns an error if the entry cannot be removed.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

/// Move `from` to `to`.
///
/// Tries a rename first. When the two paths are on different file systems
/// the entry is copied (recursively for directories) and the original is
/// removed afterwards.
///
/// # Errors
///
/// Returns an error if neither the rename nor the copy fallback succeeds.
/// The original is only removed after a complete copy.
pub fn move_path(from: &Path, to: &Path) -> io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_entry(from, to)?;
            remove_path(from)
        }
        Err(e) => Err(e),
    }
}

fn copy_entry(from: &Path, to: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(from)?;
    if meta.is_symlink() {
        copy_symlink(from, to)
    } else if meta.is_dir() {
        copy_dir_recursive(from, to)
    } else {
        std::fs::copy(from, to).map(|_| ())
    }
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    let target = std::fs::read_link(from)?;
    std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::copy(from, to).map(|_| ())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[cfg(unix)]
    #[test]
    fn copy_preserves_symlinks() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", src.path().join("link")).unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        let copied = target.join("link");
        assert!(copied.symlink_metadata().unwrap().is_symlink());
        assert_eq!(
            std::fs::read_link(&copied).unwrap(),
            Path::new("/nonexistent/target")
        );
    }

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").exists());
    }

    #[test]
    fn move_path_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        std::fs::write(&from, "content").unwrap();
        move_path(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "content");
    }

    #[test]
    fn move_path_moves_directory() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from");
        std::fs::create_dir(&from).unwrap();
        std::fs::write(from.join("inner"), "x").unwrap();
        let to = dir.path().join("to");
        move_path(&from, &to).unwrap();
        assert!(!from.exists());
        assert!(to.join("inner").exists());
    }

    #[test]
    fn move_path_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(move_path(&dir.path().join("absent"), &dir.path().join("to")).is_err());
    }

    #[test]
    fn copy_entry_then_remove_matches_move() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("tree");
        std::fs::create_dir_all(from.join("nested")).unwrap();
        std::fs::write(from.join("nested/file"), "data").unwrap();
        let to = dir.path().join("copy");
        copy_entry(&from, &to).unwrap();
        remove_path(&from).unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(to.join("nested/file")).unwrap(), "data");
    }

    #[cfg(unix)]
    #[test]
    fn remove_path_removes_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink("/nonexistent/target", &link).unwrap();
        remove_path(&link).unwrap();
        assert!(link.symlink_metadata().is_err());
    }
}
