//! Write-to-temp-then-rename helper so a reader never observes a partially
//! written file, with the Unix mode applied before the rename so the final
//! path never briefly exists world-readable.

use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, thiserror::Error)]
pub enum AtomicWriteError {
    #[error("failed to write temp file {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to set permissions on {path}: {source}")]
    Permissions {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: std::path::PathBuf,
        to: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes `contents` atomically to `path`, setting Unix mode `mode` on the
/// temp file before the rename. `mode` is ignored on non-Unix targets.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<(), AtomicWriteError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp_path = dir.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("atomic"),
        std::process::id()
    ));

    let mut file =
        std::fs::File::create(&tmp_path).map_err(|source| AtomicWriteError::Write {
            path: tmp_path.clone(),
            source,
        })?;
    file.write_all(contents)
        .map_err(|source| AtomicWriteError::Write {
            path: tmp_path.clone(),
            source,
        })?;
    file.sync_all().map_err(|source| AtomicWriteError::Write {
        path: tmp_path.clone(),
        source,
    })?;

    #[cfg(unix)]
    {
        let perms = std::fs::Permissions::from_mode(mode);
        std::fs::set_permissions(&tmp_path, perms).map_err(|source| {
            AtomicWriteError::Permissions {
                path: tmp_path.clone(),
                source,
            }
        })?;
    }

    std::fs::rename(&tmp_path, path).map_err(|source| AtomicWriteError::Rename {
        from: tmp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.key");
        write_atomic(&path, b"hello", 0o600).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        #[cfg(unix)]
        {
            let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.pem");
        write_atomic(&path, b"cert", 0o644).unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("ca.pem")]);
    }
}
