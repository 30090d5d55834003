//! Bootloader registry (§4.E): a static `src → dst` symlink table inside
//! the cache directory, plus the small classification used to resolve a
//! `dst` to a controller-relative URL path.

use std::fs;
use std::path::{Path, PathBuf};

use super::CacheError;

/// One static bootloader entry: `dst` is the symlink name created inside
/// the cache directory, `src` is what it points at.
pub struct BootloaderEntry {
    pub dst: &'static str,
    pub src: &'static str,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    UefiArm64,
    UefiAmd64,
    OpenFirmwarePpc64El,
    PxeI386,
}

pub const REGISTRY: &[BootloaderEntry] = &[
    BootloaderEntry {
        dst: "bootaa64.efi",
        src: "grubaa64.efi",
        classification: Classification::UefiArm64,
    },
    BootloaderEntry {
        dst: "bootx64.efi",
        src: "grubx64.efi",
        classification: Classification::UefiAmd64,
    },
    BootloaderEntry {
        dst: "bootppc64.bin",
        src: "grub2.ppc64le",
        classification: Classification::OpenFirmwarePpc64El,
    },
    BootloaderEntry {
        dst: "pxelinux.0",
        src: "syslinux/pxelinux.0",
        classification: Classification::PxeI386,
    },
];

/// Creates the registry's symlinks inside `cache_dir`, idempotently: an
/// existing correct symlink is left alone, a stale one is removed and
/// recreated once.
pub fn install(cache_dir: &Path) -> Result<(), CacheError> {
    for entry in REGISTRY {
        let dst_path = cache_dir.join(entry.dst);
        let src_path = cache_dir.join(entry.src);

        match fs::read_link(&dst_path) {
            Ok(existing) if existing == src_path => continue,
            Ok(_) => fs::remove_file(&dst_path)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(CacheError::Io(err)),
        }

        #[cfg(unix)]
        std::os::unix::fs::symlink(&src_path, &dst_path)?;
        #[cfg(not(unix))]
        std::os::windows::fs::symlink_file(&src_path, &dst_path)?;
    }
    Ok(())
}

/// `Find(dst)`: resolves the symlink and opens the target file.
pub fn find(cache_dir: &Path, dst: &str) -> Result<std::fs::File, CacheError> {
    let path = cache_dir.join(dst);
    std::fs::File::open(path).map_err(CacheError::Io)
}

/// `FindRemoteURL(dst)`: maps `dst` to a controller-relative path via the
/// static classification.
pub fn find_remote_url(dst: &str) -> Option<PathBuf> {
    let entry = REGISTRY.iter().find(|entry| entry.dst == dst)?;
    let prefix = match entry.classification {
        Classification::UefiArm64 => "uefi/arm64",
        Classification::UefiAmd64 => "uefi/amd64",
        Classification::OpenFirmwarePpc64El => "open-firmware/ppc64el",
        Classification::PxeI386 => "pxe/i386",
    };
    Some(PathBuf::from(prefix).join(entry.dst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn installing_twice_is_idempotent() {
        let dir = tempdir().unwrap();
        install(dir.path()).unwrap();
        let before: Vec<_> = REGISTRY
            .iter()
            .map(|entry| fs::read_link(dir.path().join(entry.dst)).unwrap())
            .collect();
        install(dir.path()).unwrap();
        let after: Vec<_> = REGISTRY
            .iter()
            .map(|entry| fs::read_link(dir.path().join(entry.dst)).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn stale_symlink_is_replaced() {
        let dir = tempdir().unwrap();
        let stale_target = dir.path().join("not-the-real-source");
        std::os::unix::fs::symlink(&stale_target, dir.path().join("bootx64.efi")).unwrap();
        install(dir.path()).unwrap();
        let resolved = fs::read_link(dir.path().join("bootx64.efi")).unwrap();
        assert_eq!(resolved, dir.path().join("grubx64.efi"));
    }

    #[test]
    fn remote_url_classifies_known_entries() {
        assert_eq!(
            find_remote_url("bootaa64.efi"),
            Some(PathBuf::from("uefi/arm64/bootaa64.efi"))
        );
        assert_eq!(find_remote_url("unknown.efi"), None);
    }
}
