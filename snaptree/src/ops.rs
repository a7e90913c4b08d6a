// SPDX-License-Identifier: GPL-3.0-only

//! Subvolume operations behind a capability trait.
//!
//! The engines only ever talk to [`SubvolumeOps`], so their ordering
//! behavior can be exercised against a recording mock; [`IoctlOps`] is the
//! production implementation on top of the raw ioctl surface.

use std::os::unix::fs::MetadataExt;

use crate::error::{Result, SnapError};
use crate::ioctl;

/// First inode of every btrfs subvolume.
const SUBVOL_ROOT_INO: u64 = 256;

/// The filesystem-level operations the engines are built from.
pub trait SubvolumeOps {
    /// Whether the subvolume at `path` carries the read-only flag.
    fn get_readonly(&self, path: &str) -> Result<bool>;

    /// Set or clear the read-only flag of the subvolume at `path`.
    fn set_readonly(&self, path: &str, readonly: bool) -> Result<()>;

    /// Snapshot the subvolume at `source` to `dest_parent`/`name`.
    fn snapshot(&self, source: &str, dest_parent: &str, name: &str) -> Result<()>;

    /// Destroy the subvolume `name` nested in the directory `parent`.
    fn destroy(&self, parent: &str, name: &str) -> Result<()>;

    /// Remove the empty placeholder directory a parent snapshot left at
    /// `path`.
    fn remove_placeholder(&self, path: &str) -> Result<()>;
}

/// Production implementation issuing btrfs ioctls.
pub struct IoctlOps;

impl SubvolumeOps for IoctlOps {
    fn get_readonly(&self, path: &str) -> Result<bool> {
        let ctx = |source: std::io::Error| SnapError::GetFlags {
            path: path.to_string(),
            source,
        };
        let dir = ioctl::open_dir(path).map_err(ctx)?;
        let flags = ioctl::get_flags(&dir).map_err(ctx)?;
        Ok(flags & ioctl::SUBVOL_RDONLY != 0)
    }

    fn set_readonly(&self, path: &str, readonly: bool) -> Result<()> {
        let ctx = |source: std::io::Error| SnapError::SetFlags {
            path: path.to_string(),
            source,
        };
        let dir = ioctl::open_dir(path).map_err(ctx)?;
        let mut flags = ioctl::get_flags(&dir).map_err(|source| SnapError::GetFlags {
            path: path.to_string(),
            source,
        })?;
        if readonly {
            flags |= ioctl::SUBVOL_RDONLY;
        } else {
            flags &= !ioctl::SUBVOL_RDONLY;
        }
        ioctl::set_flags(&dir, flags).map_err(ctx)?;
        tracing::debug!(path, readonly, "applied read-only flag");
        Ok(())
    }

    fn snapshot(&self, source: &str, dest_parent: &str, name: &str) -> Result<()> {
        let ctx = |io: std::io::Error| SnapError::SnapshotCreate {
            parent: dest_parent.to_string(),
            name: name.to_string(),
            source: io,
        };
        let dest_dir = ioctl::open_dir(dest_parent).map_err(ctx)?;
        let src_dir = ioctl::open_dir(source).map_err(ctx)?;
        ioctl::snap_create(&dest_dir, &src_dir, name).map_err(|err| match err {
            SnapError::Io(io) => ctx(io),
            other => other,
        })?;
        tracing::debug!(source, dest_parent, name, "snapshot created");
        Ok(())
    }

    fn destroy(&self, parent: &str, name: &str) -> Result<()> {
        let ctx = |io: std::io::Error| SnapError::Destroy {
            parent: parent.to_string(),
            name: name.to_string(),
            source: io,
        };
        let parent_dir = ioctl::open_dir(parent).map_err(ctx)?;
        ioctl::snap_destroy(&parent_dir, name).map_err(|err| match err {
            SnapError::Io(io) => ctx(io),
            other => other,
        })?;
        tracing::debug!(parent, name, "subvolume destroyed");
        Ok(())
    }

    fn remove_placeholder(&self, path: &str) -> Result<()> {
        std::fs::remove_dir(path).map_err(|source| SnapError::PlaceholderRemove {
            path: path.to_string(),
            source,
        })
    }
}

/// Verify that `path` is the root of a btrfs subvolume.
///
/// Every btrfs subvolume root is a directory with inode number 256; plain
/// directories and files inside a subvolume carry other inode numbers.
pub fn ensure_subvolume(path: &str) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|e| SnapError::InvalidSource(format!("{path}: {e}")))?;
    if !meta.is_dir() || meta.ino() != SUBVOL_ROOT_INO {
        return Err(SnapError::InvalidSource(format!(
            "{path} is not a btrfs subvolume root"
        )));
    }
    Ok(())
}
