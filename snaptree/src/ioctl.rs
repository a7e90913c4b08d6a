// SPDX-License-Identifier: GPL-3.0-only

//! Raw btrfs ioctl surface.
//!
//! The engines talk to the filesystem through four vol-args ioctls: query
//! and set the subvolume flag word, create a snapshot, and destroy a
//! subvolume. All of them operate on an open read-only directory handle;
//! handles are plain [`File`] values so they close on every exit path.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use crate::error::{Result, SnapError};

/// Kernel limit for a subvolume name passed through the vol-args ioctls.
pub const SUBVOL_NAME_MAX: usize = 4039;

/// Read-only bit in the 64-bit subvolume flag word.
pub const SUBVOL_RDONLY: u64 = 1 << 1;

const BTRFS_IOCTL_MAGIC: u8 = 0x94;

/// Mirror of the kernel's `struct btrfs_ioctl_vol_args_v2`.
///
/// `fd` carries the source subvolume handle for snapshot creation and is
/// ignored for destruction; `name` is the destination (or victim)
/// subvolume name relative to the handle the ioctl is issued on. The
/// `unused` block stands in for the qgroup union the engines never touch.
#[repr(C)]
#[derive(Debug)]
pub struct VolArgsV2 {
    pub fd: i64,
    pub transid: u64,
    pub flags: u64,
    pub unused: [u64; 4],
    pub name: [u8; SUBVOL_NAME_MAX + 1],
}

impl VolArgsV2 {
    /// Zeroed argument block carrying `name`.
    pub fn with_name(name: &str) -> Result<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > SUBVOL_NAME_MAX {
            return Err(SnapError::NameTooLong(name.to_string()));
        }

        let mut args = VolArgsV2 {
            fd: 0,
            transid: 0,
            flags: 0,
            unused: [0; 4],
            name: [0; SUBVOL_NAME_MAX + 1],
        };
        args.name[..bytes.len()].copy_from_slice(bytes);
        Ok(args)
    }
}

nix::ioctl_read!(btrfs_subvol_getflags, BTRFS_IOCTL_MAGIC, 25, u64);
nix::ioctl_write_ptr!(btrfs_subvol_setflags, BTRFS_IOCTL_MAGIC, 26, u64);
nix::ioctl_write_ptr!(btrfs_snap_create_v2, BTRFS_IOCTL_MAGIC, 23, VolArgsV2);
nix::ioctl_write_ptr!(btrfs_snap_destroy_v2, BTRFS_IOCTL_MAGIC, 63, VolArgsV2);

fn io_from_errno(errno: nix::errno::Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(errno as i32)
}

/// Open a path as a read-only directory handle.
pub fn open_dir(path: &str) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY)
        .open(Path::new(path))
}

/// Fetch the 64-bit flag word of the subvolume behind `dir`.
pub fn get_flags(dir: &File) -> std::io::Result<u64> {
    let mut flags: u64 = 0;
    unsafe { btrfs_subvol_getflags(dir.as_raw_fd(), &mut flags) }.map_err(io_from_errno)?;
    Ok(flags)
}

/// Apply a full 64-bit flag word to the subvolume behind `dir`.
pub fn set_flags(dir: &File, flags: u64) -> std::io::Result<()> {
    unsafe { btrfs_subvol_setflags(dir.as_raw_fd(), &flags) }.map_err(io_from_errno)?;
    Ok(())
}

/// Snapshot the subvolume behind `source` as `dest_dir`/`name`.
///
/// A single atomic kernel operation; no partial snapshot is observable.
pub fn snap_create(dest_dir: &File, source: &File, name: &str) -> Result<()> {
    let mut args = VolArgsV2::with_name(name)?;
    args.fd = i64::from(source.as_raw_fd());
    unsafe { btrfs_snap_create_v2(dest_dir.as_raw_fd(), &args) }
        .map_err(|errno| SnapError::Io(io_from_errno(errno)))?;
    Ok(())
}

/// Destroy the subvolume `name` nested in `parent_dir`.
///
/// Fails at the filesystem level while `name` still contains live nested
/// subvolumes.
pub fn snap_destroy(parent_dir: &File, name: &str) -> Result<()> {
    let args = VolArgsV2::with_name(name)?;
    unsafe { btrfs_snap_destroy_v2(parent_dir.as_raw_fd(), &args) }
        .map_err(|errno| SnapError::Io(io_from_errno(errno)))?;
    Ok(())
}
