// SPDX-License-Identifier: GPL-2.0

//! Virtual filesystem: mount-graph path router plus the read-only
//! tar-format driver plugged into it (`spec.md` §4.G, §4.H).
//!
//! The CLI-level surface below (`open`/`close`/`read`/`write`/`readdir`/
//! `ioctl`/`mount`/`unmount`) is a thin, typed wrapper over
//! [`mount_graph`] — it is not part of the hardened user-space ABI
//! (`spec.md` §6), just the entry points callers elsewhere in the
//! kernel (the shell, driver init) use.

pub mod mount_graph;
pub mod ramdisk; // In-memory block device backing the mount graph
pub mod tarfs; // Read-only USTAR filesystem driver for the mount graph

use alloc::string::String;
use alloc::vec::Vec;

pub use mount_graph::{DriverHandle, FilesystemType, IoctlRequest, OpenFlags, SeekWhence, VfsDriver};

use crate::error::Result;

/// Maximum filename length accepted by drivers registered in the graph.
pub const NAME_MAX: usize = 255;
/// Maximum path length.
pub const PATH_MAX: usize = 4096;

/// Register the tar filesystem type and mount the in-memory initrd
/// image, if one was embedded at build time, at `/`.
pub fn init() -> Result<()> {
	mount_graph::register_filesystem_type(alloc::sync::Arc::new(tarfs::TarFsType));
	crate::info!("vfs: mount graph ready, tar filesystem type registered");
	Ok(())
}

/// `open(path, flags, mode) -> fd`. `mode` is accepted for surface
/// compatibility with the Non-goal user-space ABI shape but unused: the
/// core ships no write-side filesystem.
pub fn open(path: &str, flags: OpenFlags, _mode: u32) -> Result<u32> {
	mount_graph::open(path, flags)
}

pub fn close(fd: u32) -> Result<()> {
	mount_graph::close(fd)
}

pub fn read(fd: u32, buf: &mut [u8]) -> Result<usize> {
	mount_graph::read(fd, buf)
}

pub fn write(fd: u32, buf: &[u8]) -> Result<usize> {
	mount_graph::write(fd, buf)
}

pub fn readdir(fd: u32) -> Result<Vec<String>> {
	let mut out = Vec::new();
	mount_graph::readdir(fd, &mut out)?;
	Ok(out)
}

pub fn ioctl(fd: u32, request: IoctlRequest) -> Result<i64> {
	mount_graph::ioctl(fd, request)
}

/// `mount(path, dev_path, fs_name?)`: when `fs_name` is absent every
/// registered filesystem type is probed in turn (`spec.md` §4.G).
pub fn mount(path: &str, dev_path: &str, fs_name: Option<&str>) -> Result<()> {
	mount_graph::mount(path, dev_path, fs_name)
}

pub fn unmount(path: &str) -> Result<()> {
	mount_graph::unregister(path)
}
