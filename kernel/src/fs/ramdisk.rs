// SPDX-License-Identifier: GPL-2.0

//! Minimal in-memory block-device driver for the mount graph.
//!
//! Exists so a filesystem driver's "backing device" (`spec.md` §4.H)
//! can be an ordinary mount-graph path rather than requiring real block
//! I/O hardware — [`register`] is how the boot sequence exposes an
//! embedded archive at a device path the tar driver then opens.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use super::mount_graph::{self, DriverHandle, IoctlRequest, OpenFlags, SeekWhence, VfsDriver};
use crate::error::{Error, Result};
use crate::sync::Mutex;

pub struct RamDisk {
	data: Vec<u8>,
	positions: Mutex<BTreeMap<u64, u64>>,
	next_handle: AtomicU64,
}

impl VfsDriver for RamDisk {
	fn open(&self, _path: &str, _flags: OpenFlags) -> Result<DriverHandle> {
		let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
		self.positions.lock().insert(handle, 0);
		Ok(handle)
	}

	fn close(&self, handle: DriverHandle) -> Result<()> {
		self.positions.lock().remove(&handle).map(|_| ()).ok_or(Error::EBADF)
	}

	fn read(&self, handle: DriverHandle, buf: &mut [u8]) -> Result<usize> {
		let mut positions = self.positions.lock();
		let pos = positions.get_mut(&handle).ok_or(Error::EBADF)?;
		let remaining = (self.data.len() as u64).saturating_sub(*pos);
		let n = core::cmp::min(buf.len() as u64, remaining) as usize;
		let start = *pos as usize;
		buf[..n].copy_from_slice(&self.data[start..start + n]);
		*pos += n as u64;
		Ok(n)
	}

	fn readdir(&self, _handle: DriverHandle, _out: &mut Vec<alloc::string::String>) -> Result<()> {
		Err(Error::ENOTDIR)
	}

	fn ioctl(&self, handle: DriverHandle, request: IoctlRequest) -> Result<i64> {
		let mut positions = self.positions.lock();
		let pos = positions.get_mut(&handle).ok_or(Error::EBADF)?;
		match request {
			IoctlRequest::Seek { whence, offset } => {
				let base = match whence {
					SeekWhence::Set => 0i64,
					SeekWhence::Current => *pos as i64,
				};
				let mut new_pos = base + offset;
				if new_pos < 0 {
					new_pos = 0;
				}
				if new_pos as u64 > self.data.len() as u64 {
					new_pos = self.data.len() as i64;
				}
				*pos = new_pos as u64;
				Ok(new_pos)
			}
		}
	}
}

/// Register `data` as a block device at `path`.
pub fn register(path: &str, data: Vec<u8>) -> Result<()> {
	let disk = Arc::new(RamDisk {
		data,
		positions: Mutex::new(BTreeMap::new()),
		next_handle: AtomicU64::new(1),
	});
	mount_graph::register(path, disk)
}
