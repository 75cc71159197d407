// SPDX-License-Identifier: GPL-2.0

//! Lightweight mount-graph path router.
//!
//! This sits alongside the Linux-compatible VFS above (`dentry`/`inode`/
//! `super_block`/...) rather than replacing it: this is the small
//! driver-vtable router a boot-time read-only filesystem mounts through.
//! Nodes are a tree of owned, sorted children rather than raw
//! first-child/next-sibling pointers — `register`/`unregister` walk it
//! by plain recursion, which gives the "walk toward root pruning
//! driver-less nodes" behaviour in `spec.md` §4.G for free on the
//! call-stack unwind, without hand-rolled sibling links.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::error::{Error, Result};
use crate::sync::Spinlock;

bitflags::bitflags! {
	pub struct OpenFlags: u32 {
		const READ = 1 << 0;
		const WRITE = 1 << 1;
	}
}

/// Driver-defined handle, opaque to the mount graph.
pub type DriverHandle = u64;

/// `ioctl` request understood by drivers registered in the mount graph.
/// Currently only the tar driver's seek operation; kept as an enum
/// rather than a raw `(u32, u64)` pair so drivers pattern-match instead
/// of decoding a request number.
#[derive(Debug, Clone, Copy)]
pub enum IoctlRequest {
	Seek { whence: SeekWhence, offset: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
	Set,
	Current,
}

/// Capability set a mounted filesystem exposes at a mount-graph node.
/// Object-safe trait object (`Arc<dyn VfsDriver>`) in place of the
/// source's function-pointer vtable, per `spec.md` §9 Design Notes.
pub trait VfsDriver: Send + Sync {
	fn open(&self, path: &str, flags: OpenFlags) -> Result<DriverHandle>;
	fn close(&self, handle: DriverHandle) -> Result<()>;
	fn read(&self, handle: DriverHandle, buf: &mut [u8]) -> Result<usize>;
	fn write(&self, _handle: DriverHandle, _buf: &[u8]) -> Result<usize> {
		Err(Error::NotSupported)
	}
	fn readdir(&self, handle: DriverHandle, out: &mut Vec<String>) -> Result<()>;
	fn ioctl(&self, handle: DriverHandle, request: IoctlRequest) -> Result<i64>;
}

/// Probes a device path's superblock and, on success, returns a driver
/// bound to it. One instance per supported on-disk format is registered
/// with [`register_filesystem_type`]; [`mount`] tries each in turn when
/// the caller doesn't name one explicitly.
pub trait FilesystemType: Send + Sync {
	fn name(&self) -> &'static str;
	fn probe_and_mount(&self, dev_path: &str) -> Result<Arc<dyn VfsDriver>>;
}

struct MountNode {
	segment: String,
	/// Segment-depth of this node from the root; the suffix handed to a
	/// matched driver's `open` is everything past this many segments.
	depth: usize,
	driver: Option<Arc<dyn VfsDriver>>,
	children: Vec<MountNode>,
}

impl MountNode {
	const fn root() -> Self {
		Self {
			segment: String::new(),
			depth: 0,
			driver: None,
			children: Vec::new(),
		}
	}

	fn new(segment: String, depth: usize) -> Self {
		Self {
			segment,
			depth,
			driver: None,
			children: Vec::new(),
		}
	}
}

/// Sort/search key: `(segment_length, lexicographic segment)` so that a
/// binary search over children prunes mismatches in the same spirit as
/// the source's early-exit linear scan (`spec.md` §4.G).
fn cmp_key(a: &str, b: &str) -> Ordering {
	(a.len(), a).cmp(&(b.len(), b))
}

fn split_path(path: &str) -> Vec<&str> {
	path.split('/').filter(|s| !s.is_empty()).collect()
}

static GRAPH: Spinlock<MountNode> = Spinlock::new(MountNode::root());
static FD_TABLE: Spinlock<FdTable> = Spinlock::new(FdTable::new());
static FS_TYPES: Spinlock<Vec<Arc<dyn FilesystemType>>> = Spinlock::new(Vec::new());

fn find_driver<'a>(node: &'a MountNode, segs: &[&str]) -> Option<(&'a MountNode, usize)> {
	if let Some(first) = segs.first() {
		if let Ok(idx) = node.children.binary_search_by(|c| cmp_key(&c.segment, first)) {
			if let Some(found) = find_driver(&node.children[idx], &segs[1..]) {
				return Some(found);
			}
		}
	}
	node.driver.as_ref().map(|_| (node, node.depth))
}

fn find_exact<'a>(node: &'a MountNode, segs: &[&str]) -> Option<&'a MountNode> {
	match segs.first() {
		None => Some(node),
		Some(first) => {
			let idx = node.children.binary_search_by(|c| cmp_key(&c.segment, first)).ok()?;
			find_exact(&node.children[idx], &segs[1..])
		}
	}
}

fn register_at(node: &mut MountNode, segs: &[&str], driver: Arc<dyn VfsDriver>) -> Result<()> {
	let first = segs[0];
	let idx = match node.children.binary_search_by(|c| cmp_key(&c.segment, first)) {
		Ok(idx) => idx,
		Err(insert_at) => {
			node.children.insert(insert_at, MountNode::new(String::from(first), node.depth + 1));
			insert_at
		}
	};
	if segs.len() == 1 {
		let child = &mut node.children[idx];
		if child.driver.is_some() {
			return Err(Error::AlreadyRegistered);
		}
		child.driver = Some(driver);
		Ok(())
	} else {
		register_at(&mut node.children[idx], &segs[1..], driver)
	}
}

/// Attach `driver` at `path`, creating transient (driver-less) nodes for
/// any segment that doesn't already exist. No node is created along a
/// path that ends up failing: the only failure case, an already-occupied
/// leaf, can only occur when every node on the path already existed, so
/// there is nothing to roll back (`spec.md` §4.G).
pub fn register(path: &str, driver: Arc<dyn VfsDriver>) -> Result<()> {
	let segs = split_path(path);
	let mut root = GRAPH.lock();
	if segs.is_empty() {
		if root.driver.is_some() {
			return Err(Error::AlreadyRegistered);
		}
		root.driver = Some(driver);
		return Ok(());
	}
	register_at(&mut root, &segs, driver)
}

fn unregister_at(node: &mut MountNode, segs: &[&str]) -> Result<bool> {
	if segs.is_empty() {
		node.driver.take().ok_or(Error::NotRegistered)?;
		return Ok(node.children.is_empty());
	}
	let idx = node
		.children
		.binary_search_by(|c| cmp_key(&c.segment, segs[0]))
		.map_err(|_| Error::NotRegistered)?;
	let prune_child = unregister_at(&mut node.children[idx], &segs[1..])?;
	if prune_child {
		node.children.remove(idx);
	}
	Ok(node.driver.is_none() && node.children.is_empty())
}

/// Clear the driver at `path`, then prune any now driver-less,
/// child-less node walking back toward the root.
pub fn unregister(path: &str) -> Result<()> {
	let segs = split_path(path);
	let mut root = GRAPH.lock();
	if segs.is_empty() {
		root.driver.take().ok_or(Error::NotRegistered)?;
		return Ok(());
	}
	unregister_at(&mut root, &segs)?;
	Ok(())
}

struct Fd {
	driver: Option<Arc<dyn VfsDriver>>,
	handle: DriverHandle,
	/// Snapshot taken at `open` time; used when the node is transient
	/// (driver-less) so directory listing of a mount parent still works.
	transient_children: Vec<String>,
	flags: OpenFlags,
}

const INITIAL_FD_CAPACITY: usize = 128;

struct FdTable {
	slots: Vec<Option<Fd>>,
	free: Vec<u32>,
}

impl FdTable {
	const fn new() -> Self {
		Self {
			slots: Vec::new(),
			free: Vec::new(),
		}
	}

	fn insert(&mut self, fd: Fd) -> u32 {
		if self.slots.capacity() == 0 {
			self.slots.reserve(INITIAL_FD_CAPACITY);
		}
		if let Some(idx) = self.free.pop() {
			self.slots[idx as usize] = Some(fd);
			idx
		} else {
			self.slots.push(Some(fd));
			(self.slots.len() - 1) as u32
		}
	}

	fn take(&mut self, idx: u32) -> Result<Fd> {
		let slot = self.slots.get_mut(idx as usize).ok_or(Error::EBADF)?;
		let fd = slot.take().ok_or(Error::EBADF)?;
		self.free.push(idx);
		Ok(fd)
	}

	fn get(&self, idx: u32) -> Result<&Fd> {
		self.slots.get(idx as usize).and_then(|s| s.as_ref()).ok_or(Error::EBADF)
	}
}

/// Open `path`. Routes by longest-prefix to a registered driver,
/// subtracting the mount-point depth before handing the suffix to
/// `VfsDriver::open`; falls back to a transient directory listing (no
/// driver involved) when `path` names an existing driver-less node, so
/// listing the parent of a mount works uniformly.
pub fn open(path: &str, flags: OpenFlags) -> Result<u32> {
	let segs = split_path(path);
	let root = GRAPH.lock();

	if let Some((node, depth)) = find_driver(&root, &segs) {
		let driver = node.driver.clone().expect("find_driver only returns driver-bearing nodes");
		let suffix = segs[depth..].join("/");
		let handle = driver.open(&suffix, flags)?;
		drop(root);
		let fd = Fd {
			driver: Some(driver),
			handle,
			transient_children: Vec::new(),
			flags,
		};
		return Ok(FD_TABLE.lock().insert(fd));
	}

	if let Some(node) = find_exact(&root, &segs) {
		let children: Vec<String> = node.children.iter().map(|c| c.segment.clone()).collect();
		drop(root);
		let fd = Fd {
			driver: None,
			handle: 0,
			transient_children: children,
			flags,
		};
		return Ok(FD_TABLE.lock().insert(fd));
	}

	Err(Error::NotFound)
}

pub fn close(fd: u32) -> Result<()> {
	let entry = FD_TABLE.lock().take(fd)?;
	if let Some(driver) = entry.driver {
		driver.close(entry.handle)?;
	}
	Ok(())
}

/// A mounted filesystem's own backing device can itself be routed back
/// through this module (e.g. the tar driver seeking/reading its backing
/// FD, `spec.md` §2/§4.H) — the `FD_TABLE` lock must be released before
/// calling into the driver, or that re-entrant call deadlocks against
/// the non-reentrant `Spinlock` (sync.rs).
pub fn read(fd: u32, buf: &mut [u8]) -> Result<usize> {
	let (driver, handle) = {
		let table = FD_TABLE.lock();
		let entry = table.get(fd)?;
		if !entry.flags.contains(OpenFlags::READ) {
			return Err(Error::Unauthorized);
		}
		match &entry.driver {
			Some(driver) => (driver.clone(), entry.handle),
			None => return Err(Error::EISDIR),
		}
	};
	driver.read(handle, buf)
}

pub fn write(fd: u32, buf: &[u8]) -> Result<usize> {
	let (driver, handle) = {
		let table = FD_TABLE.lock();
		let entry = table.get(fd)?;
		if !entry.flags.contains(OpenFlags::WRITE) {
			return Err(Error::Unauthorized);
		}
		match &entry.driver {
			Some(driver) => (driver.clone(), entry.handle),
			None => return Err(Error::EISDIR),
		}
	};
	driver.write(handle, buf)
}

pub fn readdir(fd: u32, out: &mut Vec<String>) -> Result<()> {
	let (driver, handle) = {
		let table = FD_TABLE.lock();
		let entry = table.get(fd)?;
		if !entry.flags.contains(OpenFlags::READ) {
			return Err(Error::Unauthorized);
		}
		match &entry.driver {
			Some(driver) => (driver.clone(), entry.handle),
			None => {
				out.extend(entry.transient_children.iter().cloned());
				return Ok(());
			}
		}
	};
	driver.readdir(handle, out)
}

pub fn ioctl(fd: u32, request: IoctlRequest) -> Result<i64> {
	let (driver, handle) = {
		let table = FD_TABLE.lock();
		let entry = table.get(fd)?;
		match &entry.driver {
			Some(driver) => (driver.clone(), entry.handle),
			None => return Err(Error::NotSupported),
		}
	};
	driver.ioctl(handle, request)
}

pub fn register_filesystem_type(fs: Arc<dyn FilesystemType>) {
	FS_TYPES.lock().push(fs);
}

/// Mount `dev_path` at `path`. When `fs_name` is `None`, every registered
/// filesystem type is tried in registration order and the first whose
/// superblock probe succeeds wins.
pub fn mount(path: &str, dev_path: &str, fs_name: Option<&str>) -> Result<()> {
	let types: Vec<Arc<dyn FilesystemType>> = FS_TYPES.lock().clone();
	if let Some(name) = fs_name {
		let fs = types.iter().find(|f| f.name() == name).ok_or(Error::NotFound)?;
		let driver = fs.probe_and_mount(dev_path)?;
		return register(path, driver);
	}
	for fs in &types {
		if let Ok(driver) = fs.probe_and_mount(dev_path) {
			return register(path, driver);
		}
	}
	Err(Error::NotFound)
}

#[cfg(test)]
mod tests {
	use super::*;

	struct NullDriver;

	impl VfsDriver for NullDriver {
		fn open(&self, _path: &str, _flags: OpenFlags) -> Result<DriverHandle> {
			Ok(0)
		}
		fn close(&self, _handle: DriverHandle) -> Result<()> {
			Ok(())
		}
		fn read(&self, _handle: DriverHandle, _buf: &mut [u8]) -> Result<usize> {
			Ok(0)
		}
		fn readdir(&self, _handle: DriverHandle, _out: &mut Vec<String>) -> Result<()> {
			Ok(())
		}
		fn ioctl(&self, _handle: DriverHandle, _request: IoctlRequest) -> Result<i64> {
			Err(Error::NotSupported)
		}
	}

	#[test_case]
	fn register_then_open_routes_to_driver() {
		let path = "test-mnt-a/sub";
		assert!(register(path, Arc::new(NullDriver)).is_ok());
		let fd = open("test-mnt-a/sub/file.txt", OpenFlags::READ).expect("open");
		assert!(close(fd).is_ok());
		assert!(unregister(path).is_ok());
	}

	#[test_case]
	fn double_register_is_rejected() {
		let path = "test-mnt-b";
		assert!(register(path, Arc::new(NullDriver)).is_ok());
		assert_eq!(register(path, Arc::new(NullDriver)), Err(Error::AlreadyRegistered));
		assert!(unregister(path).is_ok());
	}

	#[test_case]
	fn unregister_unknown_path_is_not_registered() {
		assert_eq!(unregister("never-mounted-xyz"), Err(Error::NotRegistered));
	}
}
