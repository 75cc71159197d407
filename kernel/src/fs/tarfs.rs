// SPDX-License-Identifier: GPL-2.0

//! Read-only USTAR-format filesystem driver for the mount graph.
//!
//! A tar archive is a flat sequence of 512-byte header blocks each
//! followed by `ceil(size/512)` data blocks; the archive ends at the
//! first block whose `magic` field isn't `"ustar "` (`spec.md` §3.9,
//! §4.H). The "backing device" a mount names is itself just another
//! path routed through [`super::mount_graph`] — opening it yields an FD
//! this driver seeks and reads like any other file, so no interop with
//! the Linux-compatible VFS above is required.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use super::mount_graph::{self, DriverHandle, FilesystemType, IoctlRequest, OpenFlags, SeekWhence, VfsDriver};
use crate::error::{Error, Result};
use crate::sync::Mutex;

const BLOCK_SIZE: usize = 512;
const MAGIC: &[u8] = b"ustar ";
const TYPE_DIR: u8 = b'5';

fn cstr(bytes: &[u8]) -> &str {
	let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
	core::str::from_utf8(&bytes[..end]).unwrap_or("").trim_end_matches(' ')
}

fn parse_octal(bytes: &[u8]) -> u64 {
	let mut value = 0u64;
	for &b in bytes {
		if b.is_ascii_digit() {
			value = value * 8 + (b - b'0') as u64;
		} else if b != 0 && b != b' ' {
			break;
		}
	}
	value
}

struct TarEntry {
	name: String,
	typeflag: u8,
	data_start: u64,
	size: u64,
}

fn full_name(block: &[u8; BLOCK_SIZE]) -> String {
	let prefix = cstr(&block[345..500]);
	let name = cstr(&block[0..100]);
	if prefix.is_empty() {
		String::from(name)
	} else {
		let mut s = String::from(prefix);
		s.push('/');
		s.push_str(name);
		s
	}
}

enum Kind {
	File { data_start: u64, size: u64 },
	Directory { prefix: String },
}

struct OpenFile {
	kind: Kind,
	position: u64,
}

struct TarState {
	next_handle: u64,
	open_files: BTreeMap<u64, OpenFile>,
}

pub struct TarFs {
	backing_fd: u32,
	state: Mutex<TarState>,
}

impl TarFs {
	fn read_block_at(&self, offset: u64) -> Result<[u8; BLOCK_SIZE]> {
		mount_graph::ioctl(
			self.backing_fd,
			IoctlRequest::Seek {
				whence: SeekWhence::Set,
				offset: offset as i64,
			},
		)?;
		let mut block = [0u8; BLOCK_SIZE];
		let mut filled = 0;
		while filled < BLOCK_SIZE {
			let n = mount_graph::read(self.backing_fd, &mut block[filled..])?;
			if n == 0 {
				return Err(Error::Io);
			}
			filled += n;
		}
		Ok(block)
	}

	/// Walk every header from the start of the archive until one fails
	/// magic validation or the backing device runs out of blocks. A block
	/// whose `name[0]` byte is `0` is a removed entry (`spec.md` §6): its
	/// data blocks still occupy the stream, so iteration skips past them
	/// without recording an entry.
	fn scan(&self) -> Vec<TarEntry> {
		let mut entries = Vec::new();
		let mut offset = 0u64;
		loop {
			let block = match self.read_block_at(offset) {
				Ok(b) => b,
				Err(_) => break,
			};
			if &block[257..263] != MAGIC {
				break;
			}
			let size = parse_octal(&block[124..136]);
			let data_start = offset + BLOCK_SIZE as u64;
			let data_blocks = (size + BLOCK_SIZE as u64 - 1) / BLOCK_SIZE as u64;
			offset = data_start + data_blocks * BLOCK_SIZE as u64;

			if block[0] == 0 {
				continue;
			}

			let name = full_name(&block);
			let typeflag = block[156];
			entries.push(TarEntry {
				name,
				typeflag,
				data_start,
				size,
			});
		}
		entries
	}
}

impl VfsDriver for TarFs {
	fn open(&self, path: &str, _flags: OpenFlags) -> Result<DriverHandle> {
		let norm = path.trim_matches('/');
		let mut state = self.state.lock();

		if norm.is_empty() {
			let handle = state.next_handle;
			state.next_handle += 1;
			state.open_files.insert(
				handle,
				OpenFile {
					kind: Kind::Directory { prefix: String::new() },
					position: 0,
				},
			);
			return Ok(handle);
		}

		for entry in self.scan() {
			let candidate = entry.name.trim_end_matches('/');
			if candidate != norm {
				continue;
			}
			let kind = if entry.typeflag == TYPE_DIR {
				Kind::Directory {
					prefix: String::from(candidate),
				}
			} else {
				Kind::File {
					data_start: entry.data_start,
					size: entry.size,
				}
			};
			let handle = state.next_handle;
			state.next_handle += 1;
			state.open_files.insert(handle, OpenFile { kind, position: 0 });
			return Ok(handle);
		}
		Err(Error::NotFound)
	}

	fn close(&self, handle: DriverHandle) -> Result<()> {
		self.state.lock().open_files.remove(&handle).map(|_| ()).ok_or(Error::EBADF)
	}

	fn read(&self, handle: DriverHandle, buf: &mut [u8]) -> Result<usize> {
		let mut state = self.state.lock();
		let file = state.open_files.get_mut(&handle).ok_or(Error::EBADF)?;
		let (data_start, size) = match file.kind {
			Kind::File { data_start, size } => (data_start, size),
			Kind::Directory { .. } => return Err(Error::EISDIR),
		};

		let remaining = size.saturating_sub(file.position);
		let want = core::cmp::min(buf.len() as u64, remaining) as usize;
		let mut copied = 0usize;
		while copied < want {
			let block_index = file.position / BLOCK_SIZE as u64;
			let within = (file.position % BLOCK_SIZE as u64) as usize;
			let block = self.read_block_at(data_start + block_index * BLOCK_SIZE as u64)?;
			let take = core::cmp::min(BLOCK_SIZE - within, want - copied);
			buf[copied..copied + take].copy_from_slice(&block[within..within + take]);
			file.position += take as u64;
			copied += take;
		}
		Ok(copied)
	}

	fn readdir(&self, handle: DriverHandle, out: &mut Vec<String>) -> Result<()> {
		let prefix = {
			let state = self.state.lock();
			let file = state.open_files.get(&handle).ok_or(Error::EBADF)?;
			match &file.kind {
				Kind::Directory { prefix } => prefix.clone(),
				Kind::File { .. } => return Err(Error::ENOTDIR),
			}
		};

		let mut seen = alloc::collections::BTreeSet::new();
		for entry in self.scan() {
			let name = entry.name.trim_end_matches('/');
			if prefix.is_empty() {
				if let Some(first) = name.split('/').next() {
					seen.insert(String::from(first));
				}
			} else if let Some(rest) = name.strip_prefix(&prefix).and_then(|r| r.strip_prefix('/')) {
				if !rest.is_empty() && !rest.contains('/') {
					seen.insert(String::from(rest));
				}
			}
		}
		out.extend(seen.into_iter());
		Ok(())
	}

	fn ioctl(&self, handle: DriverHandle, request: IoctlRequest) -> Result<i64> {
		let mut state = self.state.lock();
		let file = state.open_files.get_mut(&handle).ok_or(Error::EBADF)?;
		let size = match file.kind {
			Kind::File { size, .. } => size,
			Kind::Directory { .. } => return Err(Error::ESPIPE),
		};
		match request {
			IoctlRequest::Seek { whence, offset } => {
				let base = match whence {
					SeekWhence::Set => 0i64,
					SeekWhence::Current => file.position as i64,
				};
				let mut new_pos = base + offset;
				if new_pos < 0 {
					new_pos = 0;
				}
				if new_pos as u64 > size {
					new_pos = size as i64;
				}
				file.position = new_pos as u64;
				Ok(new_pos)
			}
		}
	}
}

pub struct TarFsType;

static MOUNT_COUNT: AtomicU64 = AtomicU64::new(0);

impl FilesystemType for TarFsType {
	fn name(&self) -> &'static str {
		"tar"
	}

	/// Open `dev_path` through the mount graph, read its first block and
	/// verify the USTAR magic before committing to the mount.
	fn probe_and_mount(&self, dev_path: &str) -> Result<Arc<dyn VfsDriver>> {
		let fd = mount_graph::open(dev_path, OpenFlags::READ)?;
		let mut header = [0u8; BLOCK_SIZE];
		let n = mount_graph::read(fd, &mut header)?;
		if n < BLOCK_SIZE || &header[257..263] != MAGIC {
			let _ = mount_graph::close(fd);
			return Err(Error::IncorrectValue);
		}
		let _ = mount_graph::ioctl(
			fd,
			IoctlRequest::Seek {
				whence: SeekWhence::Set,
				offset: 0,
			},
		);
		MOUNT_COUNT.fetch_add(1, Ordering::Relaxed);
		Ok(Arc::new(TarFs {
			backing_fd: fd,
			state: Mutex::new(TarState {
				next_handle: 1,
				open_files: BTreeMap::new(),
			}),
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn make_header(name: &str, size: u64, typeflag: u8) -> [u8; BLOCK_SIZE] {
		let mut block = [0u8; BLOCK_SIZE];
		block[0..name.len()].copy_from_slice(name.as_bytes());
		let size_str = alloc::format!("{:011o}", size);
		block[124..124 + size_str.len()].copy_from_slice(size_str.as_bytes());
		block[156] = typeflag;
		block[257..263].copy_from_slice(MAGIC);
		block
	}

	#[test_case]
	fn octal_size_parses() {
		let block = make_header("file.txt", 42, b'0');
		assert_eq!(parse_octal(&block[124..136]), 42);
	}

	#[test_case]
	fn full_name_without_prefix_is_bare_name() {
		let block = make_header("dir/file.txt", 0, b'0');
		assert_eq!(full_name(&block), "dir/file.txt");
	}

	#[test_case]
	fn directory_name_trims_trailing_slash() {
		let block = make_header("dir/", 0, TYPE_DIR);
		assert_eq!(full_name(&block).trim_end_matches('/'), "dir");
	}
}
