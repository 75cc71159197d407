// SPDX-License-Identifier: GPL-2.0

//! Schedulable unit of work: a thin pairing of a [`Thread`](crate::process::Thread)
//! with the process it belongs to, as consumed by call sites that only care
//! about "the thing the scheduler runs" rather than the full process tree.

use crate::process::{ProcessState, Thread};
use crate::types::{Pid, Tid};

#[derive(Debug, Clone)]
pub struct Task {
	pub tid: Tid,
	pub pid: Pid,
	pub priority: i32,
}

impl Task {
	pub fn new(thread: &Thread) -> Self {
		Self {
			tid: thread.tid,
			pid: thread.process_pid,
			priority: thread.priority,
		}
	}

	pub fn from_parts(tid: Tid, pid: Pid, priority: i32) -> Self {
		Self { tid, pid, priority }
	}

	pub fn is_runnable(&self, state: ProcessState) -> bool {
		matches!(state, ProcessState::Running)
	}
}
