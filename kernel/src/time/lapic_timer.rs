// SPDX-License-Identifier: GPL-2.0

//! Local APIC timer tick source: periodic mode, calibrated against a
//! base timer at attach time (`spec.md` §4.E).
//!
//! Unlike PIT/RTC, `disable_count` and `internal_freq` are per-CPU: each
//! core calls [`attach`] during its own bring-up and gets back an
//! instance that owns its own `TimerCore`, so nesting state never
//! crosses cores (`spec.md` §9(c)).

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::driver::{FreqRange, TickHandler, TimerCore, TimerDriver};
use crate::devicetree::{self, NodeHandle};
use crate::error::{Error, Result};
use crate::sync::Spinlock;

const LVT_TIMER: usize = 0x320;
const INITIAL_COUNT: usize = 0x380;
const CURRENT_COUNT: usize = 0x390;
const DIVIDE_CONFIG: usize = 0x3E0;
const EOI: usize = 0x0B0;

/// Divide-by-16, one of the fixed divider set `{1,2,4,8,16,32,64,128}`
/// the Local APIC timer supports.
const DIVIDE_CONFIG_DIVIDE_BY_16: u32 = 0x3;

const LVT_MASKED: u32 = 1 << 16;
const LVT_PERIODIC: u32 = 1 << 17;

const CAL_DELAY_NS: u64 = 10_000_000;

unsafe fn mmio_read(base: usize, reg: usize) -> u32 {
	core::ptr::read_volatile((base + reg) as *const u32)
}

unsafe fn mmio_write(base: usize, reg: usize, value: u32) {
	core::ptr::write_volatile((base + reg) as *mut u32, value);
}

pub struct LapicTimer {
	core: TimerCore,
	mmio_base: usize,
	vector: u8,
	internal_freq: AtomicU32,
	ticks: AtomicU64,
}

static INSTANCES: Spinlock<alloc::vec::Vec<Arc<LapicTimer>>> = Spinlock::new(alloc::vec::Vec::new());

/// Attach and calibrate this CPU's Local APIC timer against
/// `base_timer`. The device-tree parser that would resolve the
/// `base-timer` property to a live driver instance is out of scope
/// (`spec.md` §1), so the caller passes the already-attached base timer
/// directly; this module still reads and logs the property for the
/// attach record.
pub fn attach(node: NodeHandle, base_timer: &dyn TimerDriver, vector: u8) -> Result<Arc<LapicTimer>> {
	let mmio_base = devicetree::get_cells(node, "mmio-base")?
		.first()
		.copied()
		.ok_or(Error::IncorrectValue)? as usize;
	let freq = devicetree::freq(node)?;
	let (low, high) = devicetree::freq_range(node)?;
	let range = FreqRange::new(low, high);
	if !range.contains(freq) {
		return Err(Error::IncorrectValue);
	}
	let _ = devicetree::base_timer(node); // informational only; see above

	let internal_freq = calibrate(mmio_base, base_timer)?;

	let timer = Arc::new(LapicTimer {
		core: TimerCore::new(devicetree::interrupts(node).map(|(irq, _)| irq).unwrap_or(0), freq, range),
		mmio_base,
		vector,
		internal_freq: AtomicU32::new(internal_freq),
		ticks: AtomicU64::new(0),
	});

	program_periodic(&timer, freq);
	unsafe { mmio_write(mmio_base, LVT_TIMER, LVT_MASKED | LVT_PERIODIC | vector as u32) };

	crate::intman::register(32 + vector as u32, irq_handler).ok();
	INSTANCES.lock().push(timer.clone());
	Ok(timer)
}

/// Program `0xFFFFFFFF` into the initial-count register, wait
/// `CAL_DELAY_NS` against `base_timer`, and derive `internal_freq` from
/// the observed countdown. Fails with [`Error::OutOfBound`] if the
/// observed elapsed period is degenerate (zero or the timer wrapped).
fn calibrate(mmio_base: usize, base_timer: &dyn TimerDriver) -> Result<u32> {
	unsafe { mmio_write(mmio_base, DIVIDE_CONFIG, DIVIDE_CONFIG_DIVIDE_BY_16) };

	let start_ns = base_timer.get_time_ns().ok_or(Error::NotSupported)?;
	unsafe { mmio_write(mmio_base, INITIAL_COUNT, 0xFFFFFFFF) };

	loop {
		let now = base_timer.get_time_ns().ok_or(Error::NotSupported)?;
		if now.saturating_sub(start_ns) >= CAL_DELAY_NS {
			break;
		}
		core::hint::spin_loop();
	}

	let end_ns = base_timer.get_time_ns().ok_or(Error::NotSupported)?;
	let elapsed_ns = end_ns.saturating_sub(start_ns);
	let current = unsafe { mmio_read(mmio_base, CURRENT_COUNT) };
	let elapsed_count = 0xFFFFFFFFu32.saturating_sub(current);

	if elapsed_ns == 0 || elapsed_count == 0 {
		return Err(Error::OutOfBound);
	}

	Ok(((elapsed_count as u64 * 1_000_000_000u64) / elapsed_ns) as u32)
}

fn program_periodic(timer: &LapicTimer, freq: u32) {
	let internal_freq = timer.internal_freq.load(Ordering::Relaxed);
	let initial_count = core::cmp::max(1, internal_freq / core::cmp::max(freq, 1));
	unsafe { mmio_write(timer.mmio_base, INITIAL_COUNT, initial_count) };
}

impl TimerDriver for LapicTimer {
	fn get_frequency(&self) -> u32 {
		self.core.frequency()
	}

	fn set_frequency(&self, freq: u32) -> Result<()> {
		self.core.set_frequency(freq)?;
		program_periodic(self, freq);
		Ok(())
	}

	fn enable(&self) {
		if self.core.note_enable() {
			unsafe {
				let lvt = mmio_read(self.mmio_base, LVT_TIMER);
				mmio_write(self.mmio_base, LVT_TIMER, lvt & !LVT_MASKED);
			}
		}
	}

	fn disable(&self) {
		if self.core.note_disable() {
			unsafe {
				let lvt = mmio_read(self.mmio_base, LVT_TIMER);
				mmio_write(self.mmio_base, LVT_TIMER, lvt | LVT_MASKED);
			}
		}
	}

	fn set_handler(&self, handler: TickHandler) -> Result<()> {
		self.core.set_handler(handler)
	}

	fn remove_handler(&self) {
		self.core.remove_handler()
	}

	fn ack_tick(&self) {
		unsafe { mmio_write(self.mmio_base, EOI, 0) };
	}

	fn get_time_ns(&self) -> Option<u64> {
		let period_ns = 1_000_000_000u64 / self.core.frequency().max(1) as u64;
		Some(self.ticks.load(Ordering::Relaxed) * period_ns)
	}

	fn get_irq(&self) -> u32 {
		self.core.irq()
	}

	fn freq_range(&self) -> FreqRange {
		self.core.freq_range()
	}
}

fn irq_handler(vector: u32) {
	let instances = INSTANCES.lock();
	if let Some(timer) = instances.iter().find(|t| 32 + t.vector as u32 == vector) {
		timer.ticks.fetch_add(1, Ordering::Relaxed);
		let period_ns = 1_000_000_000u64 / timer.core.frequency().max(1) as u64;
		timer.core.fire(timer.ticks.load(Ordering::Relaxed) * period_ns);
		timer.ack_tick();
	}
}
