// SPDX-License-Identifier: GPL-2.0

//! Uniform capability set every tick source (PIT, RTC, LAPIC-Timer, ...)
//! implements, and the nesting/handler bookkeeping shared by all of them.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::sync::Spinlock;

/// Legal `[low, high]` frequency range for a tick source, in Hz.
#[derive(Debug, Clone, Copy)]
pub struct FreqRange {
	pub low: u32,
	pub high: u32,
}

impl FreqRange {
	pub const fn new(low: u32, high: u32) -> Self {
		Self { low, high }
	}

	pub fn contains(&self, freq: u32) -> bool {
		freq >= self.low && freq <= self.high
	}
}

/// Per-tick callback installed on a tick source. A driver that needs
/// context closes over its own state through a global rather than an
/// argument, matching the rest of the capability set.
pub type TickHandler = fn();

fn dummy_handler() {}

/// Lifecycle every tick source passes through. There is no terminal
/// state during normal operation; a halted source can only arise from
/// an explicit driver-level shutdown path outside this contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerLifecycle {
	Uninitialized,
	Attached,
	Running,
	Halted,
}

/// Shared nesting-counter and handler bookkeeping every concrete tick
/// source embeds. Whether `disable_count` behaves as a single
/// process-wide counter (PIT, RTC) or one instance per CPU
/// (LAPIC-Timer) is a choice each driver makes by how many `TimerCore`s
/// it owns; this type itself is agnostic to that.
pub struct TimerCore {
	disable_count: AtomicU32,
	frequency: AtomicU32,
	freq_range: FreqRange,
	handler: Spinlock<TickHandler>,
	irq: u32,
	lifecycle: Spinlock<TimerLifecycle>,
	last_tick_ns: AtomicU64,
}

impl TimerCore {
	/// Build a core for a freshly-attached source: masked
	/// (`disable_count == 1`), dummy handler, `Attached` lifecycle.
	pub fn new(irq: u32, initial_freq: u32, range: FreqRange) -> Self {
		Self {
			disable_count: AtomicU32::new(1),
			frequency: AtomicU32::new(initial_freq),
			freq_range: range,
			handler: Spinlock::new(dummy_handler),
			irq,
			lifecycle: Spinlock::new(TimerLifecycle::Attached),
			last_tick_ns: AtomicU64::new(0),
		}
	}

	pub fn irq(&self) -> u32 {
		self.irq
	}

	pub fn frequency(&self) -> u32 {
		self.frequency.load(Ordering::Relaxed)
	}

	pub fn freq_range(&self) -> FreqRange {
		self.freq_range
	}

	/// Validate and record a new frequency; the caller still has to
	/// reprogram the hardware divider. Out-of-range requests are logged
	/// and rejected rather than silently clamped.
	pub fn set_frequency(&self, freq: u32) -> Result<()> {
		if !self.freq_range.contains(freq) {
			crate::warn!(
				"timer: requested frequency {} outside [{}, {}]",
				freq,
				self.freq_range.low,
				self.freq_range.high
			);
			return Err(Error::IncorrectValue);
		}
		self.frequency.store(freq, Ordering::Relaxed);
		Ok(())
	}

	pub fn disable_count(&self) -> u32 {
		self.disable_count.load(Ordering::Relaxed)
	}

	pub fn is_masked(&self) -> bool {
		self.disable_count() > 0
	}

	/// Returns `true` exactly when this call is the one that drops the
	/// nesting counter to zero — i.e. when the caller must actually
	/// unmask the hardware IRQ. A call while already enabled is a no-op
	/// and returns `false`.
	pub fn note_enable(&self) -> bool {
		loop {
			let current = self.disable_count.load(Ordering::Acquire);
			if current == 0 {
				return false;
			}
			let next = current - 1;
			if self
				.disable_count
				.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
				.is_ok()
			{
				if next == 0 {
					*self.lifecycle.lock() = TimerLifecycle::Running;
				}
				return next == 0;
			}
		}
	}

	/// Returns `true` exactly when this call is the one that takes the
	/// nesting counter from zero to one — i.e. when the caller must
	/// actually mask the hardware IRQ.
	pub fn note_disable(&self) -> bool {
		self.disable_count.fetch_add(1, Ordering::AcqRel) == 0
	}

	pub fn set_handler(&self, handler: TickHandler) -> Result<()> {
		*self.handler.lock() = handler;
		Ok(())
	}

	pub fn remove_handler(&self) {
		*self.handler.lock() = dummy_handler;
	}

	/// Record the tick time and invoke the installed handler. Does not
	/// perform the device-side acknowledgement; drivers call `ack_tick`
	/// separately so the dispatcher controls ordering.
	pub fn fire(&self, now_ns: u64) {
		self.last_tick_ns.store(now_ns, Ordering::Relaxed);
		let handler = *self.handler.lock();
		handler();
	}

	pub fn lifecycle(&self) -> TimerLifecycle {
		*self.lifecycle.lock()
	}

	pub fn last_tick_ns(&self) -> u64 {
		self.last_tick_ns.load(Ordering::Relaxed)
	}
}

/// The capability set the time manager drives every tick source
/// through. Implementations are attached by a driver-specific "attach"
/// step that reads its configuration (IRQ, ports/MMIO base, quartz
/// frequency, legal range) from the device-tree surface and returns a
/// value in the `Attached` state.
pub trait TimerDriver: Send + Sync {
	/// Mandatory: the currently selected frequency, in Hz.
	fn get_frequency(&self) -> u32;

	/// Optional: reprogram the selected frequency. The default
	/// implementation reports the capability as absent.
	fn set_frequency(&self, _freq: u32) -> Result<()> {
		Err(Error::NotSupported)
	}

	/// Unmask the IRQ. Nested with [`disable`](Self::disable): N
	/// disables require N enables before the IRQ is physically
	/// unmasked; calling `enable` while already enabled is a no-op.
	fn enable(&self);

	/// Mask the IRQ, incrementing the nesting counter.
	fn disable(&self);

	/// Install a tick handler, replacing (and thereby removing) any
	/// previously installed one.
	fn set_handler(&self, handler: TickHandler) -> Result<()>;

	fn remove_handler(&self);

	/// Perform every device-side action required to receive the next
	/// tick (re-arming a register, writing an EOI, ...). Skipping this
	/// after a fired tick permanently mutes the source.
	fn ack_tick(&self);

	/// Optional monotonic time base in nanoseconds, used for
	/// calibrating other sources against this one.
	fn get_time_ns(&self) -> Option<u64> {
		None
	}

	fn get_irq(&self) -> u32;

	fn freq_range(&self) -> FreqRange;
}

/// Lets an attach function's `Arc<ConcreteDriver>` (kept around so its IRQ
/// handler can look the instance back up) also be boxed as
/// `Box<dyn TimerDriver>` for [`super::manager::add_timer`], without each
/// driver needing its own forwarding impl.
impl<T: TimerDriver + ?Sized> TimerDriver for alloc::sync::Arc<T> {
	fn get_frequency(&self) -> u32 {
		(**self).get_frequency()
	}

	fn set_frequency(&self, freq: u32) -> Result<()> {
		(**self).set_frequency(freq)
	}

	fn enable(&self) {
		(**self).enable()
	}

	fn disable(&self) {
		(**self).disable()
	}

	fn set_handler(&self, handler: TickHandler) -> Result<()> {
		(**self).set_handler(handler)
	}

	fn remove_handler(&self) {
		(**self).remove_handler()
	}

	fn ack_tick(&self) {
		(**self).ack_tick()
	}

	fn get_time_ns(&self) -> Option<u64> {
		(**self).get_time_ns()
	}

	fn get_irq(&self) -> u32 {
		(**self).get_irq()
	}

	fn freq_range(&self) -> FreqRange {
		(**self).freq_range()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test_case]
	fn disable_count_nesting_matches_irq_mask_state() {
		// A freshly-attached core starts masked (disable_count == 1), as
		// every concrete driver's `attach` leaves it (`spec.md` §4.E).
		let core = TimerCore::new(0, 1000, FreqRange::new(1, 1_000_000));
		assert!(core.is_masked());

		// enable() unmasks.
		assert!(core.note_enable());
		assert!(!core.is_masked());

		// disable(); disable(); enable(); leaves it masked (spec.md §8
		// scenario 3): two disables bring the counter to 2, one enable
		// only brings it back to 1.
		assert!(core.note_disable());
		assert!(!core.note_disable());
		assert!(!core.note_enable());
		assert!(core.is_masked());

		// A subsequent enable() unmasks.
		assert!(core.note_enable());
		assert!(!core.is_masked());
	}

	#[test_case]
	fn set_frequency_rejects_outside_range_and_accepts_bounds() {
		let core = TimerCore::new(0, 100, FreqRange::new(10, 1000));
		assert!(core.set_frequency(10).is_ok());
		assert!(core.set_frequency(1000).is_ok());
		assert_eq!(core.set_frequency(9), Err(Error::IncorrectValue));
		assert_eq!(core.set_frequency(1001), Err(Error::IncorrectValue));
	}
}
