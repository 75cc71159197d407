// SPDX-License-Identifier: GPL-2.0

//! Registry of named tick-source slots (MAIN/RTC/AUX) that derives
//! system uptime and offers a non-scheduled spin-wait, per `spec.md`
//! §4.D. Distinct from the ambient jiffies/TSC machinery in the parent
//! module, which predates this registry and keeps its own notion of
//! time for the rest of the kernel.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use super::driver::TimerDriver;
use crate::error::{Error, Result};
use crate::sync::Spinlock;

/// A callback attached to the wall-clock (RTC) tick source, invoked once
/// per tick from dispatch context.
pub type RtcCallback = fn();

struct Slots {
	main: Option<Box<dyn TimerDriver>>,
	rtc: Option<Box<dyn TimerDriver>>,
	/// AUX accumulates multiple sources; historically called
	/// `LAGGING_TIMER` in some commits, `AUX_TIMER` in others
	/// (`spec.md` §9(b)) — this registry treats them as one slot and
	/// always drives `wait_no_scheduler` from the first entry, which
	/// exists for CPU bring-up before MAIN is necessarily calibrated.
	aux: Vec<Box<dyn TimerDriver>>,
	rtc_manager: Option<RtcCallback>,
}

impl Slots {
	const fn new() -> Self {
		Self {
			main: None,
			rtc: None,
			aux: Vec::new(),
			rtc_manager: None,
		}
	}
}

static SLOTS: Spinlock<Slots> = Spinlock::new(Slots::new());
static MAIN_FILLED: AtomicBool = AtomicBool::new(false);

/// The named registration slots a tick source can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
	Main,
	Rtc,
	/// Also referred to as `LAGGING` (`spec.md` §9(b)).
	Aux,
}

/// Register `driver` into `slot`. MAIN is write-once: a second
/// registration attempt fails with [`Error::AlreadyRegistered`] rather
/// than replacing the existing source, since uptime's derivation from
/// MAIN must stay stable for the life of the system. RTC is likewise
/// single-occupancy. AUX accumulates — each call appends another
/// source.
pub fn add_timer(driver: Box<dyn TimerDriver>, slot: Slot) -> Result<()> {
	let mut slots = SLOTS.lock();
	match slot {
		Slot::Main => {
			if slots.main.is_some() {
				return Err(Error::AlreadyRegistered);
			}
			slots.main = Some(driver);
			MAIN_FILLED.store(true, Ordering::Release);
		}
		Slot::Rtc => {
			if slots.rtc.is_some() {
				return Err(Error::AlreadyRegistered);
			}
			slots.rtc = Some(driver);
		}
		Slot::Aux => slots.aux.push(driver),
	}
	Ok(())
}

/// Attach a per-tick callback to the RTC slot's source. No-op if RTC
/// hasn't been registered yet; the caller is expected to register RTC
/// before calling this (mirroring the source's boot ordering).
pub fn register_rtc_manager(callback: RtcCallback) -> Result<()> {
	let mut slots = SLOTS.lock();
	if slots.rtc.is_none() {
		return Err(Error::NotRegistered);
	}
	slots.rtc_manager = Some(callback);
	Ok(())
}

/// Invoked by the RTC driver's tick handler; runs the registered
/// callback, if any.
pub fn fire_rtc_manager() {
	let callback = SLOTS.lock().rtc_manager;
	if let Some(cb) = callback {
		cb();
	}
}

/// System uptime in nanoseconds, derived from MAIN's tick count scaled
/// by MAIN's frequency. Monotone across any two calls on the same CPU;
/// a 64-bit tick counter doesn't tear on a 64-bit load, so no
/// read-twice-and-retry is needed on this architecture.
pub fn get_uptime_ns() -> Result<u64> {
	let slots = SLOTS.lock();
	let main = slots.main.as_ref().ok_or(Error::NotRegistered)?;
	main.get_time_ns().ok_or(Error::NotSupported)
}

/// Spin-wait for `ns` nanoseconds using the AUX/LAGGING base, without
/// invoking the scheduler. Safe to call with interrupts disabled (used
/// during CPU bring-up, before a scheduler exists to yield to).
pub fn wait_no_scheduler(ns: u64) -> Result<()> {
	let start = {
		let slots = SLOTS.lock();
		let aux = slots.aux.first().ok_or(Error::NotRegistered)?;
		aux.get_time_ns().ok_or(Error::NotSupported)?
	};
	loop {
		let now = {
			let slots = SLOTS.lock();
			let aux = slots.aux.first().ok_or(Error::NotRegistered)?;
			aux.get_time_ns().ok_or(Error::NotSupported)?
		};
		if now.saturating_sub(start) >= ns {
			return Ok(());
		}
		core::hint::spin_loop();
	}
}

pub fn main_registered() -> bool {
	MAIN_FILLED.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::time::driver::FreqRange;
	use core::sync::atomic::AtomicU64;

	struct FakeDriver {
		ns: AtomicU64,
	}

	impl TimerDriver for FakeDriver {
		fn get_frequency(&self) -> u32 {
			1000
		}
		fn enable(&self) {}
		fn disable(&self) {}
		fn set_handler(&self, _h: super::super::driver::TickHandler) -> Result<()> {
			Ok(())
		}
		fn remove_handler(&self) {}
		fn ack_tick(&self) {}
		fn get_time_ns(&self) -> Option<u64> {
			Some(self.ns.load(Ordering::Relaxed))
		}
		fn get_irq(&self) -> u32 {
			0
		}
		fn freq_range(&self) -> FreqRange {
			FreqRange::new(1, 1)
		}
	}

	#[test_case]
	fn main_slot_is_write_once() {
		let a = Box::new(FakeDriver { ns: AtomicU64::new(0) });
		let b = Box::new(FakeDriver { ns: AtomicU64::new(0) });
		assert!(add_timer(a, Slot::Main).is_ok() || main_registered());
		let second = add_timer(b, Slot::Main);
		assert_eq!(second, Err(Error::AlreadyRegistered));
	}
}
