// SPDX-License-Identifier: GPL-2.0

//! CMOS Real-Time Clock tick source.
//!
//! 14 discrete periodic-interrupt rates selectable through CMOS register
//! A; the driver picks the smallest rate whose resulting frequency is
//! `>= ` the requested one. Enabling writes register B bit 6; every tick
//! requires reading register C to re-arm the IRQ (`ack_tick` does this —
//! skipping it permanently mutes the source, per `spec.md` §4.C).

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use super::driver::{FreqRange, TickHandler, TimerCore, TimerDriver};
use crate::devicetree::{self, NodeHandle};
use crate::error::{Error, Result};
use crate::sync::Spinlock;

const CMOS_ADDRESS: u16 = 0x70;
const CMOS_DATA: u16 = 0x71;
const REG_A: u8 = 0x0A;
const REG_B: u8 = 0x0B;
const REG_C: u8 = 0x0C;

/// `rate -> frequency` for the 14 usable rates (rate 0 and 1 are
/// reserved/too slow to be useful here); `32768 >> (rate - 1)`.
const BASE_FREQ: u32 = 32768;

fn rate_for_frequency(min_freq: u32) -> (u8, u32) {
	let mut best_rate = 15u8;
	let mut best_freq = BASE_FREQ >> 14;
	for rate in (2..=15u8).rev() {
		let freq = BASE_FREQ >> (rate - 1);
		if freq >= min_freq {
			best_rate = rate;
			best_freq = freq;
			break;
		}
	}
	(best_rate, best_freq)
}

unsafe fn read_reg(reg: u8) -> u8 {
	crate::arch::x86_64::port::outb(CMOS_ADDRESS, reg);
	crate::arch::x86_64::port::inb(CMOS_DATA)
}

unsafe fn write_reg(reg: u8, value: u8) {
	crate::arch::x86_64::port::outb(CMOS_ADDRESS, reg);
	crate::arch::x86_64::port::outb(CMOS_DATA, value);
}

pub struct Rtc {
	core: TimerCore,
	ticks: AtomicU64,
}

static INSTANCE: Spinlock<Option<Arc<Rtc>>> = Spinlock::new(None);

fn program_rate(rate: u8) {
	unsafe {
		let prev = read_reg(REG_A);
		write_reg(REG_A, (prev & 0xF0) | (rate & 0x0F));
	}
}

pub fn attach(node: NodeHandle) -> Result<Arc<Rtc>> {
	let (irq, _flags) = devicetree::interrupts(node)?;
	let freq = devicetree::freq(node)?;
	let (low, high) = devicetree::freq_range(node)?;
	let range = FreqRange::new(low, high);
	if !range.contains(freq) {
		return Err(Error::IncorrectValue);
	}

	let (rate, actual_freq) = rate_for_frequency(freq);
	program_rate(rate);

	let rtc = Arc::new(Rtc {
		core: TimerCore::new(irq, actual_freq, range),
		ticks: AtomicU64::new(0),
	});

	crate::intman::register_irq(irq, irq_handler).ok();
	*INSTANCE.lock() = Some(rtc.clone());
	Ok(rtc)
}

impl TimerDriver for Rtc {
	fn get_frequency(&self) -> u32 {
		self.core.frequency()
	}

	fn set_frequency(&self, freq: u32) -> Result<()> {
		self.core.set_frequency(freq)?;
		let (rate, actual_freq) = rate_for_frequency(freq);
		program_rate(rate);
		self.core.set_frequency(actual_freq)
	}

	fn enable(&self) {
		if self.core.note_enable() {
			unsafe {
				let prev = read_reg(REG_B);
				write_reg(REG_B, prev | 0x40);
			}
			let _ = crate::intman::irq_set_mask(self.core.irq(), true);
		}
	}

	fn disable(&self) {
		if self.core.note_disable() {
			unsafe {
				let prev = read_reg(REG_B);
				write_reg(REG_B, prev & !0x40);
			}
			let _ = crate::intman::irq_set_mask(self.core.irq(), false);
		}
	}

	fn set_handler(&self, handler: TickHandler) -> Result<()> {
		self.core.set_handler(handler)
	}

	fn remove_handler(&self) {
		self.core.remove_handler()
	}

	fn ack_tick(&self) {
		unsafe { read_reg(REG_C) };
		let _ = crate::intman::irq_set_eoi(self.core.irq());
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

fn irq_handler(_vector: u32) {
	if let Some(rtc) = INSTANCE.lock().as_ref() {
		rtc.ticks.fetch_add(1, Ordering::Relaxed);
		let period_ns = 1_000_000_000u64 / rtc.core.frequency().max(1) as u64;
		rtc.core.fire(rtc.ticks.load(Ordering::Relaxed) * period_ns);
		rtc.ack_tick();
		crate::time::manager::fire_rtc_manager();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test_case]
	fn rate_selection_meets_or_exceeds_request() {
		let (_, freq) = rate_for_frequency(1000);
		assert!(freq >= 1000);
	}
}
