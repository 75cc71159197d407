// SPDX-License-Identifier: GPL-2.0

//! Programmable Interval Timer (8253/8254) tick source.
//!
//! 16-bit countdown from `quartz / f`, written to the command port
//! followed by the low then high byte of the divider (`spec.md` §4.E).
//! `disable_count` is a single process-wide counter — PIT is not
//! per-CPU hardware (`spec.md` §9(c)).

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

use super::driver::{FreqRange, TickHandler, TimerCore, TimerDriver};
use crate::devicetree::{self, NodeHandle};
use crate::error::{Error, Result};
use crate::sync::Spinlock;

const CMD_PORT: u16 = 0x43;
/// Mode 3 (square wave generator), channel 0, lo/hi byte access.
const CHANNEL0_MODE3: u8 = 0x36;

pub struct Pit {
	core: TimerCore,
	data_port: u16,
	quartz: u32,
	ticks: AtomicU64,
}

static INSTANCE: Spinlock<Option<Arc<Pit>>> = Spinlock::new(None);

fn program_divisor(data_port: u16, quartz: u32, freq: u32) {
	let divisor = core::cmp::max(1, quartz / core::cmp::max(freq, 1)).min(u16::MAX as u32) as u16;
	unsafe {
		crate::arch::x86_64::port::outb(CMD_PORT, CHANNEL0_MODE3);
		crate::arch::x86_64::port::outb(data_port, (divisor & 0xFF) as u8);
		crate::arch::x86_64::port::outb(data_port, (divisor >> 8) as u8);
	}
}

/// Read configuration from the device-tree node and bring the PIT up in
/// the `Attached` state: masked (`disable_count == 1`), dummy handler,
/// divisor programmed for the requested frequency.
pub fn attach(node: NodeHandle) -> Result<Arc<Pit>> {
	let (irq, _flags) = devicetree::interrupts(node)?;
	let (_cmd_port, data_port) = devicetree::comm_ports(node)?;
	let quartz = devicetree::quartz_freq(node)?;
	let freq = devicetree::freq(node)?;
	let (low, high) = devicetree::freq_range(node)?;
	let range = FreqRange::new(low, high);
	if !range.contains(freq) {
		return Err(Error::IncorrectValue);
	}

	program_divisor(data_port, quartz, freq);

	let pit = Arc::new(Pit {
		core: TimerCore::new(irq, freq, range),
		data_port,
		quartz,
		ticks: AtomicU64::new(0),
	});

	crate::intman::register_irq(irq, irq_handler).ok();
	*INSTANCE.lock() = Some(pit.clone());
	Ok(pit)
}

impl Pit {
	fn on_tick(&self) {
		self.ticks.fetch_add(1, Ordering::Relaxed);
		let period_ns = 1_000_000_000u64 / self.core.frequency().max(1) as u64;
		let now_ns = self.ticks.load(Ordering::Relaxed) * period_ns;
		self.core.fire(now_ns);
		self.ack_tick();
	}
}

impl TimerDriver for Pit {
	fn get_frequency(&self) -> u32 {
		self.core.frequency()
	}

	fn set_frequency(&self, freq: u32) -> Result<()> {
		self.core.set_frequency(freq)?;
		program_divisor(self.data_port, self.quartz, freq);
		Ok(())
	}

	fn enable(&self) {
		if self.core.note_enable() {
			let _ = crate::intman::irq_set_mask(self.core.irq(), true);
		}
	}

	fn disable(&self) {
		if self.core.note_disable() {
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
	if let Some(pit) = INSTANCE.lock().as_ref() {
		pit.on_tick();
	}
}
