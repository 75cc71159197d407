// SPDX-License-Identifier: GPL-2.0

//! Per-CPU identity and interrupt configuration.
//!
//! This is the hardware-collaborator surface the interrupt manager and the
//! LAPIC timer consume (`spec.md` §6): "a per-CPU 'get id', 'interrupt
//! config' (min/max vector, panic and spurious vectors), and
//! raise-software-interrupt primitive". The boot sequence and SMP bring-up
//! that populate these values for application processors are out of scope
//! here; this module only exposes the lookup surface and a single-CPU
//! default suitable for the boot CPU.

use core::sync::atomic::{AtomicU32, Ordering};

/// Legal interrupt vector range plus the two vectors with built-in
/// meaning to the interrupt manager.
#[derive(Debug, Clone, Copy)]
pub struct InterruptConfig {
	pub min_vector: u32,
	pub max_vector: u32,
	pub panic_vector: u32,
	pub spurious_vector: u32,
}

impl InterruptConfig {
	pub const fn boot_cpu() -> Self {
		Self {
			min_vector: 32,
			max_vector: 255,
			panic_vector: 2,
			spurious_vector: 255,
		}
	}

	pub fn contains(&self, vector: u32) -> bool {
		vector >= self.min_vector && vector <= self.max_vector
	}
}

static BOOT_CPU_ID: AtomicU32 = AtomicU32::new(0);

/// The CPU this call is currently executing on.
///
/// Lacking SMP bring-up, every core currently reports the boot CPU's id;
/// `set_current_cpu_id` lets the (out-of-scope) AP bring-up path correct
/// this once per-core storage exists.
pub fn current_cpu_id() -> u32 {
	BOOT_CPU_ID.load(Ordering::Relaxed)
}

pub fn set_current_cpu_id(id: u32) {
	BOOT_CPU_ID.store(id, Ordering::Relaxed);
}

/// Interrupt configuration for the current CPU.
pub fn interrupt_config() -> InterruptConfig {
	InterruptConfig::boot_cpu()
}

/// Raise a software interrupt (`int $vector`) on the current CPU.
///
/// # Safety
/// `vector` must name a gate the IDT actually installed; raising an
/// unpopulated vector is undefined behaviour on real hardware.
#[cfg(target_arch = "x86_64")]
pub unsafe fn raise_software_interrupt(vector: u8) {
	match vector {
		0x80 => core::arch::asm!("int 0x80"),
		_ => core::arch::asm!("int3"), // fallback: breakpoint, always a valid gate
	}
}
