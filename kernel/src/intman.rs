// SPDX-License-Identifier: GPL-2.0

//! Interrupt manager: central dispatch, spurious-interrupt handling,
//! IRQ-to-vector mapping, enable/disable nesting, and the deferred-ISR
//! queue/worker.
//!
//! This sits alongside [`crate::interrupt`] (the Linux-`request_irq`-shaped
//! IRQ layer drivers already use) rather than replacing it: this module is
//! the vector-indexed dispatch core every interrupt ultimately passes
//! through before a driver's IRQ handler ever runs. The controller backend
//! (PIC today, IO-APIC on a multi-core bring-up path) is installed once
//! through [`set_driver`]; until then every request answers through a
//! no-op stub, matching the boot-time window before the real controller is
//! probed.

use alloc::boxed::Box;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::cpu;
use crate::error::{Error, Result};
use crate::kthread::{self, KTHREAD_PRIO_HIGHEST};
use crate::queue::{self, Queue};
use crate::sync::{Semaphore, Spinlock};

/// A vector-indexed handler. Called with the vector that fired.
pub type Handler = fn(u32);

/// The capability set the dispatcher drives the installed interrupt
/// controller through. Replaces the source's raw function-pointer vtable
/// with a trait object per `spec.md` Design Notes §9, while keeping the
/// same operations: IRQ<->vector translation, masking, EOI, and spurious
/// detection.
pub trait InterruptController: Send + Sync {
	fn irq_to_vector(&self, irq: u32) -> Option<u32>;
	fn vector_to_irq(&self, vector: u32) -> Option<u32>;
	fn is_spurious(&self, vector: u32) -> bool;
	fn set_mask(&self, irq: u32, enabled: bool) -> Result<()>;
	fn send_eoi(&self, irq: u32) -> Result<()>;
}

/// Placeholder installed before the real controller is probed. Every
/// method is a no-op / reports "not mapped", matching `spec.md` §4.F.
struct StubController;

impl InterruptController for StubController {
	fn irq_to_vector(&self, _irq: u32) -> Option<u32> {
		None
	}
	fn vector_to_irq(&self, _vector: u32) -> Option<u32> {
		None
	}
	fn is_spurious(&self, _vector: u32) -> bool {
		false
	}
	fn set_mask(&self, _irq: u32, _enabled: bool) -> Result<()> {
		Err(Error::NoSuchIrq)
	}
	fn send_eoi(&self, _irq: u32) -> Result<()> {
		Err(Error::NoSuchIrq)
	}
}

/// 8259 PIC backend: IRQs 0-15 remapped to vectors 32-47 by
/// [`crate::arch::x86_64::pic::init_pic`]. Spurious IRQ7/IRQ15 are
/// detected by reading the in-service register: a spurious interrupt
/// never sets its own ISR bit.
pub struct PicController;

const PIC_VECTOR_BASE: u32 = 32;
const PIC_SPURIOUS_IRQ_MASTER: u32 = 7;
const PIC_SPURIOUS_IRQ_SLAVE: u32 = 15;

impl InterruptController for PicController {
	fn irq_to_vector(&self, irq: u32) -> Option<u32> {
		if irq < 16 {
			Some(PIC_VECTOR_BASE + irq)
		} else {
			None
		}
	}

	fn vector_to_irq(&self, vector: u32) -> Option<u32> {
		if (PIC_VECTOR_BASE..PIC_VECTOR_BASE + 16).contains(&vector) {
			Some(vector - PIC_VECTOR_BASE)
		} else {
			None
		}
	}

	fn is_spurious(&self, vector: u32) -> bool {
		let irq = match self.vector_to_irq(vector) {
			Some(irq) => irq,
			None => return false,
		};
		if irq != PIC_SPURIOUS_IRQ_MASTER && irq != PIC_SPURIOUS_IRQ_SLAVE {
			return false;
		}
		!unsafe { crate::arch::x86_64::pic::irq_in_service(irq as u8) }
	}

	fn set_mask(&self, irq: u32, enabled: bool) -> Result<()> {
		if irq >= 16 {
			return Err(Error::NoSuchIrq);
		}
		unsafe {
			if enabled {
				crate::arch::x86_64::pic::unmask_irq(irq as u8);
			} else {
				crate::arch::x86_64::pic::mask_irq(irq as u8);
			}
		}
		Ok(())
	}

	fn send_eoi(&self, irq: u32) -> Result<()> {
		if irq >= 16 {
			return Err(Error::NoSuchIrq);
		}
		unsafe { crate::arch::x86_64::pic::send_eoi(irq as u8) };
		Ok(())
	}
}

const VECTOR_COUNT: usize = 256;

struct HandlerTable {
	slots: [Option<Handler>; VECTOR_COUNT],
}

impl HandlerTable {
	const fn new() -> Self {
		Self {
			slots: [None; VECTOR_COUNT],
		}
	}
}

static HANDLER_TABLE: Spinlock<HandlerTable> = Spinlock::new(HandlerTable::new());
static DRIVER: Spinlock<Option<Box<dyn InterruptController>>> = Spinlock::new(None);
static DRIVER_INSTALLED: AtomicBool = AtomicBool::new(false);
static SPURIOUS_COUNT: AtomicU64 = AtomicU64::new(0);

fn with_driver<R>(f: impl FnOnce(&dyn InterruptController) -> R) -> R {
	let guard = DRIVER.lock();
	match guard.as_deref() {
		Some(driver) => f(driver),
		None => f(&StubController),
	}
}

/// Install the real controller backend. Enforced to run exactly once; a
/// second call is rejected rather than silently replacing the first
/// driver (the source's handler-replacement failure paths are exactly
/// the double-free/double-enable bugs `spec.md` §9(a) calls out to avoid
/// repeating).
pub fn set_driver(driver: Box<dyn InterruptController>) -> Result<()> {
	if DRIVER_INSTALLED.swap(true, Ordering::AcqRel) {
		return Err(Error::Unauthorized);
	}
	*DRIVER.lock() = Some(driver);
	Ok(())
}

fn vector_in_range(vector: u32) -> bool {
	cpu::interrupt_config().contains(vector)
}

/// Register `handler` at `vector`. Fails with [`Error::UnauthorizedLine`]
/// if `vector` lies outside the current CPU's legal range, and with
/// [`Error::AlreadyRegistered`] if the slot is occupied.
pub fn register(vector: u32, handler: Handler) -> Result<()> {
	if !vector_in_range(vector) {
		return Err(Error::UnauthorizedLine);
	}
	let mut table = HANDLER_TABLE.lock();
	let slot = &mut table.slots[vector as usize];
	if slot.is_some() {
		return Err(Error::AlreadyRegistered);
	}
	*slot = Some(handler);
	Ok(())
}

/// Remove the handler at `vector`. Fails with [`Error::NotRegistered`] if
/// the slot is empty.
pub fn remove(vector: u32) -> Result<()> {
	if !vector_in_range(vector) {
		return Err(Error::UnauthorizedLine);
	}
	let mut table = HANDLER_TABLE.lock();
	let slot = &mut table.slots[vector as usize];
	if slot.is_none() {
		return Err(Error::NotRegistered);
	}
	*slot = None;
	Ok(())
}

/// Translate `irq` to a vector through the installed driver, then
/// [`register`]. Fails with [`Error::NoSuchIrq`] if the driver doesn't map
/// this IRQ.
pub fn register_irq(irq: u32, handler: Handler) -> Result<()> {
	let vector = with_driver(|d| d.irq_to_vector(irq)).ok_or(Error::NoSuchIrq)?;
	register(vector, handler)
}

pub fn remove_irq(irq: u32) -> Result<()> {
	let vector = with_driver(|d| d.irq_to_vector(irq)).ok_or(Error::NoSuchIrq)?;
	remove(vector)
}

pub fn irq_set_mask(irq: u32, enabled: bool) -> Result<()> {
	with_driver(|d| d.set_mask(irq, enabled))
}

pub fn irq_set_eoi(irq: u32) -> Result<()> {
	with_driver(|d| d.send_eoi(irq))
}

pub fn spurious_count() -> u64 {
	SPURIOUS_COUNT.load(Ordering::Relaxed)
}

/// Disable interrupts on the current CPU, returning whether they were
/// enabled beforehand. Thread-local and nestable: callers pair this with
/// [`restore`] rather than unconditionally re-enabling.
#[cfg(target_arch = "x86_64")]
pub fn disable() -> bool {
	let flags: u64;
	unsafe {
		core::arch::asm!("pushfq; pop {}", out(reg) flags);
		core::arch::asm!("cli");
	}
	flags & (1 << 9) != 0
}

/// Restore the interrupt-enable state [`disable`] observed before it ran.
#[cfg(target_arch = "x86_64")]
pub fn restore(was_enabled: bool) {
	if was_enabled {
		unsafe { core::arch::asm!("sti") };
	}
}

/// Central interrupt entry point. Every handler, traced back far enough,
/// tail-calls the scheduler on its way out (`spec.md` §5) — a handler
/// that only updates shared state already triggers a reschedule.
pub fn interrupt_main_handler(vector: u32) -> ! {
	increment_interrupt_count(vector);

	let config = cpu::interrupt_config();
	if vector == config.panic_vector {
		panic!("fatal interrupt on vector {}", vector);
	}

	if with_driver(|d| d.is_spurious(vector)) {
		SPURIOUS_COUNT.fetch_add(1, Ordering::Relaxed);
		if let Some(irq) = with_driver(|d| d.vector_to_irq(vector)) {
			let _ = irq_set_eoi(irq);
		}
		tail_call_scheduler();
	}

	let handler = {
		let table = HANDLER_TABLE.lock();
		table.slots[vector as usize]
	};

	match handler {
		Some(handler) => handler(vector),
		None => panic!("unhandled interrupt on vector {}", vector),
	}

	tail_call_scheduler();
}

fn tail_call_scheduler() -> ! {
	crate::scheduler::schedule_no_int();
	loop {
		core::hint::spin_loop();
	}
}

fn increment_interrupt_count(_vector: u32) {
	crate::interrupt::increment_interrupt_count();
}

// --- Deferred ISR -----------------------------------------------------

struct DeferredJob {
	routine: fn(*mut u8),
	arg: *mut u8,
}

unsafe impl Send for DeferredJob {}

static DEFER_QUEUE: Spinlock<Queue> = Spinlock::new(Queue::new());
static DEFER_SEM: Semaphore = Semaphore::new(0);
static DEFER_INIT: AtomicBool = AtomicBool::new(false);

/// Create the singleton deferred-ISR worker: highest kernel-thread
/// priority, pinned to the boot CPU, parked on a counting semaphore
/// rather than busy-spinning. Idempotent.
pub fn defer_init() -> Result<()> {
	if DEFER_INIT.swap(true, Ordering::AcqRel) {
		return Ok(());
	}
	kthread::kthread_run_pinned(
		"kworker/defer",
		defer_worker_main,
		KTHREAD_PRIO_HIGHEST,
		cpu::current_cpu_id(),
	)?;
	Ok(())
}

/// Queue `routine(arg)` to run later on the deferred-ISR worker. Safe to
/// call from interrupt context: allocates a job record, wraps it in a
/// queue node, pushes it, and posts the semaphore — no lock is held
/// across a potential reschedule.
pub fn defer_isr(routine: fn(*mut u8), arg: *mut u8) -> Result<()> {
	let job = Box::new(DeferredJob { routine, arg });
	let node = queue::create_node(Box::into_raw(job) as *mut u8);
	DEFER_QUEUE.lock().push(node);
	DEFER_SEM.post();
	Ok(())
}

fn defer_worker_main() {
	loop {
		DEFER_SEM.wait();
		let node = DEFER_QUEUE.lock().pop();
		if let Some(node) = node {
			let job = unsafe { Box::from_raw(node.data() as *mut DeferredJob) };
			(job.routine)(job.arg);
			let _ = queue::destroy_node(node);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test_case]
	fn register_then_remove_restores_empty_slot() {
		fn handler(_v: u32) {}
		let vector = cpu::interrupt_config().min_vector + 1;
		assert!(register(vector, handler).is_ok());
		assert_eq!(register(vector, handler), Err(Error::AlreadyRegistered));
		assert!(remove(vector).is_ok());
		assert_eq!(remove(vector), Err(Error::NotRegistered));
	}

	#[test_case]
	fn out_of_range_vector_is_rejected() {
		fn handler(_v: u32) {}
		let config = cpu::interrupt_config();
		assert_eq!(register(config.min_vector - 1, handler), Err(Error::UnauthorizedLine));
		assert_eq!(register(config.max_vector + 1, handler), Err(Error::UnauthorizedLine));
	}
}
