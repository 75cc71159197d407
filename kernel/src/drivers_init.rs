// SPDX-License-Identifier: GPL-2.0

//! Driver initialization and management

use crate::devicetree::{self, NodeHandle};
use crate::error::Result;
use crate::time::driver::TimerDriver;
use crate::time::manager::Slot;
use crate::time::{lapic_timer, manager, pit, rtc};
use crate::{info, warn};

/// Initialize all built-in drivers
pub fn init_drivers() -> Result<()> {
	info!("Initializing built-in drivers");

	// Initialize keyboard driver
	init_keyboard_driver()?;

	// Initialize serial driver
	init_serial_driver()?;

	// Initialize ramdisk driver
	init_ramdisk_driver()?;

	info!("Built-in drivers initialized");
	Ok(())
}

const PIT_NODE: NodeHandle = NodeHandle(1);
const RTC_NODE: NodeHandle = NodeHandle(2);
const LAPIC_NODE: NodeHandle = NodeHandle(3);

/// Populate the in-memory device-tree table standing in for a parsed FDT
/// blob (`spec.md` §1 leaves the flattened-tree parser itself out of
/// scope) and attach the PIT, RTC and Local APIC timer against it,
/// registering each with [`manager`] (`spec.md` §4.D/§4.E).
///
/// PIT fills MAIN: it is the only source whose `get_time_ns` is available
/// before APIC calibration runs, and the LAPIC timer needs a base to
/// calibrate against. RTC fills RTC. The LAPIC timer fills AUX once
/// calibrated, so `wait_no_scheduler` can later run off the per-CPU
/// source instead of bouncing through the PIT's divider.
pub fn init_board_drivers() -> Result<()> {
	devicetree::set_property(PIT_NODE, "interrupts", &0u32.to_be_bytes());
	devicetree::set_property(PIT_NODE, "comm", &cells(&[0x43, 0x40]));
	devicetree::set_property(PIT_NODE, "quartz-freq", &1_193_182u32.to_be_bytes());
	devicetree::set_property(PIT_NODE, "freq", &1000u32.to_be_bytes());
	devicetree::set_property(PIT_NODE, "freq-range", &cells(&[19, 1_193_182]));
	devicetree::set_property(PIT_NODE, "is-main", &1u32.to_be_bytes());

	devicetree::set_property(RTC_NODE, "interrupts", &8u32.to_be_bytes());
	devicetree::set_property(RTC_NODE, "freq", &1024u32.to_be_bytes());
	devicetree::set_property(RTC_NODE, "freq-range", &cells(&[2, 32_768]));
	devicetree::set_property(RTC_NODE, "is-rtc", &1u32.to_be_bytes());

	devicetree::set_property(LAPIC_NODE, "mmio-base", &0xFEE0_0000u32.to_be_bytes());
	devicetree::set_property(LAPIC_NODE, "freq", &1000u32.to_be_bytes());
	devicetree::set_property(LAPIC_NODE, "freq-range", &cells(&[1, 1_000_000]));
	devicetree::set_property(LAPIC_NODE, "base-timer", &0u32.to_be_bytes());

	let pit = pit::attach(PIT_NODE)?;
	pit.enable();
	manager::add_timer(alloc::boxed::Box::new(pit.clone()), Slot::Main)?;
	info!("PIT attached at {}Hz (MAIN)", pit.get_frequency());

	match rtc::attach(RTC_NODE) {
		Ok(rtc) => {
			rtc.enable();
			manager::add_timer(alloc::boxed::Box::new(rtc.clone()), Slot::Rtc)?;
			info!("RTC attached at {}Hz", rtc.get_frequency());
		}
		Err(e) => warn!("RTC attach failed (non-fatal): {}", e),
	}

	// Vector 0x30 (IDT vector 48) is free of the PIC's 32..47 legacy IRQ
	// remap range, so it won't collide with `PicController`.
	match lapic_timer::attach(LAPIC_NODE, pit.as_ref() as &dyn TimerDriver, 0x30) {
		Ok(lapic) => {
			lapic.enable();
			manager::add_timer(alloc::boxed::Box::new(lapic), Slot::Aux)?;
			info!("Local APIC timer calibrated and attached (AUX)");
		}
		Err(e) => warn!("Local APIC timer attach failed (non-fatal): {}", e),
	}

	Ok(())
}

fn cells(values: &[u32]) -> alloc::vec::Vec<u8> {
	let mut out = alloc::vec::Vec::with_capacity(values.len() * 4);
	for v in values {
		out.extend_from_slice(&v.to_be_bytes());
	}
	out
}

/// Initialize PS/2 keyboard driver
fn init_keyboard_driver() -> Result<()> {
	info!("Initializing PS/2 keyboard driver");

	// Register keyboard interrupt handler (IRQ 1)
	if let Err(e) = crate::interrupt::request_irq(
		1,
		keyboard_interrupt_handler,
		0,
		"keyboard",
		core::ptr::null_mut(),
	) {
		warn!("Failed to register keyboard interrupt: {}", e);
		return Err(e);
	}

	info!("PS/2 keyboard driver initialized");
	Ok(())
}

/// Initialize serial driver
fn init_serial_driver() -> Result<()> {
	info!("Initializing serial driver");

	// Register serial interrupt handlers (IRQ 3 and 4)
	if let Err(e) = crate::interrupt::request_irq(
		3,
		serial_interrupt_handler,
		0,
		"serial",
		core::ptr::null_mut(),
	) {
		warn!("Failed to register serial interrupt: {}", e);
	}

	if let Err(e) = crate::interrupt::request_irq(
		4,
		serial_interrupt_handler,
		0,
		"serial",
		core::ptr::null_mut(),
	) {
		warn!("Failed to register serial interrupt: {}", e);
	}

	info!("Serial driver initialized");
	Ok(())
}

/// Initialize ramdisk driver
fn init_ramdisk_driver() -> Result<()> {
	info!("Initializing ramdisk driver");

	// TODO: Create ramdisk device
	// This would typically involve:
	// 1. Allocating memory for the ramdisk
	// 2. Registering the device with the block device subsystem
	// 3. Setting up device file operations

	info!("Ramdisk driver initialized");
	Ok(())
}

/// Keyboard interrupt handler
fn keyboard_interrupt_handler(irq: u32, dev_id: *mut u8) -> crate::interrupt::IrqReturn {
	// Read the scan code from the keyboard controller
	let scancode = unsafe { crate::arch::x86_64::port::inb(0x60) };

	// Convert scan code to ASCII (simplified)
	if scancode < 128 {
		let ascii = SCANCODE_TO_ASCII[scancode as usize];
		if ascii != 0 {
			// Send character to kernel shell
			if let Err(e) = crate::shell::shell_input(ascii as char) {
				crate::warn!("Failed to process shell input: {}", e);
			}
		}
	}

	crate::interrupt::IrqReturn::Handled
}

/// Serial interrupt handler
fn serial_interrupt_handler(irq: u32, dev_id: *mut u8) -> crate::interrupt::IrqReturn {
	// TODO: Handle serial port interrupts
	// This would typically involve reading from the serial port
	// and handling incoming data

	crate::interrupt::IrqReturn::Handled
}

/// Keyboard scan code to ASCII mapping (simplified US layout)
const SCANCODE_TO_ASCII: [u8; 128] = [
	0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=',
	8, // 0-14
	b'\t', b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']',
	b'\n', // 15-28
	0,     // 29 ctrl
	b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', // 30-41
	0,    // 42 left shift
	b'\\', b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', // 43-53
	0,    // 54 right shift
	b'*', 0,    // 55-56 alt
	b' ', // 57 space
	0,    // 58 caps lock
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 59-68 F1-F10
	0, 0, // 69-70 num lock, scroll lock
	b'7', b'8', b'9', b'-', b'4', b'5', b'6', b'+', b'1', b'2', b'3', b'0',
	b'.', // 71-83 numpad
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 84-99
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 100-115
	0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 116-127
];
