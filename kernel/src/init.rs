// SPDX-License-Identifier: GPL-2.0

//! Kernel initialization

use crate::error::Result;

/// Early kernel initialization
pub fn early_init() {
	crate::console::write_str("[+] Early initialization complete\n");
}

/// Initialize all kernel subsystems
fn init_subsystems() {
	crate::console::write_str("[*] Initializing kernel subsystems...\n");

	// Initialize timer system
	crate::console::write_str("    - Timer system\n");
	if let Err(_e) = crate::timer::init_timer() {
		crate::console::write_str("      [!] Timer init failed (non-fatal)\n");
	}

	// Initialize interrupt handlers
	crate::console::write_str("    - Interrupt handlers\n");
	if let Err(_e) = crate::interrupt::init() {
		crate::console::write_str("      [!] Interrupt init failed (non-fatal)\n");
	}

	// Initialize the deferred-ISR worker thread before any driver registers
	// itself with intman, so a deferred job is never scheduled into a queue
	// nobody is draining.
	crate::console::write_str("    - Deferred interrupt worker\n");
	if let Err(_e) = crate::intman::defer_init() {
		crate::console::write_str("      [!] Deferred-ISR init failed (non-fatal)\n");
	}

	// Initialize scheduler
	crate::console::write_str("    - Scheduler\n");
	if let Err(_e) = crate::scheduler::init() {
		crate::console::write_str("      [!] Scheduler init failed (non-fatal)\n");
	}

	// Probe board timer/clock sources and register them with the time
	// manager, then bring up device drivers and mount the root filesystem.
	crate::console::write_str("    - Board drivers\n");
	if let Err(_e) = crate::drivers_init::init_board_drivers() {
		crate::console::write_str("      [!] Driver init failed (non-fatal)\n");
	}
	if let Err(_e) = crate::drivers_init::init_drivers() {
		crate::console::write_str("      [!] Built-in drivers init failed (non-fatal)\n");
	}

	crate::console::write_str("    - Virtual filesystem\n");
	if let Err(_e) = crate::fs::init() {
		crate::console::write_str("      [!] VFS init failed (non-fatal)\n");
	}

	crate::console::write_str("[+] Subsystems initialized\n");
}

/// Main kernel initialization  
pub fn main_init() -> ! {
	// Print boot banner
	crate::console::write_str("\n");
	crate::console::write_str("========================================\n");
	crate::console::write_str("         Rust Kernel v0.1.0\n");
	crate::console::write_str("========================================\n");
	crate::console::write_str("\n");

	// Initialize subsystems
	init_subsystems();

	// Print system information
	crate::console::write_str("\n");
	crate::console::write_str("System Information:\n");
	crate::console::write_str("  Architecture: x86_64\n");
	crate::console::write_str("  Memory mapping: 0-1GB identity mapped\n");
	crate::console::write_str("  Page size: 2MB (large pages)\n");
	crate::console::write_str("\n");
	crate::console::write_str("[+] Kernel initialization complete\n");
	crate::console::write_str("\n");

	// Enter main kernel loop
	main_kernel_loop()
}

/// Main kernel loop with task scheduling
fn main_kernel_loop() -> ! {
	crate::console::write_str("Entering kernel main loop...\n");

	let mut tick_count: u64 = 0;

	loop {
		tick_count = tick_count.wrapping_add(1);

		// Handle timer tick periodically
		if tick_count % 10000 == 0 {
			crate::timer::handle_timer_tick();
		}

		// Heartbeat indicator
		if tick_count % 5_000_000 == 0 {
			crate::console::write_str(".");
		}

		// Halt CPU to save power
		unsafe { core::arch::asm!("hlt"); }
	}
}
