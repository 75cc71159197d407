// SPDX-License-Identifier: GPL-2.0

//! Loadable module exercising the kernel heap, used as a load-time smoke test.

#![no_std]
#![no_main]

extern crate alloc;

use kernel::prelude::*;

struct TestModule;

impl kernel::module::Module for TestModule {
	fn init(_module: &'static kernel::module::ThisModule) -> Result<Self> {
		let ptr = kernel::memory::kmalloc::kmalloc(64)?;
		info!("test_module: allocated 64 bytes at {:p}", ptr);
		kernel::memory::kmalloc::kfree(ptr);
		info!("test_module: freed, self-test passed");
		Ok(TestModule)
	}

	fn exit(_module: &'static kernel::module::ThisModule) {
		info!("test_module: unloaded");
	}
}

module! {
    type: TestModule,
    name: "test_module",
    author: "Rust Kernel Contributors",
    description: "Heap allocator load-time smoke test",
    license: "GPL-2.0",
}
