// SPDX-License-Identifier: GPL-2.0

//! Dummy driver used to exercise the driver registration path with no
//! backing hardware.

#![no_std]
#![no_main]

extern crate alloc;

use kernel::device::Device;
use kernel::driver::Driver;
use kernel::prelude::*;

#[derive(Debug)]
struct DummyDriver;

impl Driver for DummyDriver {
	fn name(&self) -> &str {
		"dummy"
	}

	fn probe(&self, device: &mut Device) -> Result<()> {
		info!("dummy driver probing device: {}", device.name());
		Ok(())
	}

	fn remove(&self, device: &mut Device) -> Result<()> {
		info!("dummy driver removing device: {}", device.name());
		Ok(())
	}
}

struct DummyModule;

impl kernel::module::Module for DummyModule {
	fn init(_module: &'static kernel::module::ThisModule) -> Result<Self> {
		kernel::driver::register_driver(Box::new(DummyDriver))?;
		Ok(DummyModule)
	}

	fn exit(_module: &'static kernel::module::ThisModule) {
		kernel::driver::unregister_driver("dummy").ok();
	}
}

module! {
    type: DummyModule,
    name: "dummy_driver",
    author: "Rust Kernel Contributors",
    description: "No-op driver exercising the registration path",
    license: "GPL-2.0",
}
