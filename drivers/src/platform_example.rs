// SPDX-License-Identifier: GPL-2.0

//! Example platform driver, matching devices by device-tree "compatible"
//! string.

#![no_std]
#![no_main]

extern crate alloc;

use kernel::device::Device;
use kernel::driver::{DeviceId, Driver, PlatformDriver};
use kernel::prelude::*;

#[derive(Debug)]
struct PlatformExampleDriver {
	ids: Vec<DeviceId>,
}

impl PlatformExampleDriver {
	fn new() -> Self {
		Self {
			ids: vec![DeviceId::new(String::from("example,platform-device"))
				.with_compatible(vec![String::from("example,platform-device")])],
		}
	}
}

impl Driver for PlatformExampleDriver {
	fn name(&self) -> &str {
		"platform_example"
	}

	fn probe(&self, device: &mut Device) -> Result<()> {
		info!("platform_example probing device: {}", device.name());
		Ok(())
	}

	fn remove(&self, device: &mut Device) -> Result<()> {
		info!("platform_example removing device: {}", device.name());
		Ok(())
	}
}

impl PlatformDriver for PlatformExampleDriver {
	fn match_device(&self, device: &Device) -> bool {
		device.name().contains("platform")
	}

	fn device_ids(&self) -> &[DeviceId] {
		&self.ids
	}
}

struct PlatformExampleModule;

impl kernel::module::Module for PlatformExampleModule {
	fn init(_module: &'static kernel::module::ThisModule) -> Result<Self> {
		kernel::driver::register_platform_driver(Box::new(PlatformExampleDriver::new()))?;
		Ok(PlatformExampleModule)
	}

	fn exit(_module: &'static kernel::module::ThisModule) {
		kernel::driver::unregister_driver("platform_example").ok();
	}
}

module! {
    type: PlatformExampleModule,
    name: "platform_example",
    author: "Rust Kernel Contributors",
    description: "Example platform driver matched by compatible string",
    license: "GPL-2.0",
}
