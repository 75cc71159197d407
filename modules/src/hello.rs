// SPDX-License-Identifier: GPL-2.0

//! Minimal loadable module used as a smoke test for the module loader.

#![no_std]
#![no_main]

extern crate alloc;

use kernel::prelude::*;

struct HelloModule;

impl kernel::module::Module for HelloModule {
	fn init(_module: &'static kernel::module::ThisModule) -> Result<Self> {
		info!("hello_module: loaded");
		Ok(HelloModule)
	}

	fn exit(_module: &'static kernel::module::ThisModule) {
		info!("hello_module: unloaded");
	}
}

module! {
    type: HelloModule,
    name: "hello_module",
    author: "Rust Kernel Contributors",
    description: "Minimal hello-world loadable module",
    license: "GPL-2.0",
}
