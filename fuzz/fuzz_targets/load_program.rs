#![no_main]

use libfuzzer_sys::fuzz_target;

use hanoi_vm::prelude::*;

fuzz_target!(|data: &[u8]| {
    // arbitrary byte strings must produce a typed error or a valid program
    let _ = Program::load(data, &LoadConfig::default());
});
