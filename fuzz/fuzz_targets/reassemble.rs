#![no_main]

use libfuzzer_sys::fuzz_target;

use hanoi_vm::prelude::*;

fuzz_target!(|data: &[u8]| {
    // every accepted program is stable under load → disasm → assemble
    if let Ok(program) = Program::load(data, &LoadConfig::default()) {
        let assembled =
            assemble(&disassemble(&program)).expect("loaded operands re-encode");
        assert_eq!(assembled, program.bytes());
    }
});
