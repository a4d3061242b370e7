use fakhivets_core::computer::Computer;
use fakhivets_core::rks::RksImage;

fn blank_roms() -> (Vec<u8>, Vec<u8>) {
    (vec![0u8; 0x800], vec![0u8; 0x3000])
}

#[test]
fn test_loaded_program_runs_to_completion() {
    let (rom, rom_extra) = blank_roms();
    let mut computer = Computer::new(&rom, &rom_extra);

    // MVI A,5 ; MVI B,3 ; ADD B ; HLT, loaded at 0x4000 and jumped to
    // directly by overwriting the CPU's PC via a fresh program load.
    let image = RksImage {
        start_address: 0x4000,
        end_address: 0x4006,
        checksum: 0,
        content: vec![0x3E, 0x05, 0x06, 0x03, 0x80, 0x76, 0x00],
    };
    computer.load_program(&image);
    computer.cpu.pc = 0x4000;

    for _ in 0..3 {
        computer.step().unwrap();
    }

    assert_eq!(computer.cpu.a, 8);
    computer.shutdown();
}

#[test]
fn test_step_surfaces_an_unimplemented_controller_mode() {
    let (rom, rom_extra) = blank_roms();
    let mut computer = Computer::new(&rom, &rom_extra);

    // Set the control word to strobed mode (0xA0) before the first step
    // writes anything useful, then run a NOP so sync() observes it.
    let control_addr = fakhivets_core::memory::MemSection::Registers2K.start() + 3;
    computer.memory.write(control_addr, 0xA0);
    computer.memory.write(0x4000, 0x00); // NOP
    computer.cpu.pc = 0x4000;

    let err = computer.step().unwrap_err();
    assert!(matches!(err, fakhivets_core::computer::StepError::Controller(_)));
    computer.shutdown();
}
