use fakhivets_core::device::{Display, KeyCode, KeyState, Keyboard, PortComposer, PortController};
use fakhivets_core::memory::{MemSection, Memory};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_port_controller_simple_io_output_moves_memory_to_outbound() {
    let (controller, outbound) = PortController::new(MemSection::Registers2K.start());
    let mut memory = Memory::new();
    let base = MemSection::Registers2K.start();
    memory.write(base, 0x5A); // port A latch
    memory.write(base + 3, 0x80); // control: simple I/O, all output

    controller.sync(&mut memory).unwrap();

    assert_eq!(outbound.a.recv_timeout(Duration::from_millis(200)).unwrap(), 0x5A);
}

#[test]
fn test_port_composer_masks_every_sender_contribution() {
    let observed = Arc::new(AtomicU8::new(0));
    let observed_writer = Arc::clone(&observed);
    let mut composer = PortComposer::new(move |v| observed_writer.store(v, Ordering::SeqCst));

    let lo = composer.masked_send(0x0F);
    let hi = composer.masked_send(0xF0);
    lo.send(0xFF);
    hi.send(0x30);
    std::thread::sleep(Duration::from_millis(150));

    assert_eq!(observed.load(Ordering::SeqCst), 0x3F);
    composer.close();
}

#[test]
fn test_keyboard_reports_col0_row0_on_all_three_ports() {
    let a = Arc::new(AtomicU8::new(0xFF));
    let b = Arc::new(AtomicU8::new(0xFF));
    let c = Arc::new(AtomicU8::new(0x0F));
    let (a2, b2, c2) = (Arc::clone(&a), Arc::clone(&b), Arc::clone(&c));

    let keyboard = Keyboard::new(fakhivets_core::device::keyboard::KeyboardPorts {
        send_a: Box::new(move |v| a2.store(v, Ordering::SeqCst)),
        send_b: Box::new(move |v| b2.store(v, Ordering::SeqCst)),
        send_c_low: Box::new(move |v| c2.store(v, Ordering::SeqCst)),
    });

    keyboard.event(KeyCode::new(0, 0), KeyState::Down);
    std::thread::sleep(Duration::from_millis(150));

    assert_eq!(a.load(Ordering::SeqCst) & 0x01, 0);
    assert_eq!(b.load(Ordering::SeqCst) & 0x80, 0);
    keyboard.shutdown();
}

#[test]
fn test_display_decodes_a_single_lit_pixel() {
    let mut memory = Memory::new();
    let base = MemSection::Display12K.start();
    memory.write(base, 0b0000_0010); // bit 1 -> column 0, sixth-from-right pixel
    let image = Display::image(&memory);
    assert_eq!(image.get(6, 0), 255);
    assert_eq!(image.get(7, 0), 0);
}
