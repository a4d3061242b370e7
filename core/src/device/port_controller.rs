//! К580ВВ55 (Intel 8255 analogue) programmable peripheral interface
//! (SPEC_FULL.md §4.4). Mediates between the CPU-visible port cells at
//! [`crate::memory::MemSection::Registers2K`] and the external devices
//! wired to ports A, B, and the two C nibbles.

use std::fmt;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Mutex;

use crate::memory::Memory;

const PORT_A: usize = 0;
const PORT_B: usize = 1;
const PORT_C: usize = 2;
const CONTROL: usize = 3;

/// The only recoverable-in-theory-but-fatal-in-practice condition a
/// [`PortController::sync`] call can hit: the guest selected a mode this
/// peripheral was never wired to support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnimplementedControllerMode {
    pub strobed_bidirectional: bool,
}

impl fmt::Display for UnimplementedControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.strobed_bidirectional {
            write!(f, "strobed bidirectional I/O mode is not implemented")
        } else {
            write!(f, "strobed I/O mode is not implemented")
        }
    }
}

impl std::error::Error for UnimplementedControllerMode {}

/// Receivers the host wires to devices that consume port writes. Each
/// `recv()` blocks until the controller's next [`PortController::sync`]
/// emits a byte for that half-port while it's configured as output.
pub struct PortOutbound {
    pub a: Receiver<u8>,
    pub b: Receiver<u8>,
    pub c_low: Receiver<u8>,
    pub c_high: Receiver<u8>,
}

/// Staged device-offered values, sampled by `sync` under the same lock
/// that `send_*` updates (SPEC_FULL.md §4.4's concurrency contract).
struct Updates {
    a: u8,
    b: u8,
    c: u8,
}

pub struct PortController {
    base: u16,
    updates: Mutex<Updates>,
    a_tx: SyncSender<u8>,
    b_tx: SyncSender<u8>,
    c_low_tx: SyncSender<u8>,
    c_high_tx: SyncSender<u8>,
}

impl PortController {
    /// `base` is the first address of the 4-byte region holding ports A,
    /// B, C, and the control word, in that order (the Registers2K
    /// section in this machine).
    pub fn new(base: u16) -> (PortController, PortOutbound) {
        let (a_tx, a_rx) = mpsc::sync_channel(1);
        let (b_tx, b_rx) = mpsc::sync_channel(1);
        let (c_low_tx, c_low_rx) = mpsc::sync_channel(1);
        let (c_high_tx, c_high_rx) = mpsc::sync_channel(1);
        let controller = PortController {
            base,
            updates: Mutex::new(Updates { a: 0, b: 0, c: 0 }),
            a_tx,
            b_tx,
            c_low_tx,
            c_high_tx,
        };
        (controller, PortOutbound { a: a_rx, b: b_rx, c_low: c_low_rx, c_high: c_high_rx })
    }

    pub fn send_a(&self, value: u8) {
        self.updates.lock().unwrap().a = value;
    }

    pub fn send_b(&self, value: u8) {
        self.updates.lock().unwrap().b = value;
    }

    pub fn send_c_low(&self, value: u8) {
        let mut updates = self.updates.lock().unwrap();
        updates.c = (updates.c & 0xF0) | (value & 0x0F);
    }

    pub fn send_c_high(&self, value: u8) {
        let mut updates = self.updates.lock().unwrap();
        updates.c = (updates.c & 0x0F) | (value << 4);
    }

    /// Read the control word and dispatch. Must run once per CPU step
    /// (`Computer::step`, §4.8), after the CPU has had a chance to write
    /// the control word and the output ports.
    pub fn sync(&self, memory: &mut Memory) -> Result<(), UnimplementedControllerMode> {
        let control = memory.read(self.base + CONTROL as u16);
        if control & 0x80 != 0 {
            match (control >> 5) & 0x03 {
                0 => {
                    self.sync_simple_io(memory, control);
                    Ok(())
                }
                1 => Err(UnimplementedControllerMode { strobed_bidirectional: false }),
                _ => Err(UnimplementedControllerMode { strobed_bidirectional: true }),
            }
        } else {
            self.sync_bsr(memory, control);
            Ok(())
        }
    }

    fn sync_simple_io(&self, memory: &mut Memory, control: u8) {
        let (a, b, c) = {
            let updates = self.updates.lock().unwrap();
            (updates.a, updates.b, updates.c)
        };
        self.sync_half(memory, PORT_A, control & 0x10 != 0, a, &self.a_tx);
        self.sync_half(memory, PORT_B, control & 0x02 != 0, b, &self.b_tx);
        self.sync_c_nibble(memory, true, control & 0x01 != 0, c);
        self.sync_c_nibble(memory, false, control & 0x08 != 0, c);
    }

    fn sync_half(&self, memory: &mut Memory, port: usize, input: bool, offered: u8, out: &SyncSender<u8>) {
        let addr = self.base + port as u16;
        if input {
            memory.write(addr, offered);
        } else {
            let _ = out.try_send(memory.read(addr));
        }
    }

    fn sync_c_nibble(&self, memory: &mut Memory, low: bool, input: bool, offered_c: u8) {
        let addr = self.base + PORT_C as u16;
        if input {
            let current = memory.read(addr);
            let merged = if low {
                (current & 0xF0) | (offered_c & 0x0F)
            } else {
                (current & 0x0F) | (offered_c & 0xF0)
            };
            memory.write(addr, merged);
        } else {
            let current = memory.read(addr);
            if low {
                let _ = self.c_low_tx.try_send(current & 0x0F);
            } else {
                let _ = self.c_high_tx.try_send(current >> 4);
            }
        }
    }

    fn sync_bsr(&self, memory: &mut Memory, control: u8) {
        let addr = self.base + PORT_C as u16;
        let selector = (control >> 1) & 0x07;
        let mut c = memory.read(addr);
        if control & 0x01 != 0 {
            c |= 1 << selector;
        } else {
            c &= !(1 << selector);
        }
        memory.write(addr, c);
        let _ = self.c_high_tx.try_send(c >> 4);
        let _ = self.c_low_tx.try_send(c & 0x0F);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_io_input_mode_copies_offered_value_into_memory() {
        let mut mem = Memory::new();
        let (ctl, _out) = PortController::new(0xF800);
        mem.write(0xF800 + CONTROL as u16, 0x90); // mode=simple, A=input
        ctl.send_a(0x5A);
        ctl.sync(&mut mem).unwrap();
        assert_eq!(mem.read(0xF800), 0x5A);
    }

    #[test]
    fn simple_io_output_mode_emits_memory_cell_non_blocking() {
        let mut mem = Memory::new();
        let (ctl, out) = PortController::new(0xF800);
        mem.write(0xF800 + CONTROL as u16, 0x80); // mode=simple, A=output
        mem.write(0xF800, 0x42);
        ctl.sync(&mut mem).unwrap();
        assert_eq!(out.a.recv().unwrap(), 0x42);
    }

    #[test]
    fn output_with_no_receiver_is_dropped_not_blocked() {
        let mut mem = Memory::new();
        let (ctl, _out) = PortController::new(0xF800);
        mem.write(0xF800 + CONTROL as u16, 0x80);
        ctl.sync(&mut mem).unwrap(); // must not block even though no one ever reads
    }

    #[test]
    fn bsr_sets_and_clears_a_single_bit() {
        let mut mem = Memory::new();
        let (ctl, out) = PortController::new(0xF800);
        // BSR, bit 3, set: ctl = 0_bbb_1 with bbb=3 -> bits3-1=011, bit0=1
        mem.write(0xF800 + CONTROL as u16, 0b0000_0111);
        ctl.sync(&mut mem).unwrap();
        assert_eq!(mem.read(0xF800 + PORT_C as u16) & 0x08, 0x08);
        let _ = out.c_high.try_recv();
        let _ = out.c_low.try_recv();

        mem.write(0xF800 + CONTROL as u16, 0b0000_0110); // same bit, reset
        ctl.sync(&mut mem).unwrap();
        assert_eq!(mem.read(0xF800 + PORT_C as u16) & 0x08, 0);
    }

    #[test]
    fn strobed_mode_is_fatal() {
        let mut mem = Memory::new();
        let (ctl, _out) = PortController::new(0xF800);
        mem.write(0xF800 + CONTROL as u16, 0xA0); // mode=01 strobed
        assert!(ctl.sync(&mut mem).is_err());
    }
}
