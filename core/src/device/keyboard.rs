//! The 6×12 keyboard matrix (SPEC_FULL.md §4.6). A background worker
//! drains a single-producer event queue and projects the matrix onto the
//! port controller's A/B/C-low inputs every time a cell changes.

use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Up,
    Down,
}

/// Packs a (row, col) pair: bits 0-3 = row, bits 4-7 = col.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCode(pub u8);

impl KeyCode {
    pub fn new(row: u8, col: u8) -> KeyCode {
        KeyCode((col & 0x0F) << 4 | (row & 0x0F))
    }

    fn position(self) -> (usize, usize) {
        ((self.0 & 0x0F) as usize, (self.0 >> 4) as usize)
    }
}

struct KeyEvent {
    code: KeyCode,
    state: KeyState,
}

/// The three port-controller-facing sinks the keyboard drives. `send_b`
/// is typically a [`super::port_composer::ComposerSender`] masked to
/// 0xFC, since the keyboard only owns rows 2 through 7 of port B.
pub struct KeyboardPorts {
    pub send_a: Box<dyn Fn(u8) + Send>,
    pub send_b: Box<dyn Fn(u8) + Send>,
    pub send_c_low: Box<dyn Fn(u8) + Send>,
}

#[derive(Default)]
struct Matrix {
    states: [[KeyState; 12]; 6],
}

impl Default for KeyState {
    fn default() -> Self {
        KeyState::Up
    }
}

impl Matrix {
    /// Applies one event; returns whether the matrix actually changed.
    fn apply(&mut self, code: KeyCode, state: KeyState) -> bool {
        let (row, col) = code.position();
        if self.states[row][col] != state {
            self.states[row][col] = state;
            true
        } else {
            false
        }
    }

    /// Projects the matrix onto (A, B, C-low) per §4.6: down cells are
    /// OR-reduced per row/column, then the whole thing is active-low.
    fn port_values(&self) -> (u8, u8, u8) {
        let mut row_bits: u16 = 0;
        let mut col_bits: u16 = 0;
        for (row, cells) in self.states.iter().enumerate() {
            for (col, &state) in cells.iter().enumerate() {
                if state == KeyState::Down {
                    row_bits |= 1 << row;
                    col_bits |= 1 << col;
                }
            }
        }
        let row_bits = !row_bits;
        let col_bits = !col_bits;

        let a = (col_bits & 0xFF) as u8;
        let c_low = ((col_bits >> 8) & 0x0F) as u8;
        let b = reverse_bits((row_bits & 0xFF) as u8);
        (a, b, c_low)
    }
}

fn reverse_bits(v: u8) -> u8 {
    let v = (v & 0xAA) >> 1 | (v & 0x55) << 1;
    let v = (v & 0xCC) >> 2 | (v & 0x33) << 2;
    (v & 0xF0) >> 4 | (v & 0x0F) << 4
}

pub struct Keyboard {
    events_tx: Option<Sender<KeyEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl Keyboard {
    pub fn new(ports: KeyboardPorts) -> Keyboard {
        let (tx, rx) = mpsc::channel::<KeyEvent>();

        let worker = thread::spawn(move || {
            let mut matrix = Matrix::default();
            sync_ports(&ports, matrix.port_values());
            for event in rx {
                if matrix.apply(event.code, event.state) {
                    sync_ports(&ports, matrix.port_values());
                }
            }
        });

        Keyboard { events_tx: Some(tx), worker: Some(worker) }
    }

    pub fn event(&self, code: KeyCode, state: KeyState) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(KeyEvent { code, state });
        }
    }

    pub fn run_sequence(&self, seq: &[KeyCode]) {
        for &code in seq {
            self.event(code, KeyState::Down);
            self.event(code, KeyState::Up);
        }
    }

    pub fn shutdown(&mut self) {
        self.events_tx = None;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sync_ports(ports: &KeyboardPorts, (a, b, c_low): (u8, u8, u8)) {
    (ports.send_a)(a);
    (ports.send_c_low)(c_low);
    (ports.send_b)(b);
}
