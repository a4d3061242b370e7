//! Combines several mask-restricted senders onto one physical outbound
//! port (SPEC_FULL.md §4.5) — e.g. the keyboard and some other device
//! both drive bits of port B, and the composer keeps a single running
//! byte that each sender only partially overwrites.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct MaskedValue {
    value: u8,
    mask: u8,
}

/// A mask-scoped handle onto a [`PortComposer`]. Cloning `Sender` is
/// cheap, so each device that shares the composed port gets its own.
#[derive(Clone)]
pub struct ComposerSender {
    tx: Sender<MaskedValue>,
    mask: u8,
    closed: Arc<AtomicBool>,
}

impl ComposerSender {
    /// Overwrite this sender's masked bits of the composed byte. A no-op
    /// once the owning [`PortComposer`] has been closed.
    pub fn send(&self, value: u8) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let _ = self.tx.send(MaskedValue { value, mask: self.mask });
    }
}

pub struct PortComposer {
    tx: Sender<MaskedValue>,
    closed: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PortComposer {
    /// `dst` is called with the newly composed byte after every send;
    /// it typically forwards into a [`super::port_controller::PortController`]
    /// `send_*` method.
    pub fn new<F>(dst: F) -> PortComposer
    where
        F: Fn(u8) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<MaskedValue>();
        let closed = Arc::new(AtomicBool::new(false));
        let worker_closed = Arc::clone(&closed);

        let worker = thread::spawn(move || {
            let mut composed = 0u8;
            loop {
                if worker_closed.load(Ordering::Acquire) {
                    break;
                }
                match rx.recv_timeout(Duration::from_millis(50)) {
                    Ok(mv) => {
                        composed = (composed & !mv.mask) | (mv.value & mv.mask);
                        dst(composed);
                    }
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        PortComposer { tx, closed, worker: Some(worker) }
    }

    pub fn masked_send(&self, mask: u8) -> ComposerSender {
        ComposerSender { tx: self.tx.clone(), mask, closed: Arc::clone(&self.closed) }
    }

    /// Stop the background worker. Idempotent; no send accepted after
    /// this returns (SPEC_FULL.md §4.5's shutdown clause).
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PortComposer {
    fn drop(&mut self) {
        self.close();
    }
}
