//! Single-slot cancellation signal for actions that supervise one
//! long-running subprocess.
//!
//! The slot is created with the action, before any run starts, so a
//! cancellation that arrives before `run` is still observed. Requests never
//! block and never fail; at most one is pending at a time.

use tokio::sync::{mpsc, Mutex};

pub struct CancelSlot {
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
}

impl CancelSlot {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Queue a cancellation. Returns false when one was already pending.
    pub fn request(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }

    /// Resolves once a cancellation is pending, consuming it.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves any
    /// pending request in the slot.
    pub async fn requested(&self) {
        let mut rx = self.rx.lock().await;
        // The slot owns a sender, so the channel never closes.
        let _ = rx.recv().await;
    }

    /// Whether a request is pending, without consuming it.
    pub fn is_pending(&self) -> bool {
        self.tx.capacity() == 0
    }
}

impl Default for CancelSlot {
    fn default() -> Self {
        Self::new()
    }
}
