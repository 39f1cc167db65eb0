//! # Fatal-error signal
//!
//! Integrity failures (store corruption, a backend that stops
//! answering) are the one class of error the state machine must not
//! shrug off: any loop that hits one reports it here, and `main` races
//! this channel against `ctrl_c` to begin the same shutdown sequence
//! either way.

use tokio::sync::mpsc;

#[derive(Clone)]
pub struct FatalHandle(mpsc::Sender<String>);

impl FatalHandle {
    pub fn report(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(%reason, "fatal integrity failure, initiating shutdown");
        let _ = self.0.try_send(reason);
    }
}

pub fn channel() -> (FatalHandle, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(1);
    (FatalHandle(tx), rx)
}
