//! Inbound channel of decoded QR text events.
//!
//! The camera/decoding engine is opaque to the session core: it emits zero
//! or more decoded-text events while active and stops emitting after a stop
//! call. Anything able to feed the channel can act as the engine; the
//! binary ships a line-reader source for playing and debugging without a
//! camera.

use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing::{debug, warn};

/// Handle used to tell the active code source to stop emitting.
#[derive(Debug, Clone)]
pub struct ScannerHandle {
    stop: watch::Sender<bool>,
}

impl ScannerHandle {
    /// Wrap a stop signal sender.
    pub fn new(stop: watch::Sender<bool>) -> Self {
        Self { stop }
    }

    /// Signal the source to stop capturing.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// Spawn a source treating every non-empty stdin line as one decoded code.
///
/// Holding a code in front of a real camera produces the same text many
/// times over; repeating a line here is equivalent, and the scan gate
/// downstream deals with it either way.
pub fn stdin_source() -> (ScannerHandle, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (stop_tx, mut stop_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        debug!("decoder stopped");
                        break;
                    }
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let code = line.trim();
                        if code.is_empty() {
                            continue;
                        }
                        debug!(%code, "decoded code event");
                        if tx.send(code.to_owned()).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("decoder input ended");
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to read decoded input");
                        break;
                    }
                },
            }
        }
    });

    (ScannerHandle::new(stop_tx), rx)
}
