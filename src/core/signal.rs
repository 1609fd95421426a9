//! Interrupt source - operator signals delivered to a running pipeline

use super::error::Signal;
use std::io;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Receiving end of the interrupt notifications for one run
pub struct Interrupts {
    rx: mpsc::UnboundedReceiver<Signal>,
    listener: Option<JoinHandle<()>>,
}

impl Interrupts {
    /// Manually driven interrupts; the sender delivers signals
    pub fn channel() -> (mpsc::UnboundedSender<Signal>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx, listener: None })
    }

    /// Listen for Ctrl-C, plus SIGTERM on Unix. Must be called inside a tokio runtime.
    pub fn os() -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        // Handlers are installed here, before the listener is first polled,
        // so a signal arriving in between is queued instead of killing us.
        #[cfg(unix)]
        let (mut interrupt, mut terminate) = {
            use tokio::signal::unix::{signal, SignalKind};
            (
                signal(SignalKind::interrupt())?,
                signal(SignalKind::terminate())?,
            )
        };

        #[cfg(windows)]
        let mut interrupt = tokio::signal::windows::ctrl_c()?;

        let listener = tokio::spawn(async move {
            #[cfg(unix)]
            let received = tokio::select! {
                res = interrupt.recv() => res.map(|_| Signal::Interrupt),
                res = terminate.recv() => res.map(|_| Signal::Terminate),
            };

            #[cfg(windows)]
            let received = interrupt.recv().await.map(|_| Signal::Interrupt);

            match received {
                Some(sig) => {
                    log::debug!("Caught signal: {}", sig);
                    let _ = tx.send(sig);
                }
                None => log::warn!("Interrupt signal stream closed"),
            }
        });

        Ok(Self {
            rx,
            listener: Some(listener),
        })
    }

    /// Wait for the next signal. Returns `None` once no sender remains.
    pub async fn recv(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }

    /// Stop listening; later signals are never observed
    pub fn disarm(mut self) {
        self.rx.close();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
