//! Progress and log sink for analysis runs
//!
//! Work happens on a background worker; the front-end only ever sees progress
//! percentages and log lines. Both travel over bounded channels written with
//! `try_send`, so a slow front-end drops updates instead of stalling the run.
//! Every log line is also mirrored to the `log` facade.

use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};

/// Default capacity of each channel.
pub const CHANNEL_CAPACITY: usize = 256;

/// Sends progress and log lines to whoever is listening.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    progress: Option<Sender<u8>>,
    logs: Option<Sender<String>>,
}

/// The front-end half of a [`Reporter::channel`].
#[derive(Debug)]
pub struct ProgressReceivers {
    pub progress: Receiver<u8>,
    pub logs: Receiver<String>,
}

impl Reporter {
    /// A reporter that only writes to the `log` facade (tests, headless runs).
    pub fn quiet() -> Self {
        Self::default()
    }

    /// A reporter connected to a pair of bounded channels.
    pub fn channel(capacity: usize) -> (Self, ProgressReceivers) {
        let (progress_tx, progress_rx) = mpsc::channel(capacity.max(1));
        let (log_tx, log_rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                progress: Some(progress_tx),
                logs: Some(log_tx),
            },
            ProgressReceivers {
                progress: progress_rx,
                logs: log_rx,
            },
        )
    }

    /// Report a completion percentage; values are clamped to `[0, 100]`.
    pub fn progress(&self, percent: f64) {
        let value = if percent.is_nan() {
            0
        } else {
            percent.clamp(0.0, 100.0).round() as u8
        };
        if let Some(tx) = &self.progress {
            offer(tx, value);
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.send_log(message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.send_log(message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}", message);
        self.send_log(message);
    }

    fn send_log(&self, message: String) {
        if let Some(tx) = &self.logs {
            offer(tx, message);
        }
    }
}

/// Non-blocking send: full or closed channels drop the value.
fn offer<T>(tx: &Sender<T>, value: T) {
    match tx.try_send(value) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => log::trace!("progress channel full, update dropped"),
        Err(TrySendError::Closed(_)) => {}
    }
}
