//! Cooperative cancellation for in-flight network calls.
//!
//! A `CancelHandle` fires once; every cloned `CancelSignal` observes it. Calls
//! wrapped in [`CancelSignal::run`] are dropped mid-flight and surface as an
//! `AppError` of kind `Cancelled`.

use crate::error::{AppError, AppResult};
use std::future::Future;
use tokio::sync::watch;

#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Creates a connected handle/signal pair.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pending forever if the
    /// handle is dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Races `fut` against cancellation.
    pub async fn run<T, E, F>(&self, operation: &str, fut: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<AppError>,
    {
        if self.is_cancelled() {
            return Err(AppError::cancelled(operation));
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AppError::cancelled(operation)),
            result = fut => result.map_err(Into::into),
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
