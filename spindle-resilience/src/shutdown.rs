//! Cooperative shutdown signalling
//!
//! A [`ShutdownCoordinator`] publishes a single escalating signal that any
//! number of [`ShutdownListener`]s observe. Signals only ever escalate:
//! once `Urgent` has been raised a later `Graceful` request is ignored.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Shutdown signal types with escalating urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownSignal {
    /// Stop accepting work, finish everything already accepted
    Graceful,
    /// Stop accepting work, abandon anything not yet started
    Urgent,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Graceful => write!(f, "graceful"),
            ShutdownSignal::Urgent => write!(f, "urgent"),
        }
    }
}

/// Owner of the shutdown signal
#[derive(Debug)]
pub struct ShutdownCoordinator {
    sender: watch::Sender<Option<ShutdownSignal>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Subscribe to shutdown signals
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Raise `signal`, returning whether the observed signal changed
    pub fn signal(&self, signal: ShutdownSignal) -> bool {
        let escalated = self.sender.send_if_modified(|current| match *current {
            Some(existing) if existing >= signal => false,
            _ => {
                *current = Some(signal);
                true
            }
        });

        if escalated {
            match signal {
                ShutdownSignal::Graceful => info!("Shutdown requested ({})", signal),
                ShutdownSignal::Urgent => warn!("Shutdown requested ({})", signal),
            }
        } else {
            debug!("Ignoring {} shutdown request; already {:?}", signal, self.current());
        }

        escalated
    }

    /// The strongest signal raised so far
    pub fn current(&self) -> Option<ShutdownSignal> {
        *self.sender.borrow()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.current().is_some()
    }

    pub fn is_urgent(&self) -> bool {
        self.current() == Some(ShutdownSignal::Urgent)
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a [`ShutdownCoordinator`]
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<Option<ShutdownSignal>>,
}

impl ShutdownListener {
    pub fn current(&self) -> Option<ShutdownSignal> {
        *self.receiver.borrow()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.current().is_some()
    }

    pub fn is_urgent(&self) -> bool {
        self.current() == Some(ShutdownSignal::Urgent)
    }

    /// Wait until an urgent shutdown has been raised
    ///
    /// Pends forever if the coordinator is dropped without escalating.
    pub async fn urgent(&mut self) {
        let raised = self
            .receiver
            .wait_for(|signal| *signal == Some(ShutdownSignal::Urgent))
            .await
            .is_ok();
        if !raised {
            std::future::pending::<()>().await;
        }
    }
}
