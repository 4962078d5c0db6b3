use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Environment events that may make cached data stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleSignal {
    FocusRegained,
    ConnectivityLost,
    ConnectivityRestored,
}

pub type LifecycleSignalSender = mpsc::Sender<LifecycleSignal>;
pub type LifecycleSignalReceiver = mpsc::Receiver<LifecycleSignal>;
