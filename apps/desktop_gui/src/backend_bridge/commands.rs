//! Backend commands queued from UI to backend worker.

use client_core::ClientSettings;

pub enum BackendCommand {
    /// Mount a reconciler against the given backend, replacing any current one.
    Connect { settings: ClientSettings },
    /// Unmount the current reconciler and release its subscriptions.
    Disconnect,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect => "disconnect",
        }
    }
}
