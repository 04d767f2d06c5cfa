//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{GraphqlNotesClient, MountedReconciler, Reconciler, ReconcilerEvent};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

struct ActiveMount {
    mounted: MountedReconciler,
    forwarder: JoinHandle<()>,
}

impl ActiveMount {
    async fn release(self) {
        self.forwarder.abort();
        self.mounted.unmount().await;
    }
}

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let mut active: Option<ActiveMount> = None;
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::Connect { settings } => {
                        if let Some(previous) = active.take() {
                            previous.release().await;
                        }
                        let _ = ui_tx.try_send(UiEvent::Info(format!(
                            "Connecting to {}...",
                            settings.endpoint
                        )));
                        let client = match GraphqlNotesClient::new(&settings) {
                            Ok(client) => client,
                            Err(err) => {
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                    UiErrorContext::Connect,
                                    format!("{err:#}"),
                                )));
                                continue;
                            }
                        };
                        match Reconciler::mount(Arc::new(client)).await {
                            Ok(mounted) => {
                                let reconciler = mounted.reconciler().clone();
                                let forwarder = tokio::spawn(forward_changes(
                                    reconciler.changes(),
                                    ui_tx.clone(),
                                ));
                                let _ = ui_tx.try_send(UiEvent::Mounted(reconciler));
                                active = Some(ActiveMount { mounted, forwarder });
                            }
                            Err(err) => {
                                tracing::warn!("mount failed: {err:#}");
                                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                                    UiErrorContext::Connect,
                                    format!("{err:#}"),
                                )));
                            }
                        }
                    }
                    BackendCommand::Disconnect => {
                        if let Some(previous) = active.take() {
                            previous.release().await;
                        }
                        let _ = ui_tx.try_send(UiEvent::Unmounted);
                    }
                }
            }
            if let Some(previous) = active.take() {
                previous.release().await;
            }
        });
    });
}

async fn forward_changes(mut changes: broadcast::Receiver<ReconcilerEvent>, ui_tx: Sender<UiEvent>) {
    loop {
        let event = match changes.recv().await {
            Ok(ReconcilerEvent::StreamClosed(kind)) => UiEvent::StreamClosed(kind),
            Ok(_) | Err(RecvError::Lagged(_)) => UiEvent::NotesChanged,
            Err(RecvError::Closed) => break,
        };
        match ui_tx.try_send(event) {
            Ok(()) => {}
            // The UI re-reads the whole snapshot on the next change it does see.
            Err(TrySendError::Full(_)) => {
                tracing::debug!("ui event queue full; dropping notes change");
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
}
