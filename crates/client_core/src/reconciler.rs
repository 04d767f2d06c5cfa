//! Owns the note list for the lifetime of a mounted view and keeps it in step
//! with the backend's created/updated/deleted subscriptions.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use futures::{future, stream, StreamExt};
use shared::domain::{Note, NoteEvent, NoteEventKind, NoteId};
use tokio::{runtime::Handle, sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    state::{MergeOutcome, MutationRequest, NotesState},
    NoteSubscription, NotesApi,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilerEvent {
    Loaded { count: usize },
    Merged(NoteEvent),
    StreamClosed(NoteEventKind),
}

/// Cheap-to-clone handle onto the reconciled state. Intents may be issued
/// from any thread; mutations run on the runtime the reconciler was mounted on.
#[derive(Clone)]
pub struct Reconciler {
    api: Arc<dyn NotesApi>,
    state: Arc<Mutex<NotesState>>,
    events: broadcast::Sender<ReconcilerEvent>,
    runtime: Handle,
}

/// A mutation that has been handed to the API client. Dropping it does not
/// cancel the request.
pub struct PendingMutation {
    request: MutationRequest,
    task: JoinHandle<()>,
}

impl PendingMutation {
    pub fn request(&self) -> &MutationRequest {
        &self.request
    }

    /// Waits until the request has resolved, successfully or not.
    pub async fn settled(self) {
        let _ = self.task.await;
    }
}

impl Reconciler {
    /// Subscribes to all three event streams, loads the current notes, and
    /// starts merging events. Any failure releases the subscriptions already
    /// acquired before returning.
    pub async fn mount(api: Arc<dyn NotesApi>) -> Result<MountedReconciler> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let reconciler = Self {
            api,
            state: Arc::new(Mutex::new(NotesState::default())),
            events,
            runtime: Handle::current(),
        };

        let mut subscriptions = Vec::with_capacity(NoteEventKind::ALL.len());
        for kind in NoteEventKind::ALL {
            let subscription = reconciler
                .api
                .subscribe(kind)
                .await
                .with_context(|| format!("failed to subscribe to {kind:?} notes"))?;
            subscriptions.push(subscription);
        }

        let notes = reconciler
            .api
            .fetch_all_notes()
            .await
            .context("failed to fetch notes")?;
        let count = notes.len();
        reconciler.lock_state().replace_all(notes);
        info!(count, "notes: loaded");
        let _ = reconciler.events.send(ReconcilerEvent::Loaded { count });

        let pump = reconciler
            .runtime
            .spawn(pump_events(reconciler.clone(), subscriptions));

        Ok(MountedReconciler {
            reconciler,
            pump: Some(pump),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, NotesState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> NotesState {
        self.lock_state().clone()
    }

    pub fn changes(&self) -> broadcast::Receiver<ReconcilerEvent> {
        self.events.subscribe()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        self.lock_state().set_draft(text);
    }

    pub fn select_for_edit(&self, note: &Note) {
        self.lock_state().select_for_edit(note);
    }

    /// Issues an update when a still-present note is being edited, a create
    /// otherwise. The list itself only changes once the echoed event arrives.
    pub fn submit(&self, text: impl Into<String>) -> PendingMutation {
        let request = self.lock_state().plan_submit(text);
        self.dispatch(request)
    }

    pub fn submit_draft(&self) -> PendingMutation {
        let request = {
            let mut state = self.lock_state();
            let draft = state.draft().to_string();
            state.plan_submit(draft)
        };
        self.dispatch(request)
    }

    pub fn remove(&self, id: NoteId) -> PendingMutation {
        self.dispatch(MutationRequest::Delete { id })
    }

    pub fn on_create_event(&self, note: Note) -> MergeOutcome {
        self.apply_event(NoteEvent::Created(note))
    }

    pub fn on_update_event(&self, note: Note) -> MergeOutcome {
        self.apply_event(NoteEvent::Updated(note))
    }

    pub fn on_delete_event(&self, note: Note) -> MergeOutcome {
        self.apply_event(NoteEvent::Deleted(note))
    }

    pub fn apply_event(&self, event: NoteEvent) -> MergeOutcome {
        let outcome = self.lock_state().apply(event.clone());
        let kind = event.kind();
        let note_id = &event.note().id;
        if outcome == MergeOutcome::Ignored {
            // Update/delete for an id we do not hold; dropped, never queued.
            debug!(?kind, %note_id, "notes: event for unknown note dropped");
        } else {
            debug!(?kind, %note_id, ?outcome, "notes: merged event");
        }
        let _ = self.events.send(ReconcilerEvent::Merged(event));
        outcome
    }

    fn dispatch(&self, request: MutationRequest) -> PendingMutation {
        let api = Arc::clone(&self.api);
        let task = self.runtime.spawn({
            let request = request.clone();
            async move {
                let result = match &request {
                    MutationRequest::Create { text } => api.create_note(text).await,
                    MutationRequest::Update { id, text } => api.update_note(id, text).await,
                    MutationRequest::Delete { id } => api.delete_note(id).await,
                };
                match result {
                    Ok(note) => debug!(note_id = %note.id, "notes: mutation acknowledged"),
                    Err(err) => warn!(?request, "notes: mutation failed: {err:#}"),
                }
            }
        });
        PendingMutation { request, task }
    }
}

async fn pump_events(reconciler: Reconciler, subscriptions: Vec<NoteSubscription>) {
    let mut merged = stream::select_all(subscriptions.into_iter().map(|subscription| {
        let kind = subscription.kind();
        subscription
            .map(move |item| (kind, Some(item)))
            .chain(stream::once(future::ready((kind, None))))
            .boxed()
    }));

    while let Some((kind, item)) = merged.next().await {
        match item {
            Some(Ok(note)) => {
                reconciler.apply_event(NoteEvent::new(kind, note));
            }
            Some(Err(err)) => warn!(?kind, "notes: subscription delivery failed: {err:#}"),
            None => {
                warn!(?kind, "notes: subscription stream closed");
                let _ = reconciler.events.send(ReconcilerEvent::StreamClosed(kind));
            }
        }
    }
}

/// A reconciler together with the task that holds its subscriptions.
/// Unmounting, or dropping, releases all three subscriptions.
pub struct MountedReconciler {
    reconciler: Reconciler,
    pump: Option<JoinHandle<()>>,
}

impl MountedReconciler {
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Releases the subscriptions and waits until they have been dropped.
    pub async fn unmount(mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            let _ = pump.await;
        }
        info!("notes: unmounted");
    }
}

impl Drop for MountedReconciler {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
