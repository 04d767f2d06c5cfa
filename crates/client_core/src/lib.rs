use std::{
    pin::Pin,
    task::{Context, Poll},
};

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use shared::domain::{Note, NoteEventKind, NoteId};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;

pub mod error;
pub mod graphql_client;
pub mod reconciler;
pub mod settings;
pub mod state;
pub mod transport;

pub use graphql_client::GraphqlNotesClient;
pub use reconciler::{MountedReconciler, PendingMutation, Reconciler, ReconcilerEvent};
pub use settings::{load_settings, ClientSettings};
pub use state::{EditMode, MergeOutcome, MutationRequest, NotesState};

/// The six operations the notes backend exposes.
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn fetch_all_notes(&self) -> Result<Vec<Note>>;
    async fn create_note(&self, text: &str) -> Result<Note>;
    async fn update_note(&self, id: &NoteId, text: &str) -> Result<Note>;
    async fn delete_note(&self, id: &NoteId) -> Result<Note>;
    async fn subscribe(&self, kind: NoteEventKind) -> Result<NoteSubscription>;

    async fn subscribe_created(&self) -> Result<NoteSubscription> {
        self.subscribe(NoteEventKind::Created).await
    }

    async fn subscribe_updated(&self) -> Result<NoteSubscription> {
        self.subscribe(NoteEventKind::Updated).await
    }

    async fn subscribe_deleted(&self) -> Result<NoteSubscription> {
        self.subscribe(NoteEventKind::Deleted).await
    }
}

/// A live push stream of notes for one event kind.
///
/// Dropping the subscription signals its producer to unsubscribe; the
/// producer owns whatever connection backs the stream and releases it once
/// the signal fires.
pub struct NoteSubscription {
    kind: NoteEventKind,
    items: UnboundedReceiverStream<Result<Note>>,
    cancel: Option<oneshot::Sender<()>>,
}

impl NoteSubscription {
    pub fn new(
        kind: NoteEventKind,
        items: mpsc::UnboundedReceiver<Result<Note>>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            kind,
            items: UnboundedReceiverStream::new(items),
            cancel: Some(cancel),
        }
    }

    pub fn kind(&self) -> NoteEventKind {
        self.kind
    }
}

impl Stream for NoteSubscription {
    type Item = Result<Note>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.items).poll_next(cx)
    }
}

impl Drop for NoteSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

impl std::fmt::Debug for NoteSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteSubscription")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
