//! In-memory note list plus the input-field selection, and the merge rules
//! that fold subscription events into them.

use std::collections::HashSet;

use shared::domain::{Note, NoteEvent, NoteId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    /// Submitting creates a new note.
    Composing,
    /// Submitting updates the note with this id.
    Editing(NoteId),
}

/// An outbound request the reconciler hands to the API client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRequest {
    Create { text: String },
    Update { id: NoteId, text: String },
    Delete { id: NoteId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Appended,
    Replaced,
    Removed,
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotesState {
    notes: Vec<Note>,
    draft: String,
    editing: Option<NoteId>,
}

impl NotesState {
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn editing_id(&self) -> Option<&NoteId> {
        self.editing.as_ref()
    }

    pub fn mode(&self) -> EditMode {
        match &self.editing {
            Some(id) => EditMode::Editing(id.clone()),
            None => EditMode::Composing,
        }
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: &NoteId) -> Option<usize> {
        self.notes.iter().position(|note| &note.id == id)
    }

    /// Replaces the list wholesale with a fetched page set. Later duplicates
    /// of an id are discarded so the list never holds an id twice.
    pub fn replace_all(&mut self, notes: Vec<Note>) {
        let mut seen = HashSet::with_capacity(notes.len());
        self.notes = notes
            .into_iter()
            .filter(|note| seen.insert(note.id.clone()))
            .collect();
    }

    pub fn apply(&mut self, event: NoteEvent) -> MergeOutcome {
        match event {
            NoteEvent::Created(note) => self.merge_created(note),
            NoteEvent::Updated(note) => self.merge_updated(note),
            NoteEvent::Deleted(note) => self.merge_deleted(&note.id),
        }
    }

    pub fn merge_created(&mut self, note: Note) -> MergeOutcome {
        self.notes.retain(|existing| existing.id != note.id);
        self.notes.push(note);
        self.draft.clear();
        MergeOutcome::Appended
    }

    pub fn merge_updated(&mut self, note: Note) -> MergeOutcome {
        self.draft.clear();
        self.editing = None;
        match self.position(&note.id) {
            Some(index) => {
                self.notes[index] = note;
                MergeOutcome::Replaced
            }
            None => MergeOutcome::Ignored,
        }
    }

    pub fn merge_deleted(&mut self, id: &NoteId) -> MergeOutcome {
        match self.position(id) {
            Some(index) => {
                self.notes.remove(index);
                MergeOutcome::Removed
            }
            None => MergeOutcome::Ignored,
        }
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn select_for_edit(&mut self, note: &Note) {
        self.draft = note.text.clone();
        self.editing = Some(note.id.clone());
    }

    /// Decides which mutation a submit issues. An editing id that is no
    /// longer in the list falls back to a create and drops the selection.
    pub fn plan_submit(&mut self, text: impl Into<String>) -> MutationRequest {
        let text = text.into();
        match &self.editing {
            Some(id) if self.contains(id) => MutationRequest::Update {
                id: id.clone(),
                text,
            },
            _ => {
                self.editing = None;
                MutationRequest::Create { text }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
