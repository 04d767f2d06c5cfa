use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(NoteId);

/// A server-identified text record. The id is assigned by the backend and
/// never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(rename = "note")]
    pub text: String,
}

impl Note {
    pub fn new(id: impl Into<NoteId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteEventKind {
    Created,
    Updated,
    Deleted,
}

impl NoteEventKind {
    pub const ALL: [NoteEventKind; 3] = [Self::Created, Self::Updated, Self::Deleted];
}

/// One server-side change delivered over a subscription stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "note", rename_all = "snake_case")]
pub enum NoteEvent {
    Created(Note),
    Updated(Note),
    Deleted(Note),
}

impl NoteEvent {
    pub fn new(kind: NoteEventKind, note: Note) -> Self {
        match kind {
            NoteEventKind::Created => Self::Created(note),
            NoteEventKind::Updated => Self::Updated(note),
            NoteEventKind::Deleted => Self::Deleted(note),
        }
    }

    pub fn kind(&self) -> NoteEventKind {
        match self {
            Self::Created(_) => NoteEventKind::Created,
            Self::Updated(_) => NoteEventKind::Updated,
            Self::Deleted(_) => NoteEventKind::Deleted,
        }
    }

    pub fn note(&self) -> &Note {
        match self {
            Self::Created(note) | Self::Updated(note) | Self::Deleted(note) => note,
        }
    }
}
