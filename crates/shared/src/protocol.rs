use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Note, NoteEventKind, NoteId},
    error::GraphqlErrorEntry,
};

/// WebSocket subprotocol spoken on the realtime endpoint.
pub const GRAPHQL_WS_SUBPROTOCOL: &str = "graphql-transport-ws";

const NOTE_FIELDS: &str = "id note";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteOperation {
    ListNotes,
    CreateNote,
    UpdateNote,
    DeleteNote,
    OnCreateNote,
    OnUpdateNote,
    OnDeleteNote,
}

impl NoteOperation {
    pub fn subscription(kind: NoteEventKind) -> Self {
        match kind {
            NoteEventKind::Created => Self::OnCreateNote,
            NoteEventKind::Updated => Self::OnUpdateNote,
            NoteEventKind::Deleted => Self::OnDeleteNote,
        }
    }

    pub fn operation_name(self) -> &'static str {
        match self {
            Self::ListNotes => "ListNotes",
            Self::CreateNote => "CreateNote",
            Self::UpdateNote => "UpdateNote",
            Self::DeleteNote => "DeleteNote",
            Self::OnCreateNote => "OnCreateNote",
            Self::OnUpdateNote => "OnUpdateNote",
            Self::OnDeleteNote => "OnDeleteNote",
        }
    }

    /// Name of the single root field each document selects.
    pub fn root_field(self) -> &'static str {
        match self {
            Self::ListNotes => "listNotes",
            Self::CreateNote => "createNote",
            Self::UpdateNote => "updateNote",
            Self::DeleteNote => "deleteNote",
            Self::OnCreateNote => "onCreateNote",
            Self::OnUpdateNote => "onUpdateNote",
            Self::OnDeleteNote => "onDeleteNote",
        }
    }

    pub fn document(self) -> String {
        let name = self.operation_name();
        let field = self.root_field();
        match self {
            Self::ListNotes => format!(
                "query {name}($limit: Int, $nextToken: String) {{ {field}(limit: $limit, nextToken: $nextToken) {{ items {{ {NOTE_FIELDS} }} nextToken }} }}"
            ),
            Self::CreateNote => format!(
                "mutation {name}($input: CreateNoteInput!) {{ {field}(input: $input) {{ {NOTE_FIELDS} }} }}"
            ),
            Self::UpdateNote => format!(
                "mutation {name}($input: UpdateNoteInput!) {{ {field}(input: $input) {{ {NOTE_FIELDS} }} }}"
            ),
            Self::DeleteNote => format!(
                "mutation {name}($input: DeleteNoteInput!) {{ {field}(input: $input) {{ {NOTE_FIELDS} }} }}"
            ),
            Self::OnCreateNote | Self::OnUpdateNote | Self::OnDeleteNote => {
                format!("subscription {name} {{ {field} {{ {NOTE_FIELDS} }} }}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Value,
}

impl GraphqlRequest {
    pub fn new(operation: NoteOperation, variables: Value) -> Self {
        Self {
            query: operation.document(),
            operation_name: Some(operation.operation_name().to_string()),
            variables,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlResponse<T = Value> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphqlErrorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteInput {
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNoteInput {
    pub id: NoteId,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteNoteInput {
    pub id: NoteId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationVariables<I> {
    pub input: I,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotesVariables {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// One page of `listNotes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteConnection {
    #[serde(default)]
    pub items: Vec<Note>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Messages a client sends on a `graphql-transport-ws` socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Subscribe {
        id: String,
        payload: GraphqlRequest,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
}

/// Messages a server sends on a `graphql-transport-ws` socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    ConnectionAck {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Next {
        id: String,
        payload: GraphqlResponse,
    },
    Error {
        id: String,
        payload: Vec<GraphqlErrorEntry>,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
}
