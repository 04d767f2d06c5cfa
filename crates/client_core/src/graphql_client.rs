use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{
    domain::{Note, NoteEventKind, NoteId},
    error::ApiException,
    protocol::{
        CreateNoteInput, DeleteNoteInput, GraphqlRequest, GraphqlResponse, ListNotesVariables,
        MutationVariables, NoteConnection, NoteOperation, UpdateNoteInput,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    error::GraphqlError,
    settings::ClientSettings,
    transport::{self, Credentials},
    NoteSubscription, NotesApi,
};

/// Pulls the operation's root field out of a response, failing on any
/// reported GraphQL error or a null/missing field.
pub(crate) fn decode_root_field<T: DeserializeOwned>(
    response: GraphqlResponse,
    operation: NoteOperation,
) -> Result<T, GraphqlError> {
    if !response.errors.is_empty() {
        return Err(ApiException::new(response.errors).into());
    }
    let field = operation.root_field();
    let value = response
        .data
        .and_then(|mut data| data.get_mut(field).map(Value::take))
        .filter(|value| !value.is_null())
        .ok_or(GraphqlError::MissingData {
            operation: operation.operation_name(),
            field,
        })?;
    serde_json::from_value(value).map_err(|source| GraphqlError::Decode {
        operation: operation.operation_name(),
        source,
    })
}

#[derive(Clone)]
pub struct GraphqlNotesClient {
    http: Client,
    endpoint: Url,
    realtime_endpoint: Url,
    credentials: Credentials,
    page_size: u32,
}

impl GraphqlNotesClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let endpoint = Url::parse(&settings.endpoint)
            .with_context(|| format!("invalid graphql endpoint: {}", settings.endpoint))?;
        let realtime_endpoint = match &settings.realtime_endpoint {
            Some(raw) => {
                Url::parse(raw).with_context(|| format!("invalid realtime endpoint: {raw}"))?
            }
            None => transport::realtime_url(&settings.endpoint)?,
        };
        Ok(Self {
            http: Client::new(),
            endpoint,
            realtime_endpoint,
            credentials: Credentials {
                api_key: settings.api_key.clone(),
                auth_token: settings.auth_token.clone(),
            },
            page_size: settings.page_size.max(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn realtime_endpoint(&self) -> &Url {
        &self.realtime_endpoint
    }

    async fn execute<V, T>(&self, operation: NoteOperation, variables: V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let name = operation.operation_name();
        let request = GraphqlRequest::new(operation, serde_json::to_value(variables)?);
        let mut builder = self.http.post(self.endpoint.clone()).json(&request);
        for (header, value) in self.credentials.headers() {
            builder = builder.header(header, value);
        }
        let res = builder
            .send()
            .await
            .with_context(|| format!("failed to send {name} request"))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GraphqlError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        let response: GraphqlResponse = res
            .json()
            .await
            .with_context(|| format!("invalid {name} response body"))?;
        Ok(decode_root_field(response, operation)?)
    }
}

#[async_trait]
impl NotesApi for GraphqlNotesClient {
    async fn fetch_all_notes(&self) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        let mut next_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;
        loop {
            let variables = ListNotesVariables {
                limit: Some(self.page_size),
                next_token: next_token.clone(),
            };
            let page: NoteConnection = self.execute(NoteOperation::ListNotes, variables).await?;
            pages += 1;
            notes.extend(page.items);
            match page.next_token.filter(|token| !token.is_empty()) {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    return Err(GraphqlError::Protocol(format!(
                        "listNotes repeated pagination token after {pages} pages"
                    ))
                    .into());
                }
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        debug!(pages, count = notes.len(), "graphql: fetched notes");
        Ok(notes)
    }

    async fn create_note(&self, text: &str) -> Result<Note> {
        let variables = MutationVariables {
            input: CreateNoteInput {
                note: text.to_string(),
            },
        };
        self.execute(NoteOperation::CreateNote, variables).await
    }

    async fn update_note(&self, id: &NoteId, text: &str) -> Result<Note> {
        let variables = MutationVariables {
            input: UpdateNoteInput {
                id: id.clone(),
                note: text.to_string(),
            },
        };
        self.execute(NoteOperation::UpdateNote, variables).await
    }

    async fn delete_note(&self, id: &NoteId) -> Result<Note> {
        let variables = MutationVariables {
            input: DeleteNoteInput { id: id.clone() },
        };
        self.execute(NoteOperation::DeleteNote, variables).await
    }

    async fn subscribe(&self, kind: NoteEventKind) -> Result<NoteSubscription> {
        transport::open_subscription(&self.realtime_endpoint, &self.credentials, kind).await
    }
}

#[cfg(test)]
#[path = "tests/graphql_client_tests.rs"]
mod tests;
