use shared::error::ApiException;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphqlError {
    #[error("graphql endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("graphql request failed: {0}")]
    Api(#[from] ApiException),
    #[error("graphql response for {operation} is missing `{field}`")]
    MissingData {
        operation: &'static str,
        field: &'static str,
    },
    #[error("graphql payload for {operation} could not be decoded: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("realtime protocol violation: {0}")]
    Protocol(String),
    #[error("realtime socket closed before the subscription completed")]
    SocketClosed,
}
