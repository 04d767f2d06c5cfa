use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    ConditionalCheck,
    Internal,
}

impl ErrorCode {
    /// Maps the backend's `errorType` extension onto a coarse code.
    pub fn from_error_type(error_type: Option<&str>) -> Self {
        let Some(error_type) = error_type else {
            return Self::Internal;
        };
        let lower = error_type.to_ascii_lowercase();
        if lower.contains("unauthorized") || lower.contains("forbidden") {
            Self::Unauthorized
        } else if lower.contains("conditionalcheck") {
            Self::ConditionalCheck
        } else if lower.contains("notfound") {
            Self::NotFound
        } else if lower.contains("validation") || lower.contains("badrequest") {
            Self::Validation
        } else {
            Self::Internal
        }
    }
}

/// One entry of a GraphQL response's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlErrorEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
    #[serde(default, rename = "errorType", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl GraphqlErrorEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
            error_type: None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::from_error_type(self.error_type.as_deref())
    }
}

#[derive(Debug, Clone, Error)]
pub struct ApiException {
    pub errors: Vec<GraphqlErrorEntry>,
}

impl ApiException {
    pub fn new(errors: Vec<GraphqlErrorEntry>) -> Self {
        Self { errors }
    }

    pub fn code(&self) -> ErrorCode {
        self.errors
            .first()
            .map(GraphqlErrorEntry::code)
            .unwrap_or(ErrorCode::Internal)
    }
}

impl fmt::Display for ApiException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: ", self.code())?;
        for (index, entry) in self.errors.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            f.write_str(&entry.message)?;
        }
        Ok(())
    }
}
