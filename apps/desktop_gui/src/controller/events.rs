//! UI/backend events and error modeling for desktop GUI controller.

use client_core::Reconciler;
use shared::domain::NoteEventKind;

pub enum UiEvent {
    /// A reconciler is mounted; the UI reads snapshots and sends intents through it.
    Mounted(Reconciler),
    Unmounted,
    NotesChanged,
    StreamClosed(NoteEventKind),
    Info(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Connect,
}

pub fn classify_connect_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("backend worker startup failure")
        || lower.contains("failed to build runtime")
    {
        "Backend worker startup failure; verify local app environment and retry.".to_string()
    } else if lower.contains("error sending request")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Backend unreachable; check the endpoint URL/network and retry.".to_string()
    } else {
        format!("Connect/API error: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("401")
            || message_lower.contains("403")
            || message_lower.contains("unauthorized")
            || message_lower.contains("forbidden")
            || message_lower.contains("invalid token")
            || message_lower.contains("api key")
        {
            UiErrorCategory::Auth
        } else {
            UiErrorCategory::Other
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn requires_reconnect(&self) -> bool {
        self.category == UiErrorCategory::Auth || self.context != UiErrorContext::BackendStartup
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_startup_failure_keeps_current_screen() {
        let err = UiError::from_message(
            UiErrorContext::BackendStartup,
            "backend worker startup failure: failed to build runtime: no threads",
        );
        assert_eq!(err.category(), UiErrorCategory::Other);
        assert!(!err.requires_reconnect());
    }

    #[test]
    fn unauthorized_status_requires_reconnect() {
        let err = UiError::from_message(
            UiErrorContext::BackendStartup,
            "failed to fetch notes: graphql endpoint returned HTTP 401: Unauthorized",
        );
        assert_eq!(err.category(), UiErrorCategory::Auth);
        assert!(err.requires_reconnect());
    }

    #[test]
    fn connect_failures_are_summarized() {
        assert_eq!(
            classify_connect_failure("error sending request for url (http://127.0.0.1:1/graphql)"),
            "Backend unreachable; check the endpoint URL/network and retry."
        );
        assert_eq!(
            classify_connect_failure("Validation: note must not be empty"),
            "Connect/API error: Validation: note must not be empty"
        );
    }
}
