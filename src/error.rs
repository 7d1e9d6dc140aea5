//! # Error Handling
//!
//! Every fallible operation in the library returns [`FlyerResult`]. Errors are
//! grouped by what went wrong rather than by which module raised them, so a
//! caller can decide how to present them without matching on internals:
//!
//! - `Validation`: bad input rejected before any remote call (upload type,
//!   upload size, empty prompt, zero-sized canvas)
//! - `Gateway`: a transform request failed or returned no image
//! - `Decode` / `Encode`: local image codec failures
//! - `State`: the operation needs a source image or layer that is not there
//! - `Busy`: a request for the same layer is already in flight
//! - `Superseded`: the source image changed while the request was in flight
//! - `Config` / `Io`: setup and filesystem problems
//!
//! Each error carries an [`ErrorContext`] with the operation name, free-form
//! context and a short message fit for showing to the person using the tool.
//!
//! ```rust
//! use flyer_layers::error::{FlyerError, HasUserMessage};
//!
//! let error = FlyerError::gateway("extract person", "no image in response")
//!     .with_context("separating layers")
//!     .with_user_message("Failed to extract the person layer.");
//!
//! assert_eq!(error.category(), "gateway");
//! assert!(error.is_retryable());
//! assert_eq!(error.user_message(), "Failed to extract the person layer.");
//! ```

use std::collections::HashMap;

/// Metadata attached to every [`FlyerError`].
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed when the error occurred
    pub operation: Option<String>,
    /// Additional context about the error
    pub context: Option<String>,
    /// Message suitable for end users
    pub user_message: Option<String>,
    /// Additional metadata as key-value pairs
    pub metadata: HashMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Base error type for the flyer layer pipeline.
#[derive(Debug, thiserror::Error)]
pub enum FlyerError {
    #[error("Validation failed for '{field}': {constraint} (value: {value})")]
    Validation {
        field: String,
        constraint: String,
        value: String,
        context: ErrorContext,
    },

    #[error("Configuration error in '{field}': {reason} (value: {value})")]
    Config {
        field: String,
        value: String,
        reason: String,
        context: ErrorContext,
    },

    #[error("Transform request '{operation}' failed: {reason}")]
    Gateway {
        operation: String,
        reason: String,
        context: ErrorContext,
    },

    #[error("Could not decode {what}: {reason}")]
    Decode {
        what: String,
        reason: String,
        context: ErrorContext,
    },

    #[error("Could not encode {format}: {reason}")]
    Encode {
        format: String,
        reason: String,
        context: ErrorContext,
    },

    #[error("Cannot {attempted_operation}: {reason}")]
    State {
        attempted_operation: String,
        reason: String,
        context: ErrorContext,
    },

    #[error("Layer '{layer}' is busy: {status}")]
    Busy {
        layer: String,
        status: String,
        context: ErrorContext,
    },

    #[error("Result of '{operation}' discarded: the source image was replaced while it was in flight")]
    Superseded {
        operation: String,
        context: ErrorContext,
    },

    #[error("I/O error during {operation}{}: {source}", describe_path(.path))]
    Io {
        operation: String,
        path: Option<String>,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },
}

impl FlyerError {
    /// Create a validation error
    pub fn validation(
        field: impl Into<String>,
        constraint: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
            value: value.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a configuration error
    pub fn config(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Config {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a transform gateway error
    pub fn gateway(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Gateway {
            operation: operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn decode(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn encode(format: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Encode {
            format: format.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a state error
    pub fn state(attempted_operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::State {
            attempted_operation: attempted_operation.into(),
            reason: reason.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn busy(layer: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Busy {
            layer: layer.into(),
            status: status.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn superseded(operation: impl Into<String>) -> Self {
        Self::Superseded {
            operation: operation.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: None,
            source,
            context: ErrorContext::new(),
        }
    }

    /// Attach the path an I/O error happened on. No-op for other variants.
    pub fn with_path(mut self, new_path: impl Into<String>) -> Self {
        if let Self::Io { path, .. } = &mut self {
            *path = Some(new_path.into());
        }
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context_mut().context = Some(context.into());
        self
    }

    /// Add operation context
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Set the message shown to end users
    pub fn with_user_message(mut self, message: impl Into<String>) -> Self {
        self.context_mut().user_message = Some(message.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_mut().metadata.insert(key.into(), value.into());
        self
    }

    /// Get the error context
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::Validation { context, .. }
            | Self::Config { context, .. }
            | Self::Gateway { context, .. }
            | Self::Decode { context, .. }
            | Self::Encode { context, .. }
            | Self::State { context, .. }
            | Self::Busy { context, .. }
            | Self::Superseded { context, .. }
            | Self::Io { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::Validation { context, .. }
            | Self::Config { context, .. }
            | Self::Gateway { context, .. }
            | Self::Decode { context, .. }
            | Self::Encode { context, .. }
            | Self::State { context, .. }
            | Self::Busy { context, .. }
            | Self::Superseded { context, .. }
            | Self::Io { context, .. } => context,
        }
    }

    /// Get the error category as a string
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Config { .. } => "config",
            Self::Gateway { .. } => "gateway",
            Self::Decode { .. } => "decode",
            Self::Encode { .. } => "encode",
            Self::State { .. } => "state",
            Self::Busy { .. } => "busy",
            Self::Superseded { .. } => "superseded",
            Self::Io { .. } => "io",
        }
    }

    /// Whether the user can usefully trigger the same operation again.
    ///
    /// Nothing in the library retries on its own; this only drives whether a
    /// front end offers a retry affordance.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway { .. } | Self::Superseded { .. } | Self::Busy { .. } | Self::Io { .. }
        )
    }
}

fn describe_path(path: &Option<String>) -> String {
    path.as_deref()
        .map(|p| format!(" on '{p}'"))
        .unwrap_or_default()
}

/// Result type alias using our custom error type
pub type FlyerResult<T> = Result<T, FlyerError>;

/// Errors that can be shown to an end user as a single sentence.
pub trait HasUserMessage {
    fn user_message(&self) -> String;
}

impl HasUserMessage for FlyerError {
    fn user_message(&self) -> String {
        self.context()
            .user_message
            .clone()
            .unwrap_or_else(|| self.to_string())
    }
}

impl From<std::io::Error> for FlyerError {
    fn from(error: std::io::Error) -> Self {
        Self::io("unknown", error)
    }
}

impl From<serde_json::Error> for FlyerError {
    fn from(error: serde_json::Error) -> Self {
        Self::decode("JSON", error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = FlyerError::validation("upload.media_type", "must be JPEG or PNG", "image/gif");
        assert_eq!(error.category(), "validation");
        assert!(!error.is_retryable());
        assert_eq!(
            error.to_string(),
            "Validation failed for 'upload.media_type': must be JPEG or PNG (value: image/gif)"
        );
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let error = FlyerError::state("enhance layer", "no person layer is present");
        assert_eq!(error.user_message(), "Cannot enhance layer: no person layer is present");

        let error = error.with_user_message("Nothing to enhance yet.");
        assert_eq!(error.user_message(), "Nothing to enhance yet.");
    }

    #[test]
    fn test_io_error_mentions_path() {
        let error = FlyerError::io(
            "read upload",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        )
        .with_path("flyer.png");
        assert_eq!(error.to_string(), "I/O error during read upload on 'flyer.png': missing");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_context_builders() {
        let error = FlyerError::gateway("restore", "timeout")
            .with_operation("restore quality")
            .with_context("after upload")
            .with_metadata("layer", "background");
        let ctx = error.context();
        assert_eq!(ctx.operation.as_deref(), Some("restore quality"));
        assert_eq!(ctx.context.as_deref(), Some("after upload"));
        assert_eq!(ctx.metadata.get("layer").map(String::as_str), Some("background"));
        assert!(error.is_retryable());
    }
}
