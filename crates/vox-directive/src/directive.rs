//! The directive value type.
//!
//! A [`Directive`] is an immutable command delivered by the cloud. It
//! is parsed upstream of this SDK; the pipeline only reads the header
//! fields for routing and correlation, and hands the payload through
//! to the handler untouched.
//!
//! # Anatomy
//!
//! ```text
//! Directive
//! ├── header
//! │   ├── key                (namespace, name)  → handler selection
//! │   ├── message_id         globally unique    → cancellation handle
//! │   └── dialog_request_id  possibly empty     → turn correlation
//! ├── payload                opaque JSON        → handed to handler
//! └── unparsed               raw wire text      → exception reports
//! ```
//!
//! # Dialog Correlation
//!
//! Directives produced in response to a user turn carry the turn's
//! `dialog_request_id`. An empty id means the directive stands outside
//! any dialog (proactive cloud pushes, settings changes). The dispatch
//! layer serializes same-dialog directives and cancels stale ones when
//! the active dialog moves on.
//!
//! # Example
//!
//! ```
//! use vox_directive::Directive;
//! use serde_json::json;
//!
//! let directive = Directive::builder("SpeechSynthesizer", "Speak")
//!     .message_id("msg-1")
//!     .dialog_request_id("dialog-1")
//!     .payload(json!({ "url": "cid:audio-1" }))
//!     .build()
//!     .expect("valid directive");
//!
//! assert_eq!(directive.namespace(), "SpeechSynthesizer");
//! assert_eq!(directive.name(), "Speak");
//! assert_eq!(directive.message_id(), "msg-1");
//! assert!(!directive.is_dialog_free());
//! ```

use crate::DirectiveError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;
use vox_types::RoutingKey;

/// Routing and correlation fields of a directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectiveHeader {
    /// The `(namespace, name)` routing key.
    pub key: RoutingKey,
    /// Globally unique message identifier, assigned by the cloud.
    pub message_id: String,
    /// Correlates the directive to a user turn; empty when the
    /// directive stands outside any dialog.
    pub dialog_request_id: String,
}

impl DirectiveHeader {
    /// Renders the header for logging.
    ///
    /// Single line, stable field order, safe to emit at `info`.
    #[must_use]
    pub fn as_log_string(&self) -> String {
        format!(
            "{} messageId={} dialogRequestId={}",
            self.key.fqn(),
            self.message_id,
            if self.dialog_request_id.is_empty() {
                "<none>"
            } else {
                &self.dialog_request_id
            }
        )
    }
}

impl fmt::Display for DirectiveHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_log_string())
    }
}

/// An immutable command from the cloud.
///
/// Constructed via [`Directive::builder`]. The pipeline owns a
/// directive from intake until it completes, is cancelled, or is
/// rejected as unhandled; handlers receive it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    header: DirectiveHeader,
    payload: Value,
    unparsed: String,
}

impl Directive {
    /// Starts building a directive for the given routing key.
    ///
    /// Namespace and name are validated at [`build`](DirectiveBuilder::build).
    #[must_use]
    pub fn builder(namespace: impl Into<String>, name: impl Into<String>) -> DirectiveBuilder {
        DirectiveBuilder {
            namespace: namespace.into(),
            name: name.into(),
            message_id: None,
            dialog_request_id: String::new(),
            payload: Value::Null,
            unparsed: None,
        }
    }

    /// The header fields.
    #[must_use]
    pub fn header(&self) -> &DirectiveHeader {
        &self.header
    }

    /// The routing key.
    #[must_use]
    pub fn key(&self) -> &RoutingKey {
        &self.header.key
    }

    /// The capability namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.header.key.namespace
    }

    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.header.key.name
    }

    /// The globally unique message identifier.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.header.message_id
    }

    /// The dialog correlation token; empty outside any dialog.
    #[must_use]
    pub fn dialog_request_id(&self) -> &str {
        &self.header.dialog_request_id
    }

    /// Returns `true` when the directive carries no dialog id.
    #[must_use]
    pub fn is_dialog_free(&self) -> bool {
        self.header.dialog_request_id.is_empty()
    }

    /// The opaque JSON payload, handed through to the handler.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// The raw wire text, used in exception reports to the cloud.
    #[must_use]
    pub fn unparsed(&self) -> &str {
        &self.unparsed
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header.as_log_string())
    }
}

/// Builder for [`Directive`].
///
/// Only namespace and name are mandatory; the builder fills the rest:
///
/// | Field | Default |
/// |-------|---------|
/// | `message_id` | fresh UUID v4 |
/// | `dialog_request_id` | empty (dialog-free) |
/// | `payload` | `Value::Null` |
/// | `unparsed` | serialized header + payload |
#[derive(Debug)]
pub struct DirectiveBuilder {
    namespace: String,
    name: String,
    message_id: Option<String>,
    dialog_request_id: String,
    payload: Value,
    unparsed: Option<String>,
}

impl DirectiveBuilder {
    /// Sets the message id. Omit to mint a fresh UUID v4.
    #[must_use]
    pub fn message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    /// Sets the dialog correlation token.
    #[must_use]
    pub fn dialog_request_id(mut self, id: impl Into<String>) -> Self {
        self.dialog_request_id = id.into();
        self
    }

    /// Sets the JSON payload.
    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Sets the raw wire text. Omit to synthesize one from the
    /// header and payload.
    #[must_use]
    pub fn unparsed(mut self, text: impl Into<String>) -> Self {
        self.unparsed = Some(text.into());
        self
    }

    /// Validates and builds the directive.
    ///
    /// # Errors
    ///
    /// [`DirectiveError::EmptyNamespace`] / [`DirectiveError::EmptyName`]
    /// when the routing key is incomplete.
    pub fn build(self) -> Result<Directive, DirectiveError> {
        if self.namespace.is_empty() {
            return Err(DirectiveError::EmptyNamespace);
        }
        if self.name.is_empty() {
            return Err(DirectiveError::EmptyName);
        }

        let header = DirectiveHeader {
            key: RoutingKey::new(self.namespace, self.name),
            message_id: self
                .message_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            dialog_request_id: self.dialog_request_id,
        };

        let unparsed = match self.unparsed {
            Some(text) => text,
            None => serde_json::json!({
                "header": {
                    "namespace": header.key.namespace,
                    "name": header.key.name,
                    "messageId": header.message_id,
                    "dialogRequestId": header.dialog_request_id,
                },
                "payload": self.payload,
            })
            .to_string(),
        };

        Ok(Directive {
            header,
            payload: self.payload,
            unparsed,
        })
    }
}
