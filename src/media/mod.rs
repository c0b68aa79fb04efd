//! Remote media handles.
//!
//! The Files API answers both uploads and lookups with a file object, but
//! sometimes wraps it under a `"file"` key and sometimes returns it flat.
//! [`MediaHandle::from_wire`] is the single place where either shape is
//! mapped onto one in-memory type.
//!
//! - [`upload`] - sends the video and returns the first handle snapshot
//! - [`poller`] - re-fetches snapshots until the handle is ACTIVE

pub mod poller;
pub mod upload;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use poller::{Backoff, PollPolicy, StatePoller};
pub use upload::Uploader;

// ---------------------------------------------------------------------------
// Processing state
// ---------------------------------------------------------------------------

/// Readiness of an uploaded file as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessingState {
    /// `STATE_UNSPECIFIED` or an explicit `UNKNOWN`.
    Unknown,
    /// Still being processed; keep polling.
    Processing,
    /// Ready to be referenced from a generation request.
    Active,
    /// Processing failed; terminal.
    Failed,
    /// Any state string this crate does not recognize.
    Other(String),
}

impl ProcessingState {
    /// Whether polling should stop at this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Active | Self::Failed)
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Processing => "PROCESSING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for ProcessingState {
    fn from(s: &str) -> Self {
        match s {
            "UNKNOWN" | "STATE_UNSPECIFIED" => Self::Unknown,
            "PROCESSING" => Self::Processing,
            "ACTIVE" => Self::Active,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for ProcessingState {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<ProcessingState> for String {
    fn from(state: ProcessingState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Media handle
// ---------------------------------------------------------------------------

/// One snapshot of a remote file handle.
///
/// Fields the remote omitted stay `None`; nothing is defaulted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    /// Opaque identifier, e.g. `files/abc123`.
    pub name: Option<String>,
    /// Processing state, when reported.
    pub state: Option<ProcessingState>,
    /// Resource URI, present once the file is ACTIVE.
    pub uri: Option<String>,
    /// Display name given at upload time.
    pub display_name: Option<String>,
    /// MIME type detected by the remote.
    pub mime_type: Option<String>,
    /// Size in bytes. The API encodes int64 values as strings.
    pub size_bytes: Option<u64>,
}

impl MediaHandle {
    /// Normalize either wire shape into a handle.
    ///
    /// Accepts `{"file": {...}}` and the flat `{...}` form. Returns `None`
    /// when `value` is not a JSON object at all.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let obj = match value.get("file") {
            Some(inner) if inner.is_object() => inner,
            _ => value,
        };
        let obj = obj.as_object()?;

        let string_field = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let size_bytes = obj.get("sizeBytes").and_then(|v| match v {
            Value::String(s) => s.parse().ok(),
            other => other.as_u64(),
        });

        Some(Self {
            name: string_field("name"),
            state: obj
                .get("state")
                .and_then(Value::as_str)
                .map(ProcessingState::from),
            uri: string_field("uri"),
            display_name: string_field("displayName"),
            mime_type: string_field("mimeType"),
            size_bytes,
        })
    }

    /// The reported state, treating a missing one as [`ProcessingState::Unknown`].
    pub fn state_or_unknown(&self) -> ProcessingState {
        self.state.clone().unwrap_or(ProcessingState::Unknown)
    }

    /// The URI, ignoring an empty string.
    pub fn non_empty_uri(&self) -> Option<&str> {
        self.uri.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// A handle that reached ACTIVE with a usable URI.
///
/// Only [`StatePoller`] constructs this, so holding one proves the media is
/// ready for a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMedia {
    name: String,
    uri: String,
    mime_type: Option<String>,
}

impl ActiveMedia {
    pub(crate) fn new(name: String, uri: String, mime_type: Option<String>) -> Self {
        Self {
            name,
            uri,
            mime_type,
        }
    }

    /// Handle identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource URI to reference from generation requests.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// MIME type reported by the remote, if any.
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}
