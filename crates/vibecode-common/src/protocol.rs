//! Frame ⇄ host message protocol.
//!
//! An instrumented artifact posts every diagnostic to its parent window as
//! `{channel: "iframe-debug", payload: {...}}` and listens for
//! `{channel: "iframe-command", command: "getErrors" | "clear"}`.
//! Both directions are parsed into closed enums here; nothing downstream
//! touches the raw JSON.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Channel tag on frame → host messages.
pub const DEBUG_CHANNEL: &str = "iframe-debug";

/// Channel tag on host → frame commands.
pub const COMMAND_CHANNEL: &str = "iframe-command";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Message is not on the '{expected}' channel")]
    WrongChannel { expected: &'static str },

    #[error("Message has no payload")]
    MissingPayload,

    #[error("Malformed frame message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Warn,
    Info,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Error => "error",
            Self::Debug => "debug",
        }
    }
}

/// Body of `error` and `resource-error` messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub stack: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub source: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Body of `console` messages. `args` holds the already-serialized
/// arguments of the intercepted call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolePayload {
    pub level: ConsoleLevel,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Every message an instrumented frame can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FrameMessage {
    #[serde(rename = "error")]
    RuntimeError(ErrorPayload),
    #[serde(rename = "resource-error")]
    ResourceError(ErrorPayload),
    #[serde(rename = "console")]
    Console(ConsolePayload),
    #[serde(rename = "ready")]
    Ready {
        #[serde(rename = "errorsCount", default)]
        errors_count: u32,
    },
    /// Reply to `getErrors`: the frame's full buffered history.
    #[serde(rename = "all-errors")]
    AllErrors {
        #[serde(default, deserialize_with = "lenient_entries")]
        errors: Vec<FrameMessage>,
        #[serde(default, deserialize_with = "lenient_entries")]
        logs: Vec<FrameMessage>,
    },
}

impl FrameMessage {
    /// Parse a `{channel, payload}` envelope. Messages on any other channel
    /// are rejected with `WrongChannel`.
    pub fn from_envelope(envelope: &Value) -> Result<Self, ProtocolError> {
        if envelope.get("channel").and_then(Value::as_str) != Some(DEBUG_CHANNEL) {
            return Err(ProtocolError::WrongChannel {
                expected: DEBUG_CHANNEL,
            });
        }
        let payload = envelope
            .get("payload")
            .ok_or(ProtocolError::MissingPayload)?;
        Ok(Self::deserialize(payload)?)
    }

    pub fn to_envelope(&self) -> Value {
        serde_json::json!({ "channel": DEBUG_CHANNEL, "payload": self })
    }

    /// Convert a single stream message into a stored event. `ready` and
    /// `all-errors` carry no event of their own.
    pub fn into_event(self) -> Option<DiagnosticEvent> {
        match self {
            Self::RuntimeError(p) => Some(DiagnosticEvent::from_error(DiagnosticKind::RuntimeError, p)),
            Self::ResourceError(p) => {
                Some(DiagnosticEvent::from_error(DiagnosticKind::ResourceError, p))
            }
            Self::Console(p) => Some(DiagnosticEvent::from_console(p)),
            Self::Ready { .. } | Self::AllErrors { .. } => None,
        }
    }
}

/// Commands the host can send into a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameCommand {
    GetErrors,
    Clear,
}

impl FrameCommand {
    pub fn to_envelope(self) -> Value {
        serde_json::json!({ "channel": COMMAND_CHANNEL, "command": self })
    }

    pub fn from_envelope(envelope: &Value) -> Result<Self, ProtocolError> {
        if envelope.get("channel").and_then(Value::as_str) != Some(COMMAND_CHANNEL) {
            return Err(ProtocolError::WrongChannel {
                expected: COMMAND_CHANNEL,
            });
        }
        let command = envelope
            .get("command")
            .ok_or(ProtocolError::MissingPayload)?;
        Ok(Self::deserialize(command)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    RuntimeError,
    ResourceError,
    ConsoleLog,
    ReadySignal,
}

/// One captured diagnostic, flattened for the host's error and log lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEvent {
    pub kind: DiagnosticKind,
    pub category: Option<String>,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack: Option<String>,
    pub source: Option<String>,
    pub tag_name: Option<String>,
    pub level: Option<ConsoleLevel>,
    pub args: Vec<Value>,
    pub timestamp: i64,
}

impl DiagnosticEvent {
    pub fn from_error(kind: DiagnosticKind, p: ErrorPayload) -> Self {
        Self {
            kind,
            category: p.category,
            message: p.message.unwrap_or_default(),
            line: p.line,
            column: p.column,
            stack: p.stack,
            source: p.source,
            tag_name: p.tag_name,
            level: None,
            args: Vec::new(),
            timestamp: p.timestamp.unwrap_or_else(now_millis),
        }
    }

    pub fn from_console(p: ConsolePayload) -> Self {
        let message = p.args.iter().map(render_arg).collect::<Vec<_>>().join(" ");
        Self {
            kind: DiagnosticKind::ConsoleLog,
            category: None,
            message,
            line: None,
            column: None,
            stack: None,
            source: None,
            tag_name: None,
            level: Some(p.level),
            args: p.args,
            timestamp: p.timestamp.unwrap_or_else(now_millis),
        }
    }

    /// Copy of a `console.error` entry as it appears in the error list.
    pub fn promoted_console_error(&self) -> Self {
        Self {
            kind: DiagnosticKind::RuntimeError,
            category: Some("ConsoleError".to_string()),
            ..self.clone()
        }
    }
}

/// Render one serialized console argument the way a developer would read it.
pub fn render_arg(arg: &Value) -> String {
    match arg {
        Value::String(s) => s.clone(),
        Value::Object(map) if map.get("__error").and_then(Value::as_bool) == Some(true) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Error")
            .to_string(),
        other => other.to_string(),
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// `window.onerror` hands over whatever was thrown, so `error.name` and
/// friends can be any JSON value. Keep its text form.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Buffered history is parsed entry by entry; an entry that still fails to
/// parse is dropped instead of discarding the whole reply.
fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<FrameMessage>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| FrameMessage::deserialize(entry).ok())
        .collect())
}
