//! Host-side aggregation of the diagnostics an instrumented frame reports.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use vibecode_common::protocol::{
    ConsoleLevel, DiagnosticEvent, DiagnosticKind, FrameCommand, FrameMessage,
};

/// Error list, log list and readiness for the currently mounted revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub errors: Vec<DiagnosticEvent>,
    pub logs: Vec<DiagnosticEvent>,
    pub is_ready: bool,
}

/// Consumes one mounted frame's message stream. Call [`clear`] before
/// mounting a new revision.
///
/// [`clear`]: DiagnosticsChannel::clear
#[derive(Debug, Default)]
pub struct DiagnosticsChannel {
    snapshot: DiagnosticsSnapshot,
}

impl DiagnosticsChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw window message. Returns `false` for messages on another
    /// channel or with a payload that doesn't parse; those are dropped.
    pub fn handle_envelope(&mut self, envelope: &Value) -> bool {
        match FrameMessage::from_envelope(envelope) {
            Ok(msg) => {
                self.handle(msg);
                true
            }
            Err(e) => {
                debug!("Ignoring frame message: {}", e);
                false
            }
        }
    }

    pub fn handle(&mut self, msg: FrameMessage) {
        match msg {
            FrameMessage::Ready { .. } => self.snapshot.is_ready = true,
            FrameMessage::AllErrors { errors, logs } => {
                self.snapshot.errors = errors.into_iter().filter_map(FrameMessage::into_event).collect();
                self.snapshot.logs = logs.into_iter().filter_map(FrameMessage::into_event).collect();
            }
            other => {
                if let Some(event) = other.into_event() {
                    self.push(event);
                }
            }
        }
    }

    fn push(&mut self, event: DiagnosticEvent) {
        match event.kind {
            DiagnosticKind::RuntimeError | DiagnosticKind::ResourceError => {
                self.snapshot.errors.push(event)
            }
            DiagnosticKind::ConsoleLog => {
                if event.level == Some(ConsoleLevel::Error) {
                    self.snapshot.errors.push(event.promoted_console_error());
                }
                self.snapshot.logs.push(event);
            }
            DiagnosticKind::ReadySignal => self.snapshot.is_ready = true,
        }
    }

    pub fn clear(&mut self) {
        self.snapshot = DiagnosticsSnapshot::default();
    }

    pub fn has_errors(&self) -> bool {
        !self.snapshot.errors.is_empty()
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot.is_ready
    }

    pub fn errors(&self) -> &[DiagnosticEvent] {
        &self.snapshot.errors
    }

    pub fn logs(&self) -> &[DiagnosticEvent] {
        &self.snapshot.logs
    }

    pub fn snapshot(&self) -> &DiagnosticsSnapshot {
        &self.snapshot
    }

    /// Text digest of the error list, the exact input to a fix request.
    pub fn digest(&self) -> String {
        self.snapshot
            .errors
            .iter()
            .map(format_error)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Command asking the frame for its full history, for listeners that
    /// attached after the frame started reporting.
    pub fn history_request() -> Value {
        FrameCommand::GetErrors.to_envelope()
    }

    /// Command telling the frame to drop its buffers.
    pub fn clear_request() -> Value {
        FrameCommand::Clear.to_envelope()
    }
}

fn format_error(e: &DiagnosticEvent) -> String {
    let mut out = format!(
        "{}: {}",
        e.category.as_deref().unwrap_or("Error"),
        e.message
    );
    if let Some(line) = e.line.filter(|l| *l > 0) {
        out.push_str(&format!(" (line {})", line));
    }
    if let Some(stack) = e.stack.as_deref().filter(|s| !s.is_empty()) {
        out.push_str("\nStack: ");
        out.push_str(stack);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(payload: Value) -> Value {
        json!({"channel": "iframe-debug", "payload": payload})
    }

    fn runtime_error() -> Value {
        env(json!({
            "type": "error",
            "category": "TypeError",
            "message": "x is undefined",
            "line": 7,
            "stack": "TypeError: x is undefined\n    at tick",
            "timestamp": 1
        }))
    }

    fn console(level: &str, args: Value) -> Value {
        env(json!({"type": "console", "level": level, "args": args, "timestamp": 2}))
    }

    #[test]
    fn test_error_console_error_ready_sequence() {
        let mut ch = DiagnosticsChannel::new();
        assert!(ch.handle_envelope(&runtime_error()));
        assert!(ch.handle_envelope(&console("error", json!(["bad thing"]))));
        assert!(ch.handle_envelope(&env(json!({"type": "ready", "errorsCount": 1}))));

        assert_eq!(ch.errors().len(), 2);
        assert_eq!(ch.logs().len(), 1);
        assert!(ch.is_ready());
        assert!(ch.has_errors());
        assert_eq!(ch.errors()[1].category.as_deref(), Some("ConsoleError"));
        assert_eq!(ch.errors()[1].message, "bad thing");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut ch = DiagnosticsChannel::new();
        ch.handle_envelope(&runtime_error());
        ch.handle_envelope(&console("log", json!(["hi"])));
        ch.handle_envelope(&env(json!({"type": "ready"})));
        ch.clear();
        assert!(!ch.has_errors());
        assert!(!ch.is_ready());
        assert!(ch.logs().is_empty());
    }

    #[test]
    fn test_non_error_console_is_log_only() {
        let mut ch = DiagnosticsChannel::new();
        ch.handle_envelope(&console("warn", json!(["careful", {"n": 1}])));
        assert!(!ch.has_errors());
        assert_eq!(ch.logs()[0].message, r#"careful {"n":1}"#);
    }

    #[test]
    fn test_resource_error_goes_to_errors() {
        let mut ch = DiagnosticsChannel::new();
        ch.handle_envelope(&env(json!({
            "type": "resource-error",
            "category": "ResourceLoadError",
            "message": "Failed to load: https://cdn/x.js",
            "tagName": "SCRIPT"
        })));
        assert_eq!(ch.errors().len(), 1);
        assert_eq!(ch.errors()[0].kind, DiagnosticKind::ResourceError);
    }

    #[test]
    fn test_other_channel_and_garbage_are_not_accepted() {
        let mut ch = DiagnosticsChannel::new();
        assert!(!ch.handle_envelope(&json!({"channel": "webpack", "payload": {"type": "error"}})));
        assert!(!ch.handle_envelope(&json!("just a string")));
        assert!(!ch.handle_envelope(&env(json!({"type": "mystery"}))));
        assert!(!ch.handle_envelope(&env(json!({"type": "console", "level": "trace"}))));
        assert!(!ch.has_errors());
        assert!(ch.logs().is_empty());
        assert!(!ch.is_ready());
    }

    #[test]
    fn test_all_errors_replaces_lists_wholesale() {
        let mut ch = DiagnosticsChannel::new();
        ch.handle_envelope(&runtime_error());
        ch.handle_envelope(&runtime_error());
        ch.handle_envelope(&env(json!({
            "type": "all-errors",
            "errors": [{"type": "error", "category": "ConsoleError", "message": "from buffer"}],
            "logs": [
                {"type": "console", "level": "error", "args": ["from buffer"]},
                {"type": "console", "level": "log", "args": [1, 2]}
            ]
        })));
        assert_eq!(ch.errors().len(), 1);
        assert_eq!(ch.errors()[0].message, "from buffer");
        assert_eq!(ch.logs().len(), 2);
        assert_eq!(ch.logs()[1].message, "1 2");
    }

    #[test]
    fn test_digest_format() {
        let mut ch = DiagnosticsChannel::new();
        ch.handle_envelope(&runtime_error());
        ch.handle_envelope(&env(json!({"type": "error", "message": "Script error."})));
        assert_eq!(
            ch.digest(),
            "TypeError: x is undefined (line 7)\nStack: TypeError: x is undefined\n    at tick\n\nError: Script error."
        );
    }

    #[test]
    fn test_digest_empty_when_no_errors() {
        let ch = DiagnosticsChannel::new();
        assert_eq!(ch.digest(), "");
    }

    #[test]
    fn test_command_envelopes() {
        assert_eq!(
            DiagnosticsChannel::history_request(),
            json!({"channel": "iframe-command", "command": "getErrors"})
        );
        assert_eq!(
            DiagnosticsChannel::clear_request(),
            json!({"channel": "iframe-command", "command": "clear"})
        );
    }
}
