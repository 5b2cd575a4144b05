//! Shared types for vibecode.
//!
//! - `protocol`: the frame/host message protocol spoken by instrumented
//!   artifacts (`iframe-debug` outbound, `iframe-command` inbound)
//! - `failure`: classification of stored generation failures into
//!   user-facing reasons

pub mod failure;
pub mod protocol;

pub use failure::{FailureInfo, FailureKind, truncate_chars};
pub use protocol::{
    COMMAND_CHANNEL, ConsoleLevel, ConsolePayload, DEBUG_CHANNEL, DiagnosticEvent, DiagnosticKind,
    ErrorPayload, FrameCommand, FrameMessage, ProtocolError, render_arg,
};
