//! Sandboxed preview: instrumenting artifacts and reading back what they report.

pub mod diagnostics;
pub mod instrument;

pub use diagnostics::{DiagnosticsChannel, DiagnosticsSnapshot};
pub use instrument::{capture_transform, instrument, mute_transform};
