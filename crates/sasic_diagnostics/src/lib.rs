//! Diagnostic creation, severity management, and rendering for the flow.
//!
//! Every stage reports data-quality problems (exhausted site pools, unknown
//! cell types, dependency cycles, missing clock nets) as structured
//! [`Diagnostic`]s carrying a stable [`DiagnosticCode`]. The thread-safe
//! [`DiagnosticSink`] accumulates them so an external validator can gate on
//! per-code counts, and [`DiagnosticRenderer`] implementations format them
//! for the terminal or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
