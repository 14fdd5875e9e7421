//! Structured diagnostic messages.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message.
///
/// Instead of a source span, a diagnostic names the design object it is
/// about (a cell, site, port or net) in `subject`, when there is one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The stable code identifying the kind of condition.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The design object concerned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Explanatory footnotes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Actionable suggestions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: String) -> Self {
        Self {
            severity,
            code,
            message,
            subject: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message.into())
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message.into())
    }

    /// Creates a new informational diagnostic.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, code, message.into())
    }

    /// Names the design object this diagnostic is about.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn create_warning() {
        let code = DiagnosticCode::new(Category::Placement, 101);
        let diag = Diagnostic::warning(code, "no free site");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.message, "no free site");
        assert!(diag.subject.is_none());
    }

    #[test]
    fn builder_methods() {
        let code = DiagnosticCode::new(Category::ClockTree, 203);
        let diag = Diagnostic::warning(code, "buffer pool exhausted")
            .with_subject("level 2")
            .with_note("3 sinks left unbuffered")
            .with_help("reserve more buffer sites");
        assert_eq!(diag.subject.as_deref(), Some("level 2"));
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }

    #[test]
    fn json_omits_empty_fields() {
        let code = DiagnosticCode::new(Category::Eco, 301);
        let json = serde_json::to_string(&Diagnostic::note(code, "skipped")).unwrap();
        assert!(!json.contains("notes"));
        assert!(!json.contains("subject"));
        assert!(json.contains("\"note\""));
    }
}
