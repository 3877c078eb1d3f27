//! Diagnostics data model shared between the highlighter and its hosts.
//!
//! Coordinates follow the LSP convention: 0-based lines, `character` counted in UTF-16 code
//! units. The highlighter never converts them; it only forwards locations to the host editor.

use serde::{Deserialize, Serialize};

/// A 0-based line/character position (UTF-16 code units).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-based).
    pub line: u32,
    /// Character offset within the line (UTF-16 code units, 0-based).
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open span `start..end` inside a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Range start (inclusive).
    pub start: Position,
    /// Range end (exclusive).
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the range covers no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A span inside a specific document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Document URI (e.g. `file:///...`).
    pub uri: String,
    /// Span inside the document.
    pub range: Range,
}

impl Location {
    /// Create a new location.
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
        }
    }
}

/// Diagnostic severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    /// Error diagnostics.
    Error,
    /// Warning diagnostics.
    Warning,
    /// Informational diagnostics.
    Information,
    /// Hint diagnostics.
    Hint,
}

impl DiagnosticSeverity {
    /// Convert the numeric LSP `DiagnosticSeverity` into an enum.
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }
}

/// A secondary `(location, message)` pair attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRelatedInformation {
    /// Location the message refers to.
    pub location: Location,
    /// Free-text message.
    pub message: String,
}

/// A single diagnostic reported for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Primary range of the diagnostic.
    pub range: Range,
    /// Optional severity.
    pub severity: Option<DiagnosticSeverity>,
    /// Optional diagnostic code (stringified).
    pub code: Option<String>,
    /// Optional diagnostic source (e.g. `"ex"`).
    pub source: Option<String>,
    /// Diagnostic message.
    pub message: String,
    /// Related information entries, in server order.
    pub related_information: Vec<DiagnosticRelatedInformation>,
}

impl Diagnostic {
    /// Create a diagnostic with only a range and a message.
    pub fn new(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: None,
            code: None,
            source: None,
            message: message.into(),
            related_information: Vec::new(),
        }
    }

    /// Append a related information entry (builder style).
    pub fn with_related(mut self, location: Location, message: impl Into<String>) -> Self {
        self.related_information.push(DiagnosticRelatedInformation {
            location,
            message: message.into(),
        });
        self
    }
}

/// All diagnostics currently known, grouped per document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    documents: Vec<(String, Vec<Diagnostic>)>,
}

impl DiagnosticsSnapshot {
    /// Build a snapshot from `(uri, diagnostics)` pairs, kept in the given order.
    pub fn new(documents: Vec<(String, Vec<Diagnostic>)>) -> Self {
        Self { documents }
    }

    /// The `(uri, diagnostics)` pairs in this snapshot.
    pub fn documents(&self) -> &[(String, Vec<Diagnostic>)] {
        &self.documents
    }

    /// Iterate over every diagnostic, in document order then server order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.documents.iter().flat_map(|(_, items)| items.iter())
    }

    /// Total number of diagnostics across all documents.
    pub fn len(&self) -> usize {
        self.documents.iter().map(|(_, items)| items.len()).sum()
    }

    /// Returns `true` if no document carries any diagnostic.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_across_documents() {
        let range = Range::new(Position::new(0, 0), Position::new(0, 1));
        let snapshot = DiagnosticsSnapshot::new(vec![
            ("file:///a".to_string(), vec![Diagnostic::new(range, "a")]),
            ("file:///b".to_string(), Vec::new()),
            (
                "file:///c".to_string(),
                vec![Diagnostic::new(range, "c1"), Diagnostic::new(range, "c2")],
            ),
        ]);

        assert_eq!(snapshot.len(), 3);
        assert!(!snapshot.is_empty());
        let messages: Vec<_> = snapshot.diagnostics().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "c1", "c2"]);
    }

    #[test]
    fn test_severity_from_lsp() {
        assert_eq!(DiagnosticSeverity::from_lsp(1), Some(DiagnosticSeverity::Error));
        assert_eq!(DiagnosticSeverity::from_lsp(4), Some(DiagnosticSeverity::Hint));
        assert_eq!(DiagnosticSeverity::from_lsp(0), None);
    }
}
