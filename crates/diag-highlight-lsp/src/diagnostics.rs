//! Diagnostics store: the latest published diagnostics per document.

use crate::events::PublishDiagnosticsParams;
use diag_highlight::{Diagnostic, DiagnosticsProvider, DiagnosticsSnapshot};
use std::collections::BTreeMap;

/// Latest diagnostics per document URI, as published by the server.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsStore {
    data: BTreeMap<String, Vec<Diagnostic>>,
}

impl DiagnosticsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the diagnostics of `uri`. An empty list forgets the document.
    pub fn update(&mut self, uri: String, items: Vec<Diagnostic>) {
        if items.is_empty() {
            self.data.remove(&uri);
        } else {
            self.data.insert(uri, items);
        }
    }

    /// Apply a `textDocument/publishDiagnostics` payload.
    pub fn apply(&mut self, params: PublishDiagnosticsParams) {
        tracing::debug!(
            uri = %params.uri,
            count = params.diagnostics.len(),
            "Diagnostics updated"
        );
        self.update(params.uri, params.diagnostics);
    }

    /// Diagnostics currently known for `uri`.
    pub fn get(&self, uri: &str) -> Option<&[Diagnostic]> {
        self.data.get(uri).map(Vec::as_slice)
    }

    /// Number of documents with at least one diagnostic.
    pub fn document_count(&self) -> usize {
        self.data.len()
    }

    /// Forget everything (e.g. when the server stops).
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Snapshot of all documents, ordered by URI.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot::new(
            self.data
                .iter()
                .map(|(uri, items)| (uri.clone(), items.clone()))
                .collect(),
        )
    }
}

impl DiagnosticsProvider for DiagnosticsStore {
    fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.snapshot()
    }
}
