//! The host-editor seam.
//!
//! The highlighter never talks to a concrete editor. Hosts implement [`Window`] and
//! [`TextEditor`] to expose the focused editor, allocate decoration styles and surface notices,
//! and [`DiagnosticsProvider`] to expose the diagnostics currently published for all documents.
//!
//! [`MemoryWindow`] / [`MemoryEditor`] are a headless implementation that records every call;
//! the CLI renders from it and tests assert against it.

use crate::decoration::{DecorationRenderOptions, DecorationStyle, DecorationStyleId};
use crate::model::{DiagnosticsSnapshot, Location};
use std::collections::BTreeMap;

/// An editor showing one document.
pub trait TextEditor {
    /// URI of the document shown in this editor.
    fn document_uri(&self) -> &str;

    /// Replace the ranges rendered with `style`. An empty slice removes the style's highlight.
    fn set_decorations(&mut self, style: &DecorationStyle, ranges: &[Location]);
}

/// The host window: focused editor, style allocation and user notices.
pub trait Window {
    /// The currently focused editor, if any.
    fn active_text_editor(&mut self) -> Option<&mut dyn TextEditor>;

    /// Allocate a new decoration style.
    fn create_decoration_style(&mut self, options: DecorationRenderOptions) -> DecorationStyle;

    /// Show an informational notice to the user.
    fn show_information_message(&mut self, message: &str);
}

/// Source of the complete current diagnostics set.
pub trait DiagnosticsProvider {
    /// Snapshot of all diagnostics across all documents.
    fn diagnostics(&self) -> DiagnosticsSnapshot;
}

impl DiagnosticsProvider for DiagnosticsSnapshot {
    fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.clone()
    }
}

/// A recorded `set_decorations` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationCall {
    /// Style the ranges were applied to.
    pub style: DecorationStyleId,
    /// Ranges passed to the call (empty = cleared).
    pub ranges: Vec<Location>,
}

/// Headless editor that records decoration calls.
#[derive(Debug, Clone)]
pub struct MemoryEditor {
    uri: String,
    calls: Vec<DecorationCall>,
    visible: BTreeMap<DecorationStyleId, Vec<Location>>,
}

impl MemoryEditor {
    /// Create an editor showing `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            calls: Vec::new(),
            visible: BTreeMap::new(),
        }
    }

    /// Every `set_decorations` call, in order.
    pub fn calls(&self) -> &[DecorationCall] {
        &self.calls
    }

    /// Ranges currently rendered per style (styles with no ranges are omitted).
    pub fn visible(&self) -> &BTreeMap<DecorationStyleId, Vec<Location>> {
        &self.visible
    }

    /// Forget recorded calls (the visible state is kept).
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }
}

impl TextEditor for MemoryEditor {
    fn document_uri(&self) -> &str {
        &self.uri
    }

    fn set_decorations(&mut self, style: &DecorationStyle, ranges: &[Location]) {
        self.calls.push(DecorationCall {
            style: style.id,
            ranges: ranges.to_vec(),
        });
        if ranges.is_empty() {
            self.visible.remove(&style.id);
        } else {
            self.visible.insert(style.id, ranges.to_vec());
        }
    }
}

/// Headless window owning at most one focused [`MemoryEditor`].
#[derive(Debug, Clone, Default)]
pub struct MemoryWindow {
    editor: Option<MemoryEditor>,
    styles: Vec<DecorationStyle>,
    notices: Vec<String>,
    next_style_id: u64,
}

impl MemoryWindow {
    /// A window with no focused editor.
    pub fn new() -> Self {
        Self::default()
    }

    /// A window focused on an editor showing `uri`.
    pub fn with_editor(uri: impl Into<String>) -> Self {
        Self {
            editor: Some(MemoryEditor::new(uri)),
            ..Self::default()
        }
    }

    /// Focus `editor`, returning the previously focused one.
    pub fn focus(&mut self, editor: MemoryEditor) -> Option<MemoryEditor> {
        self.editor.replace(editor)
    }

    /// Remove focus, returning the previously focused editor.
    pub fn unfocus(&mut self) -> Option<MemoryEditor> {
        self.editor.take()
    }

    /// The focused editor.
    pub fn editor(&self) -> Option<&MemoryEditor> {
        self.editor.as_ref()
    }

    /// Mutable access to the focused editor.
    pub fn editor_mut(&mut self) -> Option<&mut MemoryEditor> {
        self.editor.as_mut()
    }

    /// Every style allocated so far, in allocation order.
    pub fn allocated_styles(&self) -> &[DecorationStyle] {
        &self.styles
    }

    /// Notices shown so far.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}

impl Window for MemoryWindow {
    fn active_text_editor(&mut self) -> Option<&mut dyn TextEditor> {
        self.editor.as_mut().map(|editor| editor as &mut dyn TextEditor)
    }

    fn create_decoration_style(&mut self, options: DecorationRenderOptions) -> DecorationStyle {
        self.next_style_id += 1;
        let style = DecorationStyle {
            id: DecorationStyleId(self.next_style_id),
            options,
        };
        self.styles.push(style.clone());
        style
    }

    fn show_information_message(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
