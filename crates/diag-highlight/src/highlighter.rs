//! The diagnostic highlighter: a two-state toggle that paints color directives.
//!
//! Switching on scans every published diagnostic, reads `Color:` directives out of the
//! related-information messages, groups the related locations by color key, makes sure one
//! style exists per key and applies each group to the focused editor. Switching off applies an
//! empty range list to every cached style and forgets the groups.
//!
//! Styles stay cached in the [`HighlightSession`] across cycles, so a color seen before is
//! rendered with the same style handle the next time highlighting is switched on.

use crate::color::{ColorDirective, MalformedColorPolicy, parse_color_directive};
use crate::decoration::{DecorationRenderOptions, RangeGroups, StyleCache};
use crate::host::{DiagnosticsProvider, TextEditor, Window};
use crate::model::{DiagnosticsSnapshot, Location};
use std::collections::HashMap;

/// Notice shown after highlighting is switched on.
pub const ADDED_HIGHLIGHT_MESSAGE: &str = "Added highlight!";
/// Notice shown after highlighting is switched off.
pub const REMOVED_HIGHLIGHT_MESSAGE: &str = "Removed highlight!";

/// Whether highlighting is currently shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToggleState {
    /// Nothing is painted (initial state).
    #[default]
    Inactive,
    /// Color groups are painted in the focused editor.
    Active,
}

/// Tunables for a [`HighlightSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlighterOptions {
    /// Handling of `Color:` directives that do not parse.
    pub malformed_colors: MalformedColorPolicy,
}

/// What a call to [`HighlightSession::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// No editor had focus; nothing changed.
    NoActiveEditor,
    /// Highlighting was switched on.
    Added {
        /// Number of color keys applied.
        groups: usize,
        /// Number of styles allocated by this toggle (cache misses).
        created_styles: usize,
        /// Number of locations applied across all groups.
        locations: usize,
    },
    /// Highlighting was switched off.
    Removed {
        /// Number of styles cleared.
        cleared_styles: usize,
    },
}

/// Color directives found in a diagnostics snapshot, grouped by key.
#[derive(Debug, Clone, Default)]
pub struct ColorGroups {
    ranges: RangeGroups,
    directives: HashMap<String, ColorDirective>,
}

impl ColorGroups {
    /// Key -> locations, keys in order of first appearance.
    pub fn ranges(&self) -> &RangeGroups {
        &self.ranges
    }

    /// The directive a key was parsed from.
    pub fn directive(&self, key: &str) -> Option<&ColorDirective> {
        self.directives.get(key)
    }

    /// Iterate `(directive, locations)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ColorDirective, &[Location])> {
        self.ranges
            .iter()
            .filter_map(|(key, locations)| self.directives.get(key).map(|d| (d, locations)))
    }

    /// Split into the range mapping and the directives.
    pub fn into_parts(self) -> (RangeGroups, HashMap<String, ColorDirective>) {
        (self.ranges, self.directives)
    }
}

/// Group the related-information locations of every diagnostic by color key.
///
/// Order is document order, then diagnostic order, then related-information order. Locations
/// are not deduplicated.
pub fn group_color_ranges(
    snapshot: &DiagnosticsSnapshot,
    policy: MalformedColorPolicy,
) -> ColorGroups {
    let mut groups = ColorGroups::default();

    for diagnostic in snapshot.diagnostics() {
        for info in &diagnostic.related_information {
            let Some(directive) = parse_color_directive(&info.message) else {
                continue;
            };
            if !directive.is_parsed() && policy == MalformedColorPolicy::Skip {
                tracing::debug!(key = directive.key(), "Skipping malformed color directive");
                continue;
            }

            groups.ranges.push(directive.key(), info.location.clone());
            if !groups.directives.contains_key(directive.key()) {
                groups
                    .directives
                    .insert(directive.key().to_string(), directive);
            }
        }
    }

    groups
}

/// State of one highlighting session: toggle flag, style cache and current range groups.
#[derive(Debug, Default)]
pub struct HighlightSession {
    state: ToggleState,
    options: HighlighterOptions,
    styles: StyleCache,
    groups: RangeGroups,
}

impl HighlightSession {
    /// Create an inactive session.
    pub fn new(options: HighlighterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Current toggle state.
    pub fn state(&self) -> ToggleState {
        self.state
    }

    /// Session options.
    pub fn options(&self) -> HighlighterOptions {
        self.options
    }

    /// Styles allocated so far, one per color key.
    pub fn styles(&self) -> &StyleCache {
        &self.styles
    }

    /// Range groups currently applied (empty while inactive).
    pub fn groups(&self) -> &RangeGroups {
        &self.groups
    }

    /// Flip highlighting on or off in the focused editor.
    ///
    /// Without a focused editor this is a no-op: no state change, no rendering, no notice.
    pub fn toggle(
        &mut self,
        window: &mut dyn Window,
        diagnostics: &dyn DiagnosticsProvider,
    ) -> ToggleOutcome {
        if window.active_text_editor().is_none() {
            tracing::debug!("Toggle ignored: no active editor");
            return ToggleOutcome::NoActiveEditor;
        }

        match self.state {
            ToggleState::Inactive => self.highlight(window, diagnostics),
            ToggleState::Active => self.unhighlight(window),
        }
    }

    /// Forget every cached style and group and return to [`ToggleState::Inactive`].
    ///
    /// Nothing is rendered; callers are expected to drop the editor state as well.
    pub fn reset(&mut self) {
        self.state = ToggleState::Inactive;
        self.styles.clear();
        self.groups.clear();
    }

    fn highlight(
        &mut self,
        window: &mut dyn Window,
        diagnostics: &dyn DiagnosticsProvider,
    ) -> ToggleOutcome {
        let snapshot = diagnostics.diagnostics();
        let (ranges, directives) =
            group_color_ranges(&snapshot, self.options.malformed_colors).into_parts();

        let mut created_styles = 0;
        for key in ranges.keys() {
            let Some(directive) = directives.get(key) else {
                continue;
            };
            let options = DecorationRenderOptions {
                background_color: directive.fill(),
            };
            let (style, created) = self.styles.get_or_create(key, options, |options| {
                window.create_decoration_style(options)
            });
            if created {
                tracing::debug!(
                    key,
                    style = style.id.0,
                    fill = %style.options.background_color,
                    "Allocated decoration style"
                );
                created_styles += 1;
            }
        }

        let Some(editor) = window.active_text_editor() else {
            return ToggleOutcome::NoActiveEditor;
        };

        clear_groups(editor, &self.styles, &self.groups);
        self.groups = ranges;

        for (key, locations) in self.groups.iter() {
            if let Some(style) = self.styles.get(key) {
                tracing::debug!(
                    key,
                    style = style.id.0,
                    count = locations.len(),
                    "Applying color group"
                );
                editor.set_decorations(style, locations);
            }
        }

        let outcome = ToggleOutcome::Added {
            groups: self.groups.len(),
            created_styles,
            locations: self.groups.location_count(),
        };
        self.state = ToggleState::Active;
        tracing::info!(
            diagnostics = snapshot.len(),
            groups = self.groups.len(),
            created_styles,
            "Highlight added"
        );
        window.show_information_message(ADDED_HIGHLIGHT_MESSAGE);
        outcome
    }

    fn unhighlight(&mut self, window: &mut dyn Window) -> ToggleOutcome {
        let Some(editor) = window.active_text_editor() else {
            return ToggleOutcome::NoActiveEditor;
        };

        for (_, style) in self.styles.iter() {
            editor.set_decorations(style, &[]);
        }
        let cleared_styles = self.styles.len();
        self.groups.clear();

        self.state = ToggleState::Inactive;
        tracing::info!(cleared_styles, "Highlight removed");
        window.show_information_message(REMOVED_HIGHLIGHT_MESSAGE);
        ToggleOutcome::Removed { cleared_styles }
    }
}

fn clear_groups(editor: &mut dyn TextEditor, styles: &StyleCache, groups: &RangeGroups) {
    for key in groups.keys() {
        if let Some(style) = styles.get(key) {
            editor.set_decorations(style, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Diagnostic, Position, Range};

    fn loc(line: u32) -> Location {
        Location::new(
            "file:///doc.txt",
            Range::new(Position::new(line, 0), Position::new(line, 4)),
        )
    }

    fn snapshot(messages: &[(&str, u32)]) -> DiagnosticsSnapshot {
        let mut diagnostic = Diagnostic::new(loc(0).range, "colors");
        for (message, line) in messages {
            diagnostic = diagnostic.with_related(loc(*line), *message);
        }
        DiagnosticsSnapshot::new(vec![("file:///doc.txt".to_string(), vec![diagnostic])])
    }

    #[test]
    fn test_grouping_ignores_non_directives() {
        let snap = snapshot(&[("Color:1,2,3", 1), ("note", 2), ("Color:1,2,3", 3)]);
        let groups = group_color_ranges(&snap, MalformedColorPolicy::Render);

        assert_eq!(groups.ranges().keys().collect::<Vec<_>>(), vec!["1,2,3"]);
        assert_eq!(groups.ranges().get("1,2,3"), Some(&[loc(1), loc(3)][..]));
    }

    #[test]
    fn test_malformed_policy() {
        let snap = snapshot(&[("Color:,1,2", 1), ("Color:0,0,255", 2)]);

        let rendered = group_color_ranges(&snap, MalformedColorPolicy::Render);
        assert_eq!(
            rendered.ranges().keys().collect::<Vec<_>>(),
            vec![",1,2", "0,0,255"]
        );
        assert!(!rendered.directive(",1,2").unwrap().is_parsed());

        let skipped = group_color_ranges(&snap, MalformedColorPolicy::Skip);
        assert_eq!(
            skipped.ranges().keys().collect::<Vec<_>>(),
            vec!["0,0,255"]
        );
    }

    #[test]
    fn test_reset_forgets_styles() {
        let mut window = crate::host::MemoryWindow::with_editor("file:///doc.txt");
        let snap = snapshot(&[("Color:9,9,9", 1)]);
        let mut session = HighlightSession::default();

        session.toggle(&mut window, &snap);
        assert_eq!(session.styles().len(), 1);

        session.reset();
        assert_eq!(session.state(), ToggleState::Inactive);
        assert!(session.styles().is_empty());
        assert!(session.groups().is_empty());
    }
}
