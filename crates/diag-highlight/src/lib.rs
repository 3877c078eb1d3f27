#![warn(missing_docs)]
//! `diag-highlight` - paint language-server color directives as editor decorations.
//!
//! A language server can smuggle highlight colors through diagnostics: every related-information
//! entry whose message reads `Color:<r>,<g>,<b>` asks for its location to be painted with that
//! color. This crate turns such diagnostics into decoration styles, independent of any concrete
//! editor:
//!
//! - [`model`]: positions, locations, diagnostics and snapshots
//! - [`color`]: the `Color:` directive parser and style fills
//! - [`decoration`]: decoration styles, the style cache and per-color range groups
//! - [`host`]: traits a host editor implements, plus a headless in-memory host
//! - [`highlighter`]: the on/off toggle that groups, allocates and applies styles
//! - [`commands`]: command registry and the `extension.toggleHighlight` command
//!
//! ```rust
//! use diag_highlight::{
//!     Diagnostic, DiagnosticsSnapshot, HighlightSession, Location, MemoryWindow, Position,
//!     Range, ToggleState,
//! };
//!
//! let at = Location::new("file:///a.txt", Range::new(Position::new(0, 0), Position::new(0, 5)));
//! let diagnostics = DiagnosticsSnapshot::new(vec![(
//!     "file:///a.txt".to_string(),
//!     vec![Diagnostic::new(at.range, "hello").with_related(at.clone(), "Color:255,0,0")],
//! )]);
//!
//! let mut window = MemoryWindow::with_editor("file:///a.txt");
//! let mut session = HighlightSession::default();
//! session.toggle(&mut window, &diagnostics);
//!
//! assert_eq!(session.state(), ToggleState::Active);
//! assert_eq!(window.allocated_styles()[0].options.background_color.to_string(), "rgba(255, 0, 0, 0.4)");
//! ```

pub mod color;
pub mod commands;
pub mod decoration;
pub mod highlighter;
pub mod host;
pub mod model;

pub use color::{
    COLOR_DIRECTIVE_PREFIX, ColorDirective, HIGHLIGHT_ALPHA, MalformedColorPolicy, Rgb, StyleFill,
    parse_color_directive,
};
pub use commands::{
    CommandContext, CommandError, CommandHandler, CommandRegistry, TOGGLE_HIGHLIGHT_COMMAND,
    ToggleHighlightCommand,
};
pub use decoration::{
    DecorationRenderOptions, DecorationStyle, DecorationStyleId, RangeGroups, StyleCache,
};
pub use highlighter::{
    ADDED_HIGHLIGHT_MESSAGE, ColorGroups, HighlightSession, HighlighterOptions,
    REMOVED_HIGHLIGHT_MESSAGE, ToggleOutcome, ToggleState, group_color_ranges,
};
pub use host::{
    DecorationCall, DiagnosticsProvider, MemoryEditor, MemoryWindow, TextEditor, Window,
};
pub use model::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, DiagnosticsSnapshot, Location,
    Position, Range,
};
