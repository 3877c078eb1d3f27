//! `"Color:r,g,b"` directives carried in diagnostic related-information messages.
//!
//! The language server encodes a highlight color as free text: a related-information message
//! of the form `Color:<int>,<int>,<int>`. The substring after the prefix is the grouping key;
//! the parsed channels only decide the fill of the style created for that key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Literal (case-sensitive) prefix that marks a color directive.
pub const COLOR_DIRECTIVE_PREFIX: &str = "Color:";

/// Opacity applied to every highlight fill.
pub const HIGHLIGHT_ALPHA: f32 = 0.4;

/// An RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB triple.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Result of reading a `Color:` related-information message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorDirective {
    /// The remainder is a well-formed `r,g,b` triple.
    Parsed {
        /// Raw text after the prefix, used as the grouping key.
        key: String,
        /// Parsed channels.
        rgb: Rgb,
    },
    /// The message has the prefix, but the remainder is not an `r,g,b` triple.
    Unparsed {
        /// Raw text after the prefix, used as the grouping key.
        key: String,
    },
}

impl ColorDirective {
    /// The grouping key (the raw text after `Color:`).
    pub fn key(&self) -> &str {
        match self {
            Self::Parsed { key, .. } | Self::Unparsed { key } => key,
        }
    }

    /// Fill for a style created from this directive.
    pub fn fill(&self) -> StyleFill {
        match self {
            Self::Parsed { rgb, .. } => StyleFill::Rgba(*rgb),
            Self::Unparsed { key } => StyleFill::Unresolved { raw: key.clone() },
        }
    }

    /// Returns `true` for [`ColorDirective::Parsed`].
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed { .. })
    }
}

/// Parse a related-information message as a color directive.
///
/// Returns `None` when the message does not start with [`COLOR_DIRECTIVE_PREFIX`]. A message
/// with the prefix always yields a directive; a remainder that is not exactly three
/// comma-separated integers yields [`ColorDirective::Unparsed`]. Channels outside `0..=255`
/// are clamped, the way a CSS `rgba()` value is.
pub fn parse_color_directive(message: &str) -> Option<ColorDirective> {
    let key = message.strip_prefix(COLOR_DIRECTIVE_PREFIX)?;

    let channels = key
        .split(',')
        .map(|part| part.trim().parse::<i64>().ok().map(clamp_channel))
        .collect::<Option<Vec<u8>>>();

    let directive = match channels.as_deref() {
        Some(&[r, g, b]) => ColorDirective::Parsed {
            key: key.to_string(),
            rgb: Rgb::new(r, g, b),
        },
        _ => ColorDirective::Unparsed {
            key: key.to_string(),
        },
    };
    Some(directive)
}

fn clamp_channel(value: i64) -> u8 {
    // Lossless after the clamp.
    value.clamp(0, 255) as u8
}

/// Background fill of a decoration style.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StyleFill {
    /// `rgba(r, g, b, 0.4)`.
    Rgba(Rgb),
    /// A fill whose channels could not be read; renders with `NaN` channels.
    Unresolved {
        /// The malformed directive text.
        raw: String,
    },
}

impl fmt::Display for StyleFill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgba(rgb) => write!(
                f,
                "rgba({}, {}, {}, {})",
                rgb.r, rgb.g, rgb.b, HIGHLIGHT_ALPHA
            ),
            Self::Unresolved { .. } => write!(f, "rgba(NaN, NaN, NaN, {})", HIGHLIGHT_ALPHA),
        }
    }
}

/// What to do with `Color:` directives whose remainder does not parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedColorPolicy {
    /// Group and render them with an [`StyleFill::Unresolved`] fill.
    #[default]
    Render,
    /// Ignore them as if the prefix were absent.
    Skip,
}
