//! Decoration styles and the per-color range groups they are applied to.
//!
//! A [`DecorationStyle`] is an opaque, host-allocated handle describing a background fill. The
//! highlighter keeps one style per color key in a [`StyleCache`] and rebuilds the
//! [`RangeGroups`] (color key -> locations) every time highlighting is switched on.

use crate::color::StyleFill;
use crate::model::Location;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Host-allocated identifier of a decoration style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DecorationStyleId(pub u64);

/// Options used when asking the host for a new decoration style.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecorationRenderOptions {
    /// Translucent background fill.
    pub background_color: StyleFill,
}

/// A reusable visual treatment applicable to many ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecorationStyle {
    /// Host handle.
    pub id: DecorationStyleId,
    /// Options the style was created with.
    pub options: DecorationRenderOptions,
}

/// One style per color key, in order of first allocation.
#[derive(Debug, Default)]
pub struct StyleCache {
    order: Vec<String>,
    styles: HashMap<String, DecorationStyle>,
}

impl StyleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the style for `key`.
    pub fn get(&self, key: &str) -> Option<&DecorationStyle> {
        self.styles.get(key)
    }

    /// Return the style for `key`, allocating it with `create` on a miss.
    ///
    /// The boolean is `true` when a new style was allocated.
    pub fn get_or_create(
        &mut self,
        key: &str,
        options: DecorationRenderOptions,
        create: impl FnOnce(DecorationRenderOptions) -> DecorationStyle,
    ) -> (&DecorationStyle, bool) {
        let created = !self.styles.contains_key(key);
        if created {
            self.order.push(key.to_string());
            self.styles.insert(key.to_string(), create(options));
        }
        (&self.styles[key], created)
    }

    /// Iterate `(key, style)` pairs in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DecorationStyle)> {
        self.order
            .iter()
            .filter_map(|key| self.styles.get(key).map(|style| (key.as_str(), style)))
    }

    /// Number of cached styles.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no style has been allocated.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every cached style.
    pub fn clear(&mut self) {
        self.order.clear();
        self.styles.clear();
    }
}

/// Color key -> ordered locations, keys in order of first appearance.
///
/// Locations are never deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeGroups {
    groups: Vec<(String, Vec<Location>)>,
    index: HashMap<String, usize>,
}

impl RangeGroups {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `location` to the list for `key`.
    pub fn push(&mut self, key: &str, location: Location) {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.groups.push((key.to_string(), Vec::new()));
                self.index.insert(key.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.push(location);
    }

    /// Locations recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&[Location]> {
        self.index
            .get(key)
            .map(|&slot| self.groups[slot].1.as_slice())
    }

    /// Keys in order of first appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(key, _)| key.as_str())
    }

    /// Iterate `(key, locations)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Location])> {
        self.groups
            .iter()
            .map(|(key, locations)| (key.as_str(), locations.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if no key has been recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of recorded locations across all keys.
    pub fn location_count(&self) -> usize {
        self.groups.iter().map(|(_, locations)| locations.len()).sum()
    }

    /// Forget every key and location.
    pub fn clear(&mut self) {
        self.groups.clear();
        self.index.clear();
    }
}
