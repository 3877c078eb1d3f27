//! Forwarding of workspace file events to the server.
//!
//! The client does not interpret watched files. It only tells the server that a file matching
//! one of the configured globs (by default `**/.clientrc`) was created, changed or deleted.

use crate::error::ClientError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde_json::{Value, json};
use std::path::Path;

/// Default glob of files whose changes are forwarded to the server.
pub const DEFAULT_WATCH_PATTERN: &str = "**/.clientrc";

/// LSP `FileChangeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeType {
    /// The file was created.
    Created = 1,
    /// The file was changed.
    Changed = 2,
    /// The file was deleted.
    Deleted = 3,
}

/// Compiled set of watch globs.
#[derive(Debug, Clone)]
pub struct FileEventFilter {
    patterns: Vec<String>,
    set: GlobSet,
}

impl FileEventFilter {
    /// Compile `patterns`. `*` does not cross `/`; `**` does.
    pub fn new<I, S>(patterns: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let mut glob = GlobBuilder::new(pattern);
            glob.literal_separator(true);
            let glob = glob.build().map_err(|e| ClientError::InvalidWatchPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| ClientError::InvalidWatchPattern {
                pattern: patterns.join(", "),
                message: e.to_string(),
            })?;
        Ok(Self { patterns, set })
    }

    /// The source patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns `true` if `path` matches any pattern.
    pub fn matches(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }
}

impl Default for FileEventFilter {
    fn default() -> Self {
        Self::new([DEFAULT_WATCH_PATTERN]).unwrap_or_else(|_| Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        })
    }
}

/// `workspace/didChangeWatchedFiles` params for a single change.
pub fn did_change_watched_files_params(uri: &str, kind: FileChangeType) -> Value {
    json!({ "changes": [{ "uri": uri, "type": kind as u8 }] })
}
