//! TOML configuration.
//!
//! Every field has a default matching the stock extension, so an empty file (or no file at all)
//! describes a `node server/out/server.js --stdio` server for plaintext `file:` documents that
//! watches `**/.clientrc`.
//!
//! ```toml
//! [client]
//! id = "languageServerExample"
//! name = "Language Server Example"
//!
//! [server]
//! module = "server/out/server.js"
//! runtime = "node"
//!
//! [client_options]
//! document_selector = [{ scheme = "file", language = "plaintext" }]
//! watch_patterns = ["**/.clientrc"]
//!
//! [highlight]
//! malformed_colors = "render"
//! ```

use crate::error::{ClientError, ConfigError};
use crate::file_events::{DEFAULT_WATCH_PATTERN, FileEventFilter};
use crate::language_client::{ClientOptions, DocumentFilter};
use crate::server_options::{DEBUG_EXEC_ARGS, Executable, ServerOptions, resolve_module};
use crate::uri::FILE_SCHEME;
use diag_highlight::{HighlighterOptions, MalformedColorPolicy};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    /// Client identity.
    pub client: ClientSection,
    /// Server launch description.
    pub server: ServerSection,
    /// Client behavior.
    pub client_options: ClientOptionsSection,
    /// Highlighter behavior.
    pub highlight: HighlightSection,
}

/// `[client]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    /// Client identifier.
    pub id: String,
    /// Human-readable client name.
    pub name: String,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            id: "languageServerExample".to_string(),
            name: "Language Server Example".to_string(),
        }
    }
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Server entry point, relative to the extension root unless absolute.
    pub module: String,
    /// Interpreter for `module`; empty runs `module` directly.
    pub runtime: String,
    /// Extra server arguments.
    pub args: Vec<String>,
    /// Runtime flags used in debug mode.
    pub debug_exec_args: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            module: "server/out/server.js".to_string(),
            runtime: "node".to_string(),
            args: Vec::new(),
            debug_exec_args: DEBUG_EXEC_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// One `document_selector` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentFilterSection {
    /// URI scheme (e.g. `file`).
    pub scheme: Option<String>,
    /// Language id (e.g. `plaintext`).
    pub language: Option<String>,
}

/// `[client_options]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptionsSection {
    /// Documents synchronized with the server.
    pub document_selector: Vec<DocumentFilterSection>,
    /// Globs of files whose changes are forwarded to the server.
    pub watch_patterns: Vec<String>,
    /// Maximum wait for the `initialize` response.
    pub initialize_timeout_ms: u64,
    /// Maximum wait for the server to exit after `shutdown`.
    pub shutdown_timeout_ms: u64,
}

impl Default for ClientOptionsSection {
    fn default() -> Self {
        Self {
            document_selector: vec![DocumentFilterSection {
                scheme: Some(FILE_SCHEME.to_string()),
                language: Some("plaintext".to_string()),
            }],
            watch_patterns: vec![DEFAULT_WATCH_PATTERN.to_string()],
            initialize_timeout_ms: 10_000,
            shutdown_timeout_ms: 2_000,
        }
    }
}

/// `[highlight]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightSection {
    /// `"render"` (default) or `"skip"`.
    pub malformed_colors: MalformedColorPolicy,
}

impl HighlightConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Run/debug executables, with `module` resolved against `extension_root`.
    pub fn server_options(&self, extension_root: &Path) -> ServerOptions {
        let runtime = Some(self.server.runtime.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let module = resolve_module(extension_root, &self.server.module);

        let mut run = Executable::new(module, runtime);
        run.args = self.server.args.clone();
        let mut debug = run.clone();
        debug.exec_args = self.server.debug_exec_args.clone();
        ServerOptions { run, debug }
    }

    /// Client options (document selector, watched files, timeouts).
    pub fn client_options(&self) -> Result<ClientOptions, ClientError> {
        let section = &self.client_options;
        Ok(ClientOptions {
            document_selector: section
                .document_selector
                .iter()
                .map(|f| DocumentFilter {
                    scheme: f.scheme.clone(),
                    language: f.language.clone(),
                })
                .collect(),
            file_events: FileEventFilter::new(section.watch_patterns.iter().cloned())?,
            initialize_timeout: Duration::from_millis(section.initialize_timeout_ms),
            shutdown_timeout: Duration::from_millis(section.shutdown_timeout_ms),
        })
    }

    /// Highlighter options.
    pub fn highlighter_options(&self) -> HighlighterOptions {
        HighlighterOptions {
            malformed_colors: self.highlight.malformed_colors,
        }
    }
}
