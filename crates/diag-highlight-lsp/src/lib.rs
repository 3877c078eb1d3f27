#![warn(missing_docs)]
//! `diag-highlight-lsp` - language client wiring for `diag-highlight`.
//!
//! This crate launches a language server, collects the diagnostics it publishes and exposes
//! them to the highlight toggle command:
//!
//! - [`transport`] / [`client`]: JSON-RPC stdio framing and a runtime-agnostic client
//! - [`server_options`]: run/debug executables and [`LaunchMode`]
//! - [`events`] / [`diagnostics`]: `publishDiagnostics` parsing and the diagnostics store
//! - [`file_events`]: forwarding of `**/.clientrc` changes to the server
//! - [`language_client`]: the Stopped/Running client lifecycle
//! - [`config`]: TOML configuration
//! - [`extension`]: activation, command dispatch and deactivation

pub mod client;
pub mod config;
pub mod diagnostics;
mod error;
pub mod events;
pub mod extension;
pub mod file_events;
pub mod language_client;
pub mod server_options;
pub mod transport;
pub mod uri;

pub use client::{Inbound, LspClient};
pub use config::HighlightConfig;
pub use diagnostics::DiagnosticsStore;
pub use error::{ClientError, ConfigError};
pub use events::{MessageParams, MessageType, Notification, PublishDiagnosticsParams};
pub use extension::{Extension, ExtensionContext};
pub use file_events::{DEFAULT_WATCH_PATTERN, FileChangeType, FileEventFilter};
pub use language_client::{
    ClientEvent, ClientOptions, ClientState, DocumentFilter, LanguageClient, ServerInfo,
    StopHandle,
};
pub use server_options::{
    DEBUG_ENV_VAR, DEBUG_EXEC_ARGS, Executable, LaunchMode, ServerOptions, TransportKind,
    resolve_module,
};
pub use transport::{read_message, write_message};
pub use uri::{FILE_SCHEME, path_to_file_uri, uri_scheme};
