//! The language client: owns the server connection and the diagnostics it publishes.
//!
//! Lifecycle is a two-state machine. [`LanguageClient::start`] spawns the executable selected by
//! the [`LaunchMode`], runs the `initialize` handshake and moves to [`ClientState::Running`].
//! [`LanguageClient::stop`] moves back to [`ClientState::Stopped`] right away and hands the
//! shutdown sequence to a background thread; the returned [`StopHandle`] is the completion
//! signal. Transport failures are returned unchanged as [`ClientError::Io`].

use crate::client::{Inbound, LspClient};
use crate::diagnostics::DiagnosticsStore;
use crate::error::ClientError;
use crate::events::{MessageParams, MessageType, Notification};
use crate::file_events::{FileChangeType, FileEventFilter, did_change_watched_files_params};
use crate::server_options::{LaunchMode, ServerOptions};
use crate::uri::{FILE_SCHEME, path_to_file_uri, uri_scheme};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A filter selecting documents synchronized with the server. `None` fields match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    /// URI scheme (e.g. `file`).
    pub scheme: Option<String>,
    /// Language id (e.g. `plaintext`).
    pub language: Option<String>,
}

impl DocumentFilter {
    /// Returns `true` if a document with `uri` and `language_id` passes this filter.
    pub fn matches(&self, uri: &str, language_id: &str) -> bool {
        let scheme_ok = self
            .scheme
            .as_deref()
            .is_none_or(|scheme| uri_scheme(uri) == Some(scheme));
        let language_ok = self
            .language
            .as_deref()
            .is_none_or(|language| language == language_id);
        scheme_ok && language_ok
    }
}

/// Client behavior options.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Documents synchronized with the server (any filter may match).
    pub document_selector: Vec<DocumentFilter>,
    /// Files whose changes are forwarded to the server.
    pub file_events: FileEventFilter,
    /// Maximum wait for the `initialize` response.
    pub initialize_timeout: Duration,
    /// Maximum wait for the server to exit during [`LanguageClient::stop`].
    pub shutdown_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            document_selector: vec![DocumentFilter {
                scheme: Some(FILE_SCHEME.to_string()),
                language: Some("plaintext".to_string()),
            }],
            file_events: FileEventFilter::default(),
            initialize_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// Whether the client holds a live server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No connection.
    Stopped,
    /// Initialized connection.
    Running,
}

/// Server identity from the `initialize` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Optional server version.
    pub version: Option<String>,
}

/// Something observed while polling the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Diagnostics for `uri` were replaced.
    Diagnostics {
        /// Document URI.
        uri: String,
        /// Number of diagnostics now known for the document.
        count: usize,
    },
    /// `window/showMessage`
    ShowMessage(MessageParams),
    /// `window/logMessage`
    LogMessage(MessageParams),
    /// The connection failed; the client is now stopped.
    Disconnected(String),
}

/// Completion signal of [`LanguageClient::stop`].
#[derive(Debug)]
pub struct StopHandle {
    name: String,
    handle: JoinHandle<io::Result<()>>,
}

impl StopHandle {
    /// Returns `true` once the shutdown sequence has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the server has shut down.
    pub fn wait(self) -> Result<(), ClientError> {
        let result = match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(io::Error::other("shutdown thread panicked")),
        };
        match &result {
            Ok(()) => tracing::info!(client = %self.name, "Language client stopped"),
            Err(err) => tracing::warn!(client = %self.name, "Language client shutdown failed: {err}"),
        }
        result.map_err(ClientError::from)
    }
}

/// A language client bound to one server.
pub struct LanguageClient {
    id: String,
    name: String,
    server_options: ServerOptions,
    options: ClientOptions,
    workspace_root: Option<PathBuf>,
    connection: Option<LspClient>,
    server_info: Option<ServerInfo>,
    diagnostics: DiagnosticsStore,
    published: HashSet<String>,
    open_documents: HashSet<String>,
    pending_events: Vec<ClientEvent>,
}

impl LanguageClient {
    /// Create a stopped client.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        server_options: ServerOptions,
        options: ClientOptions,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            server_options,
            options,
            workspace_root: None,
            connection: None,
            server_info: None,
            diagnostics: DiagnosticsStore::new(),
            published: HashSet::new(),
            open_documents: HashSet::new(),
            pending_events: Vec::new(),
        }
    }

    /// Set the workspace folder reported to the server and used to relativize watched paths.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    /// Client identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human-readable client name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch configuration.
    pub fn server_options(&self) -> &ServerOptions {
        &self.server_options
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        if self.connection.is_some() {
            ClientState::Running
        } else {
            ClientState::Stopped
        }
    }

    /// Server identity, once initialized.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    /// Diagnostics published by the server.
    pub fn diagnostics(&self) -> &DiagnosticsStore {
        &self.diagnostics
    }

    /// Spawn the executable for `mode` and initialize it.
    pub fn start(&mut self, mode: LaunchMode) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Err(ClientError::AlreadyRunning(self.id.clone()));
        }

        let executable = self.server_options.executable(mode);
        tracing::info!(
            client = %self.id,
            ?mode,
            module = %executable.module.display(),
            "Starting language server"
        );

        let mut cmd = executable.command();
        if let Some(root) = &self.workspace_root {
            cmd.current_dir(root);
        }
        let connection = LspClient::spawn(cmd, self.workspace_folders())?;
        self.attach(connection)
    }

    /// Initialize an already-established connection and move to [`ClientState::Running`].
    pub fn attach(&mut self, mut connection: LspClient) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Err(ClientError::AlreadyRunning(self.id.clone()));
        }

        let early = match self.initialize(&mut connection) {
            Ok(early) => early,
            Err(err) => {
                tracing::warn!(client = %self.id, "Language server initialization failed: {err}");
                self.server_info = None;
                if let Err(kill_err) = connection.kill() {
                    tracing::warn!(client = %self.id, "Failed to stop language server: {kill_err}");
                }
                return Err(err);
            }
        };
        self.connection = Some(connection);

        tracing::info!(
            client = %self.id,
            server = self.server_info.as_ref().map(|i| i.name.as_str()).unwrap_or("unknown"),
            "Language client running"
        );

        for msg in early {
            self.handle_message(msg);
        }
        Ok(())
    }

    /// Run the `initialize` / `initialized` handshake and return the messages that arrived
    /// before the response.
    fn initialize(&mut self, connection: &mut LspClient) -> Result<Vec<Value>, ClientError> {
        let init_id = connection.request("initialize", self.initialize_params())?;
        let (response, early) =
            connection.wait_for_response(init_id, self.options.initialize_timeout)?;

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("initialize failed");
            return Err(io::Error::other(message.to_string()).into());
        }

        let result = response.get("result").cloned().unwrap_or(Value::Null);
        self.server_info = parse_server_info(&result);
        connection.notify("initialized", json!({}))?;
        Ok(early)
    }

    fn workspace_folders(&self) -> Vec<Value> {
        self.workspace_root
            .iter()
            .map(|root| {
                let name = root
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                json!({ "uri": path_to_file_uri(root), "name": name })
            })
            .collect()
    }

    fn initialize_params(&self) -> Value {
        let folders = self.workspace_folders();
        let root_uri = folders
            .first()
            .and_then(|f| f.get("uri"))
            .cloned()
            .unwrap_or(Value::Null);

        json!({
            "processId": std::process::id(),
            "clientInfo": { "name": self.name.as_str() },
            "rootUri": root_uri,
            "workspaceFolders": if folders.is_empty() { Value::Null } else { Value::Array(folders) },
            "capabilities": {
                "textDocument": {
                    "synchronization": { "dynamicRegistration": false, "didSave": false },
                    "publishDiagnostics": { "relatedInformation": true },
                },
                "workspace": {
                    "workspaceFolders": true,
                    "configuration": true,
                    "didChangeWatchedFiles": { "dynamicRegistration": false },
                },
            },
        })
    }

    fn connection(&self) -> Result<&LspClient, ClientError> {
        self.connection
            .as_ref()
            .ok_or_else(|| ClientError::NotRunning(self.id.clone()))
    }

    /// Send `textDocument/didOpen` if the document passes the document selector.
    ///
    /// Returns `false` (and sends nothing) for documents the server does not handle.
    pub fn open_document(
        &mut self,
        uri: &str,
        language_id: &str,
        version: i32,
        text: &str,
    ) -> Result<bool, ClientError> {
        if !self.handles_document(uri, language_id) {
            tracing::debug!(uri, language_id, "Document not selected for the server");
            return Ok(false);
        }

        self.connection()?.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": language_id,
                    "version": version,
                    "text": text,
                }
            }),
        )?;
        self.open_documents.insert(uri.to_string());
        Ok(true)
    }

    /// Send `textDocument/didClose` for a document previously opened.
    pub fn close_document(&mut self, uri: &str) -> Result<bool, ClientError> {
        if !self.open_documents.contains(uri) {
            return Ok(false);
        }
        self.connection()?.notify(
            "textDocument/didClose",
            json!({ "textDocument": { "uri": uri } }),
        )?;
        self.open_documents.remove(uri);
        Ok(true)
    }

    /// Returns `true` if the document selector accepts the document.
    pub fn handles_document(&self, uri: &str, language_id: &str) -> bool {
        self.options
            .document_selector
            .iter()
            .any(|filter| filter.matches(uri, language_id))
    }

    /// Forward a file event to the server if `path` matches a watch pattern.
    ///
    /// Returns whether a `workspace/didChangeWatchedFiles` notification was sent.
    pub fn notify_file_event(
        &mut self,
        path: &Path,
        kind: FileChangeType,
    ) -> Result<bool, ClientError> {
        let relative = self
            .workspace_root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        if !self.options.file_events.matches(relative) {
            return Ok(false);
        }

        let uri = path_to_file_uri(path);
        tracing::debug!(%uri, ?kind, "Forwarding watched file event");
        self.connection()?.notify(
            "workspace/didChangeWatchedFiles",
            did_change_watched_files_params(&uri, kind),
        )?;
        Ok(true)
    }

    /// Drain every pending inbound message without blocking.
    pub fn poll(&mut self) -> Vec<ClientEvent> {
        loop {
            let Some(inbound) = self.connection.as_ref().and_then(LspClient::try_recv) else {
                break;
            };
            let reason = match inbound {
                Inbound::Message(msg) => {
                    self.handle_message(msg);
                    continue;
                }
                Inbound::IoError(err) => {
                    tracing::warn!(client = %self.id, "Language server connection failed: {err}");
                    err
                }
                Inbound::Closed => {
                    tracing::warn!(client = %self.id, "Language server closed the connection");
                    "connection closed".to_string()
                }
            };
            self.disconnect();
            self.pending_events.push(ClientEvent::Disconnected(reason));
        }
        std::mem::take(&mut self.pending_events)
    }

    /// Drop a failed connection and reap the server process.
    fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take()
            && let Err(err) = connection.kill()
        {
            tracing::warn!(client = %self.id, "Failed to stop language server: {err}");
        }
    }

    /// Poll until the server has published diagnostics for `uri` (possibly empty).
    ///
    /// Returns `false` on timeout or when the client is not running. Events observed while
    /// waiting are kept for the next [`Self::poll`].
    pub fn wait_for_diagnostics(&mut self, uri: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let events = self.poll();
            self.pending_events.extend(events);
            if self.published.contains(uri) {
                return true;
            }
            if self.connection.is_none() || Instant::now() >= deadline {
                return false;
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    fn handle_message(&mut self, msg: Value) {
        if msg.get("method").is_some() && msg.get("id").is_some() {
            if let Some(connection) = self.connection.as_mut()
                && let Err(err) = connection.handle_server_request(&msg)
            {
                tracing::warn!("Failed to answer server request: {err}");
            }
            return;
        }

        match Notification::from_json(&msg) {
            Some(Notification::PublishDiagnostics(params)) => {
                let uri = params.uri.clone();
                self.published.insert(uri.clone());
                self.diagnostics.apply(params);
                let count = self.diagnostics.get(&uri).map_or(0, <[_]>::len);
                self.pending_events
                    .push(ClientEvent::Diagnostics { uri, count });
            }
            Some(Notification::ShowMessage(params)) => {
                log_server_message(&self.id, &params);
                self.pending_events.push(ClientEvent::ShowMessage(params));
            }
            Some(Notification::LogMessage(params)) => {
                log_server_message(&self.id, &params);
                self.pending_events.push(ClientEvent::LogMessage(params));
            }
            None => {
                let method = msg.get("method").and_then(Value::as_str).unwrap_or("");
                tracing::trace!(method, "Ignoring server message");
            }
        }
    }

    /// Shut the server down.
    ///
    /// Returns `None` when the client is not running (nothing to stop). Otherwise the client is
    /// [`ClientState::Stopped`] on return, its diagnostics are cleared, and the `shutdown` /
    /// `exit` sequence runs in the background until the returned handle completes.
    pub fn stop(&mut self) -> Option<StopHandle> {
        let connection = self.connection.take()?;
        tracing::info!(client = %self.id, "Stopping language client");

        self.diagnostics.clear();
        self.published.clear();
        self.open_documents.clear();
        self.server_info = None;

        let timeout = self.options.shutdown_timeout;
        let handle = thread::spawn(move || connection.shutdown(timeout));
        Some(StopHandle {
            name: self.id.clone(),
            handle,
        })
    }
}

impl std::fmt::Debug for LanguageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageClient")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("server_info", &self.server_info)
            .finish_non_exhaustive()
    }
}

fn parse_server_info(result: &Value) -> Option<ServerInfo> {
    let info = result.get("serverInfo")?;
    Some(ServerInfo {
        name: info.get("name")?.as_str()?.to_string(),
        version: info
            .get("version")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn log_server_message(client: &str, params: &MessageParams) {
    let message = params.message.as_str();
    match params.typ {
        MessageType::Error => tracing::error!(client, "{message}"),
        MessageType::Warning => tracing::warn!(client, "{message}"),
        MessageType::Info => tracing::info!(client, "{message}"),
        MessageType::Log => tracing::debug!(client, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped_client() -> LanguageClient {
        LanguageClient::new(
            "languageServerExample",
            "Language Server Example",
            ServerOptions::for_module("/missing/server.js", Some("node".to_string())),
            ClientOptions::default(),
        )
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let mut client = stopped_client();
        assert_eq!(client.state(), ClientState::Stopped);
        assert!(client.stop().is_none());
        assert_eq!(client.state(), ClientState::Stopped);
    }

    #[test]
    fn test_operations_need_a_connection() {
        let mut client = stopped_client();
        let err = client
            .open_document("file:///a.txt", "plaintext", 1, "")
            .unwrap_err();
        assert!(matches!(err, ClientError::NotRunning(_)));

        // Unmatched documents and files never touch the connection.
        assert!(!client.open_document("file:///a.rs", "rust", 1, "").unwrap());
        assert!(
            !client
                .notify_file_event(Path::new("/w/readme.md"), FileChangeType::Changed)
                .unwrap()
        );
        assert!(client.poll().is_empty());
        assert!(!client.wait_for_diagnostics("file:///a.txt", Duration::from_millis(1)));
    }

    #[test]
    fn test_document_selector() {
        let client = stopped_client();
        assert!(client.handles_document("file:///tmp/a.txt", "plaintext"));
        assert!(!client.handles_document("untitled:Untitled-1", "plaintext"));
        assert!(!client.handles_document("file:///tmp/a.md", "markdown"));

        let any_scheme = DocumentFilter {
            scheme: None,
            language: Some("plaintext".to_string()),
        };
        assert!(any_scheme.matches("untitled:Untitled-1", "plaintext"));
    }

    #[test]
    fn test_spawn_failure_propagates_io_error() {
        let mut client = LanguageClient::new(
            "x",
            "x",
            ServerOptions::for_module("/definitely/not/a/server-binary", None),
            ClientOptions::default(),
        );
        let err = client.start(LaunchMode::Run).unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
        assert_eq!(client.state(), ClientState::Stopped);
    }
}
