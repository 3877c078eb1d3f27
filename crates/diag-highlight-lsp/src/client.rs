//! Minimal JSON-RPC client over a pair of byte streams (usually a child's stdio).
//!
//! The client is runtime-agnostic: a background writer thread drains an outbound channel and a
//! background reader thread forwards every decoded frame to an inbound channel. Callers poll
//! with [`LspClient::try_recv`] or block on a specific response with
//! [`LspClient::wait_for_response`].

use crate::transport::{read_message, write_message};
use serde_json::{Value, json};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
enum Outbound {
    Message(Value),
}

/// Inbound messages received from the server.
#[derive(Debug)]
pub enum Inbound {
    /// A raw JSON-RPC message value.
    Message(Value),
    /// An I/O error produced by the background reader/writer threads.
    IoError(String),
    /// The server closed its output stream.
    Closed,
}

/// A JSON-RPC/LSP client bound to one server connection.
pub struct LspClient {
    child: Option<Child>,
    tx: mpsc::Sender<Outbound>,
    rx: mpsc::Receiver<Inbound>,
    next_id: u64,
    workspace_folders: Vec<Value>,
}

impl LspClient {
    /// Spawn a server process and connect through its stdio.
    ///
    /// `stdin` / `stdout` are overridden to be piped; `stderr` is left as configured by the
    /// caller.
    pub fn spawn(mut cmd: ProcessCommand, workspace_folders: Vec<Value>) -> io::Result<Self> {
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
        let child = cmd.spawn()?;
        Self::from_child(child, workspace_folders)
    }

    /// Connect through the stdio of an already-spawned child.
    pub fn from_child(mut child: Child, workspace_folders: Vec<Value>) -> io::Result<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("Failed to open language server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("Failed to open language server stdout"))?;

        let mut client = Self::from_streams(stdout, stdin, workspace_folders);
        client.child = Some(child);
        Ok(client)
    }

    /// Connect through arbitrary streams: `reader` yields server frames, `writer` receives
    /// client frames.
    pub fn from_streams<R, W>(reader: R, writer: W, workspace_folders: Vec<Value>) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (tx_out, rx_out) = mpsc::channel::<Outbound>();
        let (tx_in, rx_in) = mpsc::channel::<Inbound>();

        {
            let tx_in = tx_in.clone();
            thread::spawn(move || write_loop(writer, rx_out, tx_in));
        }
        thread::spawn(move || read_loop(reader, tx_in));

        Self {
            child: None,
            tx: tx_out,
            rx: rx_in,
            next_id: 1,
            workspace_folders,
        }
    }

    /// OS process id of the server, when it was spawned by this client.
    pub fn server_pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Send a notification.
    pub fn notify(&self, method: &str, params: Value) -> io::Result<()> {
        self.send(json!({ "jsonrpc": "2.0", "method": method, "params": params }))
    }

    /// Send a request and return the allocated id.
    pub fn request(&mut self, method: &str, params: Value) -> io::Result<u64> {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);

        self.send(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))?;
        Ok(id)
    }

    /// Answer a server->client request.
    pub fn respond(&self, id: u64, result: Value) -> io::Result<()> {
        self.send(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
    }

    /// Answer a server->client request with an error.
    pub fn respond_error(
        &self,
        id: u64,
        code: i64,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> io::Result<()> {
        let mut error = json!({ "code": code, "message": message.into() });
        if let (Some(data), Some(obj)) = (data, error.as_object_mut()) {
            obj.insert("data".to_string(), data);
        }
        self.send(json!({ "jsonrpc": "2.0", "id": id, "error": error }))
    }

    fn send(&self, message: Value) -> io::Result<()> {
        self.tx
            .send(Outbound::Message(message))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "Writer thread stopped"))
    }

    /// Next inbound message, without blocking.
    pub fn try_recv(&self) -> Option<Inbound> {
        self.rx.try_recv().ok()
    }

    /// Block until the response for `request_id` arrives.
    ///
    /// Server->client requests received while waiting are answered through
    /// [`Self::handle_server_request`] so the server does not stall. Other messages received
    /// meanwhile are returned alongside the response so callers can process them.
    pub fn wait_for_response(
        &mut self,
        request_id: u64,
        timeout: Duration,
    ) -> io::Result<(Value, Vec<Value>)> {
        let deadline = Instant::now() + timeout;
        let mut skipped = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("Timed out waiting for response id={request_id}"),
                ));
            }

            let inbound = self.rx.recv_timeout(remaining).map_err(|err| match err {
                mpsc::RecvTimeoutError::Timeout => io::Error::new(io::ErrorKind::TimedOut, err),
                mpsc::RecvTimeoutError::Disconnected => {
                    io::Error::new(io::ErrorKind::BrokenPipe, "Language server closed the connection")
                }
            })?;

            match inbound {
                Inbound::IoError(err) => {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, err));
                }
                Inbound::Closed => {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "Language server closed the connection",
                    ));
                }
                Inbound::Message(msg) => {
                    let is_request = msg.get("method").is_some();
                    if !is_request && msg.get("id").and_then(Value::as_u64) == Some(request_id) {
                        return Ok((msg, skipped));
                    }

                    if is_request && msg.get("id").is_some() {
                        self.handle_server_request(&msg)?;
                    } else {
                        skipped.push(msg);
                    }
                }
            }
        }
    }

    /// Answer common server->client requests with safe headless defaults.
    ///
    /// Messages without an `id` are ignored.
    pub fn handle_server_request(&mut self, msg: &Value) -> io::Result<()> {
        let Some(id) = msg.get("id").and_then(Value::as_u64) else {
            return Ok(());
        };
        let method = msg.get("method").and_then(Value::as_str).unwrap_or("");

        let result = match method {
            "workspace/configuration" => {
                let item_count = msg
                    .get("params")
                    .and_then(|p| p.get("items"))
                    .and_then(Value::as_array)
                    .map(Vec::len)
                    .unwrap_or(0);

                Value::Array(std::iter::repeat_n(Value::Null, item_count).collect())
            }
            "workspace/workspaceFolders" => Value::Array(self.workspace_folders.clone()),
            "workspace/applyEdit" => json!({
                "applied": false,
                "failureReason": "diag-highlight does not apply workspace edits",
            }),
            // client/registerCapability, window/workDoneProgress/create,
            // window/showMessageRequest, workspace/*/refresh, ...
            _ => Value::Null,
        };

        tracing::trace!(method, id, "Answered server request");
        self.respond(id, result)
    }

    /// Graceful shutdown: `shutdown` request, `exit` notification, then wait for the process.
    ///
    /// The process is killed if it has not exited when `timeout` elapses. The first protocol
    /// error, if any, is returned after the process has been reaped.
    pub fn shutdown(mut self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;

        let protocol_result = self
            .request("shutdown", Value::Null)
            .and_then(|id| self.wait_for_response(id, timeout))
            .and_then(|_| self.notify("exit", Value::Null));

        let Self { child, tx, .. } = self;
        // Closing the outbound channel ends the writer thread and closes the server's stdin.
        drop(tx);

        if let Some(child) = child {
            wait_or_kill(child, deadline)?;
        }
        protocol_result
    }

    /// Drop the connection without the shutdown handshake.
    ///
    /// The server's stdin is closed; a spawned process is then killed (if still running) and
    /// reaped.
    pub fn kill(self) -> io::Result<()> {
        let Self { child, tx, .. } = self;
        drop(tx);

        let Some(mut child) = child else {
            return Ok(());
        };
        if child.try_wait()?.is_none() {
            tracing::debug!(pid = child.id(), "Killing language server");
            child.kill()?;
        }
        child.wait()?;
        Ok(())
    }
}

fn wait_or_kill(mut child: Child, deadline: Instant) -> io::Result<()> {
    loop {
        if let Some(status) = child.try_wait()? {
            tracing::debug!(%status, "Language server exited");
            return Ok(());
        }
        if Instant::now() >= deadline {
            tracing::debug!("Language server did not exit in time, killing");
            child.kill()?;
            child.wait()?;
            return Ok(());
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

fn write_loop<W: Write>(writer: W, rx: mpsc::Receiver<Outbound>, tx_in: mpsc::Sender<Inbound>) {
    let mut writer = BufWriter::new(writer);
    for msg in rx {
        match msg {
            Outbound::Message(value) => {
                if let Err(err) = write_message(&mut writer, &value) {
                    tracing::warn!("Language server write error: {err}");
                    let _ = tx_in.send(Inbound::IoError(err.to_string()));
                    break;
                }
            }
        }
    }
}

fn read_loop<R: Read>(reader: R, tx: mpsc::Sender<Inbound>) {
    let mut reader = BufReader::new(reader);
    loop {
        match read_message(&mut reader) {
            Ok(Some(value)) => {
                if tx.send(Inbound::Message(value)).is_err() {
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!("Language server closed its output");
                let _ = tx.send(Inbound::Closed);
                break;
            }
            Err(err) => {
                tracing::warn!("Language server read error: {err}");
                let _ = tx.send(Inbound::IoError(err.to_string()));
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{PipeReader, PipeWriter};

    /// A client plus the server ends of its two pipes.
    fn piped_client(folders: Vec<Value>) -> (LspClient, BufReader<PipeReader>, PipeWriter) {
        let (client_reader, server_writer) = io::pipe().unwrap();
        let (server_reader, client_writer) = io::pipe().unwrap();
        let client = LspClient::from_streams(client_reader, client_writer, folders);
        (client, BufReader::new(server_reader), server_writer)
    }

    #[test]
    fn test_server_requests_are_answered_while_waiting() {
        let folders = vec![json!({ "uri": "file:///w", "name": "w" })];
        let (mut client, mut server_in, mut server_out) = piped_client(folders.clone());

        let id = client.request("initialize", json!({})).unwrap();
        assert_eq!(client.request("other", Value::Null).unwrap(), id + 1);

        for msg in [
            json!({ "jsonrpc": "2.0", "id": 7, "method": "workspace/configuration",
                    "params": { "items": [{}, {}, {}] } }),
            json!({ "jsonrpc": "2.0", "method": "$/progress", "params": {} }),
            json!({ "jsonrpc": "2.0", "id": 8, "method": "workspace/workspaceFolders" }),
            json!({ "jsonrpc": "2.0", "id": id, "result": { "capabilities": {} } }),
        ] {
            write_message(&mut server_out, &msg).unwrap();
        }

        let (response, skipped) = client.wait_for_response(id, Duration::from_secs(5)).unwrap();
        assert_eq!(response["result"], json!({ "capabilities": {} }));
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0]["method"], "$/progress");

        let mut sent = Vec::new();
        for _ in 0..4 {
            sent.push(read_message(&mut server_in).unwrap().unwrap());
        }
        assert_eq!(sent[0]["method"], "initialize");
        assert_eq!(sent[1]["method"], "other");
        assert_eq!(sent[2], json!({ "jsonrpc": "2.0", "id": 7, "result": [null, null, null] }));
        assert_eq!(sent[3]["result"], Value::Array(folders));
    }

    #[test]
    fn test_wait_for_response_times_out() {
        let (mut client, _server_in, _server_out) = piped_client(Vec::new());
        let id = client.request("initialize", json!({})).unwrap();
        let err = client
            .wait_for_response(id, Duration::from_millis(20))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_closed_server_stream_is_broken_pipe() {
        let (mut client, _server_in, server_out) = piped_client(Vec::new());
        drop(server_out);

        let id = client.request("initialize", json!({})).unwrap();
        let err = client
            .wait_for_response(id, Duration::from_secs(5))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_kill_closes_server_input() {
        let (client, mut server_in, _server_out) = piped_client(Vec::new());
        client.notify("initialized", json!({})).unwrap();
        client.kill().unwrap();

        assert_eq!(
            read_message(&mut server_in).unwrap().unwrap()["method"],
            "initialized"
        );
        assert_eq!(read_message(&mut server_in).unwrap(), None);
    }

    #[test]
    fn test_error_response_carries_data() {
        let (client, mut server_in, _server_out) = piped_client(Vec::new());
        client
            .respond_error(3, -32601, "unsupported", Some(json!({ "method": "x" })))
            .unwrap();
        assert_eq!(
            read_message(&mut server_in).unwrap().unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "error": { "code": -32601, "message": "unsupported", "data": { "method": "x" } },
            })
        );
    }
}
