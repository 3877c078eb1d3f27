use diag_highlight::{MemoryWindow, StyleFill, TOGGLE_HIGHLIGHT_COMMAND};
use diag_highlight_lsp::{
    ClientError, ClientEvent, ClientOptions, ClientState, Extension, FileChangeType, LanguageClient,
    LaunchMode, LspClient, ServerOptions, read_message, write_message,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::io::{BufReader, ErrorKind, PipeReader, PipeWriter};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const DOC_URI: &str = "file:///w/sample.txt";
const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy)]
enum Script {
    /// Answer initialize, publish diagnostics on didOpen, answer shutdown.
    Cooperative,
    /// Reject initialize with an error response.
    RejectInitialize,
    /// Answer initialize, then close the output stream while still reading.
    HangUp,
}

fn respond(writer: &mut PipeWriter, id: &Value, result: Value) {
    write_message(writer, &json!({ "jsonrpc": "2.0", "id": id, "result": result })).unwrap();
}

fn notify(writer: &mut PipeWriter, method: &str, params: Value) {
    write_message(
        writer,
        &json!({ "jsonrpc": "2.0", "method": method, "params": params }),
    )
    .unwrap();
}

fn publish_colored_diagnostics(writer: &mut PipeWriter, uri: &str) {
    let range = |line: u32| {
        json!({
            "start": { "line": line, "character": 0 },
            "end": { "line": line, "character": 5 },
        })
    };
    notify(
        writer,
        "textDocument/publishDiagnostics",
        json!({
            "uri": uri,
            "version": 1,
            "diagnostics": [
                {
                    "range": range(0),
                    "severity": 3,
                    "message": "colored word",
                    "relatedInformation": [
                        { "location": { "uri": uri, "range": range(0) }, "message": "Color:255,0,0" }
                    ],
                },
                {
                    "range": range(2),
                    "severity": 2,
                    "message": "plain warning",
                },
            ],
        }),
    );
}

/// Runs a minimal server on the other end of two pipes and returns every message it received.
fn spawn_fake_server(script: Script) -> (LspClient, JoinHandle<Vec<Value>>) {
    let (client_reader, mut server_writer): (PipeReader, PipeWriter) = std::io::pipe().unwrap();
    let (server_reader, client_writer) = std::io::pipe().unwrap();

    let server = thread::spawn(move || {
        let mut reader = BufReader::new(server_reader);
        let mut received = Vec::new();
        let mut hung_up = false;
        while let Ok(Some(msg)) = read_message(&mut reader) {
            received.push(msg.clone());
            let id = msg.get("id").cloned().unwrap_or(Value::Null);
            match msg.get("method").and_then(Value::as_str).unwrap_or("") {
                "initialize" => match script {
                    Script::RejectInitialize => {
                        let error = json!({ "code": -32603, "message": "no workspace" });
                        write_message(
                            &mut server_writer,
                            &json!({ "jsonrpc": "2.0", "id": id, "error": error }),
                        )
                        .unwrap();
                    }
                    Script::Cooperative | Script::HangUp => {
                        write_message(
                            &mut server_writer,
                            &json!({
                                "jsonrpc": "2.0",
                                "id": 100,
                                "method": "workspace/configuration",
                                "params": { "items": [{ "section": "a" }, { "section": "b" }] },
                            }),
                        )
                        .unwrap();
                        respond(
                            &mut server_writer,
                            &id,
                            json!({
                                "capabilities": { "textDocumentSync": 1 },
                                "serverInfo": { "name": "fake-server", "version": "0.0.1" },
                            }),
                        );
                        if matches!(script, Script::HangUp) {
                            hung_up = true;
                            break;
                        }
                    }
                },
                "initialized" => {
                    notify(
                        &mut server_writer,
                        "window/logMessage",
                        json!({ "type": 3, "message": "ready" }),
                    );
                }
                "textDocument/didOpen" => {
                    let uri = msg["params"]["textDocument"]["uri"]
                        .as_str()
                        .unwrap()
                        .to_string();
                    publish_colored_diagnostics(&mut server_writer, &uri);
                    notify(
                        &mut server_writer,
                        "window/showMessage",
                        json!({ "type": 3, "message": "Validated sample.txt" }),
                    );
                }
                "shutdown" => respond(&mut server_writer, &id, Value::Null),
                "exit" => break,
                _ => {}
            }
        }
        if hung_up {
            drop(server_writer);
            while let Ok(Some(msg)) = read_message(&mut reader) {
                received.push(msg);
            }
        }
        received
    });

    (
        LspClient::from_streams(client_reader, client_writer, Vec::new()),
        server,
    )
}

fn new_client() -> LanguageClient {
    LanguageClient::new(
        "languageServerExample",
        "Language Server Example",
        ServerOptions::for_module("/unused/server.js", None),
        ClientOptions::default(),
    )
}

fn methods(received: &[Value]) -> Vec<&str> {
    received
        .iter()
        .filter_map(|msg| msg.get("method").and_then(Value::as_str))
        .collect()
}

#[test]
fn test_full_lifecycle_with_toggle() {
    let (connection, server) = spawn_fake_server(Script::Cooperative);
    let mut client = new_client();
    client.attach(connection).unwrap();

    assert_eq!(client.state(), ClientState::Running);
    let info = client.server_info().unwrap();
    assert_eq!(info.name, "fake-server");
    assert_eq!(info.version.as_deref(), Some("0.0.1"));

    assert!(client.open_document(DOC_URI, "plaintext", 1, "hello\n\nworld").unwrap());
    assert!(client.wait_for_diagnostics(DOC_URI, TIMEOUT));
    assert_eq!(client.diagnostics().get(DOC_URI).map(<[_]>::len), Some(2));

    let mut extension = Extension::with_client(client, Default::default()).unwrap();
    let mut window = MemoryWindow::with_editor(DOC_URI);

    // showMessage arrives right after the diagnostics; wait until it has been drained.
    let deadline = Instant::now() + TIMEOUT;
    let mut events = Vec::new();
    while window.notices().is_empty() && Instant::now() < deadline {
        events.extend(extension.poll(&mut window));
        thread::sleep(Duration::from_millis(5));
    }
    assert!(events.iter().any(|e| matches!(
        e,
        ClientEvent::Diagnostics { uri, count: 2 } if uri == DOC_URI
    )));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ClientEvent::LogMessage(p) if p.message == "ready"))
    );
    assert_eq!(window.notices(), ["Validated sample.txt"]);

    extension
        .execute_command(TOGGLE_HIGHLIGHT_COMMAND, &mut window)
        .unwrap();

    assert_eq!(window.allocated_styles().len(), 1);
    let style = &window.allocated_styles()[0];
    assert_eq!(style.options.background_color.to_string(), "rgba(255, 0, 0, 0.4)");
    assert!(matches!(
        style.options.background_color,
        StyleFill::Rgba(rgb) if rgb.r == 255 && rgb.g == 0 && rgb.b == 0
    ));
    let visible = window.editor().unwrap().visible();
    assert_eq!(visible.len(), 1);
    let locations = &visible[&style.id];
    assert_eq!(locations.len(), 1);
    assert_eq!(locations[0].uri, DOC_URI);
    assert_eq!(locations[0].range.start.line, 0);
    assert_eq!(locations[0].range.end.character, 5);
    assert_eq!(window.notices().last().map(String::as_str), Some("Added highlight!"));

    extension
        .execute_command(TOGGLE_HIGHLIGHT_COMMAND, &mut window)
        .unwrap();
    assert!(window.editor().unwrap().visible().is_empty());
    assert_eq!(window.notices().last().map(String::as_str), Some("Removed highlight!"));

    assert!(
        extension
            .client_mut()
            .notify_file_event(Path::new("/w/.clientrc"), FileChangeType::Changed)
            .unwrap()
    );
    assert!(
        !extension
            .client_mut()
            .notify_file_event(Path::new("/w/notes.txt"), FileChangeType::Changed)
            .unwrap()
    );

    assert!(extension.client_mut().close_document(DOC_URI).unwrap());
    assert!(!extension.client_mut().close_document(DOC_URI).unwrap());

    extension.deactivate().unwrap().wait().unwrap();

    let received = server.join().unwrap();
    assert_eq!(
        methods(&received),
        [
            "initialize",
            "initialized",
            "textDocument/didOpen",
            "workspace/didChangeWatchedFiles",
            "textDocument/didClose",
            "shutdown",
            "exit",
        ]
    );

    let initialize = &received[0];
    assert_eq!(
        initialize["params"]["capabilities"]["textDocument"]["publishDiagnostics"]["relatedInformation"],
        json!(true)
    );

    let configuration_reply = received
        .iter()
        .find(|msg| msg.get("id") == Some(&json!(100)))
        .unwrap();
    assert_eq!(configuration_reply["result"], json!([null, null]));

    let file_event = received
        .iter()
        .find(|msg| msg["method"] == "workspace/didChangeWatchedFiles")
        .unwrap();
    assert_eq!(
        file_event["params"],
        json!({ "changes": [{ "uri": "file:///w/.clientrc", "type": 2 }] })
    );
}

#[test]
fn test_documents_outside_selector_are_not_sent() {
    let (connection, server) = spawn_fake_server(Script::Cooperative);
    let mut client = new_client();
    client.attach(connection).unwrap();

    assert!(!client.open_document(DOC_URI, "rust", 1, "fn main() {}").unwrap());
    assert!(
        !client
            .open_document("untitled:Untitled-1", "plaintext", 1, "x")
            .unwrap()
    );
    assert!(!client.wait_for_diagnostics(DOC_URI, Duration::from_millis(50)));

    client.stop().unwrap().wait().unwrap();
    let received = server.join().unwrap();
    assert!(!methods(&received).contains(&"textDocument/didOpen"));
}

#[test]
fn test_stop_clears_diagnostics() {
    let (connection, server) = spawn_fake_server(Script::Cooperative);
    let mut client = new_client();
    client.attach(connection).unwrap();
    client.open_document(DOC_URI, "plaintext", 1, "hello").unwrap();
    assert!(client.wait_for_diagnostics(DOC_URI, TIMEOUT));

    let handle = client.stop().unwrap();
    assert_eq!(client.state(), ClientState::Stopped);
    assert_eq!(client.diagnostics().document_count(), 0);
    assert!(client.server_info().is_none());
    assert!(client.stop().is_none());

    handle.wait().unwrap();
    server.join().unwrap();
}

#[test]
fn test_initialize_error_leaves_client_stopped() {
    let (connection, server) = spawn_fake_server(Script::RejectInitialize);
    let mut client = new_client();

    let err = client.attach(connection).unwrap_err();
    assert!(err.to_string().contains("no workspace"));
    assert_eq!(client.state(), ClientState::Stopped);
    assert!(client.stop().is_none());

    // Dropping the connection closes the server's input.
    let received = server.join().unwrap();
    assert_eq!(methods(&received), ["initialize"]);
}

#[test]
fn test_server_hang_up_reports_disconnect() {
    let (connection, server) = spawn_fake_server(Script::HangUp);
    let mut client = new_client();
    client.attach(connection).unwrap();

    let deadline = Instant::now() + TIMEOUT;
    let mut events = Vec::new();
    while client.state() == ClientState::Running && Instant::now() < deadline {
        events.extend(client.poll());
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(client.state(), ClientState::Stopped);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ClientEvent::Disconnected(_)))
    );
    assert!(client.open_document(DOC_URI, "plaintext", 1, "x").is_err());

    // The disconnected client lets go of its end, so the server sees EOF.
    let received = server.join().unwrap();
    assert_eq!(methods(&received), ["initialize", "initialized"]);
}

#[cfg(unix)]
#[test]
fn test_failed_initialize_kills_the_server() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("silent-server.sh");
    let pid_file = dir.path().join("server.pid");
    std::fs::write(
        &script,
        format!("echo $$ > '{}'\nexec sleep 37\n", pid_file.display()),
    )
    .unwrap();

    let options = ClientOptions {
        initialize_timeout: Duration::from_millis(500),
        ..ClientOptions::default()
    };
    let mut client = LanguageClient::new(
        "silent",
        "Silent Server",
        ServerOptions::for_module(&script, Some("sh".to_string())),
        options,
    );

    let err = client.start(LaunchMode::Run).unwrap_err();
    assert!(matches!(&err, ClientError::Io(io) if io.kind() == ErrorKind::TimedOut));
    assert_eq!(client.state(), ClientState::Stopped);

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    let alive = Command::new("sh")
        .args(["-c", &format!("kill -0 {}", pid.trim())])
        .stderr(Stdio::null())
        .status()
        .unwrap()
        .success();
    assert!(!alive, "server process {} still running", pid.trim());
}
