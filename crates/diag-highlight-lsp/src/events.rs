//! Typed views of the server->client notifications the language client consumes.
//!
//! Only the subset needed here is parsed, straight from `serde_json::Value`:
//! `textDocument/publishDiagnostics` (including `relatedInformation`, which carries the color
//! directives), `window/showMessage` and `window/logMessage`.

use diag_highlight::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, Position, Range,
};
use serde_json::Value;

/// LSP `MessageType` used by `window/showMessage` and `window/logMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// An error message.
    Error,
    /// A warning message.
    Warning,
    /// An informational message.
    Info,
    /// A log message.
    Log,
}

impl MessageType {
    /// Convert the numeric LSP `MessageType` into an enum.
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Info),
            4 => Some(Self::Log),
            _ => None,
        }
    }
}

/// Parameters of `window/showMessage` and `window/logMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageParams {
    /// Message severity.
    pub typ: MessageType,
    /// Message text.
    pub message: String,
}

/// Parameters of `textDocument/publishDiagnostics`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishDiagnosticsParams {
    /// Document URI.
    pub uri: String,
    /// Optional document version.
    pub version: Option<i32>,
    /// Full replacement set of diagnostics for the document.
    pub diagnostics: Vec<Diagnostic>,
}

/// A parsed server->client notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// `textDocument/publishDiagnostics`
    PublishDiagnostics(PublishDiagnosticsParams),
    /// `window/showMessage`
    ShowMessage(MessageParams),
    /// `window/logMessage`
    LogMessage(MessageParams),
}

impl Notification {
    /// Parse a notification by method name and `params` payload.
    ///
    /// Returns `None` for methods outside the supported subset and for malformed payloads.
    pub fn from_method_and_params(method: &str, params: &Value) -> Option<Self> {
        match method {
            "textDocument/publishDiagnostics" => {
                parse_publish_diagnostics(params).map(Self::PublishDiagnostics)
            }
            "window/showMessage" => parse_message(params).map(Self::ShowMessage),
            "window/logMessage" => parse_message(params).map(Self::LogMessage),
            _ => None,
        }
    }

    /// Parse a raw JSON-RPC message, if it is a notification (no `id`).
    pub fn from_json(msg: &Value) -> Option<Self> {
        if msg.get("id").is_some() {
            return None;
        }
        let method = msg.get("method")?.as_str()?;
        let params = msg.get("params").unwrap_or(&Value::Null);
        Self::from_method_and_params(method, params)
    }
}

fn parse_message(params: &Value) -> Option<MessageParams> {
    let typ = params
        .get("type")?
        .as_u64()
        .and_then(MessageType::from_u64)?;
    let message = params.get("message")?.as_str()?.to_string();
    Some(MessageParams { typ, message })
}

fn parse_publish_diagnostics(params: &Value) -> Option<PublishDiagnosticsParams> {
    let uri = params.get("uri")?.as_str()?.to_string();
    let version = params
        .get("version")
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok());

    let diagnostics = params
        .get("diagnostics")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_diagnostic).collect())
        .unwrap_or_default();

    Some(PublishDiagnosticsParams {
        uri,
        version,
        diagnostics,
    })
}

fn parse_diagnostic(value: &Value) -> Option<Diagnostic> {
    let range = parse_range(value.get("range")?)?;
    let severity = value
        .get("severity")
        .and_then(Value::as_u64)
        .and_then(DiagnosticSeverity::from_lsp);
    let code = value.get("code").and_then(|code| match code {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let source = value
        .get("source")
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let related_information = value
        .get("relatedInformation")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_related_information).collect())
        .unwrap_or_default();

    Some(Diagnostic {
        range,
        severity,
        code,
        source,
        message,
        related_information,
    })
}

fn parse_related_information(value: &Value) -> Option<DiagnosticRelatedInformation> {
    let location = value.get("location")?;
    let uri = location.get("uri")?.as_str()?;
    let range = parse_range(location.get("range")?)?;
    let message = value.get("message")?.as_str()?.to_string();
    Some(DiagnosticRelatedInformation {
        location: Location::new(uri, range),
        message,
    })
}

fn parse_position(value: &Value) -> Option<Position> {
    let line = u32::try_from(value.get("line")?.as_u64()?).ok()?;
    let character = u32::try_from(value.get("character")?.as_u64()?).ok()?;
    Some(Position { line, character })
}

fn parse_range(value: &Value) -> Option<Range> {
    let start = parse_position(value.get("start")?)?;
    let end = parse_position(value.get("end")?)?;
    Some(Range { start, end })
}
