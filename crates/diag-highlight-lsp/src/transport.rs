//! JSON-RPC stdio framing.
//!
//! Every message is a JSON value preceded by HTTP-like headers:
//!
//! ```text
//! Content-Length: <n>\r\n
//! \r\n
//! <n bytes of UTF-8 JSON>
//! ```

use serde_json::Value;
use std::io::{self, BufRead, Write};

const CONTENT_LENGTH: &str = "Content-Length";

fn invalid_data(message: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

/// Write one framed message to `writer` and flush it.
pub fn write_message<W: Write>(writer: &mut W, value: &Value) -> io::Result<()> {
    let body = serde_json::to_vec(value).map_err(invalid_data)?;
    let mut frame = format!("{CONTENT_LENGTH}: {}\r\n\r\n", body.len()).into_bytes();
    frame.extend_from_slice(&body);

    writer.write_all(&frame)?;
    writer.flush()
}

/// Read one framed message from `reader`.
///
/// Returns `Ok(None)` on a clean EOF before any header byte. A stream that ends inside a frame
/// is `UnexpectedEof`; a missing or unparsable length and a body that is not JSON are
/// `InvalidData`.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<Value>> {
    let Some(len) = read_content_length(reader)? else {
        return Ok(None);
    };

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    serde_json::from_slice(&body).map(Some).map_err(invalid_data)
}

/// Consume the header block and return the announced body length.
fn read_content_length<R: BufRead>(reader: &mut R) -> io::Result<Option<usize>> {
    let mut content_length = None;
    let mut line = String::new();
    let mut first = true;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            if first {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stream ended inside message headers",
            ));
        }
        first = false;

        let header = line.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }

        // Content-Type and unknown headers are ignored.
        let Some((name, value)) = header.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let len = value
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid_data(format!("invalid Content-Length {:?}", value.trim())))?;
            content_length = Some(len);
        }
    }

    content_length
        .map(Some)
        .ok_or_else(|| invalid_data("missing Content-Length header"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_reads_consecutive_frames_then_eof() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!({ "id": 1 })).unwrap();
        write_message(&mut buf, &json!({ "method": "exit" })).unwrap();

        let mut reader = Cursor::new(buf);
        assert_eq!(read_message(&mut reader).unwrap(), Some(json!({ "id": 1 })));
        assert_eq!(
            read_message(&mut reader).unwrap(),
            Some(json!({ "method": "exit" }))
        );
        assert_eq!(read_message(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_frame_layout() {
        let mut buf = Vec::new();
        write_message(&mut buf, &json!([])).unwrap();
        assert_eq!(buf, b"Content-Length: 2\r\n\r\n[]");
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let body = r#"{"ok":true}"#;
        let raw = format!(
            "content-length: {}\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{}",
            body.len(),
            body
        );
        let mut reader = Cursor::new(raw.into_bytes());
        assert_eq!(read_message(&mut reader).unwrap(), Some(json!({ "ok": true })));
    }

    #[test]
    fn test_missing_or_bad_length_is_invalid_data() {
        for raw in [
            &b"Content-Type: x\r\n\r\n{}"[..],
            &b"Content-Length: two\r\n\r\n{}"[..],
        ] {
            let err = read_message(&mut Cursor::new(raw.to_vec())).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        }
    }

    #[test]
    fn test_bad_json_is_invalid_data() {
        let mut reader = Cursor::new(b"Content-Length: 3\r\n\r\n{x}".to_vec());
        let err = read_message(&mut reader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_frames_are_unexpected_eof() {
        for raw in [&b"Content-Length: 10\r\n"[..], &b"Content-Length: 10\r\n\r\n{}"[..]] {
            let err = read_message(&mut Cursor::new(raw.to_vec())).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        }
    }
}
