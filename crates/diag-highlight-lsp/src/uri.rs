//! `file://` URIs for documents, workspace folders and watched files.

use std::fmt::Write as _;
use std::path::Path;

/// URI scheme of local documents.
pub const FILE_SCHEME: &str = "file";

/// Bytes that appear unescaped in a `file://` path.
fn is_path_safe(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/' | b':')
}

/// Build a `file://` URI for `path`.
///
/// Existing paths are canonicalized first, others made absolute. On Windows separators
/// become `/` and drive paths get a leading slash (`C:\a` -> `file:///C:/a`).
pub fn path_to_file_uri(path: &Path) -> String {
    let path = path
        .canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf());
    let mut text = path.to_string_lossy().into_owned();
    if cfg!(windows) {
        text = text.replace('\\', "/");
        if let Some(rest) = text.strip_prefix("//?/") {
            text = rest.to_string();
        }
    }
    if !text.starts_with('/') {
        text.insert(0, '/');
    }

    let mut uri = String::with_capacity(text.len() + 7);
    uri.push_str("file://");
    for byte in text.bytes() {
        if is_path_safe(byte) {
            uri.push(char::from(byte));
        } else {
            let _ = write!(uri, "%{byte:02X}");
        }
    }
    uri
}

/// The scheme part of a URI (`"file"` for `file:///tmp/x`), if any.
pub fn uri_scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once(':')?;
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid = starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_missing_path_is_encoded_verbatim() {
        let uri = path_to_file_uri(Path::new("/definitely/missing/hello world/ü.txt"));
        assert_eq!(uri, "file:///definitely/missing/hello%20world/%C3%BC.txt");
        assert_eq!(uri_scheme(&uri), Some(FILE_SCHEME));
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_path_is_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join(".clientrc"), "").unwrap();

        let via_parent = dir.path().join("sub").join("..").join(".clientrc");
        let direct = dir.path().join(".clientrc");
        assert_eq!(path_to_file_uri(&via_parent), path_to_file_uri(&direct));
        assert!(path_to_file_uri(&direct).ends_with("/.clientrc"));
    }

    #[test]
    fn test_uri_scheme() {
        assert_eq!(uri_scheme("file:///tmp/x"), Some("file"));
        assert_eq!(uri_scheme("untitled:Untitled-1"), Some("untitled"));
        assert_eq!(uri_scheme("vscode-notebook-cell:/x"), Some("vscode-notebook-cell"));
        assert_eq!(uri_scheme("/tmp/x"), None);
        assert_eq!(uri_scheme(":x"), None);
        assert_eq!(uri_scheme("1abc:x"), None);
    }
}
