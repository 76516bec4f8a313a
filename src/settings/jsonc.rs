//! JSON-with-comments handling and source formatting detection
//!
//! Editor settings files are JSONC; `serde_json` cannot parse them
//! directly, so comments are stripped before parsing. The indentation and
//! trailing-newline style of the source text is captured on read and
//! replayed on write so a round trip does not reformat the file.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::types::Result;

/// Formatting captured from a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFormat {
    /// The detected indent string (spaces or tabs), if any.
    pub indent: Option<String>,
    pub trailing_newline: bool,
}

impl ContentFormat {
    pub fn detect(content: &str) -> Self {
        ContentFormat {
            indent: detect_indent(content),
            trailing_newline: content.ends_with('\n'),
        }
    }

    pub fn default_for(indent_width: usize) -> Self {
        ContentFormat {
            indent: Some(" ".repeat(indent_width)),
            trailing_newline: true,
        }
    }
}

/// Strip `//` and `/* */` comments from JSONC content, leaving valid JSON.
/// String literals are honored; newlines inside comments are kept so line
/// numbers in parse errors still line up.
pub fn strip_jsonc_comments(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    result.push(next);
                }
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                result.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    chars.next();
                    for nc in chars.by_ref() {
                        if nc == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    for nc in chars.by_ref() {
                        if prev == '*' && nc == '/' {
                            break;
                        }
                        if nc == '\n' {
                            result.push('\n');
                        }
                        prev = nc;
                    }
                }
                _ => result.push(c),
            },
            _ => result.push(c),
        }
    }

    result
}

/// Detect the leading whitespace of the first indented line that opens a
/// string key. Returns `None` for single-line or unindented documents.
pub fn detect_indent(content: &str) -> Option<String> {
    for line in content.lines() {
        let ws_len = line.len() - line.trim_start_matches([' ', '\t']).len();
        if ws_len > 0 && line[ws_len..].starts_with('"') {
            return Some(line[..ws_len].to_string());
        }
    }
    None
}

/// Serialize a value as pretty JSON using the captured formatting, falling
/// back to `default_indent` spaces when the source had none detected.
pub fn to_json_string<T: Serialize>(
    value: &T,
    format: &ContentFormat,
    default_indent: usize,
) -> Result<String> {
    let indent_owned;
    let indent = match &format.indent {
        Some(s) => s.as_str(),
        None => {
            indent_owned = " ".repeat(default_indent);
            &indent_owned
        }
    };

    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut ser)?;

    let mut json = String::from_utf8(out)
        .map_err(|e| crate::types::ClientError::Protocol(format!("invalid UTF-8 in JSON output: {e}")))?;
    if format.trailing_newline && !json.ends_with('\n') {
        json.push('\n');
    }
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_line_comments() {
        let src = "{\n  // a comment\n  \"words\": []\n}";
        let stripped = strip_jsonc_comments(src);
        let v: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(v["words"], json!([]));
    }

    #[test]
    fn test_strip_block_comments() {
        let src = "{ /* block\n comment */ \"a\": 1 }";
        let stripped = strip_jsonc_comments(src);
        let v: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(v["a"], json!(1));
    }

    #[test]
    fn test_slashes_inside_strings_survive() {
        let src = r#"{"url": "https://example.com/path"}"#;
        let stripped = strip_jsonc_comments(src);
        let v: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(v["url"], json!("https://example.com/path"));
    }

    #[test]
    fn test_detect_indent_two_spaces() {
        let src = "{\n  \"a\": 1\n}\n";
        assert_eq!(detect_indent(src).as_deref(), Some("  "));
    }

    #[test]
    fn test_detect_indent_tabs() {
        let src = "{\n\t\"a\": 1\n}\n";
        assert_eq!(detect_indent(src).as_deref(), Some("\t"));
    }

    #[test]
    fn test_detect_indent_none_for_flat_document() {
        assert_eq!(detect_indent(r#"{"a": 1}"#), None);
    }

    #[test]
    fn test_round_trip_preserves_detected_format() {
        let src = "{\n  \"a\": 1\n}\n";
        let format = ContentFormat::detect(src);
        let v: serde_json::Value = serde_json::from_str(src).unwrap();
        let out = to_json_string(&v, &format, 4).unwrap();
        assert_eq!(out, src);
    }

    #[test]
    fn test_no_trailing_newline_replayed() {
        let src = "{\n    \"a\": 1\n}";
        let format = ContentFormat::detect(src);
        assert!(!format.trailing_newline);
        let v: serde_json::Value = serde_json::from_str(src).unwrap();
        let out = to_json_string(&v, &format, 4).unwrap();
        assert!(!out.ends_with('\n'));
    }
}
