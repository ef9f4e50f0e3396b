//! Response decoding
//!
//! Model output is expected to be `{"files": [{"file_name", "content"}]}` but
//! arrives in several shapes in practice. The decoder tries each shape in turn
//! and reports which one matched; it never fails.

use once_cell::sync::Lazy;
use pagesmith_utils::types::{FileSet, GeneratedFile};
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Name of the single file produced when the response is not structured.
pub const FALLBACK_FILE: &str = "index.html";

/// A single surrounding Markdown code fence, with optional language tag.
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)\r?\n?```\z").expect("valid regex")
});

/// Which response shape was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// A JSON object with a `files` array
    Direct,
    /// A JSON string whose value is such an object
    DoubleEncoded,
    /// Unstructured text, published as `index.html`
    Fallback,
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::DoubleEncoded => write!(f, "double-encoded"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Decoded file set with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub files: FileSet,
    pub strategy: DecodeStrategy,
    /// Files whose content was itself a `{"files": [...]}` wrapper
    pub repaired: usize,
    /// Entries dropped for lack of a usable file name
    pub skipped: usize,
}

/// Trim and strip one surrounding code fence.
#[must_use]
pub fn normalize(raw: &str) -> &str {
    let trimmed = raw.trim();
    CODE_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str().trim())
}

/// Decode a raw model response into files.
#[must_use]
pub fn decode_response(raw: &str) -> Decoded {
    let normalized = normalize(raw);

    let structured = match serde_json::from_str::<Value>(normalized) {
        Ok(Value::Object(object)) => files_array(Value::Object(object))
            .map(|entries| (DecodeStrategy::Direct, entries)),
        Ok(Value::String(inner)) => serde_json::from_str::<Value>(normalize(&inner))
            .ok()
            .and_then(files_array)
            .map(|entries| (DecodeStrategy::DoubleEncoded, entries)),
        _ => None,
    };

    if let Some((strategy, entries)) = structured {
        let decoded = collect_entries(entries, strategy);
        if !decoded.files.is_empty() {
            return decoded;
        }
    }

    fallback(raw)
}

fn fallback(raw: &str) -> Decoded {
    let mut files = FileSet::new();
    files.insert(GeneratedFile::new(FALLBACK_FILE, raw));
    Decoded {
        files,
        strategy: DecodeStrategy::Fallback,
        repaired: 0,
        skipped: 0,
    }
}

/// The `files` array of a JSON object, if present.
fn files_array(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Object(mut object) => match object.remove("files") {
            Some(Value::Array(entries)) => Some(entries),
            _ => None,
        },
        _ => None,
    }
}

/// Clean a model-supplied path; `None` if unusable.
fn clean_path(name: &str) -> Option<String> {
    let mut path = name.trim();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    let path = path.trim_start_matches('/');
    let usable = !path.is_empty()
        && !path.ends_with('/')
        && path.split('/').all(|segment| segment != ".." && !segment.is_empty());
    usable.then(|| path.to_string())
}

fn content_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(text)) => text,
        None | Some(Value::Null) => String::new(),
        Some(other) => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Content of the first nested file if `content` is itself a file wrapper.
fn unwrap_nested(content: &str) -> Option<String> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let entries = serde_json::from_str::<Value>(normalize(content))
        .ok()
        .and_then(files_array)?;
    let first = entries.into_iter().next()?;
    match first {
        Value::Object(mut object) => Some(content_text(object.remove("content"))),
        _ => None,
    }
}

fn collect_entries(entries: Vec<Value>, strategy: DecodeStrategy) -> Decoded {
    let mut files = FileSet::new();
    let mut repaired = 0;
    let mut skipped = 0;

    for entry in entries {
        let Value::Object(mut object) = entry else {
            skipped += 1;
            continue;
        };
        let Some(path) = object
            .get("file_name")
            .and_then(Value::as_str)
            .and_then(clean_path)
        else {
            skipped += 1;
            continue;
        };

        let mut content = content_text(object.remove("content"));
        if let Some(inner) = unwrap_nested(&content) {
            content = inner;
            repaired += 1;
        }
        files.insert(GeneratedFile::new(path, content));
    }

    Decoded {
        files,
        strategy,
        repaired,
        skipped,
    }
}
