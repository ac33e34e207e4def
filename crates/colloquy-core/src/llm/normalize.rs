//! Response normalization: raw provider payload -> plain text or typed error.
//!
//! Pure functions, no state. Every provider adapter funnels its response
//! body through [`parse`] so the entire zoo of response shapes is handled
//! in one place.
//!
//! The extractor chain is a fixed, explicit list. It must never depend on
//! the iteration order of the parsed structure: an unstable match order
//! could silently surface the wrong field.

use serde_json::Value;

use colloquy_types::error::NormalizeError;

/// Maximum length of the raw-body excerpt attached to parse failures.
const EXCERPT_CHARS: usize = 200;

/// Dialect hint from the calling adapter. The hinted shape is tried first;
/// the fixed chain then runs in its canonical order regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseHint {
    /// `choices[0].message.content` / `choices[0].delta.content`.
    ChatCompletion,
    /// `content[0].text`.
    Messages,
    /// Single-field `response`.
    Generation,
    #[default]
    Unspecified,
}

/// Normalize a raw response body into plain text.
///
/// - Empty body -> [`NormalizeError::Empty`].
/// - Non-JSON body -> returned as-is (trimmed).
/// - Structured `error` object -> [`NormalizeError::Structured`].
/// - `custom_path` (dot-separated) is tried before the extractor chain;
///   a miss falls through rather than erroring.
/// - No extractor match -> [`NormalizeError::Unrecognized`] with a bounded
///   excerpt.
pub fn parse(
    raw: &str,
    hint: ResponseHint,
    custom_path: Option<&str>,
) -> Result<String, NormalizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Empty);
    }

    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        // Opaque text body: surface it unchanged.
        Err(_) => return Ok(trimmed.to_string()),
    };

    if let Some(err) = structured_error(&value) {
        return Err(err);
    }

    if let Some(path) = custom_path
        && let Some(text) = walk_path(&value, path)
    {
        return Ok(text);
    }

    for extractor in extractor_chain(hint) {
        if let Some(text) = extractor(&value) {
            return Ok(text);
        }
    }

    Err(NormalizeError::Unrecognized {
        excerpt: excerpt(trimmed),
    })
}

/// Bounded excerpt for diagnostics (char-boundary safe).
pub fn excerpt(raw: &str) -> String {
    raw.chars().take(EXCERPT_CHARS).collect()
}

/// Detect an explicit error payload: `{"error": {...}}` or `{"error": "..."}`.
fn structured_error(value: &Value) -> Option<NormalizeError> {
    let err = value.get("error")?;
    match err {
        Value::String(message) => Some(NormalizeError::Structured {
            message: message.clone(),
            error_type: None,
            code: None,
        }),
        Value::Object(obj) => {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_string();
            let error_type = obj
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_string);
            let code = obj.get("code").map(scalar_to_string).filter(|c| !c.is_empty());
            Some(NormalizeError::Structured {
                message,
                error_type,
                code,
            })
        }
        _ => None,
    }
}

/// Walk a dot-separated path: object-key lookup, or integer index when the
/// current node is a sequence. Returns the stringified leaf.
fn walk_path(value: &Value, path: &str) -> Option<String> {
    let mut node = value;
    for segment in path.split('.') {
        node = match node {
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => node.get(segment)?,
        };
    }
    let text = scalar_to_string(node);
    if text.is_empty() { None } else { Some(text) }
}

/// Stringify a leaf node: strings verbatim, other scalars via display,
/// containers as compact JSON.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

type Extractor = fn(&Value) -> Option<String>;

/// Fixed-priority extractor chain; the hinted dialect is promoted to the
/// front, everything else keeps its canonical position.
fn extractor_chain(hint: ResponseHint) -> Vec<Extractor> {
    let canonical: [(ResponseHint, Extractor); 5] = [
        (ResponseHint::ChatCompletion, extract_chat_completion),
        (ResponseHint::Messages, extract_messages),
        (ResponseHint::Unspecified, extract_bare_field),
        (ResponseHint::Generation, extract_generation),
        (ResponseHint::Unspecified, extract_data_list),
    ];

    let mut chain: Vec<Extractor> = Vec::with_capacity(canonical.len());
    if hint != ResponseHint::Unspecified
        && let Some((_, promoted)) = canonical.iter().find(|(h, _)| *h == hint)
    {
        chain.push(*promoted);
    }
    for (h, extractor) in canonical {
        if hint == ResponseHint::Unspecified || h != hint {
            chain.push(extractor);
        }
    }
    chain
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// `choices[0].message.content`, else `choices[0].delta.content`.
fn extract_chat_completion(value: &Value) -> Option<String> {
    let first = value.get("choices")?.get(0)?;
    let content = first
        .pointer("/message/content")
        .or_else(|| first.pointer("/delta/content"))?;
    non_empty(content.as_str()?)
}

/// `content[0].text` (Anthropic messages shape).
fn extract_messages(value: &Value) -> Option<String> {
    let text = value.get("content")?.get(0)?.get("text")?;
    non_empty(text.as_str()?)
}

/// First present of `text|result|output|answer|reply|message`, in that order.
fn extract_bare_field(value: &Value) -> Option<String> {
    const FIELDS: [&str; 6] = ["text", "result", "output", "answer", "reply", "message"];
    for field in FIELDS {
        if let Some(text) = value.get(field).and_then(Value::as_str)
            && let Some(found) = non_empty(text)
        {
            return Some(found);
        }
    }
    None
}

/// Single-field `response` (Ollama-style generation shape).
fn extract_generation(value: &Value) -> Option<String> {
    non_empty(value.get("response")?.as_str()?)
}

/// `data[0].text`.
fn extract_data_list(value: &Value) -> Option<String> {
    non_empty(value.get("data")?.get(0)?.get("text")?.as_str()?)
}
