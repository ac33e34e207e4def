//! Multi-segment reply splitting.
//!
//! The `\n---\n` convention is a presentation-layer contract layered onto
//! a single completion call, not a backend capability: the system prompt
//! asks the model to separate independent messages with it, and this
//! module deterministically splits the reply back apart.

/// Separator a model emits between independent outbound messages.
pub const SEGMENT_SEPARATOR: &str = "\n---\n";

/// Literal marker meaning "produce no outbound message".
pub const NO_RESPONSE_SENTINEL: &str = "[NO_RESPONSE]";

/// Split a reply on the segment separator, trimming each piece and
/// dropping empties. A non-empty reply always yields at least one
/// segment: if splitting leaves nothing, the whole trimmed text is kept
/// -- a real reply must never be silently dropped.
pub fn split_reply(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let segments: Vec<String> = trimmed
        .split(SEGMENT_SEPARATOR)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect();

    if segments.is_empty() {
        vec![trimmed.to_string()]
    } else {
        segments
    }
}
