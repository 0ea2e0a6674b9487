//! Delegation request parsing.
//!
//! The primary agent signals delegation by embedding a single JSON object
//! in its final answer. Parsing is deliberately tolerant: the object may
//! sit on its own line, fill the whole reply, or be wrapped in
//! surrounding prose. Anything that does not parse cleanly means no
//! delegation, and the text is returned to the user as-is.

use serde::Deserialize;
use serde_json::Value;

/// A parsed delegation marker. Transient: never persisted in raw form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationRequest {
    /// Specialist type name (e.g. "research")
    pub specialist: String,

    /// Self-contained task description for the specialist
    pub task: String,
}

#[derive(Deserialize)]
struct Marker {
    action: String,
    specialist: String,
    task: String,
}

fn try_parse(candidate: &str) -> Option<DelegationRequest> {
    let marker: Marker = serde_json::from_str(candidate).ok()?;
    if marker.action != "delegate" || marker.specialist.is_empty() {
        return None;
    }
    Some(DelegationRequest {
        specialist: marker.specialist,
        task: marker.task,
    })
}

/// Best-effort scan of a final answer for a delegation marker.
///
/// Tries each line, then the whole text, then the outermost brace span.
/// Returns `None` on any parse failure.
pub fn parse_delegation(text: &str) -> Option<DelegationRequest> {
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('{') {
            if let Some(request) = try_parse(line) {
                return Some(request);
            }
        }
    }

    let trimmed = text.trim();
    if let Some(request) = try_parse(trimmed) {
        return Some(request);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if start < end {
        return try_parse(&trimmed[start..=end]);
    }
    None
}

/// Whether a value looks like a delegation marker at all, parsed or not.
/// Used only for logging near-misses.
pub(crate) fn looks_like_marker(text: &str) -> bool {
    serde_json::from_str::<Value>(text.trim())
        .ok()
        .and_then(|v| v.get("action").cloned())
        .map(|a| a == "delegate")
        .unwrap_or(false)
}
