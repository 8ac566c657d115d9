use crate::{candidate, config::Config, document::DocumentBody};
use serde::{Deserialize, Serialize};

/// Where the start/end markers after an anchor paragraph were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MarkerScan {
    /// Inclusive paragraph range from the start marker to the end marker.
    Found { start: usize, end: usize },
    MissingStart,
    MissingEnd { start: usize },
}

impl MarkerScan {
    pub fn missing(&self) -> Option<&'static str> {
        match self {
            MarkerScan::Found { .. } => None,
            MarkerScan::MissingStart => Some("start"),
            MarkerScan::MissingEnd { .. } => Some("end"),
        }
    }
}

enum ScanState {
    SeekingStart,
    SeekingEnd { start: usize },
}

fn contains(cfg: &Config, text: &str, needle: &str) -> bool {
    !needle.is_empty() && candidate::normalize(cfg, text).contains(&candidate::normalize(cfg, needle))
}

/// First paragraph at or after `from` whose trimmed text contains `name`.
pub fn next_anchor<D: DocumentBody + ?Sized>(
    cfg: &Config,
    doc: &D,
    name: &str,
    from: usize,
) -> Option<usize> {
    (from..doc.paragraph_count()).find(|&i| {
        doc.paragraph_text(i)
            .map(|t| contains(cfg, t.trim(), name))
            .unwrap_or(false)
    })
}

/// Walks forward from the paragraph after `anchor`. A start marker seen
/// while seeking the end moves the start forward; an end marker seen before
/// any start marker ends the scan.
pub fn scan_markers<D: DocumentBody + ?Sized>(cfg: &Config, doc: &D, anchor: usize) -> MarkerScan {
    let start_marker = cfg.document.start_marker.as_str();
    let end_marker = cfg.document.end_marker.as_str();
    let mut state = ScanState::SeekingStart;

    for i in anchor + 1..doc.paragraph_count() {
        let text = doc.paragraph_text(i).unwrap_or_default();
        if contains(cfg, text, start_marker) {
            state = ScanState::SeekingEnd { start: i };
        }
        if contains(cfg, text, end_marker) {
            return match state {
                ScanState::SeekingStart => MarkerScan::MissingStart,
                ScanState::SeekingEnd { start } => MarkerScan::Found { start, end: i },
            };
        }
    }

    match state {
        ScanState::SeekingStart => MarkerScan::MissingStart,
        ScanState::SeekingEnd { start } => MarkerScan::MissingEnd { start },
    }
}
