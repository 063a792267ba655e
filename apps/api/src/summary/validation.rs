//! Output checks applied before a generated summary is trusted.
//!
//! The summarizer backend can echo its own error reporting as if it were
//! content ("generation failed: ..."). Such text must never be persisted or
//! pushed, so every output is scanned for a maintained list of failure
//! markers before anything is written.

use thiserror::Error;

/// Markers used when `SUMMARY_FAILURE_MARKERS` is not set.
pub const DEFAULT_FAILURE_MARKERS: &[&str] = &[
    "service not configured",
    "generation failed",
    "analysis failed",
];

/// Case-insensitive substring patterns that identify error output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMarkers(Vec<String>);

impl Default for FailureMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_MARKERS.iter().copied())
    }
}

impl FailureMarkers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            markers
                .into_iter()
                .map(|m| m.as_ref().trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        )
    }

    /// Parses a `|`-separated list, e.g. `"AI not configured|failed to summarize"`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split('|'))
    }

    /// First marker contained in `text`, if any.
    pub fn find_in(&self, text: &str) -> Option<&str> {
        let haystack = text.to_lowercase();
        self.0
            .iter()
            .find(|m| haystack.contains(m.as_str()))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("summary is empty")]
    Empty,

    #[error("summary contains failure marker '{0}'")]
    FailureMarker(String),
}

/// Returns the trimmed text when it is usable as a summary.
pub fn validate_summary_text<'a>(
    text: &'a str,
    markers: &FailureMarkers,
) -> Result<&'a str, Rejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }
    if let Some(marker) = markers.find_in(trimmed) {
        return Err(Rejection::FailureMarker(marker.to_string()));
    }
    Ok(trimmed)
}
