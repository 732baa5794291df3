//! Finished recordings and edited results.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// An assembled recording; immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedArtifact {
    bytes: Rc<[u8]>,
    mime_type: String,
    fragment_count: usize,
}

impl RecordedArtifact {
    /// Concatenate fragments in emission order
    pub fn assemble<I, B>(fragments: I, mime_type: &str) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        let mut bytes = Vec::new();
        let mut fragment_count = 0;
        for fragment in fragments {
            bytes.extend_from_slice(fragment.as_ref());
            fragment_count += 1;
        }
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.to_string(),
            fragment_count,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, mime_type: &str, fragment_count: usize) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.to_string(),
            fragment_count,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }
}

/// A video returned by the edit service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedArtifact {
    bytes: Rc<[u8]>,
    mime_type: String,
}

impl EditedArtifact {
    pub fn new(bytes: Vec<u8>, mime_type: &str) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// What one recording cycle produced, for the status line and the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub byte_len: usize,
    pub fragment_count: usize,
    pub duration_ms: f64,
    pub mime_type: String,
    pub start_time_utc: String,
    pub end_time_utc: String,
}

impl RecordingSummary {
    pub fn new(
        artifact: &RecordedArtifact,
        started_at_ms: f64,
        ended_at_ms: f64,
        start_time_utc: String,
        end_time_utc: String,
    ) -> Self {
        Self {
            byte_len: artifact.len(),
            fragment_count: artifact.fragment_count(),
            duration_ms: (ended_at_ms - started_at_ms).max(0.0),
            mime_type: artifact.mime_type().to_string(),
            start_time_utc,
            end_time_utc,
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.byte_len as f64 / (1024.0 * 1024.0)
    }

    /// e.g. `12.4s, 3.21 MB`
    pub fn display_line(&self) -> String {
        format!("{:.1}s, {:.2} MB", self.duration_ms / 1000.0, self.size_mb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_concatenates_in_order() {
        let artifact = RecordedArtifact::assemble(
            vec![vec![1u8, 2], vec![3], vec![4, 5, 6]],
            "video/webm",
        );
        assert_eq!(artifact.bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(artifact.fragment_count(), 3);
        assert_eq!(artifact.mime_type(), "video/webm");
    }

    #[test]
    fn test_assemble_nothing() {
        let artifact = RecordedArtifact::assemble(Vec::<Vec<u8>>::new(), "video/webm");
        assert!(artifact.is_empty());
        assert_eq!(artifact.fragment_count(), 0);
    }

    #[test]
    fn test_summary() {
        let artifact = RecordedArtifact::from_bytes(vec![0u8; 2 * 1024 * 1024], "video/webm", 4);
        let summary = RecordingSummary::new(
            &artifact,
            1_000.0,
            13_400.0,
            "2024-01-01T00:00:00.000Z".to_string(),
            "2024-01-01T00:00:12.400Z".to_string(),
        );
        assert_eq!(summary.fragment_count, 4);
        assert_eq!(summary.display_line(), "12.4s, 2.00 MB");
    }

    #[test]
    fn test_summary_clamps_negative_duration() {
        let artifact = RecordedArtifact::from_bytes(vec![1], "video/webm", 1);
        let summary =
            RecordingSummary::new(&artifact, 10.0, 5.0, String::new(), String::new());
        assert_eq!(summary.duration_ms, 0.0);
    }
}
