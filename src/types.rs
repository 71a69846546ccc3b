use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Word,
    Sentence,
    Paragraph,
}

impl SegmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentType::Word => "word",
            SegmentType::Sentence => "sentence",
            SegmentType::Paragraph => "paragraph",
        }
    }
}

/// One syncable unit of source text, in document reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSegment {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    /// Dense 0-based index in reading order.
    pub position: usize,
}

/// Time-stamped text fragment emitted by the external forced aligner.
/// Times are seconds from the start of the audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentCandidate {
    pub text: String,
    #[serde(alias = "beginTime", alias = "begin")]
    pub begin_time: f64,
    #[serde(alias = "endTime", alias = "end")]
    pub end_time: f64,
}

/// How a reconciled timestamp was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    /// Normalized candidate text equals the segment text.
    Exact,
    /// Candidate text contains, or is contained in, the segment text.
    Partial,
    /// Candidate only shares some words with the segment text.
    Fuzzy,
    /// No acceptable match; the next unused candidate was taken.
    Fallback,
    /// No unused candidate remained; the last candidate was reused.
    Reused,
    /// No candidates at all; zero-length marker.
    Placeholder,
}

impl MatchQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchQuality::Exact => "exact",
            MatchQuality::Partial => "partial",
            MatchQuality::Fuzzy => "fuzzy",
            MatchQuality::Fallback => "fallback",
            MatchQuality::Reused => "reused",
            MatchQuality::Placeholder => "placeholder",
        }
    }

    pub fn is_degraded(self) -> bool {
        matches!(
            self,
            MatchQuality::Fallback | MatchQuality::Reused | MatchQuality::Placeholder
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSegment {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub segment_type: SegmentType,
    pub start_time: f64,
    /// Not guaranteed to exceed `start_time` until spans are repaired.
    pub end_time: f64,
    pub duration_ms: u64,
    pub quality: MatchQuality,
}

impl AlignedSegment {
    pub fn span(&self) -> Span {
        Span::new(self.start_time, self.end_time)
    }

    pub fn set_span(&mut self, span: Span) {
        self.start_time = span.start;
        self.end_time = span.end;
        self.duration_ms = span.duration_ms();
    }
}

/// Silence interval reported by the external detector, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilencePeriod {
    pub start: f64,
    pub end: f64,
}

/// Child word reference handed to the word timing propagator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordRef {
    pub id: String,
    pub text: String,
}

/// A sentence id together with its included child words, in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordGroup {
    pub parent_id: String,
    pub words: Vec<WordRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub id: String,
    pub parent_id: String,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub duration_ms: u64,
}

impl WordTiming {
    pub fn span(&self) -> Span {
        Span::new(self.start_time, self.end_time)
    }

    pub fn set_span(&mut self, span: Span) {
        self.start_time = span.start;
        self.end_time = span.end;
        self.duration_ms = span.duration_ms();
    }
}

/// Start/end pair in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Rounded milliseconds; negative or non-finite durations map to zero.
    pub fn duration_ms(&self) -> u64 {
        duration_ms(self.start, self.end)
    }
}

pub(crate) fn duration_ms(start: f64, end: f64) -> u64 {
    let ms = ((end - start) * 1000.0).round();
    if ms.is_finite() && ms > 0.0 {
        ms as u64
    } else {
        0
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncInput {
    pub segments: Vec<SourceSegment>,
    pub word_groups: Vec<WordGroup>,
    pub candidates: Vec<AlignmentCandidate>,
    pub silences: Vec<SilencePeriod>,
    /// Total audio length in seconds. Derived from the candidates when absent.
    pub audio_duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutput {
    pub segments: Vec<AlignedSegment>,
    pub words: Vec<WordTiming>,
    /// Duration the reconciler worked with, explicit or derived.
    pub audio_duration: f64,
    /// Seconds added to every reconciled timestamp.
    pub preroll_offset: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_ms_rounds_and_saturates() {
        assert_eq!(duration_ms(1.0, 2.2345), 1235);
        assert_eq!(duration_ms(2.0, 1.0), 0);
        assert_eq!(duration_ms(f64::NAN, 1.0), 0);
    }

    #[test]
    fn candidate_accepts_aligner_field_names() {
        let json = r#"[
            {"text": "hello", "beginTime": 1.5, "endTime": 2.0},
            {"text": "world", "begin": 2.0, "end": 2.5},
            {"text": "again", "begin_time": 2.5, "end_time": 3.0}
        ]"#;
        let candidates: Vec<AlignmentCandidate> =
            serde_json::from_str(json).expect("valid candidate json");
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].begin_time, 1.5);
        assert_eq!(candidates[1].end_time, 2.5);
        assert_eq!(candidates[2].text, "again");
    }

    #[test]
    fn segment_type_serializes_lowercase() {
        let segment = SourceSegment {
            id: "p1-s1".to_string(),
            text: "Once upon a time.".to_string(),
            segment_type: SegmentType::Sentence,
            position: 0,
        };
        let value = serde_json::to_value(&segment).expect("serialize");
        assert_eq!(value["type"], "sentence");
    }

    #[test]
    fn degraded_qualities() {
        assert!(!MatchQuality::Exact.is_degraded());
        assert!(!MatchQuality::Fuzzy.is_degraded());
        assert!(MatchQuality::Fallback.is_degraded());
        assert!(MatchQuality::Placeholder.is_degraded());
    }
}
