//! Typed result events delivered to the host.

use std::path::PathBuf;

use serde::Serialize;

use crate::stream::SpeechAlternative;

// ---------------------------------------------------------------------------
// EventKind
// ---------------------------------------------------------------------------

/// Discriminant of a [`ResultEvent`], with a stable wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Transcription,
    Intent,
    EndOfUtterance,
    AudioProvided,
}

impl EventKind {
    /// Name used when re-publishing the event (e.g. as a channel event).
    ///
    /// ```
    /// use voice_stream_bridge::dispatch::EventKind;
    ///
    /// assert_eq!(EventKind::EndOfUtterance.name(), "end_of_utterance");
    /// ```
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Transcription => "transcription",
            EventKind::Intent => "intent",
            EventKind::EndOfUtterance => "end_of_utterance",
            EventKind::AudioProvided => "audio_provided",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// An interim or final transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    /// Text of the most likely alternative.
    pub text: String,
    pub confidence: f32,
    pub stability: f32,
    pub is_final: bool,
    /// Every alternative, most likely first.
    pub alternatives: Vec<SpeechAlternative>,
}

/// A completed intent match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentMatch {
    pub query_text: String,
    pub language_code: String,
    pub intent: Option<String>,
    pub confidence: f32,
    pub fulfillment_text: String,
    pub parameters: serde_json::Value,
}

/// Synthesized audio persisted for playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub bytes: usize,
}

// ---------------------------------------------------------------------------
// ResultEvent
// ---------------------------------------------------------------------------

/// One event surfaced to the host's response callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ResultEvent {
    Transcription(Transcript),
    Intent(IntentMatch),
    EndOfUtterance,
    AudioProvided(AudioArtifact),
}

impl ResultEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ResultEvent::Transcription(_) => EventKind::Transcription,
            ResultEvent::Intent(_) => EventKind::Intent,
            ResultEvent::EndOfUtterance => EventKind::EndOfUtterance,
            ResultEvent::AudioProvided(_) => EventKind::AudioProvided,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(EventKind::Transcription.name(), "transcription");
        assert_eq!(EventKind::Intent.name(), "intent");
        assert_eq!(EventKind::AudioProvided.to_string(), "audio_provided");
    }

    #[test]
    fn audio_event_serializes_with_path() {
        let event = ResultEvent::AudioProvided(AudioArtifact {
            path: PathBuf::from("/tmp/call_1.tmp.wav"),
            bytes: 4,
        });
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["type"], "audio_provided");
        assert_eq!(json["payload"]["path"], "/tmp/call_1.tmp.wav");
    }

    #[test]
    fn end_of_utterance_serializes_without_payload() {
        let json = serde_json::to_value(ResultEvent::EndOfUtterance).expect("serialize");
        assert_eq!(json["type"], "end_of_utterance");
    }
}
