//! Message types exchanged with the remote speech/intent service.
//!
//! Outbound traffic is a single configuration message followed by any number
//! of audio chunks, both carried by [`StreamingRequest`].  Inbound traffic is
//! [`StreamingResponse`], which may carry recognition results, a completed
//! intent, synthesized audio, or any combination of them.
//!
//! The recognition message type is decoded once, here, into
//! [`RecognitionKind`]; nothing downstream inspects type names.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Audio encoding announced in the configuration message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioEncoding {
    /// Uncompressed little-endian 16-bit PCM.
    Linear16,
}

impl Default for AudioEncoding {
    fn default() -> Self {
        Self::Linear16
    }
}

/// Which flavour of remote service the stream talks to.
///
/// | Variant      | Session path                                  | Results              |
/// |--------------|-----------------------------------------------|----------------------|
/// | DetectIntent | `projects/{project_id}/agent/sessions/{call}` | transcripts, intents, audio |
/// | Transcribe   | none                                          | transcripts only     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteProfile {
    DetectIntent,
    Transcribe,
}

impl Default for RemoteProfile {
    fn default() -> Self {
        Self::DetectIntent
    }
}

/// Audio parameters for the upcoming chunk stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    /// Ask the service to end recognition after the first utterance.
    pub single_utterance: bool,
    /// Ask the service for non-final hypotheses.
    pub interim_results: bool,
}

/// A named event that triggers an intent without any speech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInput {
    pub name: String,
    pub language_code: String,
}

/// Body of the first message on every stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default)]
    pub profile: RemoteProfile,
    pub audio: InputAudioConfig,
    pub event: Option<EventInput>,
}

/// One outbound message.
///
/// Exactly one of `config` / `input_audio` is meaningful: the first message
/// has `config` set and no audio, every later message has `config == None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingRequest {
    /// Remote session path; `None` for services without sessions.
    pub session: Option<String>,
    pub config: Option<StreamingConfig>,
    #[serde(default)]
    pub input_audio: Vec<u8>,
}

impl StreamingRequest {
    /// Returns `true` for the configuration message.
    pub fn is_config(&self) -> bool {
        self.config.is_some()
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// What a recognition result represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionKind {
    /// An interim or final transcript hypothesis.
    Transcript,
    /// The service detected the end of the single utterance it listens for.
    EndOfSingleUtterance,
}

impl Default for RecognitionKind {
    fn default() -> Self {
        Self::Transcript
    }
}

/// One recognition hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechAlternative {
    pub transcript: String,
    pub confidence: f32,
}

/// A recognition result, ordered most-likely alternative first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub kind: RecognitionKind,
    #[serde(default)]
    pub alternatives: Vec<SpeechAlternative>,
    /// `true` once the service will no longer revise this result.
    #[serde(default)]
    pub is_final: bool,
    /// Likelihood the result will not change (0.0 – 1.0); interim only.
    #[serde(default)]
    pub stability: f32,
}

/// A completed intent / query match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_text: String,
    pub language_code: String,
    /// Display name of the matched intent, if any matched.
    pub intent: Option<String>,
    pub intent_confidence: f32,
    pub fulfillment_text: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

/// One inbound message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingResponse {
    #[serde(default)]
    pub recognition_results: Vec<RecognitionResult>,
    pub query_result: Option<QueryResult>,
    /// Synthesized speech to play back to the caller; empty when absent.
    #[serde(default)]
    pub output_audio: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Terminal status
// ---------------------------------------------------------------------------

/// Outcome codes for a finished stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    PermissionDenied,
    Unauthenticated,
    ResourceExhausted,
    Unavailable,
    Internal,
}

/// Terminal status reported when a stream is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub code: StatusCode,
    pub message: String,
}

impl StreamStatus {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::Ok,
            message: String::new(),
        }
    }

    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            write!(f, "{:?}", self.code)
        } else {
            write!(f, "{:?}: {}", self.code, self.message)
        }
    }
}
