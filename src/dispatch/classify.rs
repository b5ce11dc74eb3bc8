//! Classification of inbound stream messages into [`ResultEvent`]s.
//!
//! Order of checks for one [`StreamingResponse`]:
//!
//! 1. A completed query result → [`ResultEvent::Intent`]; recognition
//!    results in the same message are not reported separately.
//! 2. Otherwise each recognition result →
//!    [`ResultEvent::EndOfUtterance`] or [`ResultEvent::Transcription`],
//!    depending on its [`RecognitionKind`].
//! 3. Independently, non-empty `output_audio` is returned alongside the
//!    events so the reader can persist it and emit
//!    [`ResultEvent::AudioProvided`].

use crate::stream::{QueryResult, RecognitionKind, RecognitionResult, StreamingResponse};

use super::event::{IntentMatch, ResultEvent, Transcript};

/// Output of [`classify`].
#[derive(Debug, Default, PartialEq)]
pub struct Classified<'a> {
    pub events: Vec<ResultEvent>,
    /// Synthesized audio carried by the message, if any.
    pub audio: Option<&'a [u8]>,
}

/// Classify one inbound message.  Pure: no I/O, no host interaction.
pub fn classify(response: &StreamingResponse) -> Classified<'_> {
    let events = match &response.query_result {
        Some(query) => vec![ResultEvent::Intent(intent_from(query))],
        None => response
            .recognition_results
            .iter()
            .map(recognition_event)
            .collect(),
    };

    let audio = (!response.output_audio.is_empty()).then_some(response.output_audio.as_slice());

    Classified { events, audio }
}

fn recognition_event(result: &RecognitionResult) -> ResultEvent {
    match result.kind {
        RecognitionKind::EndOfSingleUtterance => ResultEvent::EndOfUtterance,
        RecognitionKind::Transcript => {
            // No hypotheses still reports finality, with empty text.
            let (text, confidence) = result
                .alternatives
                .first()
                .map(|best| (best.transcript.clone(), best.confidence))
                .unwrap_or_default();
            ResultEvent::Transcription(Transcript {
                text,
                confidence,
                stability: result.stability,
                is_final: result.is_final,
                alternatives: result.alternatives.clone(),
            })
        }
    }
}

fn intent_from(query: &QueryResult) -> IntentMatch {
    IntentMatch {
        query_text: query.query_text.clone(),
        language_code: query.language_code.clone(),
        intent: query.intent.clone(),
        confidence: query.intent_confidence,
        fulfillment_text: query.fulfillment_text.clone(),
        parameters: query.parameters.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
