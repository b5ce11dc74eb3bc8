//! Demo host: one simulated call against a scripted loopback service.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`BridgeConfig`] (path from the first argument, or the default
//!    settings file; defaults when missing).
//! 3. Discover credentials.  Missing credentials are fatal.
//! 4. Start the simulated remote service thread.
//! 5. Start a session and feed a 400 Hz tone every 20 ms on a tokio
//!    interval, printing each result event as JSON.
//! 6. Stop the session and report the terminal status.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use voice_stream_bridge::{
    config::{BridgeConfig, Credentials, SessionOptions},
    dispatch::ResultEvent,
    session::{Bridge, CallHost, FeedOutcome},
    stream::{
        LoopbackConnector, QueryResult, RecognitionKind, RecognitionResult, RemotePeer,
        SpeechAlternative, StreamStatus, StreamingResponse,
    },
};

const CALL_ID: &str = "demo-call-1";
const FRAME_MS: u64 = 20;
const CALL_FRAMES: usize = 100;

// ---------------------------------------------------------------------------
// PrintingHost
// ---------------------------------------------------------------------------

/// Prints every event as one JSON line on stdout.
struct PrintingHost {
    active: Mutex<HashSet<String>>,
}

impl PrintingHost {
    fn new() -> Self {
        Self {
            active: Mutex::new(HashSet::new()),
        }
    }

    fn answer(&self, call_id: &str) {
        if let Ok(mut active) = self.active.lock() {
            active.insert(call_id.to_string());
        }
    }

    fn hang_up(&self, call_id: &str) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(call_id);
        }
    }
}

impl CallHost for PrintingHost {
    fn is_call_active(&self, call_id: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(call_id))
            .unwrap_or(false)
    }

    fn on_response(&self, call_id: &str, event: &ResultEvent) {
        let line = serde_json::json!({
            "call": call_id,
            "event": event.kind().name(),
            "body": event,
        });
        println!("{line}");
    }

    fn on_error(&self, call_id: &str, message: &str) {
        log::error!("call {call_id}: stream error: {message}");
    }

    fn on_completion(&self, call_id: &str) {
        log::info!("call {call_id}: session complete");
    }
}

// ---------------------------------------------------------------------------
// Simulated remote service
// ---------------------------------------------------------------------------

fn transcript(text: &str, confidence: f32, is_final: bool) -> RecognitionResult {
    RecognitionResult {
        kind: RecognitionKind::Transcript,
        alternatives: vec![SpeechAlternative {
            transcript: text.into(),
            confidence,
        }],
        is_final,
        stability: if is_final { 0.0 } else { 0.6 },
    }
}

/// Answer one call: a partial transcript, a final one with end of
/// utterance, then an intent with synthesized audio once the caller stops.
fn serve_call(call_id: String, mut peer: RemotePeer) {
    let Some(first) = peer.next_request(Duration::from_secs(2)) else {
        peer.close(StreamStatus::ok());
        return;
    };
    log::info!("remote: {call_id} configured with {:?}", first.config);

    let mut packets = 0usize;
    while let Some(request) = peer.next_request(Duration::from_secs(2)) {
        packets += 1;
        log::trace!("remote: {call_id} packet {packets} ({} bytes)", request.input_audio.len());
        match packets {
            10 => {
                peer.respond(StreamingResponse {
                    recognition_results: vec![transcript("check my", 0.0, false)],
                    ..Default::default()
                });
            }
            25 => {
                peer.respond(StreamingResponse {
                    recognition_results: vec![
                        RecognitionResult {
                            kind: RecognitionKind::EndOfSingleUtterance,
                            ..Default::default()
                        },
                        transcript("check my balance", 0.92, true),
                    ],
                    ..Default::default()
                });
            }
            _ => {}
        }
    }

    peer.respond(StreamingResponse {
        query_result: Some(QueryResult {
            query_text: "check my balance".into(),
            language_code: "en-US".into(),
            intent: Some("account.balance".into()),
            intent_confidence: 0.88,
            fulfillment_text: "Your balance is 42 dollars.".into(),
            parameters: serde_json::json!({ "account": "checking" }),
        }),
        output_audio: b"RIFF\x24\x00\x00\x00WAVEfmt ".to_vec(),
        ..Default::default()
    });
    log::info!("remote: {call_id} received {packets} audio packets");
    peer.close(StreamStatus::ok());
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("voice-stream-bridge demo starting up");

    // 2. Configuration
    let loaded = match std::env::args_os().nth(1) {
        Some(path) => BridgeConfig::load_from(std::path::Path::new(&path)),
        None => BridgeConfig::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        BridgeConfig::default()
    });

    // 3. Credentials (fatal when missing)
    let credentials = Credentials::discover(&config.credentials.env_var)
        .context("cannot start without service credentials")?;

    // 4. Simulated remote service
    let (connector, peers) = LoopbackConnector::new(config.stream.read_poll());
    std::thread::Builder::new()
        .name("simulated-remote".into())
        .spawn(move || {
            while let Ok((call_id, peer)) = peers.recv() {
                serve_call(call_id, peer);
            }
        })
        .context("failed to spawn simulated remote")?;

    let host = Arc::new(PrintingHost::new());
    let frame_samples =
        (config.audio.input_rate as u64 * FRAME_MS / 1_000) as usize * config.audio.channels as usize;
    let input_rate = config.audio.input_rate as f32;
    let bridge = Bridge::new(config, credentials, Arc::new(connector), host.clone());

    // 5. One call
    host.answer(CALL_ID);
    let session = Arc::new(bridge.start_session(CALL_ID, &SessionOptions::default())?);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let status = rt.block_on(async {
        let mut ticker = tokio::time::interval(Duration::from_millis(FRAME_MS));
        let mut frame = vec![0i16; frame_samples];
        let mut sent = 0usize;
        let mut phase = 0.0f32;

        for _ in 0..CALL_FRAMES {
            ticker.tick().await;
            for sample in frame.iter_mut() {
                *sample = (phase.sin() * 6_000.0) as i16;
                phase += 400.0 * std::f32::consts::TAU / input_rate;
            }
            phase %= std::f32::consts::TAU;

            match session.feed(&frame) {
                FeedOutcome::Sent => sent += 1,
                FeedOutcome::Halted | FeedOutcome::Rejected | FeedOutcome::Closed => break,
                _ => {}
            }
        }
        log::info!("call {CALL_ID}: fed {sent} frames");

        // 6. Teardown blocks on the remote's terminal status.
        let stopping = Arc::clone(&session);
        tokio::task::spawn_blocking(move || stopping.stop()).await
    })?;

    host.hang_up(CALL_ID);
    log::info!("call {CALL_ID}: finished with {status}");
    Ok(())
}
