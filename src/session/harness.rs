//! Shared fixtures for session tests: a bridge wired to a loopback remote
//! and a recording host.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use super::host::testing::RecordingHost;
use super::{Bridge, CallHost, SessionHandle};
use crate::config::{BridgeConfig, Credentials, SessionOptions};
use crate::stream::{
    LoopbackConnector, RecognitionKind, RecognitionResult, RemotePeer, SpeechAlternative,
};

/// Generous upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub bridge: Bridge,
    pub host: Arc<RecordingHost>,
    pub peers: Receiver<(String, RemotePeer)>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new(active_calls: &[&str]) -> Self {
        Self::with_finish_timeout(active_calls, Duration::from_secs(2))
    }

    pub fn with_finish_timeout(active_calls: &[&str], finish_timeout: Duration) -> Self {
        let host = Arc::new(RecordingHost::with_calls(active_calls));
        let mut config = test_config();
        config.stream.finish_timeout_ms = finish_timeout.as_millis() as u64;
        Self::build(config, host.clone(), host)
    }

    /// Wire the bridge to a custom host.  `self.host` is then unused.
    pub fn with_host(host: Arc<dyn CallHost>) -> Self {
        Self::build(test_config(), host, Arc::new(RecordingHost::default()))
    }

    pub fn with_config(config: BridgeConfig, active_calls: &[&str]) -> Self {
        let host = Arc::new(RecordingHost::with_calls(active_calls));
        Self::build(config, host.clone(), host)
    }

    fn build(mut config: BridgeConfig, host: Arc<dyn CallHost>, recorder: Arc<RecordingHost>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        if config.artifacts.dir.is_none() {
            config.artifacts.dir = Some(dir.path().join("audio"));
        }

        let key = dir.path().join("key.json");
        std::fs::write(&key, "{}").expect("write key");
        let credentials =
            Credentials::from_value("TEST_KEY", Some(key.into_os_string())).expect("credentials");

        let (connector, peers) = LoopbackConnector::new(Duration::from_millis(10));
        let bridge = Bridge::new(config, credentials, Arc::new(connector), host);

        Self {
            bridge,
            host: recorder,
            peers,
            dir,
        }
    }

    /// Start a session with default options and return it with its remote
    /// peer.
    pub fn start(&self, call_id: &str) -> (SessionHandle, RemotePeer) {
        self.start_with(call_id, &SessionOptions::default())
    }

    pub fn start_with(&self, call_id: &str, options: &SessionOptions) -> (SessionHandle, RemotePeer) {
        let session = self
            .bridge
            .start_session(call_id, options)
            .expect("start session");
        let (id, peer) = self.peers.recv_timeout(WAIT).expect("remote peer");
        assert_eq!(id, call_id);
        (session, peer)
    }
}

pub fn test_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.stream.project_id = "test-agent".into();
    config.stream.finish_timeout_ms = 2_000;
    config.stream.read_poll_ms = 10;
    config
}

/// A mono 400 Hz tone at 8 kHz, `samples` long.
pub fn frame(samples: usize) -> Vec<i16> {
    (0..samples)
        .map(|i| {
            let t = i as f32 / 8_000.0;
            ((t * 400.0 * std::f32::consts::TAU).sin() * 8_000.0) as i16
        })
        .collect()
}

pub fn final_transcript(text: &str) -> RecognitionResult {
    RecognitionResult {
        kind: RecognitionKind::Transcript,
        alternatives: vec![SpeechAlternative {
            transcript: text.into(),
            confidence: 0.9,
        }],
        is_final: true,
        stability: 0.0,
    }
}
