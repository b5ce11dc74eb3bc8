//! Session construction.

use std::sync::Arc;

use thiserror::Error;

use super::handle::SessionHandle;
use super::host::CallHost;
use super::reader::ReadLoop;
use crate::audio::{ResampleError, Resampler};
use crate::config::{BridgeConfig, Credentials, RemoteProfile, SessionOptions};
use crate::dispatch::AudioArtifactWriter;
use crate::stream::{intent_session_path, Connector, DuplexStreamClient, StreamSetup, TransportError};

/// Why a session could not be started.  No partial session survives any of
/// these.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("resampler initialisation failed: {0}")]
    Resampler(#[from] ResampleError),

    #[error("stream could not be opened: {0}")]
    Stream(#[from] TransportError),

    #[error("failed to spawn reader thread: {0}")]
    ReaderSpawn(#[source] std::io::Error),

    #[error("audio artifact directory is unusable: {0}")]
    Artifacts(#[source] std::io::Error),
}

/// Starts sessions for the host.  One per process.
pub struct Bridge {
    config: BridgeConfig,
    credentials: Credentials,
    connector: Arc<dyn Connector>,
    host: Arc<dyn CallHost>,
}

impl Bridge {
    /// Requires discovered [`Credentials`]; without them no session may
    /// open a stream.
    pub fn new(
        config: BridgeConfig,
        credentials: Credentials,
        connector: Arc<dyn Connector>,
        host: Arc<dyn CallHost>,
    ) -> Self {
        log::info!(
            "bridge ready: {:?} profile, {} Hz -> {} Hz, credentials {}",
            config.stream.profile,
            config.audio.input_rate,
            config.stream.sample_rate,
            credentials.key_file().display()
        );
        Self {
            config,
            credentials,
            connector,
            host,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Build the resampler, open the stream, and start its reader thread.
    ///
    /// Everything built before a failing step is released before the error
    /// is returned.
    pub fn start_session(
        &self,
        call_id: &str,
        options: &SessionOptions,
    ) -> Result<SessionHandle, SessionError> {
        let audio = &self.config.audio;
        let stream = &self.config.stream;

        let resampler = Resampler::new(
            audio.channels,
            audio.input_rate,
            stream.sample_rate,
            audio.block_frames(),
            audio.max_frame_samples,
        )?;

        let artifacts = AudioArtifactWriter::new(self.config.artifacts.resolve_dir(), call_id)
            .map_err(SessionError::Artifacts)?;

        let session_path = match stream.profile {
            RemoteProfile::DetectIntent => Some(intent_session_path(&stream.project_id, call_id)),
            RemoteProfile::Transcribe => None,
        };

        let transport = self.connector.connect(call_id)?;
        let client = DuplexStreamClient::open(
            StreamSetup {
                call_id: call_id.to_string(),
                session_path,
                config: stream.streaming_config(options),
                finish_timeout: stream.finish_timeout(),
            },
            transport,
        )?;
        let client = Arc::new(client);

        let reader = ReadLoop::new(Arc::clone(&client), Arc::clone(&self.host), artifacts);
        let reader = match reader.spawn() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("session[{call_id}]: could not start reader: {e}");
                client.half_close();
                return Err(SessionError::ReaderSpawn(e));
            }
        };

        log::info!(
            "session[{call_id}]: started ({} Hz -> {} Hz, {} ch, resampler delay {} frames)",
            resampler.input_rate(),
            resampler.output_rate(),
            resampler.channels(),
            resampler.delay_frames()
        );
        Ok(SessionHandle::new(resampler, client, reader))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::harness::{test_config, Harness, WAIT};
    use crate::stream::StreamStatus;

    #[test]
    fn unsupported_channels_fail_before_connecting() {
        let mut config = test_config();
        config.audio.channels = 0;
        let h = Harness::with_config(config, &["c"]);

        let err = h
            .bridge
            .start_session("c", &SessionOptions::default())
            .unwrap_err();

        assert!(matches!(err, SessionError::Resampler(ResampleError::UnsupportedChannels(0))));
        assert!(h.peers.try_recv().is_err());
        assert_eq!(h.host.completions(), 0);
    }

    #[test]
    fn connect_failure_is_a_stream_error() {
        let Harness {
            bridge,
            host,
            peers,
            dir: _dir,
        } = Harness::new(&["c"]);
        drop(peers);

        let err = bridge
            .start_session("c", &SessionOptions::default())
            .unwrap_err();

        assert!(matches!(err, SessionError::Stream(TransportError::Connect { .. })));
        assert!(err.to_string().contains("could not be opened"));
        assert_eq!(host.completions(), 0);
    }

    #[test]
    fn session_options_shape_the_config_message() {
        let h = Harness::new(&["c"]);
        let options = SessionOptions {
            language: Some("fr-FR".into()),
            trigger_event: Some("WELCOME".into()),
        };
        let (session, mut peer) = h.start_with("c", &options);

        let first = peer.next_request(WAIT).expect("config message");
        let config = first.config.expect("config");
        assert_eq!(config.profile, RemoteProfile::DetectIntent);
        assert_eq!(config.audio.language_code, "fr-FR");
        let event = config.event.expect("event");
        assert_eq!(event.name, "WELCOME");
        assert_eq!(event.language_code, "fr-FR");

        peer.close(StreamStatus::ok());
        session.stop();
    }

    #[test]
    fn transcribe_profile_has_no_session_path() {
        let mut config = test_config();
        config.stream.profile = RemoteProfile::Transcribe;
        let h = Harness::with_config(config, &["c"]);
        let (session, mut peer) = h.start("c");

        let first = peer.next_request(WAIT).expect("config message");
        assert!(first.is_config());
        assert!(first.session.is_none());

        peer.close(StreamStatus::ok());
        session.stop();
    }

    #[test]
    fn transcribe_profile_never_sends_a_trigger_event() {
        let mut config = test_config();
        config.stream.profile = RemoteProfile::Transcribe;
        config.stream.trigger_event = Some("WELCOME".into());
        let h = Harness::with_config(config, &["c"]);
        let options = SessionOptions {
            language: None,
            trigger_event: Some("GREETING".into()),
        };
        let (session, mut peer) = h.start_with("c", &options);

        let first = peer.next_request(WAIT).expect("config message");
        let config = first.config.expect("config");
        assert_eq!(config.profile, RemoteProfile::Transcribe);
        assert!(config.event.is_none());
        assert!(!config.audio.single_utterance);
        assert!(config.audio.interim_results);

        peer.close(StreamStatus::ok());
        session.stop();
    }

    #[test]
    fn artifacts_land_in_configured_directory() {
        use crate::dispatch::ResultEvent;
        use crate::stream::StreamingResponse;

        let h = Harness::new(&["call/7"]);
        let (session, mut peer) = h.start("call/7");

        peer.respond(StreamingResponse {
            output_audio: vec![1, 2, 3, 4],
            ..Default::default()
        });
        peer.respond(StreamingResponse {
            output_audio: vec![5, 6],
            ..Default::default()
        });
        peer.close(StreamStatus::ok());
        session.stop();

        let paths: Vec<_> = h
            .host
            .responses()
            .into_iter()
            .filter_map(|e| match e {
                ResultEvent::AudioProvided(a) => Some(a.path),
                _ => None,
            })
            .collect();
        let dir = h.dir.path().join("audio");
        assert_eq!(
            paths,
            vec![dir.join("call_7_1.tmp.wav"), dir.join("call_7_2.tmp.wav")]
        );
    }

    #[test]
    fn concurrent_sessions_are_independent() {
        let h = Harness::new(&["a", "b"]);
        let (first, mut peer_a) = h.start("a");
        let (second, mut peer_b) = h.start("b");

        peer_a.close(StreamStatus::ok());
        first.stop();
        assert_eq!(h.host.completions(), 1);

        peer_b.close(StreamStatus::ok());
        second.stop();
        assert_eq!(h.host.completions(), 2);
    }
}
