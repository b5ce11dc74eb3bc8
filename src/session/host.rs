//! The host (call/media layer) as seen from the bridge.

use crate::dispatch::ResultEvent;

/// Callbacks and call lookup provided by the host.
///
/// The bridge never holds a reference to the host's call object.  It only
/// knows the call id and asks [`is_call_active`](Self::is_call_active)
/// before each callback, so a call torn down by the host mid-stream is
/// detected rather than dereferenced.
///
/// All methods are invoked from the session's reader thread.
pub trait CallHost: Send + Sync {
    /// Whether the call identified by `call_id` still exists.
    fn is_call_active(&self, call_id: &str) -> bool;

    /// A result arrived for the call.
    fn on_response(&self, call_id: &str, event: &ResultEvent);

    /// The stream ended with a non-success terminal status.
    fn on_error(&self, call_id: &str, message: &str);

    /// The session is over.  Fired exactly once per started session.
    fn on_completion(&self, call_id: &str);
}

// Compile-time assertion: Arc<dyn CallHost> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: std::sync::Arc<dyn CallHost>) {}
};

// ---------------------------------------------------------------------------
// RecordingHost  (test-only)
// ---------------------------------------------------------------------------

/// A host double that records every callback.
#[cfg(test)]
pub mod testing {
    use std::collections::HashSet;
    use std::sync::{Condvar, Mutex};
    use std::time::Duration;

    use super::CallHost;
    use crate::dispatch::ResultEvent;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Callback {
        Response(String, ResultEvent),
        Error(String, String),
        Completion(String),
    }

    #[derive(Default)]
    pub struct RecordingHost {
        active: Mutex<HashSet<String>>,
        log: Mutex<Vec<Callback>>,
        changed: Condvar,
    }

    impl RecordingHost {
        pub fn with_calls(calls: &[&str]) -> Self {
            let host = Self::default();
            for call in calls {
                host.add_call(call);
            }
            host
        }

        pub fn add_call(&self, call_id: &str) {
            self.active.lock().unwrap().insert(call_id.to_string());
        }

        pub fn hang_up(&self, call_id: &str) {
            self.active.lock().unwrap().remove(call_id);
        }

        pub fn callbacks(&self) -> Vec<Callback> {
            self.log.lock().unwrap().clone()
        }

        pub fn responses(&self) -> Vec<ResultEvent> {
            self.callbacks()
                .into_iter()
                .filter_map(|c| match c {
                    Callback::Response(_, e) => Some(e),
                    _ => None,
                })
                .collect()
        }

        pub fn errors(&self) -> Vec<String> {
            self.callbacks()
                .into_iter()
                .filter_map(|c| match c {
                    Callback::Error(_, m) => Some(m),
                    _ => None,
                })
                .collect()
        }

        pub fn completions(&self) -> usize {
            self.callbacks()
                .iter()
                .filter(|c| matches!(c, Callback::Completion(_)))
                .count()
        }

        /// Block until at least `n` callbacks have been recorded.
        pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
            let log = self.log.lock().unwrap();
            let (log, _) = self
                .changed
                .wait_timeout_while(log, timeout, |log| log.len() < n)
                .unwrap();
            log.len() >= n
        }

        fn record(&self, callback: Callback) {
            self.log.lock().unwrap().push(callback);
            self.changed.notify_all();
        }
    }

    impl CallHost for RecordingHost {
        fn is_call_active(&self, call_id: &str) -> bool {
            self.active.lock().unwrap().contains(call_id)
        }

        fn on_response(&self, call_id: &str, event: &ResultEvent) {
            self.record(Callback::Response(call_id.into(), event.clone()));
        }

        fn on_error(&self, call_id: &str, message: &str) {
            self.record(Callback::Error(call_id.into(), message.into()));
        }

        fn on_completion(&self, call_id: &str) {
            self.record(Callback::Completion(call_id.into()));
        }
    }
}
