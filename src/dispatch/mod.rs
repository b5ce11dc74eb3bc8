//! Result dispatch: inbound messages → typed host events.
//!
//! [`classify`] is pure.  Synthesized audio is handed back raw; the reader
//! persists it with an [`AudioArtifactWriter`] and reports the file through
//! [`ResultEvent::AudioProvided`].

pub mod artifact;
pub mod classify;
pub mod event;

pub use artifact::AudioArtifactWriter;
pub use classify::{classify, Classified};
pub use event::{AudioArtifact, EventKind, IntentMatch, ResultEvent, Transcript};
