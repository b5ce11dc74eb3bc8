//! Persistence of synthesized audio received from the remote service.
//!
//! Each payload is written verbatim to its own file named
//! `<call id>_<n>.tmp.wav`, where `n` counts up from 1 per session.  The
//! counter belongs to the writer, so sessions never share numbering.

use std::io;
use std::path::{Path, PathBuf};

use super::event::AudioArtifact;

pub struct AudioArtifactWriter {
    dir: PathBuf,
    stem: String,
    counter: u64,
}

impl AudioArtifactWriter {
    /// Create a writer for `call_id`, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, call_id: &str) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            stem: file_stem(call_id),
            counter: 0,
        })
    }

    /// Write one payload and return where it went.
    pub fn write(&mut self, audio: &[u8]) -> io::Result<AudioArtifact> {
        self.counter += 1;
        let path = self.dir.join(format!("{}_{}.tmp.wav", self.stem, self.counter));
        std::fs::write(&path, audio)?;
        Ok(AudioArtifact {
            path,
            bytes: audio.len(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of artifacts written so far.
    pub fn written(&self) -> u64 {
        self.counter
    }
}

/// Keep call ids from escaping the artifact directory.
fn file_stem(call_id: &str) -> String {
    call_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn artifacts_are_numbered_per_writer() {
        let dir = tempdir().expect("temp dir");
        let mut a = AudioArtifactWriter::new(dir.path(), "call-a").expect("writer a");
        let mut b = AudioArtifactWriter::new(dir.path(), "call-b").expect("writer b");

        let a1 = a.write(&[1, 2]).expect("a1");
        let a2 = a.write(&[3]).expect("a2");
        let b1 = b.write(&[4, 5, 6]).expect("b1");

        assert_eq!(a1.path, dir.path().join("call-a_1.tmp.wav"));
        assert_eq!(a2.path, dir.path().join("call-a_2.tmp.wav"));
        assert_eq!(b1.path, dir.path().join("call-b_1.tmp.wav"));
        assert_eq!(b1.bytes, 3);
        assert_eq!(a.written(), 2);
    }

    #[test]
    fn payload_is_written_verbatim() {
        let dir = tempdir().expect("temp dir");
        let mut w = AudioArtifactWriter::new(dir.path(), "c").expect("writer");
        let artifact = w.write(b"RIFF....").expect("write");
        assert_eq!(std::fs::read(&artifact.path).expect("read"), b"RIFF....");
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempdir().expect("temp dir");
        let nested = dir.path().join("a").join("b");
        let w = AudioArtifactWriter::new(&nested, "c").expect("writer");
        assert!(w.dir().is_dir());
    }

    #[test]
    fn path_separators_in_call_id_are_neutralised() {
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
    }
}
