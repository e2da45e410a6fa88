//! Code and video artifacts owned by a single section.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Generated source implementing one section's animation.
///
/// Each section holds exactly one current code artifact. Revisions replace
/// it wholesale; the previous version only survives as a rollback snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodeArtifact {
    source: String,
}

impl CodeArtifact {
    /// Wraps generated source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Consumes the artifact, returning its source text.
    pub fn into_source(self) -> String {
        self.source
    }

    /// Hex-encoded SHA-256 of the source text.
    ///
    /// Used as the render stamp that ties a video to the code producing it.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.source.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Rendered output of a section's current code artifact.
///
/// The video records the fingerprint of the code it was rendered from and
/// is only valid for that exact code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoArtifact {
    bytes: Vec<u8>,
    code_fingerprint: String,
}

impl VideoArtifact {
    /// Creates a video rendered from `code`.
    pub fn rendered_from(code: &CodeArtifact, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            code_fingerprint: code.fingerprint(),
        }
    }

    /// Reconstructs a persisted video with its stored stamp.
    pub fn from_parts(bytes: Vec<u8>, code_fingerprint: impl Into<String>) -> Self {
        Self {
            bytes,
            code_fingerprint: code_fingerprint.into(),
        }
    }

    /// Encoded video bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Fingerprint of the producing code.
    pub fn code_fingerprint(&self) -> &str {
        &self.code_fingerprint
    }

    /// Whether this video still corresponds to `code`.
    pub fn is_valid_for(&self, code: &CodeArtifact) -> bool {
        self.code_fingerprint == code.fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let code = CodeArtifact::new("class A: pass");
        let fp = code.fingerprint();
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, CodeArtifact::new("class A: pass").fingerprint());
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_video_invalidated_by_code_change() {
        let code = CodeArtifact::new("v1");
        let video = VideoArtifact::rendered_from(&code, vec![1, 2, 3]);
        assert!(video.is_valid_for(&code));
        assert!(!video.is_valid_for(&CodeArtifact::new("v2")));
    }
}
