//! Video concatenation adapter.

use crate::process::{RunFailure, run_with_timeout, tail_lines};
use async_trait::async_trait;
use lumiere_error::{MergeError, MergeErrorKind};
use lumiere_interface::Concatenator;
use lumiere_rate_limit::MergeConfig;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Concatenates segments with the ffmpeg concat demuxer, copying streams.
#[derive(Debug, Clone)]
pub struct FfmpegConcatenator {
    program: PathBuf,
    timeout_secs: u64,
}

impl FfmpegConcatenator {
    /// Creates a concatenator.
    pub fn new(program: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
        }
    }

    /// Creates a concatenator from configuration.
    pub fn from_config(config: &MergeConfig) -> Self {
        Self::new(&config.program, config.timeout_secs)
    }
}

/// Concat demuxer manifest listing `paths` in order.
pub fn manifest(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', r"'\''")))
        .collect()
}

fn workspace_error(path: &Path, e: std::io::Error) -> MergeError {
    MergeError::new(MergeErrorKind::Workspace(format!("{}: {}", path.display(), e)))
}

#[async_trait]
impl Concatenator for FfmpegConcatenator {
    #[instrument(skip(self, segments), fields(segments = segments.len()))]
    async fn concat(&self, segments: &[Vec<u8>]) -> Result<Vec<u8>, MergeError> {
        if segments.is_empty() {
            return Err(MergeError::new(MergeErrorKind::NoSegments));
        }

        let workspace = tempfile::Builder::new()
            .prefix("lumiere-merge-")
            .tempdir()
            .map_err(|e| MergeError::new(MergeErrorKind::Workspace(e.to_string())))?;

        let mut paths = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let path = workspace.path().join(format!("segment_{:04}.mp4", i));
            tokio::fs::write(&path, segment)
                .await
                .map_err(|e| workspace_error(&path, e))?;
            paths.push(path);
        }

        let list_path = workspace.path().join("concat_list.txt");
        tokio::fs::write(&list_path, manifest(&paths))
            .await
            .map_err(|e| workspace_error(&list_path, e))?;

        let output_path = workspace.path().join("merged.mp4");
        let mut command = Command::new(&self.program);
        command
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list_path)
            .args(["-c", "copy"])
            .arg(&output_path);

        debug!(program = %self.program.display(), "Starting concatenation");
        let output = run_with_timeout(command, self.timeout_secs)
            .await
            .map_err(|failure| match failure {
                RunFailure::Spawn(msg) => MergeError::new(MergeErrorKind::Spawn(msg)),
                RunFailure::Timeout(secs) => MergeError::new(MergeErrorKind::Timeout(secs)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MergeError::new(MergeErrorKind::Failed(tail_lines(&stderr, 20))));
        }

        let merged = tokio::fs::read(&output_path)
            .await
            .map_err(|e| workspace_error(&output_path, e))?;
        info!(size = merged.len(), "Merged segments");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_order_and_quoting() {
        let text = manifest(&[PathBuf::from("/a/one.mp4"), PathBuf::from("/b/it's.mp4")]);
        assert_eq!(text, "file '/a/one.mp4'\nfile '/b/it'\\''s.mp4'\n");
    }
}
