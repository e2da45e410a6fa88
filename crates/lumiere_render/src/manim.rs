//! Rendering engine adapter.

use crate::process::{RunFailure, run_with_timeout, tail_lines};
use async_trait::async_trait;
use lumiere_core::RenderJob;
use lumiere_error::{RenderError, RenderErrorKind};
use lumiere_interface::Renderer;
use lumiere_rate_limit::RenderConfig;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Lines of engine stderr kept as the repair diagnostic.
pub const DIAGNOSTIC_TAIL_LINES: usize = 40;

const RESOLUTION_DIRS: &[&str] = &["480p15", "720p30", "1080p60", "1440p60", "2160p60"];

/// Renders scenes by invoking the engine as `{program} {quality} {file} {scene}`.
///
/// Every render runs in a fresh scratch directory, so concurrent sections
/// never share engine state or output paths.
#[derive(Debug, Clone)]
pub struct ManimRenderer {
    program: PathBuf,
    quality: String,
    timeout_secs: u64,
}

impl ManimRenderer {
    /// Creates a renderer.
    pub fn new(program: impl Into<PathBuf>, quality: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            quality: quality.into(),
            timeout_secs,
        }
    }

    /// Creates a renderer from configuration.
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(&config.program, &config.quality, config.timeout_secs)
    }
}

/// Places the engine may write a scene's video, in search order.
pub fn output_candidates(root: &Path, stem: &str, scene: &str) -> Vec<PathBuf> {
    let file = format!("{}.mp4", scene);
    let videos = root.join("media").join("videos");
    let nested = RESOLUTION_DIRS
        .iter()
        .map(|res| videos.join(stem).join(res).join(&file));
    let flat = RESOLUTION_DIRS.iter().map(|res| videos.join(res).join(&file));
    nested.chain(flat).collect()
}

fn file_stem(section_id: &str) -> String {
    section_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[async_trait]
impl Renderer for ManimRenderer {
    #[instrument(skip(self, job), fields(section = %job.section_id, scene = %job.entry_point))]
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        let workspace = tempfile::Builder::new()
            .prefix("lumiere-render-")
            .tempdir()
            .map_err(|e| RenderError::new(RenderErrorKind::Workspace(e.to_string())))?;

        let stem = file_stem(&job.section_id);
        let source_path = workspace.path().join(format!("{}.py", stem));
        tokio::fs::write(&source_path, &job.source)
            .await
            .map_err(|e| RenderError::new(RenderErrorKind::Workspace(e.to_string())))?;

        let mut command = Command::new(&self.program);
        command
            .arg(&self.quality)
            .arg(&source_path)
            .arg(&job.entry_point)
            .current_dir(workspace.path());

        debug!(program = %self.program.display(), "Starting render");
        let output = run_with_timeout(command, self.timeout_secs)
            .await
            .map_err(|failure| match failure {
                RunFailure::Spawn(msg) => RenderError::new(RenderErrorKind::Spawn(msg)),
                RunFailure::Timeout(secs) => RenderError::new(RenderErrorKind::Timeout(secs)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = tail_lines(&stderr, DIAGNOSTIC_TAIL_LINES);
            warn!(exit = ?output.status.code(), "Render failed");
            return Err(RenderError::new(RenderErrorKind::Failed {
                exit_code: output.status.code().unwrap_or(-1),
                diagnostic,
            }));
        }

        for candidate in output_candidates(workspace.path(), &stem, &job.entry_point) {
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                let bytes = tokio::fs::read(&candidate)
                    .await
                    .map_err(|e| RenderError::new(RenderErrorKind::Workspace(e.to_string())))?;
                debug!(path = %candidate.display(), size = bytes.len(), "Render output found");
                return Ok(bytes);
            }
        }

        Err(RenderError::new(RenderErrorKind::OutputMissing(
            job.entry_point.clone(),
        )))
    }
}
