//! Process-level tests using stand-in shell scripts for the engine.
#![cfg(unix)]

use lumiere_core::RenderJob;
use lumiere_error::{MergeErrorKind, RenderErrorKind};
use lumiere_interface::{Concatenator, Renderer};
use lumiere_render::{FfmpegConcatenator, ManimRenderer};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn job() -> RenderJob {
    RenderJob {
        section_id: "section_1".into(),
        source: "class Section1Scene: pass\n".into(),
        entry_point: "Section1Scene".into(),
    }
}

#[tokio::test]
async fn test_successful_render_reads_output() {
    let dir = TempDir::new().unwrap();
    let engine = script(
        &dir,
        "engine_ok",
        r#"stem=$(basename "$2" .py)
mkdir -p "media/videos/$stem/480p15"
printf 'VIDEO' > "media/videos/$stem/480p15/$3.mp4""#,
    );

    let renderer = ManimRenderer::new(engine, "-ql", 30);
    let bytes = renderer.render(&job()).await.unwrap();
    assert_eq!(bytes, b"VIDEO");
}

#[tokio::test]
async fn test_failed_render_carries_diagnostic() {
    let dir = TempDir::new().unwrap();
    let engine = script(
        &dir,
        "engine_fail",
        r#"echo "Traceback (most recent call last):" >&2
echo "NameError: name 'circle' is not defined" >&2
exit 1"#,
    );

    let renderer = ManimRenderer::new(engine, "-ql", 30);
    let err = renderer.render(&job()).await.unwrap_err();
    match err.kind {
        RenderErrorKind::Failed {
            exit_code,
            diagnostic,
        } => {
            assert_eq!(exit_code, 1);
            assert!(diagnostic.contains("NameError"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_success_without_output_is_missing() {
    let dir = TempDir::new().unwrap();
    let engine = script(&dir, "engine_silent", "exit 0");

    let renderer = ManimRenderer::new(engine, "-ql", 30);
    let err = renderer.render(&job()).await.unwrap_err();
    assert!(matches!(err.kind, RenderErrorKind::OutputMissing(_)));
}

#[tokio::test]
async fn test_render_timeout() {
    let dir = TempDir::new().unwrap();
    let engine = script(&dir, "engine_slow", "sleep 10");

    let renderer = ManimRenderer::new(engine, "-ql", 1);
    let err = renderer.render(&job()).await.unwrap_err();
    assert!(matches!(err.kind, RenderErrorKind::Timeout(1)));
}

#[tokio::test]
async fn test_missing_program_is_spawn_error() {
    let renderer = ManimRenderer::new("/nonexistent/lumiere-engine", "-ql", 5);
    let err = renderer.render(&job()).await.unwrap_err();
    assert!(matches!(err.kind, RenderErrorKind::Spawn(_)));
}

#[tokio::test]
async fn test_concat_follows_manifest_order() {
    let dir = TempDir::new().unwrap();
    // Stand-in for the concat demuxer: args are -y -f concat -safe 0 -i LIST -c copy OUT
    let tool = script(
        &dir,
        "concat_tool",
        r#"list="$7"
out="${10}"
: > "$out"
sed -e "s/^file '//" -e "s/'$//" "$list" | while read -r f; do cat "$f" >> "$out"; done"#,
    );

    let concatenator = FfmpegConcatenator::new(tool, 30);
    let merged = concatenator
        .concat(&[b"A".to_vec(), b"B".to_vec(), b"C".to_vec()])
        .await
        .unwrap();
    assert_eq!(merged, b"ABC");
}

#[tokio::test]
async fn test_concat_rejects_empty() {
    let concatenator = FfmpegConcatenator::new("ffmpeg", 5);
    let err = concatenator.concat(&[]).await.unwrap_err();
    assert!(matches!(err.kind, MergeErrorKind::NoSegments));
}
