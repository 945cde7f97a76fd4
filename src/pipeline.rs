//! Sequential orchestration: markup → edges → frames → video.
//!
//! The pipeline is single-threaded on purpose; each frame write targets its
//! own path and indices are assigned before composition, so a parallel
//! version would be safe but is not needed at this scale.

use std::path::PathBuf;

use anyhow::Context as _;

use crate::{
    assets,
    compose::FrameComposer,
    config::Config,
    encode_ffmpeg::{self, CancelToken, EncodeConfig},
    error::KinreelResult,
    markup,
    model::Edge,
};

/// Read and parse the configured markup file into the ordered edge sequence.
///
/// A missing or unreadable markup file aborts the run; unrecognized lines
/// inside it are silently dropped by the parser.
pub fn load_edges(cfg: &Config) -> KinreelResult<Vec<Edge>> {
    let path = cfg.markup_path();
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read markup '{}'", path.display()))?;
    let edges = markup::parse_markup(&text);
    tracing::info!(count = edges.len(), markup = %path.display(), "parsed relationship edges");
    Ok(edges)
}

/// Compose one frame per edge, in edge order, as `frame_0000.png` onward.
#[tracing::instrument(skip(cfg, edges), fields(count = edges.len()))]
pub fn generate_frames(cfg: &Config, edges: &[Edge]) -> KinreelResult<Vec<PathBuf>> {
    let mut composer = FrameComposer::new(cfg.clone())?;
    let mut paths = Vec::with_capacity(edges.len());
    for (index, edge) in edges.iter().enumerate() {
        let path = composer.write(edge, index)?;
        tracing::info!(
            frame = index,
            left = %edge.left.name,
            relation = %edge.relation_display(),
            right = %edge.right.name,
            "generated frame"
        );
        paths.push(path);
    }
    Ok(paths)
}

/// Full run: parse, compose all frames, discover audio, assemble the video.
///
/// Returns the output video path. Encoder failure is fatal; audio absence is
/// not.
pub fn render_video(cfg: &Config, cancel: &CancelToken) -> KinreelResult<PathBuf> {
    let edges = load_edges(cfg)?;
    generate_frames(cfg, &edges)?;

    let audio = assets::find_audio(&cfg.music_path());
    match &audio {
        Some(path) => tracing::info!(audio = %path.display(), "background audio found"),
        None => tracing::info!("no background audio found"),
    }

    let enc = EncodeConfig {
        frames_dir: cfg.frames_path(),
        frame_duration_s: cfg.frame_duration_s,
        output_fps: cfg.output_fps,
        out_path: cfg.output_path(),
        audio,
        overwrite: true,
    };
    encode_ffmpeg::assemble(&enc, cancel)?;
    Ok(enc.out_path)
}
