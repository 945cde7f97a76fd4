//! Video assembly by invoking the system `ffmpeg` binary once over the
//! written frame sequence.
//!
//! We intentionally shell out to `ffmpeg` rather than linking FFmpeg
//! libraries, to avoid native dev header/lib requirements. The argument list
//! is built as a pure function so the audio/no-audio flag sets are testable
//! without spawning anything.

use std::{
    ffi::OsString,
    io::Read as _,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::Context as _;

use crate::{
    compose::FRAME_PATTERN,
    error::{KinreelError, KinreelResult},
};

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Directory holding the `frame_%04d.png` sequence.
    pub frames_dir: PathBuf,
    /// Seconds each frame is displayed (input framerate is `1/duration`).
    pub frame_duration_s: u32,
    /// Output video frame rate.
    pub output_fps: u32,
    pub out_path: PathBuf,
    /// Background audio; looped to cover the video and clamped with
    /// `-shortest` when present.
    pub audio: Option<PathBuf>,
    pub overwrite: bool,
}

impl EncodeConfig {
    pub fn validate(&self) -> KinreelResult<()> {
        if self.frame_duration_s == 0 {
            return Err(KinreelError::validation("encode frame_duration_s must be non-zero"));
        }
        if self.output_fps == 0 {
            return Err(KinreelError::validation("encode output_fps must be non-zero"));
        }
        Ok(())
    }
}

/// Cooperative cancellation for the encoder invocation.
///
/// Triggering the token kills the child process; partial frame output is left
/// in place and is not cleaned up.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn ensure_parent_dir(path: &Path) -> KinreelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Build the full `ffmpeg` argument list for one invocation.
pub fn build_args(cfg: &EncodeConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();

    args.push(if cfg.overwrite { "-y" } else { "-n" }.into());
    args.push("-framerate".into());
    args.push(format!("1/{}", cfg.frame_duration_s).into());
    args.push("-i".into());
    args.push(cfg.frames_dir.join(FRAME_PATTERN).into());

    if let Some(audio) = &cfg.audio {
        args.push("-stream_loop".into());
        args.push("-1".into());
        args.push("-i".into());
        args.push(audio.clone().into());
    }

    args.push("-c:v".into());
    args.push("libx264".into());
    args.push("-r".into());
    args.push(cfg.output_fps.to_string().into());
    args.push("-pix_fmt".into());
    args.push("yuv420p".into());

    if cfg.audio.is_some() {
        args.push("-c:a".into());
        args.push("aac".into());
        args.push("-shortest".into());
    }

    args.push(cfg.out_path.clone().into());
    args
}

fn command_line_for_log(args: &[OsString]) -> String {
    let mut line = String::from("ffmpeg");
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

/// Run `ffmpeg` over the frame sequence and block until it finishes.
///
/// No retry: a non-zero exit is fatal and the error carries the invoked
/// command line and captured stderr for diagnosis. Cancellation through
/// `cancel` terminates the child.
pub fn assemble(cfg: &EncodeConfig, cancel: &CancelToken) -> KinreelResult<()> {
    cfg.validate()?;
    ensure_parent_dir(&cfg.out_path)?;

    if !cfg.overwrite && cfg.out_path.exists() {
        return Err(KinreelError::validation(format!(
            "output file '{}' already exists",
            cfg.out_path.display()
        )));
    }

    if !is_ffmpeg_on_path() {
        return Err(KinreelError::encode(
            "ffmpeg is required for video assembly, but was not found on PATH",
        ));
    }

    let args = build_args(cfg);
    let command_line = command_line_for_log(&args);
    tracing::info!(command = %command_line, "invoking ffmpeg");

    let mut child = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            KinreelError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

    // Drain stderr on a helper thread so the child can never block on a full
    // pipe while we poll for exit or cancellation.
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| KinreelError::encode("failed to open ffmpeg stderr (unexpected)"))?;
    let stderr_reader = std::thread::spawn(move || {
        let mut stderr = stderr;
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf);
        buf
    });

    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stderr_reader.join();
            return Err(KinreelError::encode(format!(
                "encoding cancelled, ffmpeg terminated (command was: {command_line})"
            )));
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_reader.join();
                return Err(KinreelError::encode(format!(
                    "failed to wait for ffmpeg: {e}"
                )));
            }
        }
    };

    let stderr_bytes = stderr_reader.join().unwrap_or_default();
    if !status.success() {
        let stderr_text = String::from_utf8_lossy(&stderr_bytes);
        return Err(KinreelError::encode(format!(
            "ffmpeg exited with status {status}: {} (command was: {command_line})",
            stderr_text.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cfg() -> EncodeConfig {
        EncodeConfig {
            frames_dir: PathBuf::from("frames"),
            frame_duration_s: 3,
            output_fps: 30,
            out_path: PathBuf::from("output.mp4"),
            audio: None,
            overwrite: true,
        }
    }

    fn has_arg(args: &[OsString], needle: &str) -> bool {
        args.iter().any(|a| a.to_str() == Some(needle))
    }

    #[test]
    fn validation_catches_zero_values() {
        assert!(
            EncodeConfig {
                frame_duration_s: 0,
                ..base_cfg()
            }
            .validate()
            .is_err()
        );
        assert!(
            EncodeConfig {
                output_fps: 0,
                ..base_cfg()
            }
            .validate()
            .is_err()
        );
        assert!(base_cfg().validate().is_ok());
    }

    #[test]
    fn args_without_audio_omit_audio_flags() {
        let args = build_args(&base_cfg());

        assert!(has_arg(&args, "-y"));
        assert!(has_arg(&args, "-framerate"));
        assert!(has_arg(&args, "1/3"));
        assert!(has_arg(&args, "libx264"));
        assert!(has_arg(&args, "yuv420p"));

        assert!(!has_arg(&args, "-stream_loop"));
        assert!(!has_arg(&args, "-shortest"));
        assert!(!has_arg(&args, "-c:a"));
        assert!(!has_arg(&args, "aac"));
    }

    #[test]
    fn args_with_audio_loop_and_stop_at_shortest() {
        let cfg = EncodeConfig {
            audio: Some(PathBuf::from("Music/bgm.mp3")),
            ..base_cfg()
        };
        let args = build_args(&cfg);

        assert!(has_arg(&args, "-stream_loop"));
        assert!(has_arg(&args, "-1"));
        assert!(has_arg(&args, "-c:a"));
        assert!(has_arg(&args, "aac"));
        assert!(has_arg(&args, "-shortest"));

        // Loop flags must precede the audio input they apply to.
        let audio_arg: OsString = PathBuf::from("Music/bgm.mp3").into();
        let loop_pos = args
            .iter()
            .position(|a| a.to_str() == Some("-stream_loop"))
            .unwrap();
        let audio_pos = args.iter().position(|a| *a == audio_arg).unwrap();
        assert!(loop_pos < audio_pos);
    }

    #[test]
    fn args_reference_frame_pattern_and_output() {
        let args = build_args(&base_cfg());
        let pattern = PathBuf::from("frames").join(FRAME_PATTERN);
        assert!(has_arg(&args, pattern.to_str().unwrap()));
        assert_eq!(args.last().and_then(|a| a.to_str()), Some("output.mp4"));
    }

    #[test]
    fn no_overwrite_uses_dash_n() {
        let cfg = EncodeConfig {
            overwrite: false,
            ..base_cfg()
        };
        let args = build_args(&cfg);
        assert!(has_arg(&args, "-n"));
        assert!(!has_arg(&args, "-y"));
    }

    #[test]
    fn cancel_token_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
