use std::path::{Path, PathBuf};

use crate::error::{KinreelError, KinreelResult};

/// Global configuration for one run.
///
/// Everything file-shaped is interpreted relative to `root`, which mirrors
/// the on-disk convention the markup lives in: avatar directories named
/// `id+name` and a `Music/` directory sit next to the markup file.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Working root containing the markup file and sibling asset directories.
    pub root: PathBuf,
    /// Markup file name, relative to `root`.
    pub markup: PathBuf,
    /// Frame output directory, relative to `root`.
    pub frames_dir: PathBuf,
    /// Final video path, relative to `root`.
    pub output: PathBuf,
    /// Audio directory scanned for the first recognized audio file.
    pub music_dir: PathBuf,
    /// Font file candidates, tried in order; first readable file wins.
    pub font_candidates: Vec<PathBuf>,

    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Background color, straight RGBA8.
    pub bg_rgba: [u8; 4],
    /// Text color, straight RGBA8.
    pub text_rgba: [u8; 4],
    /// Maximum avatar bounding box (width, height); avatars only downscale.
    pub avatar_max: (u32, u32),

    pub name_size_px: f32,
    pub title_size_px: f32,
    pub relation_size_px: f32,

    /// Seconds each frame is displayed.
    pub frame_duration_s: u32,
    /// Output video frame rate.
    pub output_fps: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            markup: PathBuf::from("Relations.md"),
            frames_dir: PathBuf::from("frames"),
            output: PathBuf::from("output.mp4"),
            music_dir: PathBuf::from("Music"),
            font_candidates: vec![
                PathBuf::from("C:/Windows/Fonts/msyh.ttc"),
                PathBuf::from("C:/Windows/Fonts/simhei.ttf"),
                PathBuf::from("/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc"),
                PathBuf::from("/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc"),
                PathBuf::from("/System/Library/Fonts/PingFang.ttc"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            ],
            canvas_width: 1920,
            canvas_height: 1080,
            bg_rgba: [255, 255, 255, 255],
            text_rgba: [0, 0, 0, 255],
            avatar_max: (500, 500),
            name_size_px: 60.0,
            title_size_px: 40.0,
            relation_size_px: 50.0,
            frame_duration_s: 3,
            output_fps: 30,
        }
    }
}

impl Config {
    pub fn validate(&self) -> KinreelResult<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(KinreelError::validation("canvas width/height must be > 0"));
        }
        if self.canvas_width > u16::MAX as u32 || self.canvas_height > u16::MAX as u32 {
            // The CPU rasterizer addresses pixmaps with u16 coordinates.
            return Err(KinreelError::validation("canvas width/height must fit in u16"));
        }
        if self.avatar_max.0 == 0 || self.avatar_max.1 == 0 {
            return Err(KinreelError::validation("avatar_max must be > 0"));
        }
        if self.frame_duration_s == 0 {
            return Err(KinreelError::validation("frame_duration_s must be > 0"));
        }
        if self.output_fps == 0 {
            return Err(KinreelError::validation("output_fps must be > 0"));
        }
        for size in [self.name_size_px, self.title_size_px, self.relation_size_px] {
            if !size.is_finite() || size <= 0.0 {
                return Err(KinreelError::validation(
                    "font sizes must be finite and > 0",
                ));
            }
        }
        Ok(())
    }

    /// Load a JSON config file and validate it.
    pub fn from_json_file(path: &Path) -> KinreelResult<Self> {
        use anyhow::Context as _;
        let f = std::fs::File::open(path)
            .with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Config = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn markup_path(&self) -> PathBuf {
        self.root.join(&self.markup)
    }

    pub fn frames_path(&self) -> PathBuf {
        self.root.join(&self.frames_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join(&self.output)
    }

    pub fn music_path(&self) -> PathBuf {
        self.root.join(&self.music_dir)
    }

    /// Width of one of the three layout columns.
    pub fn column_width(&self) -> u32 {
        self.canvas_width / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_canvas() {
        let cfg = Config {
            canvas_width: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_canvas() {
        let cfg = Config {
            canvas_height: 70_000,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_duration_and_fps() {
        assert!(
            Config {
                frame_duration_s: 0,
                ..Config::default()
            }
            .validate()
            .is_err()
        );
        assert!(
            Config {
                output_fps: 0,
                ..Config::default()
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn paths_resolve_against_root() {
        let cfg = Config {
            root: PathBuf::from("/work"),
            ..Config::default()
        };
        assert_eq!(cfg.markup_path(), PathBuf::from("/work/Relations.md"));
        assert_eq!(cfg.frames_path(), PathBuf::from("/work/frames"));
        assert_eq!(cfg.music_path(), PathBuf::from("/work/Music"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: Config = serde_json::from_str(r#"{"canvas_width": 640}"#).unwrap();
        assert_eq!(cfg.canvas_width, 640);
        assert_eq!(cfg.canvas_height, 1080);
        assert_eq!(cfg.frame_duration_s, 3);
    }
}
