//! Filesystem asset resolution: avatars, background audio, and fonts.
//!
//! All lookups are read-only and convention-driven. Misses are `None`, not
//! errors; the composer degrades to text-only layout when an avatar is
//! absent and the assembler simply omits the audio inputs.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::error::{KinreelError, KinreelResult};

const IMAGE_EXTS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];
const AUDIO_EXTS: [&str; 5] = ["mp3", "wav", "ogg", "flac", "m4a"];
const FONT_EXTS: [&str; 3] = ["ttf", "otf", "ttc"];

/// System directories scanned when no configured font candidate resolves.
const FONT_SCAN_DIRS: [&str; 3] = [
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "/System/Library/Fonts",
];

fn has_ext_in(path: &Path, exts: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| exts.contains(&e.to_ascii_lowercase().as_str()))
}

/// Resolve a person's avatar image.
///
/// Looks for a direct subdirectory of `root` named exactly `id + name` and
/// returns the first file in it with a recognized raster-image extension.
/// "First" is directory-listing order, which is platform-dependent; the
/// convention treats it as "first match, order unspecified". Only the exact
/// concatenation is tried, so ids that are prefixes of one another (`A` vs
/// `AA`) can never collide.
pub fn find_avatar(root: &Path, id: &str, name: &str) -> Option<PathBuf> {
    let dir = root.join(format!("{id}{name}"));
    if !dir.is_dir() {
        return None;
    }
    first_file_with_ext(&dir, &IMAGE_EXTS)
}

/// Find the background audio track: first recognized audio file in the
/// music directory, or `None` when the directory is absent or empty.
pub fn find_audio(music_dir: &Path) -> Option<PathBuf> {
    if !music_dir.is_dir() {
        return None;
    }
    first_file_with_ext(music_dir, &AUDIO_EXTS)
}

fn first_file_with_ext(dir: &Path, exts: &[&str]) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && has_ext_in(&path, exts) {
            return Some(path);
        }
    }
    None
}

/// Load font bytes from the first readable candidate path, falling back to a
/// recursive scan of the standard system font directories.
pub fn find_font_bytes(candidates: &[PathBuf]) -> KinreelResult<Vec<u8>> {
    for path in candidates {
        if let Ok(bytes) = std::fs::read(path) {
            tracing::debug!(font = %path.display(), "resolved font candidate");
            return Ok(bytes);
        }
    }

    for dir in FONT_SCAN_DIRS {
        if let Some(path) = scan_for_font(Path::new(dir)) {
            tracing::debug!(font = %path.display(), "resolved font by directory scan");
            return Ok(std::fs::read(&path)
                .with_context(|| format!("read font '{}'", path.display()))?);
        }
    }

    Err(KinreelError::validation(
        "no usable font found: none of the configured candidates exist and no \
         system font directory contains a ttf/otf/ttc file",
    ))
}

fn scan_for_font(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && has_ext_in(&path, &FONT_EXTS) {
            return Some(path);
        }
        if path.is_dir() {
            subdirs.push(path);
        }
    }
    subdirs.into_iter().find_map(|d| scan_for_font(&d))
}

/// Decoded raster image in row-major premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode an avatar image file into premultiplied RGBA8.
pub fn load_image(path: &Path) -> KinreelResult<PreparedImage> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
}

pub fn decode_image(bytes: &[u8]) -> KinreelResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from("target").join("assets_tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_tiny_png(path: &Path) {
        let img = image::RgbaImage::from_raw(1, 1, vec![10, 20, 30, 255]).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn find_avatar_matches_exact_concatenation_only() {
        let root = scratch_dir("avatar_exact");
        let dir = root.join("A十一");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("notes.txt"), b"not an image").unwrap();
        write_tiny_png(&dir.join("face.png"));

        // A prefix-sharing sibling must not satisfy a different id.
        std::fs::create_dir_all(root.join("AA十一")).unwrap();

        let found = find_avatar(&root, "A", "十一").unwrap();
        assert_eq!(found.file_name().unwrap(), "face.png");

        assert!(find_avatar(&root, "B", "十一").is_none());
        assert!(find_avatar(&root, "A", "别人").is_none());
    }

    #[test]
    fn find_avatar_accepts_uppercase_extensions() {
        let root = scratch_dir("avatar_ext_case");
        let dir = root.join("C猪罗纪");
        std::fs::create_dir_all(&dir).unwrap();
        write_tiny_png(&dir.join("FACE.PNG"));

        assert!(find_avatar(&root, "C", "猪罗纪").is_some());
    }

    #[test]
    fn find_audio_handles_missing_and_present_dirs() {
        let root = scratch_dir("audio");
        assert!(find_audio(&root.join("Music")).is_none());

        let music = root.join("Music");
        std::fs::create_dir_all(&music).unwrap();
        std::fs::write(music.join("cover.txt"), b"x").unwrap();
        assert!(find_audio(&music).is_none());

        std::fs::write(music.join("bgm.mp3"), b"fake").unwrap();
        let found = find_audio(&music).unwrap();
        assert_eq!(found.file_name().unwrap(), "bgm.mp3");
    }

    #[test]
    fn decode_image_premultiplies() {
        let img = image::RgbaImage::from_raw(1, 1, vec![100, 50, 200, 128]).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let prepared = decode_image(&buf).unwrap();
        assert_eq!((prepared.width, prepared.height), (1, 1));
        assert_eq!(
            prepared.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn decode_image_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }
}
