//! Frame layout and rasterization.
//!
//! One frame shows one [`Edge`]: the two persons in the outer thirds of the
//! canvas (avatar above the midline, name and wrapped title below) and the
//! relation label dead center. Composition is a pure function of the edge,
//! the configuration, and the avatar files on disk, so re-running a frame
//! overwrites it with byte-identical output.

use std::path::PathBuf;

use anyhow::Context as _;
use vello_cpu::{kurbo, peniko};

use crate::{
    assets::{self, PreparedImage},
    config::Config,
    error::{KinreelError, KinreelResult},
    model::{Edge, Person},
    text::{TextBrushRgba8, TextEngine},
};

/// Avatar center sits this far above the canvas midline.
const AVATAR_LIFT_PX: f64 = 150.0;
/// Name top edge sits this far below the canvas midline.
const NAME_DROP_PX: f64 = 150.0;
/// Title block starts this far below the name top edge.
const TITLE_GAP_PX: f64 = 80.0;
/// Vertical spacing between wrapped title lines.
const LINE_SPACING_PX: f64 = 10.0;
/// Horizontal margin subtracted from the column width for title wrapping.
const TITLE_MARGIN_PX: f64 = 40.0;

/// A rasterized frame in premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

/// File name for a frame index, zero-padded to match [`FRAME_PATTERN`].
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:04}.png")
}

/// `ffmpeg` image-sequence pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "frame_%04d.png";

#[derive(Clone, Copy, Debug)]
enum Column {
    Left,
    Right,
}

pub struct FrameComposer {
    cfg: Config,
    engine: TextEngine,
    font: peniko::FontData,
}

impl FrameComposer {
    /// Resolve the configured font and build the layout engine.
    pub fn new(cfg: Config) -> KinreelResult<Self> {
        cfg.validate()?;
        let font_bytes = assets::find_font_bytes(&cfg.font_candidates)?;
        let font = peniko::FontData::new(peniko::Blob::from(font_bytes.clone()), 0);
        let engine = TextEngine::new(font_bytes)?;
        Ok(Self { cfg, engine, font })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Rasterize one edge to an in-memory frame.
    pub fn compose(&mut self, edge: &Edge) -> KinreelResult<FrameRGBA> {
        let width = self.cfg.canvas_width;
        let height = self.cfg.canvas_height;
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| KinreelError::render("canvas width exceeds u16"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| KinreelError::render("canvas height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);

        let [r, g, b, a] = self.cfg.bg_rgba;
        ctx.set_paint_transform(kurbo::Affine::IDENTITY);
        ctx.set_transform(kurbo::Affine::IDENTITY);
        ctx.set_paint(peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&kurbo::Rect::new(0.0, 0.0, f64::from(width), f64::from(height)));

        self.draw_person(&mut ctx, &edge.left, Column::Left)?;
        self.draw_person(&mut ctx, &edge.right, Column::Right)?;
        self.draw_relation(&mut ctx, edge)?;

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width,
            height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    /// Compose one edge and write it as `frames/frame_{index:04}.png`.
    ///
    /// Creates the frames directory if absent; re-running overwrites
    /// deterministically.
    pub fn write(&mut self, edge: &Edge, index: usize) -> KinreelResult<PathBuf> {
        let frame = self.compose(edge)?;

        let dir = self.cfg.frames_path();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create frames directory '{}'", dir.display()))?;

        let path = dir.join(frame_file_name(index));
        image::save_buffer_with_format(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write frame '{}'", path.display()))?;

        Ok(path)
    }

    fn draw_person(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        person: &Person,
        column: Column,
    ) -> KinreelResult<()> {
        let col_w = f64::from(self.cfg.column_width());
        let cx = match column {
            Column::Left => col_w / 2.0,
            Column::Right => f64::from(self.cfg.canvas_width) - col_w / 2.0,
        };
        let cy = f64::from(self.cfg.canvas_height) / 2.0;

        // Avatar misses and decode failures degrade to text-only layout.
        match assets::find_avatar(&self.cfg.root, &person.id, &person.name) {
            Some(path) => match assets::load_image(&path) {
                Ok(img) => self.draw_avatar(ctx, &img, cx, cy - AVATAR_LIFT_PX)?,
                Err(err) => {
                    tracing::warn!(person = %person.name, avatar = %path.display(), error = %err,
                        "avatar failed to load, continuing without it");
                }
            },
            None => {
                tracing::debug!(person = %person.name, id = %person.id, "no avatar directory");
            }
        }

        let brush = TextBrushRgba8::from(self.cfg.text_rgba);
        let name_top = cy + NAME_DROP_PX;
        self.draw_text_centered(ctx, &person.name, self.cfg.name_size_px, brush, cx, name_top)?;

        if person.has_title() {
            let max_w = (col_w - TITLE_MARGIN_PX) as f32;
            let lines = self
                .engine
                .wrap_chars(&person.title, self.cfg.title_size_px, max_w)?;
            let mut y = name_top + TITLE_GAP_PX;
            for line in &lines {
                let line_h =
                    self.draw_text_centered(ctx, line, self.cfg.title_size_px, brush, cx, y)?;
                y += f64::from(line_h) + LINE_SPACING_PX;
            }
        }

        Ok(())
    }

    fn draw_relation(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        edge: &Edge,
    ) -> KinreelResult<()> {
        let text = edge.relation_display();
        let brush = TextBrushRgba8::from(self.cfg.text_rgba);
        let layout = self.engine.layout(&text, self.cfg.relation_size_px, brush)?;

        // Measure first so the label lands exactly on the canvas midpoint.
        let x = f64::from(self.cfg.canvas_width) / 2.0 - f64::from(layout.width()) / 2.0;
        let y = f64::from(self.cfg.canvas_height) / 2.0 - f64::from(layout.height()) / 2.0;
        draw_layout(ctx, &self.font, &layout, x, y);
        Ok(())
    }

    /// Draw `text` horizontally centered on `cx` with its top edge at `top`.
    /// Returns the rendered line height for stacking.
    fn draw_text_centered(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
        cx: f64,
        top: f64,
    ) -> KinreelResult<f32> {
        let layout = self.engine.layout(text, size_px, brush)?;
        let x = cx - f64::from(layout.width()) / 2.0;
        draw_layout(ctx, &self.font, &layout, x, top);
        Ok(layout.height())
    }

    fn draw_avatar(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        img: &PreparedImage,
        cx: f64,
        cy: f64,
    ) -> KinreelResult<()> {
        if img.width == 0 || img.height == 0 {
            return Ok(());
        }

        // Downscale-only aspect-preserving fit into the configured box.
        let (max_w, max_h) = self.cfg.avatar_max;
        let scale = (f64::from(max_w) / f64::from(img.width))
            .min(f64::from(max_h) / f64::from(img.height))
            .min(1.0);
        let scaled_w = f64::from(img.width) * scale;
        let scaled_h = f64::from(img.height) * scale;

        let paint = image_paint(img)?;
        ctx.set_paint_transform(kurbo::Affine::IDENTITY);
        ctx.set_transform(
            kurbo::Affine::translate((cx - scaled_w / 2.0, cy - scaled_h / 2.0))
                * kurbo::Affine::scale(scale),
        );
        ctx.set_paint(paint);
        ctx.fill_rect(&kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(img.width),
            f64::from(img.height),
        ));
        Ok(())
    }
}

fn draw_layout(
    ctx: &mut vello_cpu::RenderContext,
    font: &peniko::FontData,
    layout: &parley::Layout<TextBrushRgba8>,
    x: f64,
    y: f64,
) {
    ctx.set_paint_transform(kurbo::Affine::IDENTITY);
    ctx.set_transform(kurbo::Affine::translate((x, y)));

    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };

            let brush = run.style().brush;
            ctx.set_paint(peniko::Color::from_rgba8(brush.r, brush.g, brush.b, brush.a));

            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

fn image_paint(img: &PreparedImage) -> KinreelResult<vello_cpu::Image> {
    let pixmap = premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(std::sync::Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> KinreelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| KinreelError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| KinreelError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(KinreelError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_file_names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_0000.png");
        assert_eq!(frame_file_name(7), "frame_0007.png");
        assert_eq!(frame_file_name(123), "frame_0123.png");
        assert_eq!(frame_file_name(12345), "frame_12345.png");
    }

    #[test]
    fn premul_pixmap_rejects_bad_lengths() {
        assert!(premul_bytes_to_pixmap(&[0u8; 5], 1, 1).is_err());
        assert!(premul_bytes_to_pixmap(&[0u8; 4], 1, 1).is_ok());
    }
}
