//! Parley-backed text shaping and measurement.
//!
//! One font family is registered at construction from raw font bytes; every
//! layout and measurement in a run goes through the same family so frame
//! output is a pure function of the configured font file.

use crate::error::{KinreelError, KinreelResult};

/// RGBA8 brush color carried through Parley layouts into glyph runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<[u8; 4]> for TextBrushRgba8 {
    fn from([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

pub struct TextEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
}

impl TextEngine {
    /// Register `font_bytes` (ttf/otf/ttc) and remember its primary family.
    pub fn new(font_bytes: Vec<u8>) -> KinreelResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            KinreelError::validation("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| KinreelError::validation("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
        })
    }

    /// Shape and lay out a single run of plain text at `size_px`.
    pub fn layout(
        &mut self,
        text: &str,
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> KinreelResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(KinreelError::validation("text size_px must be finite and > 0"));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }

    /// Rendered pixel width of `text` at `size_px`.
    pub fn measure_width(&mut self, text: &str, size_px: f32) -> KinreelResult<f32> {
        Ok(self.layout(text, size_px, TextBrushRgba8::default())?.width())
    }

    /// Break `text` into lines no wider than `max_width_px`.
    ///
    /// Characters are appended to a running line; when the candidate line's
    /// rendered width exceeds the limit the line is closed and a new one
    /// starts at the overflowing character. This is a character wrap, not a
    /// word wrap, matching the markup convention for CJK titles.
    pub fn wrap_chars(
        &mut self,
        text: &str,
        size_px: f32,
        max_width_px: f32,
    ) -> KinreelResult<Vec<String>> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if self.measure_width(&candidate, size_px)? > max_width_px {
                lines.push(current);
                current = ch.to_string();
            } else {
                current = candidate;
            }
        }
        lines.push(current);
        Ok(lines)
    }
}
