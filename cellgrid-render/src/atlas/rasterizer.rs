//! Glyph rasterization seam.
//!
//! The atlas composes cells out of raw glyph masks; where those masks come
//! from is behind [`GlyphRasterizer`] so the pipeline can run headless
//! (tests supply a deterministic implementation) while production uses
//! swash-backed font rendering.

use cellgrid_fonts::FontManager;
use swash::scale::image::Content;
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::Format;

/// Pixel content of a rasterized glyph.
#[derive(Debug, Clone)]
pub enum MaskContent {
    /// 8-bit coverage, one byte per pixel; colored by the atlas.
    Alpha(Vec<u8>),
    /// Premultiplied RGBA bitmap (color emoji); drawn as-is.
    Color(Vec<u8>),
}

/// A glyph rendered at the configured size, positioned relative to the
/// baseline origin: `left` is the horizontal bearing, `top` the distance
/// from the baseline up to the mask's first row.
#[derive(Debug, Clone)]
pub struct RasterizedMask {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    pub content: MaskContent,
}

/// Produces glyph masks for single characters or grapheme clusters.
pub trait GlyphRasterizer: Send {
    /// Rasterize the given text at the configured font size. Returns `None`
    /// when no font in the chain covers it.
    fn rasterize(&mut self, text: &str, bold: bool, italic: bool) -> Option<RasterizedMask>;
}

/// Font-backed rasterizer using the swash scaler.
pub struct FontRasterizer {
    fonts: FontManager,
    context: ScaleContext,
    font_size_px: f32,
}

impl FontRasterizer {
    pub fn new(fonts: FontManager, font_size_px: f32) -> Self {
        Self {
            fonts,
            context: ScaleContext::new(),
            font_size_px,
        }
    }

    pub fn set_font_size(&mut self, font_size_px: f32) {
        self.font_size_px = font_size_px;
    }
}

impl GlyphRasterizer for FontRasterizer {
    fn rasterize(&mut self, text: &str, bold: bool, italic: bool) -> Option<RasterizedMask> {
        // Clusters are represented by their base character; full shaping is
        // the host's concern and arrives pre-joined.
        let character = text.chars().next()?;
        let (font_idx, glyph_id) = self.fonts.find_glyph(character, bold, italic)?;
        let font = self.fonts.get_font(font_idx)?;

        let mut scaler = self
            .context
            .builder(*font)
            .size(self.font_size_px)
            .hint(true)
            .build();

        // Color sources first so emoji fonts render as colored bitmaps;
        // text fonts have no color data and fall through to Outline.
        let image = Render::new(&[
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::ColorOutline(0),
            Source::Outline,
        ])
        .format(Format::Alpha)
        .render(&mut scaler, glyph_id)?;

        let content = match image.content {
            Content::Color => MaskContent::Color(image.data.clone()),
            Content::Mask => MaskContent::Alpha(image.data.clone()),
            Content::SubpixelMask => {
                // Collapse RGB coverage to single-channel alpha.
                let alpha = image
                    .data
                    .chunks(3)
                    .map(|px| px.iter().copied().max().unwrap_or(0))
                    .collect();
                MaskContent::Alpha(alpha)
            }
        };

        Some(RasterizedMask {
            width: image.placement.width,
            height: image.placement.height,
            left: image.placement.left,
            top: image.placement.top,
            content,
        })
    }
}
