//! Renderer options.

use serde::{Deserialize, Serialize};

/// Cursor shapes the renderer can draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CursorStyle {
    #[default]
    Block,
    Underline,
    Bar,
    /// Hollow block, used when the terminal is unfocused.
    Outline,
}

/// Options that shape how cells are rasterized and presented.
///
/// These feed the atlas configuration hash, so any change to them forces a
/// fresh glyph atlas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    pub font_family: String,
    /// Font size in pixels at a device pixel ratio of 1.0.
    pub font_size: f32,
    /// Extra horizontal pixels added to each cell.
    pub letter_spacing: f32,
    /// Multiplier on the font's natural line height.
    pub line_height: f32,
    /// Physical-to-logical pixel ratio of the output surface.
    pub device_pixel_ratio: f32,
    /// Render bold text using the bright palette variant (indexes 0-7
    /// promoted to 8-15).
    pub draw_bold_text_in_bright_colors: bool,
    /// Minimum WCAG contrast ratio to enforce between cell fg and bg.
    /// 1.0 disables enforcement; 21.0 forces black-or-white text.
    pub minimum_contrast_ratio: f32,
    /// Keep the atlas background transparent instead of keying it out
    /// against an opaque clear color.
    pub allow_transparency: bool,
    /// Draw box-drawing and block-element characters procedurally instead
    /// of from the font.
    pub custom_glyphs: bool,
    pub cursor_blink: bool,
    pub cursor_style: CursorStyle,
    /// Bar cursor width in logical pixels.
    pub cursor_width: f32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            font_family: "monospace".to_string(),
            font_size: 15.0,
            letter_spacing: 0.0,
            line_height: 1.0,
            device_pixel_ratio: 1.0,
            draw_bold_text_in_bright_colors: true,
            minimum_contrast_ratio: 1.0,
            allow_transparency: false,
            custom_glyphs: true,
            cursor_blink: false,
            cursor_style: CursorStyle::Block,
            cursor_width: 1.0,
        }
    }
}
