//! Cell metrics derived from font tables.

use swash::FontRef;

/// Unscaled metrics read straight from a font's tables, in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFontMetrics {
    pub units_per_em: u16,
    pub ascent: f32,
    pub descent: f32,
    pub leading: f32,
    /// Advance width of a representative full-width character.
    pub advance_width: f32,
    pub underline_offset: f32,
    pub stroke_size: f32,
}

impl RawFontMetrics {
    /// Read metrics from a font, using `M` (falling back to `0`) for the
    /// representative advance.
    pub fn from_font(font: &FontRef<'_>) -> Self {
        let m = font.metrics(&[]);
        let charmap = font.charmap();
        let glyphs = font.glyph_metrics(&[]);
        let mut gid = charmap.map('M');
        if gid == 0 {
            gid = charmap.map('0');
        }
        let advance_width = if gid != 0 {
            glyphs.advance_width(gid)
        } else {
            m.average_width
        };
        Self {
            units_per_em: m.units_per_em,
            ascent: m.ascent,
            descent: m.descent,
            leading: m.leading,
            advance_width,
            underline_offset: m.underline_offset,
            stroke_size: m.stroke_size,
        }
    }
}

/// Device-pixel cell geometry shared by the atlas and the batchers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    /// Cell width in device pixels.
    pub cell_width: u32,
    /// Cell height in device pixels.
    pub cell_height: u32,
    /// Natural glyph height before the line-height multiplier.
    pub char_height: u32,
    /// Baseline position measured down from the cell top.
    pub baseline: f32,
    /// Underline position measured down from the baseline.
    pub underline_offset: f32,
    /// Underline/strikethrough stroke thickness.
    pub stroke_size: f32,
    pub device_pixel_ratio: f32,
}

impl CellMetrics {
    /// Scale raw font metrics to a cell grid.
    ///
    /// Extra height from `line_height` is split evenly above and below the
    /// glyph box so the baseline stays vertically centered.
    pub fn compute(
        raw: RawFontMetrics,
        font_size: f32,
        device_pixel_ratio: f32,
        line_height: f32,
        letter_spacing: f32,
    ) -> Self {
        let scale = font_size * device_pixel_ratio / raw.units_per_em.max(1) as f32;
        let char_height = ((raw.ascent + raw.descent + raw.leading) * scale).ceil().max(1.0);
        let cell_height = (char_height * line_height.max(1.0)).ceil();
        let cell_width = (raw.advance_width * scale + letter_spacing * device_pixel_ratio)
            .ceil()
            .max(1.0);
        let top_pad = (cell_height - char_height) / 2.0;
        Self {
            cell_width: cell_width as u32,
            cell_height: cell_height as u32,
            char_height: char_height as u32,
            baseline: (top_pad + raw.ascent * scale).round(),
            underline_offset: (raw.underline_offset.abs() * scale).round().max(1.0),
            stroke_size: (raw.stroke_size * scale).round().max(1.0),
            device_pixel_ratio,
        }
    }
}
