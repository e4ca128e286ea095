//! The glyph texture atlas.
//!
//! Cells are rasterized (glyph + underline + strikethrough over the
//! resolved background), keyed against the background color so only the ink
//! remains, trimmed to their alpha bounding box, and shelf-packed into a
//! CPU-side RGBA page that the GPU layer uploads on change. Results are
//! cached by `(code-or-cluster, bg, fg, ext)` so a cell is rasterized once
//! per attribute combination per atlas lifetime.

mod cache;
mod rasterizer;

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use cellgrid_config::color::{blend, ensure_contrast_ratio, multiply_opacity, opaque};
use cellgrid_config::{
    AttrWords, ColorSpec, ContrastCache, RenderColors, RendererOptions, UnderlineStyle,
    DIM_OPACITY,
};
use cellgrid_fonts::CellMetrics;

use crate::custom_glyphs::{draw_custom_glyph, is_contrast_exempt, is_custom_glyph};
use crate::scratch::Scratch;

pub use cache::{AtlasHandle, AtlasInstanceCache};
pub use rasterizer::{FontRasterizer, GlyphRasterizer, MaskContent, RasterizedMask};

/// Atlas page width and height in pixels.
pub const PAGE_SIZE: u32 = 1024;

/// Fraction of the page height that may be occupied before the next
/// `begin_frame` triggers a full reset.
const CAPACITY_FRACTION: f32 = 0.8;

/// Padding around the cell on the scratch surface so bold or italic ink
/// that overhangs the cell box is not clipped.
const GLYPH_PADDING: u32 = 2;

/// How many times an unexpectedly empty glyph is redrawn at a raised
/// baseline before giving up. Underscore-like glyphs can sit entirely
/// below the keyed cell area in some fonts.
const EMPTY_GLYPH_RETRIES: u32 = 5;

/// A packed atlas entry: where the glyph lives on the page and how to place
/// it relative to its cell origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterizedGlyph {
    pub texture_position: (u32, u32),
    pub size: (u32, u32),
    /// Offset from the cell origin to the glyph's top-left pixel.
    pub offset: (i32, i32),
}

/// Sentinel for invisible or empty cells. Zero-size entries must be skipped
/// by draw-buffer writers, never treated as failures.
pub const NULL_RASTERIZED_GLYPH: RasterizedGlyph = RasterizedGlyph {
    texture_position: (0, 0),
    size: (0, 0),
    offset: (0, 0),
};

impl RasterizedGlyph {
    pub fn is_empty(&self) -> bool {
        self.size.0 == 0 || self.size.1 == 0
    }

    /// Normalized texture-space origin and size on the atlas page.
    pub fn tex_coords(&self) -> ([f32; 2], [f32; 2]) {
        let s = PAGE_SIZE as f32;
        (
            [
                self.texture_position.0 as f32 / s,
                self.texture_position.1 as f32 / s,
            ],
            [self.size.0 as f32 / s, self.size.1 as f32 / s],
        )
    }
}

/// One packing shelf: a horizontal strip of the page.
#[derive(Debug, Clone, Copy, Default)]
struct ShelfRow {
    x: u32,
    y: u32,
    height: u32,
}

/// Everything that affects rasterized output. Two renderers whose configs
/// hash equal can share one atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasConfig {
    pub font_family: String,
    pub font_size: f32,
    pub device_pixel_ratio: f32,
    pub letter_spacing: f32,
    pub line_height: f32,
    pub draw_bold_text_in_bright_colors: bool,
    pub minimum_contrast_ratio: f32,
    pub allow_transparency: bool,
    pub custom_glyphs: bool,
    pub foreground: u32,
    pub background: u32,
    pub palette: [u32; 256],
}

impl AtlasConfig {
    pub fn new(options: &RendererOptions, colors: &RenderColors) -> Self {
        Self {
            font_family: options.font_family.clone(),
            font_size: options.font_size,
            device_pixel_ratio: options.device_pixel_ratio,
            letter_spacing: options.letter_spacing,
            line_height: options.line_height,
            draw_bold_text_in_bright_colors: options.draw_bold_text_in_bright_colors,
            minimum_contrast_ratio: options.minimum_contrast_ratio,
            allow_transparency: options.allow_transparency,
            custom_glyphs: options.custom_glyphs,
            foreground: colors.foreground,
            background: colors.background,
            palette: colors.palette,
        }
    }

    /// Content hash used by the instance cache to share atlases between
    /// identically configured renderers.
    pub fn content_hash(&self) -> u64 {
        let mut h = std::collections::hash_map::DefaultHasher::new();
        self.font_family.hash(&mut h);
        self.font_size.to_bits().hash(&mut h);
        self.device_pixel_ratio.to_bits().hash(&mut h);
        self.letter_spacing.to_bits().hash(&mut h);
        self.line_height.to_bits().hash(&mut h);
        self.draw_bold_text_in_bright_colors.hash(&mut h);
        self.minimum_contrast_ratio.to_bits().hash(&mut h);
        self.allow_transparency.hash(&mut h);
        self.custom_glyphs.hash(&mut h);
        self.foreground.hash(&mut h);
        self.background.hash(&mut h);
        self.palette.hash(&mut h);
        h.finish()
    }
}

/// Cache hit/miss counters, mainly for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtlasStats {
    pub hits: u64,
    pub misses: u64,
}

/// The shared glyph atlas.
pub struct TextureAtlas {
    config: AtlasConfig,
    metrics: CellMetrics,
    rasterizer: Box<dyn GlyphRasterizer>,
    page: Vec<u8>,
    /// Bumped on every reset and every new glyph; the GPU layer re-uploads
    /// when it lags behind.
    generation: u64,
    current_row: ShelfRow,
    fixed_rows: Vec<ShelfRow>,
    /// Set when the page overflowed and reset outside `begin_frame`.
    overflowed: bool,
    glyphs: HashMap<(u32, u32, u32, u32), RasterizedGlyph>,
    cluster_glyphs: HashMap<(Arc<str>, u32, u32, u32), RasterizedGlyph>,
    contrast_cache: ContrastCache,
    stats: AtlasStats,
}

impl TextureAtlas {
    pub fn new(
        config: AtlasConfig,
        metrics: CellMetrics,
        rasterizer: Box<dyn GlyphRasterizer>,
    ) -> Self {
        let mut atlas = Self {
            config,
            metrics,
            rasterizer,
            page: vec![0; (PAGE_SIZE * PAGE_SIZE * 4) as usize],
            generation: 0,
            current_row: ShelfRow::default(),
            fixed_rows: Vec::new(),
            overflowed: false,
            glyphs: HashMap::new(),
            cluster_glyphs: HashMap::new(),
            contrast_cache: ContrastCache::new(),
            stats: AtlasStats::default(),
        };
        atlas.warm_up();
        // Nothing references the page yet, so an overflow during warm-up
        // needs no redraw from the caller.
        atlas.overflowed = false;
        atlas
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    pub fn metrics(&self) -> CellMetrics {
        self.metrics
    }

    pub fn stats(&self) -> AtlasStats {
        self.stats
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Raw RGBA page contents, for GPU upload and diagnostics snapshots.
    pub fn page_data(&self) -> &[u8] {
        &self.page
    }

    /// Start-of-frame occupancy check. Returns true when the atlas was
    /// reset and re-warmed, in which case all cached entries are invalid
    /// and the caller must redraw everything.
    pub fn begin_frame(&mut self) -> bool {
        let capacity = (PAGE_SIZE as f32 * CAPACITY_FRACTION) as u32;
        if self.current_row.y > capacity {
            log::info!(
                "glyph atlas at {}px of {}px capacity, clearing",
                self.current_row.y,
                capacity
            );
            self.reset();
            self.warm_up();
            return true;
        }
        false
    }

    /// Drop everything: page pixels, shelves, and both cache maps. The
    /// contrast cache survives since palette and ratio are unchanged.
    fn reset(&mut self) {
        self.page.fill(0);
        self.current_row = ShelfRow::default();
        self.fixed_rows.clear();
        self.glyphs.clear();
        self.cluster_glyphs.clear();
        self.generation += 1;
    }

    /// True when the page overflowed and reset since the last call. Glyph
    /// entries handed out before the reset point into cleared texture
    /// space, so the caller must redraw everything it placed this frame.
    pub fn take_overflow(&mut self) -> bool {
        std::mem::take(&mut self.overflowed)
    }

    /// Full reset plus re-warm, for the host-facing clear operation. The
    /// caller invalidates its own drawn state, so the overflow signal is
    /// swallowed here like it is at construction.
    pub fn clear(&mut self) {
        self.reset();
        self.warm_up();
        self.overflowed = false;
    }

    /// Eagerly rasterize the printable ASCII range at default attributes so
    /// the first painted frame doesn't stall on glyph production.
    fn warm_up(&mut self) {
        for code in 33u32..=126 {
            self.get_glyph(code, 0, 0, 0);
        }
    }

    /// Look up or produce the glyph for a single code point.
    pub fn get_glyph(&mut self, code: u32, bg: u32, fg: u32, ext: u32) -> RasterizedGlyph {
        if let Some(&glyph) = self.glyphs.get(&(code, bg, fg, ext)) {
            self.stats.hits += 1;
            return glyph;
        }
        self.stats.misses += 1;
        let text: String = char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER).into();
        let glyph = self.draw(&text, code, AttrWords::new(fg, bg, ext));
        self.glyphs.insert((code, bg, fg, ext), glyph);
        glyph
    }

    /// Look up or produce the glyph for a combined grapheme cluster.
    pub fn get_cluster_glyph(
        &mut self,
        cluster: &Arc<str>,
        bg: u32,
        fg: u32,
        ext: u32,
    ) -> RasterizedGlyph {
        let key = (Arc::clone(cluster), bg, fg, ext);
        if let Some(&glyph) = self.cluster_glyphs.get(&key) {
            self.stats.hits += 1;
            return glyph;
        }
        self.stats.misses += 1;
        let code = cluster.chars().next().map_or(0, |c| c as u32);
        let glyph = self.draw(cluster, code, AttrWords::new(fg, bg, ext));
        self.cluster_glyphs.insert(key, glyph);
        glyph
    }

    // -- color resolution ---------------------------------------------------

    fn palette_color(&self, index: u32, promote_bright: bool, bold: bool) -> u32 {
        let mut index = index & 0xFF;
        if promote_bright && bold && self.config.draw_bold_text_in_bright_colors && index < 8 {
            index += 8;
        }
        self.config.palette[index as usize]
    }

    /// Resolve the draw-time background and foreground for a cell. The
    /// inverse swap happens here, so downstream rasterization is identical
    /// for `inverse(fg=F, bg=B)` and `plain(fg=B, bg=F)`.
    fn resolve_draw_colors(&mut self, code: u32, attrs: AttrWords) -> (u32, u32) {
        let inverse = attrs.is_inverse();
        let bold = attrs.is_bold();

        // Specs after the swap; the flag tracks which side came from the fg
        // word, since bold-as-bright only ever promotes the text color.
        let (bg_spec, bg_from_fg) = if inverse {
            (attrs.fg_spec(), true)
        } else {
            (attrs.bg_spec(), false)
        };
        let (fg_spec, fg_from_fg) = if inverse {
            (attrs.bg_spec(), false)
        } else {
            (attrs.fg_spec(), true)
        };

        let bg = match bg_spec {
            ColorSpec::Default => {
                if inverse {
                    self.config.foreground
                } else {
                    self.config.background
                }
            }
            ColorSpec::Palette16(i) => self.palette_color(i as u32, bg_from_fg, bold),
            ColorSpec::Palette256(i) => self.palette_color(i as u32, bg_from_fg, bold),
            ColorSpec::Rgb(r, g, b) => u32::from_be_bytes([r, g, b, 0xFF]),
        };

        let mut fg = match fg_spec {
            ColorSpec::Default => {
                if inverse {
                    self.config.background
                } else {
                    self.config.foreground
                }
            }
            ColorSpec::Palette16(i) => self.palette_color(i as u32, fg_from_fg, bold),
            ColorSpec::Palette256(i) => self.palette_color(i as u32, fg_from_fg, bold),
            ColorSpec::Rgb(r, g, b) => u32::from_be_bytes([r, g, b, 0xFF]),
        };

        if self.config.minimum_contrast_ratio > 1.0 && !is_contrast_exempt(code) {
            fg = self.apply_minimum_contrast(attrs, bg, fg);
        }

        if attrs.is_dim() {
            fg = blend(opaque(bg), multiply_opacity(fg, DIM_OPACITY));
        }

        (bg, fg)
    }

    fn apply_minimum_contrast(&mut self, attrs: AttrWords, bg: u32, fg: u32) -> u32 {
        if let Some(&cached) = self.contrast_cache.get(attrs.bg, attrs.fg) {
            return cached.unwrap_or(fg);
        }
        let adjusted = ensure_contrast_ratio(opaque(bg), opaque(fg), self.config.minimum_contrast_ratio);
        self.contrast_cache.set(attrs.bg, attrs.fg, adjusted);
        adjusted.unwrap_or(fg)
    }

    fn resolve_underline_color(&self, attrs: AttrWords, fg: u32, bg: u32) -> u32 {
        let color = match attrs.underline_color() {
            ColorSpec::Default => return fg,
            ColorSpec::Palette16(i) => self.palette_color(i as u32, false, false),
            ColorSpec::Palette256(i) => self.palette_color(i as u32, false, false),
            ColorSpec::Rgb(r, g, b) => u32::from_be_bytes([r, g, b, 0xFF]),
        };
        if attrs.is_dim() {
            blend(opaque(bg), multiply_opacity(color, DIM_OPACITY))
        } else {
            color
        }
    }

    // -- rasterization ------------------------------------------------------

    fn draw(&mut self, text: &str, code: u32, attrs: AttrWords) -> RasterizedGlyph {
        if attrs.is_invisible() {
            return NULL_RASTERIZED_GLYPH;
        }
        let (bg, fg) = self.resolve_draw_colors(code, attrs);

        let keyed = !self.config.allow_transparency;
        let visible_ink = !text.trim().is_empty() || attrs.is_underline() || attrs.is_strikethrough();
        let retries = if keyed && visible_ink { EMPTY_GLYPH_RETRIES } else { 0 };

        for baseline_shift in 0..=retries {
            let scratch = self.compose(text, code, attrs, bg, fg, baseline_shift);
            if let Some((bx, by, bw, bh)) = scratch.alpha_bounding_box() {
                let pixels = scratch.extract(bx, by, bw, bh);
                let (tx, ty) = self.pack(bw, bh);
                self.blit_to_page(&pixels, bw, bh, tx, ty);
                self.generation += 1;
                return RasterizedGlyph {
                    texture_position: (tx, ty),
                    size: (bw, bh),
                    offset: (
                        bx as i32 - GLYPH_PADDING as i32,
                        by as i32 - GLYPH_PADDING as i32,
                    ),
                };
            }
            if !visible_ink {
                break;
            }
        }
        NULL_RASTERIZED_GLYPH
    }

    /// Compose the full cell onto a padded scratch surface. `baseline_shift`
    /// raises the baseline to recover glyphs whose ink falls entirely below
    /// the cell (observed for underscores at some metrics).
    fn compose(
        &mut self,
        text: &str,
        code: u32,
        attrs: AttrWords,
        bg: u32,
        fg: u32,
        baseline_shift: u32,
    ) -> Scratch {
        let pad = GLYPH_PADDING as i32;
        let cell_w = self.metrics.cell_width;
        let cell_h = self.metrics.cell_height;
        let mut scratch = Scratch::new(cell_w + GLYPH_PADDING * 2, cell_h + GLYPH_PADDING * 2);
        if !self.config.allow_transparency {
            scratch.clear(opaque(bg));
        }
        let baseline_y = pad + self.metrics.baseline as i32 - baseline_shift as i32;

        let custom = self.config.custom_glyphs && is_custom_glyph(code);
        let mask = if custom {
            None
        } else {
            self.rasterizer
                .rasterize(text, attrs.is_bold(), attrs.is_italic())
        };

        // Ink coverage for underline descender masking: underline pixels
        // within 1px of glyph ink are skipped so descenders stay readable.
        let ink = mask.as_ref().map(|m| {
            InkMap::from_mask(m, pad + m.left, baseline_y - m.top, scratch.width(), scratch.height())
        });

        if attrs.is_underline() {
            let color = self.resolve_underline_color(attrs, fg, bg);
            self.draw_underline(
                &mut scratch,
                attrs.underline_style(),
                color,
                pad,
                baseline_y,
                ink.as_ref(),
            );
        }

        if custom {
            draw_custom_glyph(
                &mut scratch,
                code,
                fg,
                pad,
                pad,
                cell_w,
                cell_h,
                self.config.device_pixel_ratio,
            );
        } else if let Some(m) = &mask {
            let gx = pad + m.left;
            let gy = baseline_y - m.top;
            match &m.content {
                MaskContent::Alpha(data) => scratch.blit_mask(data, m.width, m.height, gx, gy, fg),
                MaskContent::Color(data) => scratch.blit_rgba(data, m.width, m.height, gx, gy),
            }
        }

        if attrs.is_strikethrough() {
            let stroke = self.metrics.stroke_size.max(1.0) as u32;
            let sy = baseline_y - (self.metrics.char_height as f32 * 0.3) as i32;
            scratch.fill_rect(pad, sy, cell_w, stroke, fg);
        }

        if !self.config.allow_transparency {
            scratch.key_out_background(opaque(bg), opaque(fg));
        }
        scratch
    }

    fn draw_underline(
        &self,
        scratch: &mut Scratch,
        style: UnderlineStyle,
        color: u32,
        x0: i32,
        baseline_y: i32,
        ink: Option<&InkMap>,
    ) {
        let cell_w = self.metrics.cell_width as i32;
        let stroke = self.metrics.stroke_size.max(1.0) as i32;
        let max_y = scratch.height() as i32 - stroke;
        let uy = (baseline_y + self.metrics.underline_offset as i32).min(max_y);
        let clear = |s: &mut Scratch, x: i32, y: i32| {
            let masked = ink.is_some_and(|m| m.covers(x, y));
            if !masked {
                for dy in 0..stroke {
                    s.set_pixel(x, y + dy, color);
                }
            }
        };
        match style {
            UnderlineStyle::Single => {
                for x in x0..x0 + cell_w {
                    clear(scratch, x, uy);
                }
            }
            UnderlineStyle::Double => {
                let second = (uy + stroke + 1).min(max_y);
                for x in x0..x0 + cell_w {
                    clear(scratch, x, uy);
                    clear(scratch, x, second);
                }
            }
            UnderlineStyle::Dotted => {
                for x in x0..x0 + cell_w {
                    if ((x - x0) / stroke) % 2 == 0 {
                        clear(scratch, x, uy);
                    }
                }
            }
            UnderlineStyle::Dashed => {
                let on = stroke * 4;
                let period = on + stroke * 2;
                for x in x0..x0 + cell_w {
                    if (x - x0) % period < on {
                        clear(scratch, x, uy);
                    }
                }
            }
            UnderlineStyle::Curly => {
                let amplitude = stroke.max(1) as f32;
                let wavelength = (cell_w as f32 / 2.0).max(2.0);
                for x in x0..x0 + cell_w {
                    let phase = (x - x0) as f32 / wavelength * std::f32::consts::TAU;
                    let wy = uy + (phase.sin() * amplitude).round() as i32;
                    clear(scratch, x, wy.min(max_y));
                }
            }
        }
    }

    // -- packing ------------------------------------------------------------

    fn freeze_current_row(&mut self) {
        let next = ShelfRow {
            x: 0,
            y: self.current_row.y + self.current_row.height,
            height: 0,
        };
        let old = std::mem::replace(&mut self.current_row, next);
        if old.height > 0 {
            self.fixed_rows.push(old);
        }
    }

    /// Allocate a `w`×`h` slot on the page.
    ///
    /// Fixed rows of known height are preferred (smallest fitting height
    /// first) to limit fragmentation; otherwise the growing current row
    /// takes the glyph, freezing itself once its height would waste more
    /// than half the strip on this glyph.
    fn pack(&mut self, w: u32, h: u32) -> (u32, u32) {
        if self.current_row.height > h * 2 && self.current_row.x > 0 {
            self.freeze_current_row();
        }

        let mut best: Option<usize> = None;
        for (i, row) in self.fixed_rows.iter().enumerate() {
            if row.height >= h && row.x + w <= PAGE_SIZE {
                if best.is_none_or(|b| self.fixed_rows[b].height > row.height) {
                    best = Some(i);
                }
            }
        }
        if let Some(i) = best {
            let row = &mut self.fixed_rows[i];
            let pos = (row.x, row.y);
            row.x += w;
            return pos;
        }

        if self.current_row.x + w > PAGE_SIZE {
            self.freeze_current_row();
        }
        if self.current_row.y + h.max(self.current_row.height) > PAGE_SIZE {
            // The 80% begin-frame reset makes this nearly unreachable, but a
            // pathological frame can still fill the page outright.
            log::warn!("glyph atlas page overflowed mid-frame, dropping all cached glyphs");
            self.reset();
            self.overflowed = true;
        }
        let row = &mut self.current_row;
        row.height = row.height.max(h);
        let pos = (row.x, row.y);
        row.x += w;
        pos
    }

    fn blit_to_page(&mut self, pixels: &[u8], w: u32, h: u32, tx: u32, ty: u32) {
        for row in 0..h {
            let src = (row * w * 4) as usize;
            let dst = (((ty + row) * PAGE_SIZE + tx) * 4) as usize;
            self.page[dst..dst + (w * 4) as usize]
                .copy_from_slice(&pixels[src..src + (w * 4) as usize]);
        }
    }
}

/// Dilated ink coverage of a glyph mask, in scratch coordinates.
struct InkMap {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl InkMap {
    fn from_mask(mask: &RasterizedMask, gx: i32, gy: i32, width: u32, height: u32) -> Self {
        let mut bits = vec![false; (width * height) as usize];
        let alpha_at = |mx: u32, my: u32| -> u8 {
            match &mask.content {
                MaskContent::Alpha(data) => data[(my * mask.width + mx) as usize],
                MaskContent::Color(data) => data[((my * mask.width + mx) * 4 + 3) as usize],
            }
        };
        for my in 0..mask.height {
            for mx in 0..mask.width {
                if alpha_at(mx, my) == 0 {
                    continue;
                }
                // Dilate by one pixel in each direction.
                for dy in -1i32..=1 {
                    for dx in -1i32..=1 {
                        let x = gx + mx as i32 + dx;
                        let y = gy + my as i32 + dy;
                        if x >= 0 && y >= 0 && (x as u32) < width && (y as u32) < height {
                            bits[(y as u32 * width + x as u32) as usize] = true;
                        }
                    }
                }
            }
        }
        Self { width, height, bits }
    }

    fn covers(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return false;
        }
        self.bits[(y as u32 * self.width + x as u32) as usize]
    }
}
