//! The frame orchestrator.
//!
//! `render_rows` drives the whole pipeline for a dirty row range: read cell
//! records, resolve joined clusters, resolve colors, diff against the
//! render model, produce glyphs through the atlas, and rebuild the
//! background rectangle and glyph instance batches. Cells whose four model
//! words are unchanged are skipped entirely.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use cellgrid_config::{CursorStyle, RenderColors, RendererOptions, Theme};
use cellgrid_fonts::{CellMetrics, FontManager};

use crate::atlas::{
    AtlasConfig, AtlasHandle, AtlasInstanceCache, FontRasterizer, GlyphRasterizer,
};
use crate::color_resolver::{resolve_cell_colors, ResolveContext};
use crate::cursor::CursorBlinkState;
use crate::dimensions::RenderDimensions;
use crate::glyphs::GlyphRenderer;
use crate::model::{ModelCell, RenderModel, COMBINED_CHAR_BIT};
use crate::rects::RectangleRenderer;
use crate::services::{BufferAccessor, CharacterJoiner, DecorationProvider};
use crate::types::{GlyphInstance, RectInstance};

/// The host-side service bundle injected at construction.
pub struct HostServices {
    pub buffer: Box<dyn BufferAccessor + Send>,
    pub joiner: Box<dyn CharacterJoiner + Send>,
    pub decorations: Box<dyn DecorationProvider + Send>,
}

/// Provides cell metrics and a glyph rasterizer for the current options.
/// Re-invoked whenever fonts or sizing options change.
pub type FontSource =
    Box<dyn FnMut(&RendererOptions) -> Result<(CellMetrics, Box<dyn GlyphRasterizer>)> + Send>;

/// A [`FontSource`] backed by the system font database.
pub fn system_font_source() -> FontSource {
    Box::new(|options| {
        let fonts = FontManager::new(&options.font_family)
            .context("loading fonts for the cell renderer")?;
        let metrics = fonts.cell_metrics(
            options.font_size,
            options.device_pixel_ratio,
            options.line_height,
            options.letter_spacing,
        );
        let size_px = options.font_size * options.device_pixel_ratio;
        let rasterizer: Box<dyn GlyphRasterizer> = Box::new(FontRasterizer::new(fonts, size_px));
        Ok((metrics, rasterizer))
    })
}

/// Cumulative pipeline counters, mainly for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub cells_scanned: u64,
    pub cells_updated: u64,
}

/// An inclusive range of dirty viewport rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    fn overlaps_or_touches(&self, other: &RowRange) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }

    fn merge(&mut self, other: &RowRange) {
        self.start = self.start.min(other.start);
        self.end = self.end.max(other.end);
    }
}

/// One frame's worth of CPU draw data for the GPU layer.
pub struct Frame<'a> {
    pub rects: &'a [RectInstance],
    pub cursor: &'a [RectInstance],
    pub glyphs: &'a [GlyphInstance],
    pub atlas: AtlasHandle,
    pub dims: RenderDimensions,
}

/// Renders the terminal's cell grid into instanced draw batches.
pub struct Renderer {
    services: HostServices,
    options: RendererOptions,
    theme: Theme,
    colors: RenderColors,
    font_source: FontSource,
    metrics: CellMetrics,
    atlas: AtlasHandle,
    atlas_hash: u64,
    model: RenderModel,
    rects: RectangleRenderer,
    glyphs: GlyphRenderer,
    blink: CursorBlinkState,
    dims: RenderDimensions,
    focused: bool,
    cursor_pos: (usize, usize),
    cursor_rects: Vec<RectInstance>,
    pending: Vec<RowRange>,
    stats: FrameStats,
}

impl Renderer {
    /// Create a renderer using system fonts.
    pub fn new(services: HostServices, options: RendererOptions, theme: Theme) -> Result<Self> {
        Self::with_font_source(services, options, theme, system_font_source())
    }

    /// Create a renderer with an explicit font source. Headless hosts and
    /// tests supply deterministic metrics and rasterization here.
    pub fn with_font_source(
        services: HostServices,
        options: RendererOptions,
        theme: Theme,
        mut font_source: FontSource,
    ) -> Result<Self> {
        let (metrics, rasterizer) = font_source(&options)?;
        let colors = RenderColors::from_theme(&theme);
        let config = AtlasConfig::new(&options, &colors);
        let atlas_hash = config.content_hash();
        let atlas = AtlasInstanceCache::global()
            .lock()
            .acquire(config, metrics, move || rasterizer);

        let cols = services.buffer.cols();
        let rows = services.buffer.rows();
        let now = Instant::now();
        Ok(Self {
            blink: CursorBlinkState::new(options.cursor_blink, now),
            model: RenderModel::new(cols, rows),
            rects: RectangleRenderer::new(),
            glyphs: GlyphRenderer::new(cols, rows),
            dims: RenderDimensions::new(cols, rows, metrics),
            services,
            options,
            theme,
            colors,
            font_source,
            metrics,
            atlas,
            atlas_hash,
            focused: true,
            cursor_pos: (0, 0),
            cursor_rects: Vec::new(),
            pending: Vec::new(),
            stats: FrameStats::default(),
        })
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn model(&self) -> &RenderModel {
        &self.model
    }

    pub fn atlas(&self) -> AtlasHandle {
        Arc::clone(&self.atlas)
    }

    /// The current draw batches. Valid until the next `render_rows`.
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            rects: self.rects.rects(),
            cursor: &self.cursor_rects,
            glyphs: self.glyphs_draw_list(),
            atlas: Arc::clone(&self.atlas),
            dims: self.dims,
        }
    }

    fn glyphs_draw_list(&self) -> &[GlyphInstance] {
        // The list is rebuilt at the end of render_rows; between frames it
        // is stable.
        self.glyphs.draw_list()
    }

    // -- host notifications -------------------------------------------------

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.model.resize(cols, rows);
        self.glyphs.resize(cols, rows);
        self.dims = RenderDimensions::new(cols, rows, self.metrics);
    }

    /// Swap the palette. The atlas bakes colors into its pixels, so this
    /// re-acquires a (possibly shared) atlas for the new configuration and
    /// invalidates all drawn state.
    pub fn set_colors(&mut self, theme: Theme) -> Result<()> {
        self.theme = theme;
        self.colors = RenderColors::from_theme(&self.theme);
        self.rebuild_atlas()
    }

    pub fn on_options_changed(&mut self, options: RendererOptions) -> Result<()> {
        self.blink.set_enabled(options.cursor_blink, Instant::now());
        self.options = options;
        self.rebuild_atlas()?;
        self.resize(self.services.buffer.cols(), self.services.buffer.rows());
        Ok(())
    }

    fn rebuild_atlas(&mut self) -> Result<()> {
        let (metrics, rasterizer) = (self.font_source)(&self.options)?;
        let config = AtlasConfig::new(&self.options, &self.colors);
        let new_hash = config.content_hash();
        {
            let mut cache = AtlasInstanceCache::global().lock();
            let atlas = cache.acquire(config, metrics, move || rasterizer);
            cache.release(self.atlas_hash);
            self.atlas = atlas;
            self.atlas_hash = new_hash;
        }
        self.metrics = metrics;
        self.dims = RenderDimensions::new(self.dims.cols, self.dims.rows, metrics);
        self.model.clear();
        self.glyphs.clear();
        Ok(())
    }

    /// Update selection geometry. The host should follow up with a full
    /// `render_rows` pass; the model diff limits actual work to cells whose
    /// resolved colors changed.
    pub fn on_selection_changed(
        &mut self,
        start: Option<(usize, isize)>,
        end: Option<(usize, isize)>,
        column_select: bool,
    ) {
        self.model
            .selection
            .update(start, end, column_select, self.dims.rows);
    }

    pub fn on_cursor_move(&mut self, row: usize, col: usize) {
        self.cursor_pos = (row, col);
        self.blink.restart(Instant::now());
    }

    pub fn on_focus(&mut self) {
        self.focused = true;
        self.blink.resume(Instant::now());
    }

    pub fn on_blur(&mut self) {
        self.focused = false;
        self.blink.pause();
    }

    /// Drive the blink timer. A visibility toggle queues the cursor row for
    /// redraw; returns true when there is now pending work.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.blink.tick(now) {
            let row = self.cursor_pos.0;
            self.request_redraw(row, row);
        }
        self.has_pending()
    }

    /// Queue viewport rows for the next [`Self::render_pending`] pass.
    /// Overlapping or adjacent requests coalesce into one range; a newer
    /// request supersedes older ones for the same rows instead of queuing
    /// behind them.
    pub fn request_redraw(&mut self, start: usize, end: usize) {
        let mut range = RowRange {
            start: start.min(end),
            end: start.max(end),
        };
        self.pending.retain(|existing| {
            if range.overlaps_or_touches(existing) {
                range.merge(existing);
                false
            } else {
                true
            }
        });
        self.pending.push(range);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Render every queued row range and rebuild the frame batches.
    pub fn render_pending(&mut self) {
        let ranges = std::mem::take(&mut self.pending);
        for range in &ranges {
            self.scan_rows(range.start, range.end);
        }
        self.finalize_frame();
    }

    /// Drop every cached glyph and re-warm the shared atlas.
    pub fn clear_texture_atlas(&mut self) {
        self.atlas.lock().clear();
        self.model.clear();
        self.glyphs.clear();
    }

    /// Copy of the atlas page for diagnostics.
    pub fn texture_atlas_snapshot(&self) -> (u32, Vec<u8>) {
        let atlas = self.atlas.lock();
        (crate::atlas::PAGE_SIZE, atlas.page_data().to_vec())
    }

    // -- the frame ----------------------------------------------------------

    /// Render viewport rows `start..=end` (inclusive, clamped) and rebuild
    /// the frame batches.
    pub fn render_rows(&mut self, start: usize, end: usize) {
        self.scan_rows(start, end);
        self.finalize_frame();
    }

    fn scan_rows(&mut self, start: usize, end: usize) {
        if self.scan_rows_once(start, end) {
            // The atlas page overflowed and reset mid-scan, so cells written
            // this pass reference cleared texture space. One full re-scan
            // rebuilds them against the fresh page.
            let rows = self.model.rows();
            self.model.clear();
            self.glyphs.clear();
            self.scan_rows_once(0, rows.saturating_sub(1));
        }
    }

    /// One scan pass. Returns true when the atlas overflowed underneath it
    /// and the written rows need to be redone.
    fn scan_rows_once(&mut self, start: usize, end: usize) -> bool {
        let rows = self.model.rows();
        let cols = self.model.cols();
        if rows == 0 || cols == 0 {
            return false;
        }
        let mut atlas = self.atlas.lock();

        let (mut start, mut end) = (start.min(rows - 1), end.min(rows - 1));
        if atlas.begin_frame() {
            // Atlas reset invalidated every cached entry; widen to a full
            // redraw so no cell references stale texture space.
            self.model.clear();
            self.glyphs.clear();
            start = 0;
            end = rows - 1;
        }

        for row in start..=end {
            let joined = self.services.joiner.joined_ranges(row);
            let mut joined_iter = joined.iter().peekable();
            let mut content_len = 0usize;
            let mut col = 0usize;
            while col < cols {
                let record = self.services.buffer.cell(row, col);

                // Span of columns this glyph covers: a joined range, a wide
                // character's two cells, or a single cell.
                let span = match joined_iter.peek() {
                    Some(range) if range.start == col => {
                        let r = joined_iter.next().cloned().unwrap_or(col..col + 1);
                        r.end.min(cols) - col
                    }
                    _ => (record.width.max(1) as usize).min(cols - col),
                };

                let cluster: Option<Arc<str>> = if span > 1 && joined.iter().any(|r| r.start == col)
                {
                    let mut text = String::new();
                    for c in col..col + span {
                        let r = self.services.buffer.cell(row, c);
                        if let Some(combined) = &r.combined {
                            text.push_str(combined);
                        } else if let Some(ch) = char::from_u32(r.code).filter(|_| r.code != 0) {
                            text.push(ch);
                        }
                    }
                    (!text.is_empty()).then(|| Arc::from(text.as_str()))
                } else {
                    record.combined.clone()
                };

                let code_word = match &cluster {
                    Some(text) => {
                        text.chars().next().map_or(0, |c| c as u32) | COMBINED_CHAR_BIT
                    }
                    None => record.code,
                };

                let ctx = ResolveContext {
                    colors: &self.colors,
                    decorations: self.services.decorations.as_ref(),
                    selection: &self.model.selection,
                    focused: self.focused,
                };
                let resolved = resolve_cell_colors(record.attrs, row, col, &ctx);

                if code_word != 0 {
                    content_len = col + span;
                }

                // The lead cell carries the glyph; the rest of the span is
                // "empty, colored" so background batching still covers it.
                for offset in 0..span {
                    let cell = ModelCell {
                        code: if offset == 0 { code_word } else { 0 },
                        bg: resolved.bg,
                        fg: resolved.fg,
                        ext: resolved.ext,
                    };
                    self.stats.cells_scanned += 1;
                    if self.model.cell(row, col + offset) == cell {
                        continue;
                    }
                    self.stats.cells_updated += 1;

                    if cell.code == 0 {
                        self.glyphs.clear_cell(row, col + offset);
                    } else {
                        let glyph = match &cluster {
                            Some(text) => {
                                atlas.get_cluster_glyph(text, cell.bg, cell.fg, cell.ext)
                            }
                            None => atlas.get_glyph(cell.code, cell.bg, cell.fg, cell.ext),
                        };
                        let last_bg = (col > 0).then(|| self.model.cell(row, col - 1).bg);
                        self.glyphs
                            .update_cell(row, col, glyph, &self.dims, cell.bg, last_bg);
                    }
                    self.model.set_cell(row, col + offset, cell);
                }
                col += span;
            }
            self.model.set_line_length(row, content_len);
        }
        atlas.take_overflow()
    }

    fn finalize_frame(&mut self) {
        self.rects
            .update(&self.model, &self.colors, &self.dims, &self.options);
        self.glyphs.build_draw_list(&self.model);
        self.cursor_rects = self.build_cursor_rects();
    }

    fn build_cursor_rects(&self) -> Vec<RectInstance> {
        if !self.blink.is_visible() {
            return Vec::new();
        }
        let (row, col) = self.cursor_pos;
        if row >= self.dims.rows || col >= self.dims.cols {
            return Vec::new();
        }
        let (x, y) = self.dims.cell_origin(row, col);
        let (w, h) = (self.dims.cell_width as f32, self.dims.cell_height as f32);
        let color = cellgrid_config::color::rgba_to_f32(self.colors.cursor);
        let stroke = self.options.device_pixel_ratio.max(1.0);
        let rect = |px: f32, py: f32, pw: f32, ph: f32| RectInstance {
            pos: [px, py],
            size: [pw, ph],
            color,
        };

        if !self.focused {
            // Hollow outline while unfocused, regardless of style.
            return vec![
                rect(x, y, w, stroke),
                rect(x, y + h - stroke, w, stroke),
                rect(x, y, stroke, h),
                rect(x + w - stroke, y, stroke, h),
            ];
        }
        match self.options.cursor_style {
            CursorStyle::Block => vec![rect(x, y, w, h)],
            CursorStyle::Outline => vec![
                rect(x, y, w, stroke),
                rect(x, y + h - stroke, w, stroke),
                rect(x, y, stroke, h),
                rect(x + w - stroke, y, stroke, h),
            ],
            CursorStyle::Underline => {
                let t = (self.options.cursor_width * stroke).max(1.0);
                vec![rect(x, y + h - t, w, t)]
            }
            CursorStyle::Bar => {
                let t = (self.options.cursor_width * stroke).max(1.0);
                vec![rect(x, y, t, h)]
            }
        }
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        AtlasInstanceCache::global().lock().release(self.atlas_hash);
    }
}
