//! Integration tests for the frame pipeline.
//!
//! These run the full renderer headless: a deterministic glyph rasterizer
//! stands in for font rendering, so results only depend on the pipeline
//! logic. Each test uses a unique font family name to get its own atlas
//! out of the process-wide instance cache.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::Mutex;

use cellgrid_config::{AttrWords, RenderColors, RendererOptions, Theme};
use cellgrid_fonts::{CellMetrics, RawFontMetrics};
use cellgrid_render::atlas::AtlasConfig;
use cellgrid_render::model::COMBINED_CHAR_BIT;
use cellgrid_render::{
    AtlasInstanceCache, BufferAccessor, CellRecord, CharacterJoiner, FontSource, GlyphRasterizer,
    GridBuffer, HostServices, MaskContent, NoDecorations, NoJoiner, RasterizedMask, Renderer,
};

/// Draws every glyph as a fixed-size filled box.
struct BlockRasterizer;

impl GlyphRasterizer for BlockRasterizer {
    fn rasterize(&mut self, _text: &str, _bold: bool, _italic: bool) -> Option<RasterizedMask> {
        Some(RasterizedMask {
            width: 4,
            height: 6,
            left: 1,
            top: 6,
            content: MaskContent::Alpha(vec![0xFF; 4 * 6]),
        })
    }
}

fn stub_metrics(options: &RendererOptions) -> CellMetrics {
    CellMetrics::compute(
        RawFontMetrics {
            units_per_em: 1000,
            ascent: 800.0,
            descent: 200.0,
            leading: 0.0,
            advance_width: 600.0,
            underline_offset: -100.0,
            stroke_size: 50.0,
        },
        options.font_size,
        options.device_pixel_ratio,
        options.line_height,
        options.letter_spacing,
    )
}

fn stub_font_source() -> FontSource {
    Box::new(|options| {
        let rasterizer: Box<dyn GlyphRasterizer> = Box::new(BlockRasterizer);
        Ok((stub_metrics(options), rasterizer))
    })
}

/// Buffer the test can keep mutating after handing it to the renderer.
#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<GridBuffer>>);

impl SharedBuffer {
    fn new(cols: usize, rows: usize) -> Self {
        Self(Arc::new(Mutex::new(GridBuffer::new(cols, rows))))
    }
}

impl BufferAccessor for SharedBuffer {
    fn cols(&self) -> usize {
        self.0.lock().cols()
    }

    fn rows(&self) -> usize {
        self.0.lock().rows()
    }

    fn cell(&self, row: usize, col: usize) -> CellRecord {
        self.0.lock().cell(row, col)
    }

    fn line_length(&self, row: usize) -> usize {
        self.0.lock().line_length(row)
    }
}

fn options_for(test: &str) -> RendererOptions {
    RendererOptions {
        font_family: format!("test-{test}"),
        ..RendererOptions::default()
    }
}

fn renderer_for(test: &str, buffer: SharedBuffer) -> Renderer {
    let services = HostServices {
        buffer: Box::new(buffer),
        joiner: Box::new(NoJoiner),
        decorations: Box::new(NoDecorations),
    };
    Renderer::with_font_source(services, options_for(test), Theme::dark(), stub_font_source())
        .unwrap()
}

#[test]
fn static_screen_does_no_work_after_first_pass() {
    let buffer = SharedBuffer::new(20, 4);
    buffer.0.lock().set_text(0, 0, "hello", AttrWords::default());
    let mut renderer = renderer_for("static-screen", buffer);

    renderer.render_rows(0, 3);
    let first = renderer.stats();
    assert!(first.cells_updated >= 5);
    let generation = renderer.atlas().lock().generation();
    let misses = renderer.atlas().lock().stats().misses;

    renderer.render_rows(0, 3);
    let second = renderer.stats();
    assert_eq!(second.cells_updated, first.cells_updated);
    assert!(second.cells_scanned > first.cells_scanned);
    assert_eq!(renderer.atlas().lock().generation(), generation);
    assert_eq!(renderer.atlas().lock().stats().misses, misses);
}

#[test]
fn changed_cells_are_re_rendered() {
    let buffer = SharedBuffer::new(20, 2);
    buffer.0.lock().set_text(0, 0, "aaaa", AttrWords::default());
    let mut renderer = renderer_for("changed-cells", buffer.clone());
    renderer.render_rows(0, 1);
    let before = renderer.stats().cells_updated;

    buffer.0.lock().set_text(0, 1, "b", AttrWords::default());
    renderer.render_rows(0, 1);
    assert_eq!(renderer.stats().cells_updated, before + 1);
}

#[test]
fn frame_contains_glyphs_and_viewport_rect() {
    let buffer = SharedBuffer::new(10, 2);
    buffer.0.lock().set_text(1, 2, "abc", AttrWords::default());
    let mut renderer = renderer_for("frame-shape", buffer);
    renderer.render_rows(0, 1);

    let frame = renderer.frame();
    // Default background everywhere: only the viewport rectangle.
    assert_eq!(frame.rects.len(), 1);
    assert_eq!(frame.glyphs.len(), 3);
}

#[test]
fn selection_changes_resolved_colors() {
    let buffer = SharedBuffer::new(10, 2);
    buffer.0.lock().set_text(0, 0, "abcd", AttrWords::default());
    let mut renderer = renderer_for("selection", buffer);
    renderer.render_rows(0, 1);
    let before = renderer.stats().cells_updated;
    assert_eq!(renderer.frame().rects.len(), 1);

    renderer.on_selection_changed(Some((0, 0)), Some((2, 0)), false);
    renderer.render_rows(0, 1);
    // The two selected cells picked up the selection background.
    assert_eq!(renderer.stats().cells_updated, before + 2);
    let frame = renderer.frame();
    assert_eq!(frame.rects.len(), 2);

    // Clearing the selection restores the original words.
    renderer.on_selection_changed(None, None, false);
    renderer.render_rows(0, 1);
    assert_eq!(renderer.frame().rects.len(), 1);
}

/// Joins the first two columns of row 0 into one glyph.
struct PairJoiner;

impl CharacterJoiner for PairJoiner {
    fn joined_ranges(&self, row: usize) -> Vec<Range<usize>> {
        if row == 0 { vec![0..2] } else { Vec::new() }
    }
}

#[test]
fn joined_cells_render_as_one_glyph() {
    let buffer = SharedBuffer::new(10, 2);
    buffer.0.lock().set_text(0, 0, "fi", AttrWords::default());
    let services = HostServices {
        buffer: Box::new(buffer),
        joiner: Box::new(PairJoiner),
        decorations: Box::new(NoDecorations),
    };
    let mut renderer = Renderer::with_font_source(
        services,
        options_for("joined"),
        Theme::dark(),
        stub_font_source(),
    )
    .unwrap();
    renderer.render_rows(0, 1);

    assert_eq!(renderer.frame().glyphs.len(), 1);
    let lead = renderer.model().cell(0, 0);
    assert_ne!(lead.code & COMBINED_CHAR_BIT, 0);
    assert_eq!(lead.code & !COMBINED_CHAR_BIT, 'f' as u32);
    // The trailing cell is empty but carries the same colors.
    let trail = renderer.model().cell(0, 1);
    assert_eq!(trail.code, 0);
    assert_eq!(trail.bg, lead.bg);
}

#[test]
fn wide_characters_cover_two_columns() {
    let buffer = SharedBuffer::new(10, 1);
    buffer.0.lock().set_text(0, 0, "無x", AttrWords::default());
    let mut renderer = renderer_for("wide", buffer);
    renderer.render_rows(0, 0);

    // One glyph for the wide character, one for 'x' at column 2.
    assert_eq!(renderer.frame().glyphs.len(), 2);
    assert_eq!(renderer.model().cell(0, 1).code, 0);
    assert_eq!(renderer.model().cell(0, 2).code & !COMBINED_CHAR_BIT, 'x' as u32);
    assert_eq!(renderer.model().line_length(0), 3);
}

#[test]
fn identically_configured_renderers_share_one_atlas() {
    let options = options_for("shared-atlas");
    let theme = Theme::dark();
    let hash = AtlasConfig::new(&options, &RenderColors::from_theme(&theme)).content_hash();

    let make = || {
        let services = HostServices {
            buffer: Box::new(SharedBuffer::new(4, 2)),
            joiner: Box::new(NoJoiner),
            decorations: Box::new(NoDecorations),
        };
        Renderer::with_font_source(services, options.clone(), theme.clone(), stub_font_source())
            .unwrap()
    };

    let a = make();
    assert_eq!(AtlasInstanceCache::global().lock().ref_count(hash), 1);
    let b = make();
    assert_eq!(AtlasInstanceCache::global().lock().ref_count(hash), 2);
    assert!(Arc::ptr_eq(&a.atlas(), &b.atlas()));
    drop(a);
    assert_eq!(AtlasInstanceCache::global().lock().ref_count(hash), 1);
    drop(b);
    assert_eq!(AtlasInstanceCache::global().lock().ref_count(hash), 0);
}

#[test]
fn redraw_requests_coalesce_and_drain() {
    let buffer = SharedBuffer::new(10, 6);
    buffer.0.lock().set_text(2, 0, "queued", AttrWords::default());
    let mut renderer = renderer_for("redraw-queue", buffer);

    renderer.request_redraw(0, 1);
    renderer.request_redraw(1, 3);
    renderer.request_redraw(5, 5);
    assert!(renderer.has_pending());
    renderer.render_pending();
    assert!(!renderer.has_pending());
    // Rows 2's content was inside the coalesced 0..=3 range.
    assert_eq!(renderer.frame().glyphs.len(), 6);
}

/// Cell-filling ink at 300x450 per glyph: three per atlas shelf, two
/// shelves per page, so a row of distinct characters spills the page.
struct HugeGlyphRasterizer;

impl GlyphRasterizer for HugeGlyphRasterizer {
    fn rasterize(&mut self, _text: &str, _bold: bool, _italic: bool) -> Option<RasterizedMask> {
        Some(RasterizedMask {
            width: 300,
            height: 450,
            left: 0,
            top: 400,
            content: MaskContent::Alpha(vec![0xFF; 300 * 450]),
        })
    }
}

fn huge_glyph_font_source() -> FontSource {
    Box::new(|options| {
        let metrics = CellMetrics::compute(
            RawFontMetrics {
                units_per_em: 1000,
                ascent: 800.0,
                descent: 200.0,
                leading: 0.0,
                advance_width: 600.0,
                underline_offset: -100.0,
                stroke_size: 50.0,
            },
            500.0,
            options.device_pixel_ratio,
            options.line_height,
            options.letter_spacing,
        );
        let rasterizer: Box<dyn GlyphRasterizer> = Box::new(HugeGlyphRasterizer);
        Ok((metrics, rasterizer))
    })
}

#[test]
fn atlas_overflow_mid_pass_triggers_a_full_rescan() {
    let buffer = SharedBuffer::new(8, 1);
    buffer.0.lock().set_text(0, 0, "ABCDEF", AttrWords::default());
    let services = HostServices {
        buffer: Box::new(buffer),
        joiner: Box::new(NoJoiner),
        decorations: Box::new(NoDecorations),
    };
    let mut renderer = Renderer::with_font_source(
        services,
        options_for("atlas-overflow"),
        Theme::dark(),
        huge_glyph_font_source(),
    )
    .unwrap();

    renderer.render_rows(0, 0);
    // Producing the six glyphs overflowed the page mid-scan; the pass was
    // redone from scratch so no cell references cleared texture space.
    assert_eq!(renderer.frame().glyphs.len(), 6);
    assert!(renderer.stats().cells_updated >= 12);
}

#[test]
fn theme_change_rebuilds_the_frame() {
    let buffer = SharedBuffer::new(8, 1);
    buffer.0.lock().set_text(0, 0, "ab", AttrWords::default());
    let mut renderer = renderer_for("theme-change", buffer);
    renderer.render_rows(0, 0);
    assert_eq!(renderer.frame().glyphs.len(), 2);

    let mut theme = Theme::dark();
    theme.background = cellgrid_config::Color::new(1, 2, 3);
    renderer.set_colors(theme).unwrap();
    // The model was invalidated; everything renders again.
    let before = renderer.stats().cells_updated;
    renderer.render_rows(0, 0);
    assert!(renderer.stats().cells_updated > before);
    assert_eq!(renderer.frame().glyphs.len(), 2);
}
