//! Glyph instance batching.
//!
//! A fixed slot per cell holds that cell's glyph quad; the draw list is
//! compacted each frame from the slots using the model's per-row content
//! lengths, so trailing blank cells cost nothing at draw time.

use crate::atlas::{RasterizedGlyph, PAGE_SIZE};
use crate::dimensions::RenderDimensions;
use crate::model::RenderModel;
use crate::types::GlyphInstance;

#[derive(Debug)]
pub struct GlyphRenderer {
    cols: usize,
    rows: usize,
    slots: Vec<GlyphInstance>,
    draw_list: Vec<GlyphInstance>,
}

impl GlyphRenderer {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            slots: vec![GlyphInstance::default(); cols * rows],
            draw_list: Vec::new(),
        }
    }

    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.slots.clear();
        self.slots.resize(cols * rows, GlyphInstance::default());
    }

    pub fn clear(&mut self) {
        self.slots.fill(GlyphInstance::default());
    }

    pub fn clear_cell(&mut self, row: usize, col: usize) {
        self.slots[row * self.cols + col] = GlyphInstance::default();
    }

    /// Write a cell's glyph quad.
    ///
    /// Glyphs whose ink starts left of their cell (italic overhang, wide
    /// bearings) are clipped at the cell edge when the previous cell has a
    /// different background, so ink never bleeds onto a differently
    /// colored neighbor.
    pub fn update_cell(
        &mut self,
        row: usize,
        col: usize,
        glyph: RasterizedGlyph,
        dims: &RenderDimensions,
        bg: u32,
        last_bg: Option<u32>,
    ) {
        if glyph.is_empty() {
            self.clear_cell(row, col);
            return;
        }
        let (cx, cy) = dims.cell_origin(row, col);
        let ([mut tx, ty], [mut tw, th]) = glyph.tex_coords();
        let mut x = cx + glyph.offset.0 as f32;
        let mut w = glyph.size.0 as f32;

        if glyph.offset.0 < 0 && last_bg.is_some_and(|last| last != bg) {
            let cut = (-glyph.offset.0) as f32;
            x = cx;
            w = (w - cut).max(0.0);
            tx += cut / PAGE_SIZE as f32;
            tw -= cut / PAGE_SIZE as f32;
        }

        self.slots[row * self.cols + col] = GlyphInstance {
            pos: [x, cy + glyph.offset.1 as f32],
            size: [w, glyph.size.1 as f32],
            tex_origin: [tx, ty],
            tex_size: [tw, th],
        };
    }

    /// The draw list from the most recent [`Self::build_draw_list`] call.
    pub fn draw_list(&self) -> &[GlyphInstance] {
        &self.draw_list
    }

    /// Compact the populated slots into the draw list.
    pub fn build_draw_list(&mut self, model: &RenderModel) -> &[GlyphInstance] {
        self.draw_list.clear();
        for row in 0..self.rows.min(model.rows()) {
            let len = model.line_length(row).min(self.cols);
            let base = row * self.cols;
            for slot in &self.slots[base..base + len] {
                if !slot.is_empty() {
                    self.draw_list.push(*slot);
                }
            }
        }
        &self.draw_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> RenderDimensions {
        RenderDimensions {
            cols: 4,
            rows: 2,
            cell_width: 10,
            cell_height: 20,
            canvas_width: 40,
            canvas_height: 40,
        }
    }

    fn glyph() -> RasterizedGlyph {
        RasterizedGlyph {
            texture_position: (100, 50),
            size: (8, 12),
            offset: (1, 4),
        }
    }

    #[test]
    fn instance_positions_follow_cell_origin_and_offset() {
        let mut gr = GlyphRenderer::new(4, 2);
        gr.update_cell(1, 2, glyph(), &dims(), 0, None);
        let mut model = RenderModel::new(4, 2);
        model.set_line_length(1, 3);
        let list = gr.build_draw_list(&model);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].pos, [21.0, 24.0]);
        assert_eq!(list[0].size, [8.0, 12.0]);
    }

    #[test]
    fn draw_list_respects_line_lengths() {
        let mut gr = GlyphRenderer::new(4, 2);
        for col in 0..4 {
            gr.update_cell(0, col, glyph(), &dims(), 0, None);
        }
        let mut model = RenderModel::new(4, 2);
        model.set_line_length(0, 2);
        assert_eq!(gr.build_draw_list(&model).len(), 2);
        model.set_line_length(0, 4);
        assert_eq!(gr.build_draw_list(&model).len(), 4);
    }

    #[test]
    fn zero_size_glyphs_clear_their_slot() {
        let mut gr = GlyphRenderer::new(4, 2);
        gr.update_cell(0, 0, glyph(), &dims(), 0, None);
        gr.update_cell(0, 0, RasterizedGlyph::default(), &dims(), 0, None);
        let mut model = RenderModel::new(4, 2);
        model.set_line_length(0, 4);
        assert!(gr.build_draw_list(&model).is_empty());
    }

    #[test]
    fn left_overhang_clips_against_differing_neighbor_bg() {
        let mut gr = GlyphRenderer::new(4, 2);
        let overhang = RasterizedGlyph {
            texture_position: (0, 0),
            size: (10, 12),
            offset: (-2, 0),
        };
        // Same neighbor bg: no clipping.
        gr.update_cell(0, 1, overhang, &dims(), 5, Some(5));
        let mut model = RenderModel::new(4, 2);
        model.set_line_length(0, 4);
        assert_eq!(gr.build_draw_list(&model)[0].pos[0], 8.0);

        // Differing neighbor bg: clipped at the cell edge.
        gr.update_cell(0, 1, overhang, &dims(), 5, Some(7));
        let list = gr.build_draw_list(&model);
        assert_eq!(list[0].pos[0], 10.0);
        assert_eq!(list[0].size[0], 8.0);
    }
}
