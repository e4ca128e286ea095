//! Background rectangle batching.
//!
//! Backgrounds are drawn as a separate instanced pass: one full-viewport
//! rectangle in the default background color, then one rectangle per
//! maximal same-color run. This produces O(distinct-color-runs) instances
//! instead of one quad per cell.

use cellgrid_config::color::{blend, multiply_opacity, rgba_to_f32};
use cellgrid_config::{AttrWords, ColorSpec, RenderColors, RendererOptions, DIM_OPACITY};

use crate::dimensions::RenderDimensions;
use crate::model::RenderModel;
use crate::types::RectInstance;

/// Effective background of a run, derived from decoded attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunKey {
    bg_word: u32,
    fg_word: u32,
}

impl RunKey {
    fn attrs(&self) -> AttrWords {
        AttrWords::new(self.fg_word, self.bg_word, 0)
    }

    /// A run breaks when the background changes, or when the foreground
    /// changes while either side is inverse — inverse runs paint their
    /// background with the foreground color, so a foreground change there
    /// is a visible background change.
    fn breaks_with(&self, next: RunKey) -> bool {
        if self.bg_word != next.bg_word {
            return true;
        }
        self.fg_word != next.fg_word
            && (self.attrs().is_inverse() || next.attrs().is_inverse())
    }
}

/// Produces the background rectangle list for the current model state.
#[derive(Debug, Default)]
pub struct RectangleRenderer {
    rects: Vec<RectInstance>,
}

impl RectangleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rects(&self) -> &[RectInstance] {
        &self.rects
    }

    /// Rebuild all rectangles from the model. Rectangle 0 always covers the
    /// full viewport with the theme background.
    pub fn update(
        &mut self,
        model: &RenderModel,
        colors: &RenderColors,
        dims: &RenderDimensions,
        options: &RendererOptions,
    ) {
        self.rects.clear();
        self.rects.push(RectInstance {
            pos: [0.0, 0.0],
            size: [dims.canvas_width as f32, dims.canvas_height as f32],
            color: rgba_to_f32(colors.background),
        });

        for row in 0..model.rows() {
            let mut run_start = 0usize;
            let mut run: Option<RunKey> = None;
            for col in 0..model.cols() {
                let cell = model.cell(row, col);
                let key = RunKey {
                    bg_word: cell.bg,
                    fg_word: cell.fg,
                };
                match run {
                    Some(current) if current.breaks_with(key) => {
                        self.flush_run(current, row, run_start, col, colors, dims, options);
                        run_start = col;
                        run = Some(key);
                    }
                    Some(_) => {}
                    None => {
                        run_start = col;
                        run = Some(key);
                    }
                }
            }
            if let Some(current) = run {
                self.flush_run(current, row, run_start, model.cols(), colors, dims, options);
            }
        }
    }

    fn flush_run(
        &mut self,
        key: RunKey,
        row: usize,
        start: usize,
        end: usize,
        colors: &RenderColors,
        dims: &RenderDimensions,
        options: &RendererOptions,
    ) {
        let Some(rgba) = effective_run_bg(key, colors, options) else {
            return;
        };
        let (x, y) = dims.cell_origin(row, start);
        self.rects.push(RectInstance {
            pos: [x, y],
            size: [
                (end - start) as f32 * dims.cell_width as f32,
                dims.cell_height as f32,
            ],
            color: rgba_to_f32(rgba),
        });
    }
}

/// The color a run paints behind its cells, or `None` when it matches the
/// default background and the viewport rectangle already covers it.
fn effective_run_bg(
    key: RunKey,
    colors: &RenderColors,
    options: &RendererOptions,
) -> Option<u32> {
    let attrs = key.attrs();
    let mut rgba = if attrs.is_inverse() {
        // Inverse cells paint their background with the foreground color.
        match attrs.fg_spec() {
            ColorSpec::Default => colors.foreground,
            ColorSpec::Palette16(i) | ColorSpec::Palette256(i) => {
                let mut i = i as u32;
                if attrs.is_bold() && options.draw_bold_text_in_bright_colors && i < 8 {
                    i += 8;
                }
                colors.palette_color(i)
            }
            ColorSpec::Rgb(r, g, b) => u32::from_be_bytes([r, g, b, 0xFF]),
        }
    } else {
        match attrs.bg_spec() {
            ColorSpec::Default => return None,
            ColorSpec::Palette16(i) | ColorSpec::Palette256(i) => colors.palette_color(i as u32),
            ColorSpec::Rgb(r, g, b) => u32::from_be_bytes([r, g, b, 0xFF]),
        }
    };
    // Every run reaching this point has a non-default background (or paints
    // one via inverse), so dim always applies. The opacity is folded in
    // against the theme background here so the GPU pass stays opaque.
    if attrs.is_dim() {
        rgba = blend(colors.background, multiply_opacity(rgba, DIM_OPACITY));
    }
    Some(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelCell;
    use cellgrid_config::attributes::{bg_flags, fg_flags, CM_P256, CM_RGB};
    use cellgrid_config::Theme;

    fn setup(cols: usize, rows: usize) -> (RenderModel, RenderColors, RenderDimensions, RendererOptions) {
        let model = RenderModel::new(cols, rows);
        let colors = RenderColors::from_theme(&Theme::dark());
        let dims = RenderDimensions {
            cols,
            rows,
            cell_width: 10,
            cell_height: 20,
            canvas_width: 10 * cols as u32,
            canvas_height: 20 * rows as u32,
        };
        (model, colors, dims, RendererOptions::default())
    }

    fn bg_cell(bg: u32) -> ModelCell {
        ModelCell { code: 'x' as u32, bg, fg: 0, ext: 0 }
    }

    #[test]
    fn default_background_emits_only_the_viewport_rect() {
        let (model, colors, dims, options) = setup(8, 2);
        let mut rr = RectangleRenderer::new();
        rr.update(&model, &colors, &dims, &options);
        assert_eq!(rr.rects().len(), 1);
        assert_eq!(rr.rects()[0].size, [80.0, 40.0]);
    }

    #[test]
    fn k_runs_emit_exactly_k_rects() {
        let (mut model, colors, dims, options) = setup(8, 1);
        // Row: [red red] [default default] [blue blue blue] [green]
        for col in 0..2 {
            model.set_cell(0, col, bg_cell(CM_RGB | 0xFF0000));
        }
        for col in 4..7 {
            model.set_cell(0, col, bg_cell(CM_RGB | 0x0000FF));
        }
        model.set_cell(0, 7, bg_cell(CM_RGB | 0x00FF00));
        let mut rr = RectangleRenderer::new();
        rr.update(&model, &colors, &dims, &options);
        assert_eq!(rr.rects().len(), 1 + 3);
        assert_eq!(rr.rects()[1].pos, [0.0, 0.0]);
        assert_eq!(rr.rects()[1].size, [20.0, 20.0]);
        assert_eq!(rr.rects()[2].pos, [40.0, 0.0]);
        assert_eq!(rr.rects()[2].size, [30.0, 20.0]);
    }

    #[test]
    fn runs_merge_across_equal_cells() {
        let (mut model, colors, dims, options) = setup(4, 1);
        for col in 0..4 {
            model.set_cell(0, col, bg_cell(CM_P256 | 1));
        }
        let mut rr = RectangleRenderer::new();
        rr.update(&model, &colors, &dims, &options);
        assert_eq!(rr.rects().len(), 2);
        assert_eq!(rr.rects()[1].size, [40.0, 20.0]);
        assert_eq!(rr.rects()[1].color, rgba_to_f32(colors.palette[1]));
    }

    #[test]
    fn fg_change_breaks_run_only_under_inverse() {
        let (mut model, colors, dims, options) = setup(4, 1);
        // Same bg everywhere; fg differs between cols 0-1 and 2-3.
        for col in 0..4 {
            let fg = if col < 2 { CM_RGB | 0x111111 } else { CM_RGB | 0x222222 };
            model.set_cell(0, col, ModelCell { code: 'x' as u32, bg: CM_RGB | 0xFF0000, fg, ext: 0 });
        }
        let mut rr = RectangleRenderer::new();
        rr.update(&model, &colors, &dims, &options);
        // No inverse: one merged run.
        assert_eq!(rr.rects().len(), 2);

        // Now with inverse set the fg paints the background, so the fg
        // change splits the run.
        for col in 0..4 {
            let mut cell = model.cell(0, col);
            cell.fg |= fg_flags::INVERSE;
            cell.bg = 0;
            model.set_cell(0, col, cell);
        }
        rr.update(&model, &colors, &dims, &options);
        assert_eq!(rr.rects().len(), 3);
        assert_eq!(rr.rects()[1].color, rgba_to_f32(0x111111FF));
    }

    #[test]
    fn dim_background_halves_toward_the_theme_background() {
        let (mut model, colors, dims, options) = setup(2, 1);
        model.set_cell(
            0,
            0,
            ModelCell {
                code: 'x' as u32,
                bg: CM_RGB | 0xFF0000 | bg_flags::DIM,
                fg: 0,
                ext: 0,
            },
        );
        let mut rr = RectangleRenderer::new();
        rr.update(&model, &colors, &dims, &options);
        assert_eq!(rr.rects().len(), 2);
        // Half-opacity red folded in over the black theme background.
        assert_eq!(rr.rects()[1].color, rgba_to_f32(0x800000FF));
    }

    #[test]
    fn inverse_default_fg_paints_theme_foreground() {
        let (mut model, colors, dims, options) = setup(2, 1);
        model.set_cell(
            0,
            0,
            ModelCell { code: 'x' as u32, bg: 0, fg: fg_flags::INVERSE, ext: 0 },
        );
        let mut rr = RectangleRenderer::new();
        rr.update(&model, &colors, &dims, &options);
        assert_eq!(rr.rects().len(), 2);
        assert_eq!(rr.rects()[1].color, rgba_to_f32(colors.foreground));
        assert_eq!(rr.rects()[1].size, [10.0, 20.0]);
    }
}
