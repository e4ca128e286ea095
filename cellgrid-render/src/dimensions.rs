//! Pixel geometry of the rendered grid.

use cellgrid_fonts::CellMetrics;

/// Device-pixel layout of the cell grid on the output surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderDimensions {
    pub cols: usize,
    pub rows: usize,
    pub cell_width: u32,
    pub cell_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl RenderDimensions {
    pub fn new(cols: usize, rows: usize, metrics: CellMetrics) -> Self {
        Self {
            cols,
            rows,
            cell_width: metrics.cell_width,
            cell_height: metrics.cell_height,
            canvas_width: metrics.cell_width * cols as u32,
            canvas_height: metrics.cell_height * rows as u32,
        }
    }

    /// Top-left device pixel of a cell.
    pub fn cell_origin(&self, row: usize, col: usize) -> (f32, f32) {
        (
            col as f32 * self.cell_width as f32,
            row as f32 * self.cell_height as f32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellgrid_fonts::RawFontMetrics;

    #[test]
    fn canvas_size_is_grid_times_cell() {
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
            10.0,
            1.0,
            1.0,
            0.0,
        );
        let dims = RenderDimensions::new(80, 24, metrics);
        assert_eq!(dims.canvas_width, 80 * 6);
        assert_eq!(dims.canvas_height, 24 * 10);
        assert_eq!(dims.cell_origin(1, 2), (12.0, 10.0));
    }
}
