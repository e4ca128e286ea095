//! The render model: last-drawn state of every visible cell.
//!
//! The model is the diff baseline for incremental redraws. Each cell stores
//! four words (code, bg, fg, ext); a cell is skipped during a redraw iff all
//! four words match the freshly resolved values. A static screen therefore
//! costs zero atlas lookups and zero instance-buffer writes after its first
//! frame.

/// Words stored per cell.
pub const CELL_WORDS: usize = 4;

/// Set on the code word when the cell renders a combined grapheme cluster
/// instead of a single code point.
pub const COMBINED_CHAR_BIT: u32 = 0x8000_0000;

/// Offsets into a cell's word quad.
pub const WORD_CODE: usize = 0;
pub const WORD_BG: usize = 1;
pub const WORD_FG: usize = 2;
pub const WORD_EXT: usize = 3;

/// Last-drawn words for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelCell {
    pub code: u32,
    pub bg: u32,
    pub fg: u32,
    pub ext: u32,
}

/// Per-cell render state plus selection geometry for the visible viewport.
#[derive(Debug)]
pub struct RenderModel {
    cells: Vec<u32>,
    line_lengths: Vec<usize>,
    cols: usize,
    rows: usize,
    pub selection: SelectionState,
}

impl RenderModel {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cells: vec![0; cols * rows * CELL_WORDS],
            line_lengths: vec![0; rows],
            cols,
            rows,
            selection: SelectionState::default(),
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Resize the grid. All cell state is dropped so the next frame redraws
    /// everything.
    pub fn resize(&mut self, cols: usize, rows: usize) {
        self.cols = cols;
        self.rows = rows;
        self.cells.clear();
        self.cells.resize(cols * rows * CELL_WORDS, 0);
        self.line_lengths.clear();
        self.line_lengths.resize(rows, 0);
    }

    /// Forget all drawn state without resizing.
    pub fn clear(&mut self) {
        self.cells.fill(0);
        self.line_lengths.fill(0);
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        (row * self.cols + col) * CELL_WORDS
    }

    pub fn cell(&self, row: usize, col: usize) -> ModelCell {
        let i = self.index(row, col);
        ModelCell {
            code: self.cells[i + WORD_CODE],
            bg: self.cells[i + WORD_BG],
            fg: self.cells[i + WORD_FG],
            ext: self.cells[i + WORD_EXT],
        }
    }

    pub fn set_cell(&mut self, row: usize, col: usize, cell: ModelCell) {
        let i = self.index(row, col);
        self.cells[i + WORD_CODE] = cell.code;
        self.cells[i + WORD_BG] = cell.bg;
        self.cells[i + WORD_FG] = cell.fg;
        self.cells[i + WORD_EXT] = cell.ext;
    }

    pub fn line_length(&self, row: usize) -> usize {
        self.line_lengths[row]
    }

    pub fn set_line_length(&mut self, row: usize, len: usize) {
        self.line_lengths[row] = len;
    }
}

/// Current selection, clamped to the viewport.
///
/// Rows are viewport-relative; the unclamped rows are kept signed so a
/// selection that starts above the viewport still covers the right cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub is_active: bool,
    pub column_select: bool,
    pub viewport_start_row: isize,
    pub viewport_end_row: isize,
    pub capped_start_row: usize,
    pub capped_end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl SelectionState {
    /// Recompute from host selection endpoints, given as `(col, row)` with
    /// viewport-relative rows. Clears when there is no selection, the
    /// endpoints coincide, or the range lies entirely outside the viewport.
    pub fn update(
        &mut self,
        start: Option<(usize, isize)>,
        end: Option<(usize, isize)>,
        column_select: bool,
        viewport_rows: usize,
    ) {
        *self = SelectionState::default();
        let (Some(start), Some(end)) = (start, end) else {
            return;
        };
        if start == end {
            return;
        }
        let (start_row, end_row) = (start.1, end.1);
        if end_row < 0 || start_row >= viewport_rows as isize {
            return;
        }
        self.is_active = true;
        self.column_select = column_select;
        self.viewport_start_row = start_row;
        self.viewport_end_row = end_row;
        self.capped_start_row = start_row.max(0) as usize;
        self.capped_end_row = end_row.min(viewport_rows as isize - 1).max(0) as usize;
        self.start_col = start.0;
        self.end_col = end.0;
    }

    /// Whether a viewport cell falls inside the selection.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        if !self.is_active {
            return false;
        }
        let r = row as isize;
        if self.column_select {
            let (lo, hi) = if self.start_col <= self.end_col {
                (self.start_col, self.end_col)
            } else {
                (self.end_col, self.start_col)
            };
            r >= self.viewport_start_row && r <= self.viewport_end_row && col >= lo && col < hi
        } else if self.viewport_start_row == self.viewport_end_row {
            r == self.viewport_start_row && col >= self.start_col && col < self.end_col
        } else if r == self.viewport_start_row {
            col >= self.start_col
        } else if r == self.viewport_end_row {
            col < self.end_col
        } else {
            r > self.viewport_start_row && r < self.viewport_end_row
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_words_distinguish_cells() {
        let mut model = RenderModel::new(4, 2);
        let cell = ModelCell {
            code: 'x' as u32,
            bg: 1,
            fg: 2,
            ext: 3,
        };
        model.set_cell(1, 2, cell);
        assert_eq!(model.cell(1, 2), cell);
        assert_eq!(model.cell(1, 1), ModelCell::default());
    }

    #[test]
    fn resize_drops_state() {
        let mut model = RenderModel::new(2, 2);
        model.set_cell(0, 0, ModelCell { code: 1, bg: 1, fg: 1, ext: 1 });
        model.resize(3, 3);
        assert_eq!(model.cell(0, 0), ModelCell::default());
        assert_eq!(model.cols(), 3);
    }

    #[test]
    fn empty_or_degenerate_selection_clears() {
        let mut sel = SelectionState::default();
        sel.update(Some((2, 1)), Some((2, 1)), false, 10);
        assert!(!sel.is_active);
        sel.update(None, None, false, 10);
        assert!(!sel.is_active);
    }

    #[test]
    fn selection_outside_viewport_clears() {
        let mut sel = SelectionState::default();
        sel.update(Some((0, -5)), Some((3, -2)), false, 10);
        assert!(!sel.is_active);
        sel.update(Some((0, 12)), Some((3, 14)), false, 10);
        assert!(!sel.is_active);
    }

    #[test]
    fn selection_rows_clamp_to_viewport() {
        let mut sel = SelectionState::default();
        sel.update(Some((3, -2)), Some((5, 12)), false, 10);
        assert!(sel.is_active);
        assert_eq!(sel.capped_start_row, 0);
        assert_eq!(sel.capped_end_row, 9);
        // Middle rows are fully covered.
        assert!(sel.contains(0, 0));
        assert!(sel.contains(9, 80));
    }

    #[test]
    fn linear_selection_respects_endpoint_columns() {
        let mut sel = SelectionState::default();
        sel.update(Some((3, 1)), Some((2, 3)), false, 10);
        assert!(!sel.contains(1, 2));
        assert!(sel.contains(1, 3));
        assert!(sel.contains(2, 0));
        assert!(sel.contains(3, 1));
        assert!(!sel.contains(3, 2));
    }

    #[test]
    fn column_selection_is_a_rectangle() {
        let mut sel = SelectionState::default();
        sel.update(Some((2, 1)), Some((5, 3)), true, 10);
        assert!(sel.contains(1, 2));
        assert!(sel.contains(3, 4));
        assert!(!sel.contains(2, 1));
        assert!(!sel.contains(2, 5));
        assert!(!sel.contains(0, 3));
    }
}
