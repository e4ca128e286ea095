//! Narrow service interfaces to the host terminal.
//!
//! The renderer never reaches into host internals; everything it needs from
//! the terminal is expressed as one of these traits, injected at
//! construction. The host keeps ownership of the buffer; the renderer only
//! reads cell records through [`BufferAccessor`].

use std::ops::Range;
use std::sync::Arc;

use cellgrid_config::AttrWords;
use unicode_width::UnicodeWidthChar;

/// A read-only snapshot of one buffer cell.
#[derive(Debug, Clone, Default)]
pub struct CellRecord {
    /// Unicode code point, or 0 for an empty cell.
    pub code: u32,
    /// Display width in columns (0 for the trailing half of a wide glyph).
    pub width: u8,
    /// Packed attribute words.
    pub attrs: AttrWords,
    /// Combined grapheme cluster text, when the cell holds more than one
    /// code point.
    pub combined: Option<Arc<str>>,
}

impl CellRecord {
    pub fn is_empty(&self) -> bool {
        self.code == 0 && self.combined.is_none()
    }
}

/// Read access to the visible portion of the terminal buffer.
///
/// Rows are viewport-relative: row 0 is the top visible row at the current
/// scroll position.
pub trait BufferAccessor {
    fn cols(&self) -> usize;
    fn rows(&self) -> usize;
    /// The cell at a viewport position. Out-of-range coordinates yield the
    /// default (empty) record.
    fn cell(&self, row: usize, col: usize) -> CellRecord;
    /// Number of columns in the row that actually hold content.
    fn line_length(&self, row: usize) -> usize {
        self.cols()
    }
}

/// Declares runs of adjacent columns that render as a single glyph
/// (ligatures, emoji sequences).
pub trait CharacterJoiner {
    /// Joined column ranges for a viewport row, sorted and non-overlapping.
    fn joined_ranges(&self, row: usize) -> Vec<Range<usize>> {
        let _ = row;
        Vec::new()
    }
}

/// Which side of the text a decoration paints on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationLayer {
    /// Applied before selection, so selection wins.
    Below,
    /// Applied after selection, so the decoration wins.
    Above,
}

/// Color overrides contributed by one decoration covering a cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecorationColors {
    /// Override background as `0xRRGGBBAA`.
    pub bg: Option<u32>,
    /// Override foreground as `0xRRGGBBAA`.
    pub fg: Option<u32>,
}

/// Read access to decorations registered with the host.
pub trait DecorationProvider {
    /// Overrides for a cell on one layer, in registration order. Later
    /// entries win over earlier ones.
    fn decorations_at(&self, row: usize, col: usize, layer: DecorationLayer) -> DecorationColors {
        let _ = (row, col, layer);
        DecorationColors::default()
    }
}

/// A simple in-memory cell grid implementing [`BufferAccessor`].
///
/// Hosts with their own buffer representation implement the trait directly;
/// this grid covers embedding scenarios and tests where the renderer is fed
/// plain text.
#[derive(Debug, Clone)]
pub struct GridBuffer {
    cols: usize,
    rows: usize,
    cells: Vec<CellRecord>,
}

impl GridBuffer {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            cells: vec![CellRecord::default(); cols * rows],
        }
    }

    pub fn set_cell(&mut self, row: usize, col: usize, record: CellRecord) {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = record;
        }
    }

    /// Write a string starting at a position, with the given attributes.
    /// Wide characters occupy two columns; the trailing column gets a
    /// zero-width record. Writing stops at the end of the row.
    pub fn set_text(&mut self, row: usize, col: usize, text: &str, attrs: AttrWords) {
        let mut col = col;
        for ch in text.chars() {
            let width = ch.width().unwrap_or(0) as u8;
            if col + width.max(1) as usize > self.cols {
                break;
            }
            self.set_cell(
                row,
                col,
                CellRecord {
                    code: ch as u32,
                    width,
                    attrs,
                    combined: None,
                },
            );
            if width == 2 {
                self.set_cell(
                    row,
                    col + 1,
                    CellRecord {
                        code: 0,
                        width: 0,
                        attrs,
                        combined: None,
                    },
                );
            }
            col += width.max(1) as usize;
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(CellRecord::default());
    }
}

impl BufferAccessor for GridBuffer {
    fn cols(&self) -> usize {
        self.cols
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cell(&self, row: usize, col: usize) -> CellRecord {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col].clone()
        } else {
            CellRecord::default()
        }
    }

    fn line_length(&self, row: usize) -> usize {
        (0..self.cols)
            .rev()
            .find(|&col| !self.cell(row, col).is_empty())
            .map_or(0, |col| col + 1)
    }
}

/// A host with no joined characters.
#[derive(Debug, Default)]
pub struct NoJoiner;
impl CharacterJoiner for NoJoiner {}

/// A host with no decorations.
#[derive(Debug, Default)]
pub struct NoDecorations;
impl DecorationProvider for NoDecorations {}
