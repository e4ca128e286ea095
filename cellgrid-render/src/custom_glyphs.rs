//! Procedurally drawn glyphs for box-drawing, block-element, and powerline
//! code points.
//!
//! Font coverage and hinting for these characters is inconsistent across
//! platforms; drawing them straight into the cell guarantees adjacent cells
//! connect seamlessly at any size.

use crate::scratch::Scratch;

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

/// Whether a code point is drawn procedurally instead of from a font.
pub fn is_custom_glyph(code: u32) -> bool {
    box_sides(code).is_some()
        || double_sides(code).is_some()
        || matches!(code, 0x2580..=0x259F | 0xE0B0..=0xE0B3)
}

/// Code points exempt from minimum-contrast adjustment. Box-drawing and
/// powerline glyphs abut same-colored neighbors, and adjusting them breaks
/// the seams.
pub fn is_contrast_exempt(code: u32) -> bool {
    matches!(code, 0x2500..=0x259F | 0xE0A0..=0xE0D6)
}

/// Light/heavy box-drawing strokes: `(sides, heavy)`.
fn box_sides(code: u32) -> Option<(u8, bool)> {
    let (sides, heavy) = match code {
        0x2500 => (LEFT | RIGHT, false),
        0x2501 => (LEFT | RIGHT, true),
        0x2502 => (UP | DOWN, false),
        0x2503 => (UP | DOWN, true),
        0x250C => (DOWN | RIGHT, false),
        0x250F => (DOWN | RIGHT, true),
        0x2510 => (DOWN | LEFT, false),
        0x2513 => (DOWN | LEFT, true),
        0x2514 => (UP | RIGHT, false),
        0x2517 => (UP | RIGHT, true),
        0x2518 => (UP | LEFT, false),
        0x251B => (UP | LEFT, true),
        0x251C => (UP | DOWN | RIGHT, false),
        0x2523 => (UP | DOWN | RIGHT, true),
        0x2524 => (UP | DOWN | LEFT, false),
        0x252B => (UP | DOWN | LEFT, true),
        0x252C => (DOWN | LEFT | RIGHT, false),
        0x2533 => (DOWN | LEFT | RIGHT, true),
        0x2534 => (UP | LEFT | RIGHT, false),
        0x253B => (UP | LEFT | RIGHT, true),
        0x253C => (UP | DOWN | LEFT | RIGHT, false),
        0x254B => (UP | DOWN | LEFT | RIGHT, true),
        0x2574 => (LEFT, false),
        0x2575 => (UP, false),
        0x2576 => (RIGHT, false),
        0x2577 => (DOWN, false),
        _ => return None,
    };
    Some((sides, heavy))
}

/// Double-line box-drawing strokes.
fn double_sides(code: u32) -> Option<u8> {
    Some(match code {
        0x2550 => LEFT | RIGHT,
        0x2551 => UP | DOWN,
        0x2554 => DOWN | RIGHT,
        0x2557 => DOWN | LEFT,
        0x255A => UP | RIGHT,
        0x255D => UP | LEFT,
        0x2560 => UP | DOWN | RIGHT,
        0x2563 => UP | DOWN | LEFT,
        0x2566 => DOWN | LEFT | RIGHT,
        0x2569 => UP | LEFT | RIGHT,
        0x256C => UP | DOWN | LEFT | RIGHT,
        _ => return None,
    })
}

/// Draw a custom glyph into the cell rectangle at `(x, y)`.
/// Returns false when the code point has no procedural definition.
pub fn draw_custom_glyph(
    scratch: &mut Scratch,
    code: u32,
    fg: u32,
    x: i32,
    y: i32,
    cell_w: u32,
    cell_h: u32,
    device_pixel_ratio: f32,
) -> bool {
    let lw = (device_pixel_ratio.round() as u32).max(1);
    if let Some((sides, heavy)) = box_sides(code) {
        let lw = if heavy { lw * 2 } else { lw };
        draw_box_sides(scratch, sides, fg, x, y, cell_w, cell_h, lw);
        return true;
    }
    if let Some(sides) = double_sides(code) {
        let gap = lw + 1;
        draw_double_sides(scratch, sides, fg, x, y, cell_w, cell_h, lw, gap);
        return true;
    }
    match code {
        0x2580..=0x259F => draw_block_element(scratch, code, fg, x, y, cell_w, cell_h),
        0xE0B0..=0xE0B3 => draw_powerline(scratch, code, fg, x, y, cell_w, cell_h, lw),
        _ => return false,
    }
    true
}

fn draw_box_sides(
    scratch: &mut Scratch,
    sides: u8,
    fg: u32,
    x: i32,
    y: i32,
    cell_w: u32,
    cell_h: u32,
    lw: u32,
) {
    let cx = x + (cell_w / 2) as i32 - (lw / 2) as i32;
    let cy = y + (cell_h / 2) as i32 - (lw / 2) as i32;
    if sides & LEFT != 0 {
        scratch.fill_rect(x, cy, (cx - x) as u32 + lw, lw, fg);
    }
    if sides & RIGHT != 0 {
        scratch.fill_rect(cx, cy, cell_w - (cx - x) as u32, lw, fg);
    }
    if sides & UP != 0 {
        scratch.fill_rect(cx, y, lw, (cy - y) as u32 + lw, fg);
    }
    if sides & DOWN != 0 {
        scratch.fill_rect(cx, cy, lw, cell_h - (cy - y) as u32, fg);
    }
}

fn draw_double_sides(
    scratch: &mut Scratch,
    sides: u8,
    fg: u32,
    x: i32,
    y: i32,
    cell_w: u32,
    cell_h: u32,
    lw: u32,
    gap: u32,
) {
    let off = gap as i32;
    if sides & (LEFT | RIGHT) != 0 {
        for dy in [-off, off] {
            let s = sides & (LEFT | RIGHT);
            draw_box_sides(scratch, s, fg, x, y + dy, cell_w, cell_h, lw);
        }
    }
    if sides & (UP | DOWN) != 0 {
        for dx in [-off, off] {
            let s = sides & (UP | DOWN);
            draw_box_sides(scratch, s, fg, x + dx, y, cell_w, cell_h, lw);
        }
    }
}

fn draw_block_element(
    scratch: &mut Scratch,
    code: u32,
    fg: u32,
    x: i32,
    y: i32,
    cell_w: u32,
    cell_h: u32,
) {
    let eighth_h = |n: u32| (cell_h * n + 7) / 8;
    let eighth_w = |n: u32| (cell_w * n + 7) / 8;
    match code {
        // Upper half block
        0x2580 => scratch.fill_rect(x, y, cell_w, eighth_h(4), fg),
        // Lower one-eighth through full block
        0x2581..=0x2588 => {
            let h = eighth_h(code - 0x2580);
            scratch.fill_rect(x, y + (cell_h - h) as i32, cell_w, h, fg);
        }
        // Left seven-eighths down to one-eighth
        0x2589..=0x258F => {
            let w = eighth_w(8 - (code - 0x2588));
            scratch.fill_rect(x, y, w, cell_h, fg);
        }
        // Right half block
        0x2590 => {
            let w = eighth_w(4);
            scratch.fill_rect(x + (cell_w - w) as i32, y, w, cell_h, fg);
        }
        // Shades
        0x2591 => scratch.fill_rect_alpha(x, y, cell_w, cell_h, fg, 64),
        0x2592 => scratch.fill_rect_alpha(x, y, cell_w, cell_h, fg, 128),
        0x2593 => scratch.fill_rect_alpha(x, y, cell_w, cell_h, fg, 192),
        // Upper one-eighth
        0x2594 => scratch.fill_rect(x, y, cell_w, eighth_h(1), fg),
        // Right one-eighth
        0x2595 => {
            let w = eighth_w(1);
            scratch.fill_rect(x + (cell_w - w) as i32, y, w, cell_h, fg);
        }
        // Quadrants
        0x2596..=0x259F => {
            let quads: u8 = match code {
                0x2596 => 0b0100,          // lower left
                0x2597 => 0b1000,          // lower right
                0x2598 => 0b0001,          // upper left
                0x2599 => 0b1101,          // UL + LL + LR
                0x259A => 0b1001,          // UL + LR
                0x259B => 0b0111,          // UL + UR + LL
                0x259C => 0b1011,          // UL + UR + LR
                0x259D => 0b0010,          // upper right
                0x259E => 0b0110,          // UR + LL
                _ => 0b1110,               // UR + LL + LR
            };
            let hw = eighth_w(4);
            let hh = eighth_h(4);
            if quads & 0b0001 != 0 {
                scratch.fill_rect(x, y, hw, hh, fg);
            }
            if quads & 0b0010 != 0 {
                scratch.fill_rect(x + hw as i32, y, cell_w - hw, hh, fg);
            }
            if quads & 0b0100 != 0 {
                scratch.fill_rect(x, y + hh as i32, hw, cell_h - hh, fg);
            }
            if quads & 0b1000 != 0 {
                scratch.fill_rect(x + hw as i32, y + hh as i32, cell_w - hw, cell_h - hh, fg);
            }
        }
        _ => {}
    }
}

fn draw_powerline(
    scratch: &mut Scratch,
    code: u32,
    fg: u32,
    x: i32,
    y: i32,
    cell_w: u32,
    cell_h: u32,
    lw: u32,
) {
    let mid = (cell_h / 2) as i32;
    for row in 0..cell_h as i32 {
        // Horizontal extent of the triangle edge at this row.
        let reach = if row <= mid {
            (row * cell_w as i32) / mid.max(1)
        } else {
            ((cell_h as i32 - 1 - row) * cell_w as i32) / (cell_h as i32 - 1 - mid).max(1)
        }
        .clamp(0, cell_w as i32);
        match code {
            // Solid right-pointing triangle
            0xE0B0 => scratch.fill_rect(x, y + row, reach as u32, 1, fg),
            // Thin right chevron
            0xE0B1 => scratch.fill_rect(x + reach - lw as i32, y + row, lw, 1, fg),
            // Solid left-pointing triangle
            0xE0B2 => {
                scratch.fill_rect(x + cell_w as i32 - reach, y + row, reach as u32, 1, fg)
            }
            // Thin left chevron
            _ => scratch.fill_rect(x + cell_w as i32 - reach, y + row, lw, 1, fg),
        }
    }
}
