//! Color themes and the palette the renderer resolves against.

use serde::{Deserialize, Serialize};

use crate::color::{blend, multiply_opacity, Color};

/// Terminal color theme with 16 ANSI colors plus the special colors the
/// renderer needs (defaults, cursor, selection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub foreground: Color,
    pub background: Color,
    pub cursor: Color,
    pub cursor_accent: Color,
    pub selection_bg: Color,
    /// Selection background used while the terminal is unfocused.
    pub selection_inactive_bg: Color,
    /// Optional forced foreground for selected cells.
    pub selection_fg: Option<Color>,

    // ANSI colors (0-15)
    pub black: Color,
    pub red: Color,
    pub green: Color,
    pub yellow: Color,
    pub blue: Color,
    pub magenta: Color,
    pub cyan: Color,
    pub white: Color,
    pub bright_black: Color,
    pub bright_red: Color,
    pub bright_green: Color,
    pub bright_yellow: Color,
    pub bright_blue: Color,
    pub bright_magenta: Color,
    pub bright_cyan: Color,
    pub bright_white: Color,
}

impl Theme {
    /// Get ANSI color by index (0-15)
    pub fn ansi_color(&self, index: u8) -> Color {
        match index {
            0 => self.black,
            1 => self.red,
            2 => self.green,
            3 => self.yellow,
            4 => self.blue,
            5 => self.magenta,
            6 => self.cyan,
            7 => self.white,
            8 => self.bright_black,
            9 => self.bright_red,
            10 => self.bright_green,
            11 => self.bright_yellow,
            12 => self.bright_blue,
            13 => self.bright_magenta,
            14 => self.bright_cyan,
            15 => self.bright_white,
            _ => self.foreground,
        }
    }

    /// Default dark theme.
    pub fn dark() -> Self {
        Self {
            name: "Dark".to_string(),
            foreground: Color::from_rgb24(0xffffff),
            background: Color::from_rgb24(0x000000),
            cursor: Color::from_rgb24(0xffffff),
            cursor_accent: Color::from_rgb24(0x000000),
            selection_bg: Color::from_rgb24(0x3f5363),
            selection_inactive_bg: Color::from_rgb24(0x2b3b4a),
            selection_fg: None,
            black: Color::from_rgb24(0x2e3436),
            red: Color::from_rgb24(0xcc0000),
            green: Color::from_rgb24(0x4e9a06),
            yellow: Color::from_rgb24(0xc4a000),
            blue: Color::from_rgb24(0x3465a4),
            magenta: Color::from_rgb24(0x75507b),
            cyan: Color::from_rgb24(0x06989a),
            white: Color::from_rgb24(0xd3d7cf),
            bright_black: Color::from_rgb24(0x555753),
            bright_red: Color::from_rgb24(0xef2929),
            bright_green: Color::from_rgb24(0x8ae234),
            bright_yellow: Color::from_rgb24(0xfce94f),
            bright_blue: Color::from_rgb24(0x729fcf),
            bright_magenta: Color::from_rgb24(0xad7fa8),
            bright_cyan: Color::from_rgb24(0x34e2e2),
            bright_white: Color::from_rgb24(0xeeeeec),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

/// The resolved colors the renderer actually draws with: a full 256-entry
/// palette plus the special colors, all packed as `0xRRGGBBAA`.
///
/// Palette lookups index a fixed `[u32; 256]` table with an 8-bit payload,
/// so an out-of-range palette index cannot occur by construction.
#[derive(Debug, Clone)]
pub struct RenderColors {
    pub foreground: u32,
    pub background: u32,
    pub cursor: u32,
    pub cursor_accent: u32,
    pub selection_bg: u32,
    pub selection_inactive_bg: u32,
    pub selection_fg: Option<u32>,
    pub palette: [u32; 256],
}

impl RenderColors {
    /// Build the render palette from a theme: 16 theme colors, then the
    /// 6x6x6 color cube, then the 24-step grayscale ramp.
    pub fn from_theme(theme: &Theme) -> Self {
        const CUBE: [u8; 6] = [0, 95, 135, 175, 215, 255];
        let mut palette = [0u32; 256];
        for (i, slot) in palette.iter_mut().enumerate().take(16) {
            *slot = theme.ansi_color(i as u8).rgba();
        }
        for i in 16..232 {
            let v = i - 16;
            palette[i] = Color::new(CUBE[v / 36], CUBE[v / 6 % 6], CUBE[v % 6]).rgba();
        }
        for i in 232..256 {
            let v = (8 + (i - 232) * 10) as u8;
            palette[i] = Color::new(v, v, v).rgba();
        }
        Self {
            foreground: theme.foreground.rgba(),
            background: theme.background.rgba(),
            cursor: theme.cursor.rgba(),
            cursor_accent: theme.cursor_accent.rgba(),
            // Selection is translucent over whatever it covers; the packed
            // attribute words carry no alpha, so the blend against the
            // default background is folded in up front.
            selection_bg: blend(
                theme.background.rgba(),
                multiply_opacity(theme.selection_bg.rgba(), 0.6),
            ),
            selection_inactive_bg: blend(
                theme.background.rgba(),
                multiply_opacity(theme.selection_inactive_bg.rgba(), 0.45),
            ),
            selection_fg: theme.selection_fg.map(Color::rgba),
            palette,
        }
    }

    /// Look up a palette entry. The index is masked to 8 bits, matching the
    /// payload width of palette-mode attribute words.
    pub fn palette_color(&self, index: u32) -> u32 {
        self.palette[(index & 0xFF) as usize]
    }

    /// The bold-is-bright counterpart of a palette index: indexes 0-7 map
    /// to 8-15, everything else is unchanged.
    pub fn bright_counterpart(index: u32) -> u32 {
        if index < 8 { index + 8 } else { index }
    }
}

impl Default for RenderColors {
    fn default() -> Self {
        Self::from_theme(&Theme::default())
    }
}
