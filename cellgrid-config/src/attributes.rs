//! Packed cell attribute words and their decoded form.
//!
//! The host buffer stores cell styling as three 32-bit words: a foreground
//! word, a background word, and an extended word for underline style and
//! color. Each color word carries a 2-bit mode tag, a 24-bit payload
//! (palette index or RGB), and style flags in the high bits:
//!
//! ```text
//! bits  0..=23  payload (palette index in the low byte, or 0xRRGGBB)
//! bits 24..=25  color mode: 00 default, 01 palette-16, 10 palette-256, 11 RGB
//! bits 26..=31  style flags (different sets for fg and bg, see below)
//! ```
//!
//! The mode tag fully determines payload interpretation; RGB mode never
//! aliases palette indexes. Everything downstream of the codec works on the
//! decoded [`CellAttributes`] or the named accessors of [`AttrWords`] —
//! the raw mask values are an encoding detail, not an interface.

use bitflags::bitflags;

/// Payload mask for the 24-bit color value.
pub const COLOR_MASK: u32 = 0x00FF_FFFF;
/// Color mode tag mask (bits 24-25).
pub const CM_MASK: u32 = 0x0300_0000;
pub const CM_DEFAULT: u32 = 0;
pub const CM_P16: u32 = 0x0100_0000;
pub const CM_P256: u32 = 0x0200_0000;
pub const CM_RGB: u32 = 0x0300_0000;

/// Flags stored in the high bits of the foreground word.
pub mod fg_flags {
    pub const INVERSE: u32 = 0x0400_0000;
    pub const BOLD: u32 = 0x0800_0000;
    pub const UNDERLINE: u32 = 0x1000_0000;
    pub const BLINK: u32 = 0x2000_0000;
    pub const INVISIBLE: u32 = 0x4000_0000;
    pub const STRIKETHROUGH: u32 = 0x8000_0000;
}

/// Flags stored in the high bits of the background word.
pub mod bg_flags {
    pub const ITALIC: u32 = 0x0400_0000;
    pub const DIM: u32 = 0x0800_0000;
    /// The cell has a meaningful extended word (underline style/color).
    pub const HAS_EXTENDED: u32 = 0x1000_0000;
}

/// Underline style field of the extended word (bits 26-28).
pub const EXT_UNDERLINE_STYLE_SHIFT: u32 = 26;
pub const EXT_UNDERLINE_STYLE_MASK: u32 = 0x1C00_0000;

bitflags! {
    /// Decoded cell style flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StyleFlags: u16 {
        const BOLD = 1 << 0;
        const ITALIC = 1 << 1;
        const UNDERLINE = 1 << 2;
        const INVERSE = 1 << 3;
        const DIM = 1 << 4;
        const STRIKETHROUGH = 1 << 5;
        const INVISIBLE = 1 << 6;
        const BLINK = 1 << 7;
    }
}

/// A decoded color channel: mode tag plus payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpec {
    /// Use the terminal's default foreground/background.
    #[default]
    Default,
    /// One of the 16 base ANSI colors.
    Palette16(u8),
    /// An index into the extended 256-color palette.
    Palette256(u8),
    /// A 24-bit RGB color.
    Rgb(u8, u8, u8),
}

impl ColorSpec {
    /// Decode from a packed color word (fg, bg, or underline-color layout).
    pub fn from_word(word: u32) -> Self {
        match word & CM_MASK {
            CM_P16 => ColorSpec::Palette16((word & 0xFF) as u8),
            CM_P256 => ColorSpec::Palette256((word & 0xFF) as u8),
            CM_RGB => ColorSpec::Rgb((word >> 16) as u8, (word >> 8) as u8, word as u8),
            _ => ColorSpec::Default,
        }
    }

    /// Encode into the mode + payload bits of a color word.
    pub fn to_word(self) -> u32 {
        match self {
            ColorSpec::Default => CM_DEFAULT,
            ColorSpec::Palette16(idx) => CM_P16 | idx as u32,
            ColorSpec::Palette256(idx) => CM_P256 | idx as u32,
            ColorSpec::Rgb(r, g, b) => {
                CM_RGB | (r as u32) << 16 | (g as u32) << 8 | b as u32
            }
        }
    }

    /// Whether this spec addresses the 256-entry palette (either tag).
    pub fn is_palette(self) -> bool {
        matches!(self, ColorSpec::Palette16(_) | ColorSpec::Palette256(_))
    }
}

/// Underline style of the extended word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderlineStyle {
    #[default]
    Single,
    Double,
    Curly,
    Dotted,
    Dashed,
}

impl UnderlineStyle {
    fn from_bits(bits: u32) -> Self {
        match bits {
            2 => UnderlineStyle::Double,
            3 => UnderlineStyle::Curly,
            4 => UnderlineStyle::Dotted,
            5 => UnderlineStyle::Dashed,
            _ => UnderlineStyle::Single,
        }
    }

    fn to_bits(self) -> u32 {
        match self {
            UnderlineStyle::Single => 1,
            UnderlineStyle::Double => 2,
            UnderlineStyle::Curly => 3,
            UnderlineStyle::Dotted => 4,
            UnderlineStyle::Dashed => 5,
        }
    }
}

/// Decoded underline attributes from the extended word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnderlineAttr {
    pub style: UnderlineStyle,
    /// `Default` means "same color as the text".
    pub color: ColorSpec,
}

/// Fully decoded cell attributes, produced once per cell by the codec and
/// passed by value through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellAttributes {
    pub fg: ColorSpec,
    pub bg: ColorSpec,
    pub flags: StyleFlags,
    pub underline: UnderlineAttr,
}

/// The packed (fg, bg, ext) word triple with named accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrWords {
    pub fg: u32,
    pub bg: u32,
    pub ext: u32,
}

impl AttrWords {
    pub const fn new(fg: u32, bg: u32, ext: u32) -> Self {
        Self { fg, bg, ext }
    }

    pub fn is_inverse(&self) -> bool {
        self.fg & fg_flags::INVERSE != 0
    }
    pub fn is_bold(&self) -> bool {
        self.fg & fg_flags::BOLD != 0
    }
    pub fn is_underline(&self) -> bool {
        self.fg & fg_flags::UNDERLINE != 0
    }
    pub fn is_invisible(&self) -> bool {
        self.fg & fg_flags::INVISIBLE != 0
    }
    pub fn is_strikethrough(&self) -> bool {
        self.fg & fg_flags::STRIKETHROUGH != 0
    }
    pub fn is_blink(&self) -> bool {
        self.fg & fg_flags::BLINK != 0
    }
    pub fn is_italic(&self) -> bool {
        self.bg & bg_flags::ITALIC != 0
    }
    pub fn is_dim(&self) -> bool {
        self.bg & bg_flags::DIM != 0
    }
    pub fn has_extended(&self) -> bool {
        self.bg & bg_flags::HAS_EXTENDED != 0
    }

    pub fn fg_spec(&self) -> ColorSpec {
        ColorSpec::from_word(self.fg)
    }
    pub fn bg_spec(&self) -> ColorSpec {
        ColorSpec::from_word(self.bg)
    }

    pub fn underline_style(&self) -> UnderlineStyle {
        UnderlineStyle::from_bits((self.ext & EXT_UNDERLINE_STYLE_MASK) >> EXT_UNDERLINE_STYLE_SHIFT)
    }

    pub fn underline_color(&self) -> ColorSpec {
        ColorSpec::from_word(self.ext)
    }

    /// Decode into the explicit attribute struct.
    pub fn decode(&self) -> CellAttributes {
        let mut flags = StyleFlags::empty();
        flags.set(StyleFlags::BOLD, self.is_bold());
        flags.set(StyleFlags::ITALIC, self.is_italic());
        flags.set(StyleFlags::UNDERLINE, self.is_underline());
        flags.set(StyleFlags::INVERSE, self.is_inverse());
        flags.set(StyleFlags::DIM, self.is_dim());
        flags.set(StyleFlags::STRIKETHROUGH, self.is_strikethrough());
        flags.set(StyleFlags::INVISIBLE, self.is_invisible());
        flags.set(StyleFlags::BLINK, self.is_blink());
        CellAttributes {
            fg: self.fg_spec(),
            bg: self.bg_spec(),
            flags,
            underline: if self.has_extended() {
                UnderlineAttr {
                    style: self.underline_style(),
                    color: self.underline_color(),
                }
            } else {
                UnderlineAttr::default()
            },
        }
    }

    /// Encode an attribute struct back into packed words.
    pub fn encode(attrs: &CellAttributes) -> Self {
        let mut fg = attrs.fg.to_word();
        let mut bg = attrs.bg.to_word();
        let f = attrs.flags;
        if f.contains(StyleFlags::BOLD) {
            fg |= fg_flags::BOLD;
        }
        if f.contains(StyleFlags::UNDERLINE) {
            fg |= fg_flags::UNDERLINE;
        }
        if f.contains(StyleFlags::INVERSE) {
            fg |= fg_flags::INVERSE;
        }
        if f.contains(StyleFlags::STRIKETHROUGH) {
            fg |= fg_flags::STRIKETHROUGH;
        }
        if f.contains(StyleFlags::INVISIBLE) {
            fg |= fg_flags::INVISIBLE;
        }
        if f.contains(StyleFlags::BLINK) {
            fg |= fg_flags::BLINK;
        }
        if f.contains(StyleFlags::ITALIC) {
            bg |= bg_flags::ITALIC;
        }
        if f.contains(StyleFlags::DIM) {
            bg |= bg_flags::DIM;
        }
        let ext = if attrs.underline != UnderlineAttr::default() {
            bg |= bg_flags::HAS_EXTENDED;
            attrs.underline.color.to_word()
                | (attrs.underline.style.to_bits() << EXT_UNDERLINE_STYLE_SHIFT)
        } else {
            0
        };
        Self { fg, bg, ext }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_tag_determines_payload_interpretation() {
        let p16 = ColorSpec::from_word(CM_P16 | 7);
        assert_eq!(p16, ColorSpec::Palette16(7));
        let p256 = ColorSpec::from_word(CM_P256 | 214);
        assert_eq!(p256, ColorSpec::Palette256(214));
        let rgb = ColorSpec::from_word(CM_RGB | 0x010203);
        assert_eq!(rgb, ColorSpec::Rgb(1, 2, 3));
        // An RGB payload that happens to be a small number is still RGB.
        assert_eq!(ColorSpec::from_word(CM_RGB | 7), ColorSpec::Rgb(0, 0, 7));
    }

    #[test]
    fn decode_reads_flags_from_the_right_word() {
        let words = AttrWords::new(
            fg_flags::INVERSE | fg_flags::BOLD | CM_P16 | 1,
            bg_flags::DIM | CM_RGB | 0x112233,
            0,
        );
        let attrs = words.decode();
        assert!(attrs.flags.contains(StyleFlags::INVERSE));
        assert!(attrs.flags.contains(StyleFlags::BOLD));
        assert!(attrs.flags.contains(StyleFlags::DIM));
        assert!(!attrs.flags.contains(StyleFlags::ITALIC));
        assert_eq!(attrs.fg, ColorSpec::Palette16(1));
        assert_eq!(attrs.bg, ColorSpec::Rgb(0x11, 0x22, 0x33));
    }

    #[test]
    fn underline_attrs_require_has_extended() {
        let ext = (3 << EXT_UNDERLINE_STYLE_SHIFT) | CM_RGB | 0xFF0000;
        let without = AttrWords::new(fg_flags::UNDERLINE, 0, ext);
        assert_eq!(without.decode().underline, UnderlineAttr::default());

        let with = AttrWords::new(fg_flags::UNDERLINE, bg_flags::HAS_EXTENDED, ext);
        let ul = with.decode().underline;
        assert_eq!(ul.style, UnderlineStyle::Curly);
        assert_eq!(ul.color, ColorSpec::Rgb(0xFF, 0, 0));
    }

    #[test]
    fn encode_decode_round_trip() {
        let attrs = CellAttributes {
            fg: ColorSpec::Rgb(10, 20, 30),
            bg: ColorSpec::Palette256(100),
            flags: StyleFlags::BOLD | StyleFlags::UNDERLINE | StyleFlags::DIM,
            underline: UnderlineAttr {
                style: UnderlineStyle::Dashed,
                color: ColorSpec::Palette16(4),
            },
        };
        assert_eq!(AttrWords::encode(&attrs).decode(), attrs);
    }
}
