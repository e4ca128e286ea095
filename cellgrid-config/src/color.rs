//! Color values and perceptual color math.
//!
//! Colors cross two representations here: the theme-level [`Color`] (plain
//! RGB bytes, serde-able) and packed `u32` RGBA values laid out as
//! `0xRRGGBBAA`, which is what the render pipeline works with internally.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opacity multiplier applied to dim (SGR 2) cells.
pub const DIM_OPACITY: f32 = 0.5;

/// A color in RGB format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a 24-bit `0xRRGGBB` value.
    pub const fn from_rgb24(rgb: u32) -> Self {
        Self {
            r: (rgb >> 16) as u8,
            g: (rgb >> 8) as u8,
            b: rgb as u8,
        }
    }

    /// The 24-bit `0xRRGGBB` value.
    pub const fn rgb24(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// The packed `0xRRGGBBAA` value with full alpha.
    pub const fn rgba(self) -> u32 {
        self.rgb24() << 8 | 0xFF
    }

    pub fn as_array(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Extract the `[r, g, b, a]` channels of a packed `0xRRGGBBAA` value.
pub const fn rgba_channels(rgba: u32) -> [u8; 4] {
    [
        (rgba >> 24) as u8,
        (rgba >> 16) as u8,
        (rgba >> 8) as u8,
        rgba as u8,
    ]
}

/// Pack `[r, g, b, a]` channels into a `0xRRGGBBAA` value.
pub const fn rgba_from_channels(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) << 24 | (g as u32) << 16 | (b as u32) << 8 | a as u32
}

/// Convert a packed `0xRRGGBBAA` value to normalized `[f32; 4]` components.
pub fn rgba_to_f32(rgba: u32) -> [f32; 4] {
    let [r, g, b, a] = rgba_channels(rgba);
    [
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    ]
}

/// WCAG relative luminance of a 24-bit `0xRRGGBB` value.
pub fn relative_luminance(rgb: u32) -> f32 {
    relative_luminance_split((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

fn relative_luminance_split(r: u8, g: u8, b: u8) -> f32 {
    fn linearize(c: u8) -> f32 {
        let c = c as f32 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * linearize(r) + 0.7152 * linearize(g) + 0.0722 * linearize(b)
}

/// WCAG contrast ratio between two relative luminance values (>= 1.0).
pub fn contrast_ratio(l1: f32, l2: f32) -> f32 {
    if l1 < l2 {
        (l2 + 0.05) / (l1 + 0.05)
    } else {
        (l1 + 0.05) / (l2 + 0.05)
    }
}

/// Contrast ratio between two packed `0xRRGGBBAA` colors.
pub fn contrast_ratio_rgba(a: u32, b: u32) -> f32 {
    contrast_ratio(relative_luminance(a >> 8), relative_luminance(b >> 8))
}

/// Adjust `fg` away from `bg` until the contrast ratio meets `ratio`.
///
/// Returns `None` when the pair already satisfies the ratio. A foreground
/// darker than the background is pushed toward black, a lighter one toward
/// white; the loop terminates at pure black/white even when the requested
/// ratio is unreachable against this background.
pub fn ensure_contrast_ratio(bg_rgba: u32, fg_rgba: u32, ratio: f32) -> Option<u32> {
    let bg_l = relative_luminance(bg_rgba >> 8);
    let fg_l = relative_luminance(fg_rgba >> 8);
    if contrast_ratio(bg_l, fg_l) >= ratio {
        return None;
    }
    if fg_l < bg_l {
        Some(reduce_luminance(bg_rgba, fg_rgba, ratio))
    } else {
        Some(increase_luminance(bg_rgba, fg_rgba, ratio))
    }
}

fn reduce_luminance(bg_rgba: u32, fg_rgba: u32, ratio: f32) -> u32 {
    let bg_l = relative_luminance(bg_rgba >> 8);
    let [mut r, mut g, mut b, _] = rgba_channels(fg_rgba);
    // Step each channel down by 10% of its remaining value until the ratio
    // is met or the color bottoms out at black.
    loop {
        let cr = contrast_ratio(bg_l, relative_luminance_split(r, g, b));
        if cr >= ratio || (r == 0 && g == 0 && b == 0) {
            break;
        }
        r -= (r as f32 * 0.1).ceil() as u8;
        g -= (g as f32 * 0.1).ceil() as u8;
        b -= (b as f32 * 0.1).ceil() as u8;
    }
    rgba_from_channels(r, g, b, 0xFF)
}

fn increase_luminance(bg_rgba: u32, fg_rgba: u32, ratio: f32) -> u32 {
    let bg_l = relative_luminance(bg_rgba >> 8);
    let [mut r, mut g, mut b, _] = rgba_channels(fg_rgba);
    loop {
        let cr = contrast_ratio(bg_l, relative_luminance_split(r, g, b));
        if cr >= ratio || (r == 255 && g == 255 && b == 255) {
            break;
        }
        r += (((255 - r) as f32) * 0.1).ceil() as u8;
        g += (((255 - g) as f32) * 0.1).ceil() as u8;
        b += (((255 - b) as f32) * 0.1).ceil() as u8;
    }
    rgba_from_channels(r, g, b, 0xFF)
}

/// Alpha-composite `fg` over `bg` (both `0xRRGGBBAA`).
pub fn blend(bg_rgba: u32, fg_rgba: u32) -> u32 {
    let [fr, fg_, fb, fa] = rgba_channels(fg_rgba);
    if fa == 0xFF {
        return fg_rgba;
    }
    let a = fa as f32 / 255.0;
    let [br, bg_, bb, _] = rgba_channels(bg_rgba);
    let mix = |f: u8, b: u8| (f as f32 * a + b as f32 * (1.0 - a)).round() as u8;
    rgba_from_channels(mix(fr, br), mix(fg_, bg_), mix(fb, bb), 0xFF)
}

/// Multiply the alpha channel of a packed color by `mult`.
pub fn multiply_opacity(rgba: u32, mult: f32) -> u32 {
    let [r, g, b, a] = rgba_channels(rgba);
    rgba_from_channels(r, g, b, (a as f32 * mult).round() as u8)
}

/// Force full opacity.
pub const fn opaque(rgba: u32) -> u32 {
    rgba | 0xFF
}

/// Memoized minimum-contrast adjustments keyed by the packed (bg, fg)
/// attribute words of the cell that produced them.
///
/// `Some(color)` is an adjusted foreground; `None` records that the pair
/// needed no adjustment (or none was possible) so the math is not redone.
/// The cache must be cleared wholesale whenever the palette or the
/// configured minimum contrast ratio changes.
#[derive(Debug, Default)]
pub struct ContrastCache {
    colors: HashMap<(u32, u32), Option<u32>>,
}

impl ContrastCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bg: u32, fg: u32) -> Option<&Option<u32>> {
        self.colors.get(&(bg, fg))
    }

    pub fn set(&mut self, bg: u32, fg: u32, color: Option<u32>) {
        self.colors.insert((bg, fg), color);
    }

    pub fn clear(&mut self) {
        self.colors.clear();
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luminance_extremes() {
        assert!(relative_luminance(0x000000) < 0.001);
        assert!((relative_luminance(0xFFFFFF) - 1.0).abs() < 0.001);
    }

    #[test]
    fn contrast_ratio_is_symmetric() {
        let a = relative_luminance(0x2e3436);
        let b = relative_luminance(0xcc0000);
        assert_eq!(contrast_ratio(a, b), contrast_ratio(b, a));
    }

    #[test]
    fn ensure_contrast_no_adjustment_needed() {
        // Black on white is 21:1, nothing to do.
        assert_eq!(ensure_contrast_ratio(0xFFFFFFFF, 0x000000FF, 4.5), None);
    }

    #[test]
    fn ensure_contrast_brightens_dark_on_dark() {
        let adjusted = ensure_contrast_ratio(0x000000FF, 0x101010FF, 4.5).unwrap();
        assert!(contrast_ratio_rgba(0x000000FF, adjusted) >= 4.5);
    }

    #[test]
    fn ensure_contrast_darkens_light_on_light() {
        let adjusted = ensure_contrast_ratio(0xFFFFFFFF, 0xEEEEEEFF, 4.5).unwrap();
        assert!(contrast_ratio_rgba(0xFFFFFFFF, adjusted) >= 4.5);
    }

    #[test]
    fn ensure_contrast_is_monotone_in_ratio() {
        let bg = 0x2e3436FF;
        let fg = 0xcc0000FF;
        let mut last = contrast_ratio_rgba(bg, fg);
        for ratio in [2.0, 4.5, 7.0, 10.0, 21.0] {
            let adjusted = ensure_contrast_ratio(bg, fg, ratio).unwrap_or(fg);
            let cr = contrast_ratio_rgba(bg, adjusted);
            assert!(
                cr + 0.0001 >= last,
                "raising the ratio to {ratio} lowered contrast: {cr} < {last}"
            );
            last = cr;
        }
    }

    #[test]
    fn blend_full_alpha_replaces() {
        assert_eq!(blend(0x112233FF, 0xAABBCCFF), 0xAABBCCFF);
    }

    #[test]
    fn blend_half_alpha_mixes() {
        let mixed = blend(0x000000FF, 0xFFFFFF80);
        let [r, g, b, a] = rgba_channels(mixed);
        assert_eq!(a, 0xFF);
        assert!(r > 0x70 && r < 0x90);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn contrast_cache_distinguishes_sentinel_from_miss() {
        let mut cache = ContrastCache::new();
        assert!(cache.get(1, 2).is_none());
        cache.set(1, 2, None);
        assert_eq!(cache.get(1, 2), Some(&None));
        cache.set(1, 2, Some(0xFF0000FF));
        assert_eq!(cache.get(1, 2), Some(&Some(0xFF0000FF)));
        cache.clear();
        assert!(cache.get(1, 2).is_none());
    }
}
