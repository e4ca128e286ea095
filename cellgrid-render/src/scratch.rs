//! CPU scratch surface glyphs are composed onto before atlas packing.

use cellgrid_config::color::rgba_channels;

/// A small RGBA8 surface. Coordinates are plain pixels with the origin at
/// the top left; all drawing clips to the surface bounds.
#[derive(Debug, Clone)]
pub struct Scratch {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Scratch {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height * 4) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Fill the whole surface with one color.
    pub fn clear(&mut self, rgba: u32) {
        let px = rgba_channels(rgba);
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, rgba: u32) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        self.data[i..i + 4].copy_from_slice(&rgba_channels(rgba));
    }

    /// Source-over blend a single pixel with coverage `alpha` (0-255).
    #[inline]
    pub fn blend_pixel(&mut self, x: i32, y: i32, rgba: u32, alpha: u8) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height || alpha == 0 {
            return;
        }
        let [sr, sg, sb, sa] = rgba_channels(rgba);
        let a = (sa as u32 * alpha as u32) / 255;
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        let inv = 255 - a;
        self.data[i] = ((sr as u32 * a + self.data[i] as u32 * inv) / 255) as u8;
        self.data[i + 1] = ((sg as u32 * a + self.data[i + 1] as u32 * inv) / 255) as u8;
        self.data[i + 2] = ((sb as u32 * a + self.data[i + 2] as u32 * inv) / 255) as u8;
        self.data[i + 3] = (a + (self.data[i + 3] as u32 * inv) / 255).min(255) as u8;
    }

    /// Fill an axis-aligned rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, rgba: u32) {
        for yy in y.max(0)..(y + h as i32).min(self.height as i32) {
            for xx in x.max(0)..(x + w as i32).min(self.width as i32) {
                self.set_pixel(xx, yy, rgba);
            }
        }
    }

    /// Fill a rectangle with constant coverage (used for shade glyphs).
    pub fn fill_rect_alpha(&mut self, x: i32, y: i32, w: u32, h: u32, rgba: u32, alpha: u8) {
        for yy in y.max(0)..(y + h as i32).min(self.height as i32) {
            for xx in x.max(0)..(x + w as i32).min(self.width as i32) {
                self.blend_pixel(xx, yy, rgba, alpha);
            }
        }
    }

    /// Composite an 8-bit coverage mask colored with `rgba` at `(x, y)`.
    pub fn blit_mask(&mut self, mask: &[u8], mask_w: u32, mask_h: u32, x: i32, y: i32, rgba: u32) {
        for my in 0..mask_h {
            for mx in 0..mask_w {
                let alpha = mask[(my * mask_w + mx) as usize];
                self.blend_pixel(x + mx as i32, y + my as i32, rgba, alpha);
            }
        }
    }

    /// Composite a premade RGBA bitmap (color emoji) at `(x, y)`.
    pub fn blit_rgba(&mut self, src: &[u8], src_w: u32, src_h: u32, x: i32, y: i32) {
        for sy in 0..src_h {
            for sx in 0..src_w {
                let i = ((sy * src_w + sx) * 4) as usize;
                let rgba = u32::from_be_bytes([src[i], src[i + 1], src[i + 2], src[i + 3]]);
                self.blend_pixel(x + sx as i32, y + sy as i32, rgba, 0xFF);
            }
        }
    }

    /// Tight bounding box of pixels whose alpha is non-zero.
    /// Returns `(x, y, w, h)` or `None` when the surface is fully clear.
    pub fn alpha_bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut found = false;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.pixel(x, y)[3] != 0 {
                    found = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }
        found.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Make pixels close to `bg` transparent. The per-channel threshold is
    /// derived from the bg/fg distance so anti-aliased edge pixels of a
    /// near-background glyph are not stripped along with the fill.
    pub fn key_out_background(&mut self, bg: u32, fg: u32) {
        let [br, bgc, bb, _] = rgba_channels(bg);
        let [fr, fg_, fb, _] = rgba_channels(fg);
        let threshold = ((br as i32 - fr as i32).abs()
            + (bgc as i32 - fg_ as i32).abs()
            + (bb as i32 - fb as i32).abs())
            / 12;
        for chunk in self.data.chunks_exact_mut(4) {
            if (chunk[0] as i32 - br as i32).abs() <= threshold
                && (chunk[1] as i32 - bgc as i32).abs() <= threshold
                && (chunk[2] as i32 - bb as i32).abs() <= threshold
            {
                chunk.fill(0);
            }
        }
    }

    /// Copy a sub-rectangle out as a tightly packed RGBA buffer.
    pub fn extract(&self, x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity((w * h * 4) as usize);
        for yy in y..y + h {
            let start = ((yy * self.width + x) * 4) as usize;
            out.extend_from_slice(&self.data[start..start + (w * 4) as usize]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_of_clear_surface_is_none() {
        let s = Scratch::new(8, 8);
        assert_eq!(s.alpha_bounding_box(), None);
    }

    #[test]
    fn bounding_box_is_tight() {
        let mut s = Scratch::new(8, 8);
        s.fill_rect(2, 3, 3, 2, 0xFF0000FF);
        assert_eq!(s.alpha_bounding_box(), Some((2, 3, 3, 2)));
    }

    #[test]
    fn keying_strips_background_but_not_ink() {
        let mut s = Scratch::new(4, 1);
        s.clear(0x000000FF);
        s.set_pixel(1, 0, 0xFFFFFFFF);
        // A pixel just off the background survives only if it clears the
        // threshold derived from the bg/fg distance.
        s.set_pixel(2, 0, 0xC0C0C0FF);
        s.key_out_background(0x000000FF, 0xFFFFFFFF);
        assert_eq!(s.pixel(0, 0)[3], 0);
        assert_eq!(s.pixel(1, 0)[3], 0xFF);
        assert_eq!(s.pixel(2, 0)[3], 0xFF);
    }

    #[test]
    fn extract_returns_packed_rows() {
        let mut s = Scratch::new(4, 4);
        s.fill_rect(1, 1, 2, 2, 0x11223344);
        let px = s.extract(1, 1, 2, 2);
        assert_eq!(px.len(), 16);
        assert_eq!(&px[0..4], &[0x11, 0x22, 0x33, 0x44]);
    }
}
