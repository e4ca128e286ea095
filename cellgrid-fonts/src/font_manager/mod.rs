//! Font management with fallback chain for Unicode coverage.
//!
//! This module provides font loading and fallback chain management:
//! - Primary font with bold/italic/bold-italic variants
//! - Automatic fallback chain for missing glyphs
//! - Cell metrics derived from the primary font

mod fallbacks;
mod types;

use anyhow::{Context, Result};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use swash::FontRef;

use crate::metrics::{CellMetrics, RawFontMetrics};

pub use fallbacks::FALLBACK_FAMILIES;
pub use types::FontData;

/// Manages multiple fonts with a fallback chain.
///
/// Font indices are assigned as follows:
/// - 0: Primary/regular font
/// - 1: Bold font (if available)
/// - 2: Italic font (if available)
/// - 3: Bold-italic font (if available)
/// - 4..: Fallback fonts
pub struct FontManager {
    primary: FontData,
    bold: Option<FontData>,
    italic: Option<FontData>,
    bold_italic: Option<FontData>,
    /// Fallback fonts in priority order
    fallbacks: Vec<FontData>,
}

impl FontManager {
    /// Create a new FontManager for a font family, with system fallbacks.
    ///
    /// If the family is not installed, the platform's default monospace
    /// family is used instead.
    pub fn new(family: &str) -> Result<Self> {
        let mut font_db = Database::new();
        font_db.load_system_fonts();
        log::info!("Loaded {} system fonts", font_db.len());

        let primary = Self::load_primary_font(&font_db, family)?;
        let fallbacks = Self::build_fallback_chain(&font_db);
        log::info!("Loaded {} fallback fonts", fallbacks.len());

        let bold = Self::load_styled_font(&font_db, family, "bold", Weight::BOLD, Style::Normal);
        let italic =
            Self::load_styled_font(&font_db, family, "italic", Weight::NORMAL, Style::Italic);
        let bold_italic =
            Self::load_styled_font(&font_db, family, "bold italic", Weight::BOLD, Style::Italic);

        Ok(FontManager {
            primary,
            bold,
            italic,
            bold_italic,
            fallbacks,
        })
    }

    fn load_primary_font(font_db: &Database, family: &str) -> Result<FontData> {
        if let Some(font_data) =
            Self::query_font(font_db, Family::Name(family), Weight::NORMAL, Style::Normal)
        {
            log::info!("Loaded primary font: {}", family);
            return Ok(font_data);
        }
        log::warn!("Primary font '{}' not found, using system monospace", family);
        Self::query_font(font_db, Family::Monospace, Weight::NORMAL, Style::Normal)
            .context("no monospace font available on this system")
    }

    fn build_fallback_chain(font_db: &Database) -> Vec<FontData> {
        let mut fallbacks = Vec::new();
        for family_name in FALLBACK_FAMILIES {
            if let Some(font_data) = Self::query_font(
                font_db,
                Family::Name(family_name),
                Weight::NORMAL,
                Style::Normal,
            ) {
                log::debug!("Added fallback font: {}", family_name);
                fallbacks.push(font_data);
            }
        }
        fallbacks
    }

    /// Load a styled variant of the primary family. Missing variants are
    /// fine; the primary font is substituted at lookup time.
    fn load_styled_font(
        font_db: &Database,
        family: &str,
        style_name: &str,
        weight: Weight,
        style: Style,
    ) -> Option<FontData> {
        let font_data = Self::query_font(font_db, Family::Name(family), weight, style);
        if font_data.is_none() {
            log::debug!("No {} variant for '{}', using regular", style_name, family);
        }
        font_data
    }

    fn query_font(
        font_db: &Database,
        family: Family<'_>,
        weight: Weight,
        style: Style,
    ) -> Option<FontData> {
        let id = font_db.query(&Query {
            families: &[family],
            weight,
            stretch: Stretch::Normal,
            style,
        })?;
        font_db
            .with_face_data(id, |data, face_index| {
                FontData::new_with_index(data.to_vec(), face_index as usize)
            })
            .flatten()
    }

    /// Get the appropriate font based on bold and italic attributes.
    fn get_styled_font(&self, bold: bool, italic: bool) -> &FontRef<'static> {
        match (bold, italic) {
            (true, true) => self
                .bold_italic
                .as_ref()
                .map(|f| &f.font_ref)
                .unwrap_or(&self.primary.font_ref),
            (true, false) => self
                .bold
                .as_ref()
                .map(|f| &f.font_ref)
                .unwrap_or(&self.primary.font_ref),
            (false, true) => self
                .italic
                .as_ref()
                .map(|f| &f.font_ref)
                .unwrap_or(&self.primary.font_ref),
            (false, false) => &self.primary.font_ref,
        }
    }

    fn styled_font_index(&self, bold: bool, italic: bool) -> usize {
        match (bold, italic) {
            (true, true) if self.bold_italic.is_some() => 3,
            (true, false) if self.bold.is_some() => 1,
            (false, true) if self.italic.is_some() => 2,
            _ => 0,
        }
    }

    /// Find a glyph for a character across the font fallback chain.
    ///
    /// Returns `(font_index, glyph_id)` where the index identifies which
    /// font contains the glyph.
    pub fn find_glyph(&self, character: char, bold: bool, italic: bool) -> Option<(usize, u16)> {
        let styled_font = self.get_styled_font(bold, italic);
        let glyph_id = styled_font.charmap().map(character);
        if glyph_id != 0 {
            return Some((self.styled_font_index(bold, italic), glyph_id));
        }

        for (idx, fallback) in self.fallbacks.iter().enumerate() {
            let glyph_id = fallback.font_ref.charmap().map(character);
            if glyph_id != 0 {
                log::debug!(
                    "Character '{}' (U+{:04X}) found in fallback font index {}",
                    character,
                    character as u32,
                    4 + idx
                );
                return Some((4 + idx, glyph_id));
            }
        }

        log::debug!(
            "Character '{}' (U+{:04X}) not found in any font ({} total fonts)",
            character,
            character as u32,
            self.font_count()
        );
        None
    }

    /// Get font reference by index (see struct documentation for layout).
    pub fn get_font(&self, font_index: usize) -> Option<&FontRef<'static>> {
        match font_index {
            0 => Some(&self.primary.font_ref),
            1 => self.bold.as_ref().map(|f| &f.font_ref),
            2 => self.italic.as_ref().map(|f| &f.font_ref),
            3 => self.bold_italic.as_ref().map(|f| &f.font_ref),
            idx => self.fallbacks.get(idx - 4).map(|fd| &fd.font_ref),
        }
    }

    /// Get number of fonts loaded (primary + styled + fallbacks).
    pub fn font_count(&self) -> usize {
        1 + self.bold.is_some() as usize
            + self.italic.is_some() as usize
            + self.bold_italic.is_some() as usize
            + self.fallbacks.len()
    }

    /// Compute cell metrics from the primary font at the given size.
    pub fn cell_metrics(
        &self,
        font_size: f32,
        device_pixel_ratio: f32,
        line_height: f32,
        letter_spacing: f32,
    ) -> CellMetrics {
        CellMetrics::compute(
            RawFontMetrics::from_font(&self.primary.font_ref),
            font_size,
            device_pixel_ratio,
            line_height,
            letter_spacing,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests depend on at least one monospace font being installed.
    // They are skipped gracefully on bare systems.

    fn manager() -> Option<FontManager> {
        FontManager::new("monospace").ok()
    }

    #[test]
    fn ascii_glyphs_resolve_to_primary_font() {
        let Some(fm) = manager() else { return };
        if let Some((font_idx, glyph_id)) = fm.find_glyph('A', false, false) {
            assert_eq!(font_idx, 0);
            assert!(glyph_id > 0);
        }
    }

    #[test]
    fn styled_lookup_falls_back_to_primary() {
        let Some(fm) = manager() else { return };
        // Whatever variants exist, a bold lookup must return a valid index.
        if let Some((font_idx, _)) = fm.find_glyph('A', true, false) {
            assert!(fm.get_font(font_idx).is_some());
        }
    }

    #[test]
    fn metrics_are_positive() {
        let Some(fm) = manager() else { return };
        let m = fm.cell_metrics(15.0, 1.0, 1.0, 0.0);
        assert!(m.cell_width > 0);
        assert!(m.cell_height > 0);
        assert!(m.baseline > 0.0);
    }
}
