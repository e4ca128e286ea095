//! Resolves a cell's effective color words from its attributes plus
//! selection and decoration overrides.
//!
//! The output is still in packed word form so the render model can diff it
//! cheaply, but any override re-tags the affected word as RGB mode so
//! downstream stages never confuse an override with the cell's original
//! palette color.

use cellgrid_config::attributes::{bg_flags, fg_flags, CM_DEFAULT, CM_MASK, CM_RGB, COLOR_MASK};
use cellgrid_config::{AttrWords, RenderColors};

use crate::model::SelectionState;
use crate::services::{DecorationLayer, DecorationProvider};

/// Resolved (bg, fg, ext) words for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedColors {
    pub bg: u32,
    pub fg: u32,
    pub ext: u32,
}

/// Everything the resolver needs besides the cell itself.
pub struct ResolveContext<'a> {
    pub colors: &'a RenderColors,
    pub decorations: &'a dyn DecorationProvider,
    pub selection: &'a SelectionState,
    pub focused: bool,
}

/// Resolve the effective color words for a cell.
///
/// Override layers apply in order: below-text decorations, selection,
/// above-text decorations. Selection never reads the cell's inverse flag;
/// it paints its own background regardless.
pub fn resolve_cell_colors(
    attrs: AttrWords,
    row: usize,
    col: usize,
    ctx: &ResolveContext<'_>,
) -> ResolvedColors {
    let mut bg_override: Option<u32> = None;
    let mut fg_override: Option<u32> = None;

    let below = ctx.decorations.decorations_at(row, col, DecorationLayer::Below);
    if let Some(bg) = below.bg {
        bg_override = Some(bg >> 8 & COLOR_MASK);
    }
    if let Some(fg) = below.fg {
        fg_override = Some(fg >> 8 & COLOR_MASK);
    }

    let selected = ctx.selection.contains(row, col);
    if selected {
        let sel_bg = if ctx.focused {
            ctx.colors.selection_bg
        } else {
            ctx.colors.selection_inactive_bg
        };
        bg_override = Some(sel_bg >> 8 & COLOR_MASK);
        if let Some(sel_fg) = ctx.colors.selection_fg {
            fg_override = Some(sel_fg >> 8 & COLOR_MASK);
        }
    }

    let above = ctx.decorations.decorations_at(row, col, DecorationLayer::Above);
    if let Some(bg) = above.bg {
        bg_override = Some(bg >> 8 & COLOR_MASK);
    }
    if let Some(fg) = above.fg {
        fg_override = Some(fg >> 8 & COLOR_MASK);
    }

    let mut out = ResolvedColors {
        bg: attrs.bg,
        fg: attrs.fg,
        ext: if attrs.has_extended() { attrs.ext } else { 0 },
    };

    if let Some(bg) = bg_override {
        // Selection backgrounds defeat dim so selected text stays readable.
        let cleared = if selected {
            attrs.bg & !COLOR_MASK & !bg_flags::DIM
        } else {
            attrs.bg & !COLOR_MASK
        };
        out.bg = cleared | bg | CM_RGB;
    }
    if let Some(fg) = fg_override {
        // An explicit foreground override replaces whatever inverse would
        // have produced, so the flag is dropped along with the old color.
        out.fg = (attrs.fg & !COLOR_MASK & !fg_flags::INVERSE) | fg | CM_RGB;
    }

    // Inverse must never be computed against a half-overridden pair: when
    // exactly one side was overridden, pin the other side to the color the
    // swap would have produced (the terminal default when the cell's other
    // channel is default mode, otherwise the cell's own color) and drop the
    // flag. The original fg word is tested because a foreground override
    // already cleared the flag from `out.fg` above.
    if attrs.fg & fg_flags::INVERSE != 0 {
        if bg_override.is_some() && fg_override.is_none() {
            let base = attrs.fg & !(COLOR_MASK | CM_MASK | fg_flags::INVERSE);
            out.fg = if attrs.bg & CM_MASK == CM_DEFAULT {
                base | (ctx.colors.background >> 8 & COLOR_MASK) | CM_RGB
            } else {
                base | (attrs.bg & (COLOR_MASK | CM_MASK))
            };
        }
        if bg_override.is_none() && fg_override.is_some() {
            let base = attrs.bg & !(COLOR_MASK | CM_MASK);
            out.bg = if attrs.fg & CM_MASK == CM_DEFAULT {
                base | (ctx.colors.foreground >> 8 & COLOR_MASK) | CM_RGB
            } else {
                base | (attrs.fg & (COLOR_MASK | CM_MASK))
            };
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{DecorationColors, NoDecorations};
    use cellgrid_config::attributes::CM_P256;
    use cellgrid_config::Theme;

    struct FgDecoration(u32);
    impl DecorationProvider for FgDecoration {
        fn decorations_at(
            &self,
            _row: usize,
            _col: usize,
            layer: DecorationLayer,
        ) -> DecorationColors {
            if layer == DecorationLayer::Above {
                DecorationColors {
                    bg: None,
                    fg: Some(self.0),
                }
            } else {
                DecorationColors::default()
            }
        }
    }

    fn ctx_parts() -> (RenderColors, SelectionState) {
        (RenderColors::from_theme(&Theme::dark()), SelectionState::default())
    }

    #[test]
    fn no_overrides_pass_words_through() {
        let (colors, selection) = ctx_parts();
        let ctx = ResolveContext {
            colors: &colors,
            decorations: &NoDecorations,
            selection: &selection,
            focused: true,
        };
        let attrs = AttrWords::new(CM_P256 | 100, CM_P256 | 200, 0);
        let out = resolve_cell_colors(attrs, 0, 0, &ctx);
        assert_eq!(out.fg, attrs.fg);
        assert_eq!(out.bg, attrs.bg);
        assert_eq!(out.ext, 0);
    }

    #[test]
    fn selection_overrides_bg_and_retags_rgb() {
        let (colors, mut selection) = ctx_parts();
        selection.update(Some((0, 0)), Some((10, 0)), false, 5);
        let ctx = ResolveContext {
            colors: &colors,
            decorations: &NoDecorations,
            selection: &selection,
            focused: true,
        };
        let attrs = AttrWords::new(0, CM_P256 | 42 | bg_flags::DIM, 0);
        let out = resolve_cell_colors(attrs, 0, 3, &ctx);
        assert_eq!(out.bg & CM_MASK, CM_RGB);
        assert_eq!(out.bg & COLOR_MASK, colors.selection_bg >> 8 & COLOR_MASK);
        // Selection clears dim so the selected run keeps full intensity.
        assert_eq!(out.bg & bg_flags::DIM, 0);
        // Foreground untouched without a selection-foreground color.
        assert_eq!(out.fg, attrs.fg);
    }

    #[test]
    fn unfocused_selection_uses_inactive_color() {
        let (colors, mut selection) = ctx_parts();
        selection.update(Some((0, 0)), Some((10, 0)), false, 5);
        let ctx = ResolveContext {
            colors: &colors,
            decorations: &NoDecorations,
            selection: &selection,
            focused: false,
        };
        let out = resolve_cell_colors(AttrWords::default(), 0, 0, &ctx);
        assert_eq!(
            out.bg & COLOR_MASK,
            colors.selection_inactive_bg >> 8 & COLOR_MASK
        );
    }

    #[test]
    fn fg_decoration_on_inverse_cell_drops_the_swap() {
        let (colors, selection) = ctx_parts();
        let deco = FgDecoration(0xAABBCCFF);
        let ctx = ResolveContext {
            colors: &colors,
            decorations: &deco,
            selection: &selection,
            focused: true,
        };
        let attrs = AttrWords::new(fg_flags::INVERSE, 0, 0);
        let out = resolve_cell_colors(attrs, 0, 0, &ctx);
        // The decoration foreground wins and inverse is cleared from fg.
        assert_eq!(out.fg & COLOR_MASK, 0xAABBCC);
        assert_eq!(out.fg & fg_flags::INVERSE, 0);
        assert_eq!(out.fg & CM_MASK, CM_RGB);
        // The cell would have painted its background with the theme
        // foreground; that color is pinned so dropping inverse doesn't
        // revert the bg to the default.
        assert_eq!(out.bg & CM_MASK, CM_RGB);
        assert_eq!(out.bg & COLOR_MASK, colors.foreground >> 8 & COLOR_MASK);
    }

    #[test]
    fn selection_on_inverse_cell_with_explicit_fg_clears_the_swap() {
        let (colors, mut selection) = ctx_parts();
        selection.update(Some((0, 0)), Some((10, 0)), false, 5);
        let ctx = ResolveContext {
            colors: &colors,
            decorations: &NoDecorations,
            selection: &selection,
            focused: true,
        };
        // Inverse cell with an explicit palette fg: the selection replaces
        // the bg, so the fg must stop mirroring it. With a default cell bg
        // the swap would have painted the theme background.
        let attrs = AttrWords::new(fg_flags::INVERSE | CM_P256 | 196, 0, 0);
        let out = resolve_cell_colors(attrs, 0, 0, &ctx);
        assert_eq!(out.fg & fg_flags::INVERSE, 0);
        assert_eq!(out.fg & CM_MASK, CM_RGB);
        assert_eq!(out.fg & COLOR_MASK, colors.background >> 8 & COLOR_MASK);
    }

    #[test]
    fn inverse_synthesis_copies_a_non_default_cell_color() {
        let (colors, mut selection) = ctx_parts();
        selection.update(Some((0, 0)), Some((10, 0)), false, 5);
        let ctx = ResolveContext {
            colors: &colors,
            decorations: &NoDecorations,
            selection: &selection,
            focused: true,
        };
        // The cell's own bg is an explicit palette color; the pinned fg
        // takes that word's mode and payload, not the terminal default.
        let attrs = AttrWords::new(fg_flags::INVERSE, CM_P256 | 21, 0);
        let out = resolve_cell_colors(attrs, 0, 0, &ctx);
        assert_eq!(out.fg & fg_flags::INVERSE, 0);
        assert_eq!(out.fg & CM_MASK, CM_P256);
        assert_eq!(out.fg & COLOR_MASK, 21);
    }

    #[test]
    fn inverse_with_bg_override_pins_default_fg() {
        let (colors, mut selection) = ctx_parts();
        selection.update(Some((0, 0)), Some((10, 0)), false, 5);
        let ctx = ResolveContext {
            colors: &colors,
            decorations: &NoDecorations,
            selection: &selection,
            focused: true,
        };
        // Inverse cell with default colors: selection overrides bg only, so
        // the fg must be pinned to the terminal default background it would
        // have swapped to.
        let attrs = AttrWords::new(fg_flags::INVERSE, 0, 0);
        let out = resolve_cell_colors(attrs, 0, 0, &ctx);
        assert_eq!(out.fg & CM_MASK, CM_RGB);
        assert_eq!(out.fg & COLOR_MASK, colors.background >> 8 & COLOR_MASK);
        assert_eq!(out.fg & fg_flags::INVERSE, 0);
    }
}
