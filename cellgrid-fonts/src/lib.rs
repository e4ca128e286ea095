//! Font discovery and glyph lookup for the cellgrid renderer.
//!
//! This crate provides:
//! - Font loading with system font discovery and fallback chains
//! - Bold/italic/bold-italic variant resolution
//! - Scaled cell metrics derived from font tables
//!
//! The `FontManager` orchestrates glyph lookup across a priority-ordered
//! chain of fonts: the styled primary variants first, then system fallback
//! fonts for characters the primary family is missing.

pub mod font_manager;
pub mod metrics;

pub use font_manager::{FALLBACK_FAMILIES, FontData, FontManager};
pub use metrics::{CellMetrics, RawFontMetrics};
