//! Shared data types for the cellgrid GPU grid renderer.
//!
//! This crate holds everything the renderer needs that is plain data:
//!
//! - Packed cell attribute words and their decoded form
//! - Color math (WCAG contrast, blending, dimming) and the contrast cache
//! - Terminal themes and the 256-entry palette
//! - Renderer options

pub mod attributes;
pub mod color;
pub mod options;
pub mod theme;

pub use attributes::{
    AttrWords, CellAttributes, ColorSpec, StyleFlags, UnderlineAttr, UnderlineStyle,
};
pub use color::{Color, ContrastCache, DIM_OPACITY};
pub use options::{CursorStyle, RendererOptions};
pub use theme::{RenderColors, Theme};
