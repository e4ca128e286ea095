//! GPU-accelerated cell grid renderer.
//!
//! This crate turns a terminal's cell buffer into instanced GPU draw
//! batches:
//!
//! - Glyph rasterization into a shared, reference-counted texture atlas
//! - Layered color resolution (decorations, selection, inverse, dim,
//!   minimum contrast)
//! - Per-cell diffing against a retained render model, so static screens
//!   cost nothing
//! - Background rectangle batching into maximal same-color runs
//! - A wgpu presentation layer for the two instanced passes

pub mod atlas;
pub mod color_resolver;
pub mod cursor;
pub mod custom_glyphs;
pub mod dimensions;
pub mod error;
pub mod glyphs;
pub mod gpu;
pub mod model;
pub mod rects;
pub mod renderer;
mod scratch;
pub mod services;
pub mod types;

// Re-export main public types
pub use atlas::{
    AtlasConfig, AtlasHandle, AtlasInstanceCache, AtlasStats, FontRasterizer, GlyphRasterizer,
    MaskContent, RasterizedGlyph, RasterizedMask, TextureAtlas, NULL_RASTERIZED_GLYPH, PAGE_SIZE,
};
pub use cursor::CursorBlinkState;
pub use dimensions::RenderDimensions;
pub use error::RenderError;
pub use gpu::GpuRenderer;
pub use model::{RenderModel, SelectionState};
pub use renderer::{
    system_font_source, FontSource, Frame, FrameStats, HostServices, Renderer, RowRange,
};
pub use services::{
    BufferAccessor, CellRecord, CharacterJoiner, DecorationColors, DecorationLayer,
    DecorationProvider, GridBuffer, NoDecorations, NoJoiner,
};
pub use types::{GlyphInstance, RectInstance};

// Re-export shared types from dependencies for convenience
pub use cellgrid_config::{RenderColors, RendererOptions, Theme};
