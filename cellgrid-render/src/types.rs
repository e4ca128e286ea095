//! GPU vertex and instance layouts.

use bytemuck::{Pod, Zeroable};

/// Unit-quad vertex; the shaders scale it by the instance rect.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
}

/// The unit quad drawn as a triangle strip.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex { position: [0.0, 0.0] },
    Vertex { position: [1.0, 0.0] },
    Vertex { position: [0.0, 1.0] },
    Vertex { position: [1.0, 1.0] },
];

/// One background rectangle, in device pixels.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct RectInstance {
    pub pos: [f32; 2],
    pub size: [f32; 2],
    pub color: [f32; 4],
}

/// One glyph quad: device-pixel placement plus normalized atlas coords.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    pub pos: [f32; 2],
    pub size: [f32; 2],
    pub tex_origin: [f32; 2],
    pub tex_size: [f32; 2],
}

impl GlyphInstance {
    pub fn is_empty(&self) -> bool {
        self.size[0] == 0.0 || self.size[1] == 0.0
    }
}
