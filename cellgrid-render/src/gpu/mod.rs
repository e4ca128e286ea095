//! wgpu presentation layer.
//!
//! Owns the surface, device, pipelines and GPU buffers, and turns a CPU
//! [`Frame`](crate::renderer::Frame) into draw calls: one instanced pass
//! for background rectangles (plus the cursor), one for glyph quads
//! sampled from the atlas page. The atlas page is re-uploaded only when
//! its generation counter moved.

mod pipeline;

use std::time::{Duration, Instant};

use crate::atlas::PAGE_SIZE;
use crate::error::RenderError;
use crate::renderer::Frame;
use crate::types::{GlyphInstance, RectInstance};

const SURFACE_FRAME_LATENCY: u32 = 2;

/// How long a lost surface may stay lost before rendering is abandoned.
const CONTEXT_LOST_GRACE: Duration = Duration::from_secs(3);

/// Initial instance buffer capacities; both grow on demand.
const INITIAL_RECT_CAPACITY: usize = 256;
const INITIAL_GLYPH_CAPACITY: usize = 4096;

pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    bg_pipeline: wgpu::RenderPipeline,
    text_pipeline: wgpu::RenderPipeline,
    bg_bind_group: wgpu::BindGroup,
    text_bind_group: wgpu::BindGroup,
    viewport_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    rect_buffer: wgpu::Buffer,
    rect_capacity: usize,
    glyph_buffer: wgpu::Buffer,
    glyph_capacity: usize,
    atlas_texture: wgpu::Texture,
    uploaded_generation: Option<u64>,
    lost_since: Option<Instant>,
}

impl GpuRenderer {
    /// Create the GPU state for an output surface of `width`×`height`
    /// device pixels.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(target)
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterNotFound)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                ..Default::default()
            })
            .await
            .map_err(|e| RenderError::DeviceError(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if surface_caps
            .present_modes
            .contains(&wgpu::PresentMode::Fifo)
        {
            wgpu::PresentMode::Fifo
        } else {
            surface_caps.present_modes[0]
        };
        let alpha_mode = if surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::PreMultiplied)
        {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else if surface_caps
            .alpha_modes
            .contains(&wgpu::CompositeAlphaMode::Auto)
        {
            wgpu::CompositeAlphaMode::Auto
        } else {
            surface_caps.alpha_modes[0]
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: SURFACE_FRAME_LATENCY,
        };
        surface.configure(&device, &config);

        let bg_bind_group_layout = pipeline::create_bg_bind_group_layout(&device);
        let text_bind_group_layout = pipeline::create_text_bind_group_layout(&device);
        let bg_pipeline =
            pipeline::create_bg_pipeline(&device, surface_format, &bg_bind_group_layout);
        let text_pipeline =
            pipeline::create_text_pipeline(&device, surface_format, &text_bind_group_layout);
        let (atlas_texture, atlas_view, atlas_sampler) = pipeline::create_atlas_texture(&device);

        let viewport_buffer = pipeline::create_viewport_buffer(&device);
        queue.write_buffer(
            &viewport_buffer,
            0,
            bytemuck::cast_slice(&[width.max(1) as f32, height.max(1) as f32, 0.0, 0.0]),
        );

        let bg_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg bind group"),
            layout: &bg_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_buffer.as_entire_binding(),
            }],
        });
        let text_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("text bind group"),
            layout: &text_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: viewport_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&atlas_sampler),
                },
            ],
        });

        let rect_buffer = pipeline::create_instance_buffer(
            &device,
            "rect instance buffer",
            INITIAL_RECT_CAPACITY,
            std::mem::size_of::<RectInstance>(),
        );
        let glyph_buffer = pipeline::create_instance_buffer(
            &device,
            "glyph instance buffer",
            INITIAL_GLYPH_CAPACITY,
            std::mem::size_of::<GlyphInstance>(),
        );
        let vertex_buffer = pipeline::create_vertex_buffer(&device);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            bg_pipeline,
            text_pipeline,
            bg_bind_group,
            text_bind_group,
            viewport_buffer,
            vertex_buffer,
            rect_buffer,
            rect_capacity: INITIAL_RECT_CAPACITY,
            glyph_buffer,
            glyph_capacity: INITIAL_GLYPH_CAPACITY,
            atlas_texture,
            uploaded_generation: None,
            lost_since: None,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.queue.write_buffer(
            &self.viewport_buffer,
            0,
            bytemuck::cast_slice(&[self.config.width as f32, self.config.height as f32, 0.0, 0.0]),
        );
    }

    /// Present one frame. A lost or outdated surface is reconfigured and the
    /// frame skipped; if the surface stays lost past the grace window this
    /// returns [`RenderError::ContextLost`] and the caller must stop
    /// rendering.
    pub fn present(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        self.upload_atlas(frame);
        self.upload_instances(frame);

        let output = match self.surface.get_current_texture() {
            Ok(output) => {
                self.lost_since = None;
                output
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let now = Instant::now();
                let since = *self.lost_since.get_or_insert(now);
                if now.duration_since(since) > CONTEXT_LOST_GRACE {
                    return Err(RenderError::ContextLost {
                        grace_secs: CONTEXT_LOST_GRACE.as_secs(),
                    });
                }
                log::warn!("surface lost, reconfiguring and skipping frame");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Backgrounds plus the cursor, then glyphs on top.
            let rect_count = (frame.rects.len() + frame.cursor.len()) as u32;
            render_pass.set_pipeline(&self.bg_pipeline);
            render_pass.set_bind_group(0, &self.bg_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.rect_buffer.slice(..));
            render_pass.draw(0..4, 0..rect_count);

            render_pass.set_pipeline(&self.text_pipeline);
            render_pass.set_bind_group(0, &self.text_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.glyph_buffer.slice(..));
            render_pass.draw(0..4, 0..frame.glyphs.len() as u32);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    /// Re-upload the atlas page when its generation moved.
    fn upload_atlas(&mut self, frame: &Frame<'_>) {
        let atlas = frame.atlas.lock();
        let generation = atlas.generation();
        if self.uploaded_generation == Some(generation) {
            return;
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.atlas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            atlas.page_data(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * PAGE_SIZE),
                rows_per_image: Some(PAGE_SIZE),
            },
            wgpu::Extent3d {
                width: PAGE_SIZE,
                height: PAGE_SIZE,
                depth_or_array_layers: 1,
            },
        );
        self.uploaded_generation = Some(generation);
    }

    fn upload_instances(&mut self, frame: &Frame<'_>) {
        let rect_count = frame.rects.len() + frame.cursor.len();
        if rect_count > self.rect_capacity {
            self.rect_capacity = rect_count.next_power_of_two();
            self.rect_buffer = pipeline::create_instance_buffer(
                &self.device,
                "rect instance buffer",
                self.rect_capacity,
                std::mem::size_of::<RectInstance>(),
            );
        }
        self.queue
            .write_buffer(&self.rect_buffer, 0, bytemuck::cast_slice(frame.rects));
        self.queue.write_buffer(
            &self.rect_buffer,
            (frame.rects.len() * std::mem::size_of::<RectInstance>()) as u64,
            bytemuck::cast_slice(frame.cursor),
        );

        if frame.glyphs.len() > self.glyph_capacity {
            self.glyph_capacity = frame.glyphs.len().next_power_of_two();
            self.glyph_buffer = pipeline::create_instance_buffer(
                &self.device,
                "glyph instance buffer",
                self.glyph_capacity,
                std::mem::size_of::<GlyphInstance>(),
            );
        }
        self.queue
            .write_buffer(&self.glyph_buffer, 0, bytemuck::cast_slice(frame.glyphs));
    }
}
