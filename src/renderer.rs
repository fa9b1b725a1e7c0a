//! wgpu Renderer
//!
//! This module handles all wgpu initialization and rendering.
//! It's designed to be independent of the windowing system where possible.
//!
//! Every frame redraws all visible segments into the accumulation canvas with
//! a single indirect instanced draw, then blits the canvas to the surface.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use wgpu::util::DeviceExt;

use crate::arc_length::ArcLengthPass;
use crate::brush_texture::BrushTexture;
use crate::config::CanvasConfig;
use crate::debug;
use crate::error::CanvasError;
use crate::segment::SegmentInstance;
use crate::store::{IndirectArgs, StrokeStore, VERTICES_PER_INSTANCE};
use crate::view::View;

/// Color blending mode for brush strokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendColorSpace {
    /// Blend in linear color space (physically correct)
    Linear,
    /// Blend in sRGB/gamma space (matches Procreate/CSP)
    Srgb,
}

impl BlendColorSpace {
    fn convert(self, srgb: [f32; 4]) -> [f32; 4] {
        match self {
            BlendColorSpace::Linear => crate::color::srgb_to_linear_rgba(srgb),
            BlendColorSpace::Srgb => srgb,
        }
    }

    fn blit_mode(self) -> u32 {
        match self {
            BlendColorSpace::Linear => 0,
            BlendColorSpace::Srgb => 1,
        }
    }
}

/// Uniforms for the stroke shader
#[repr(C, align(16))] // Force 16-byte alignment for WebGL compatibility
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct StrokeUniforms {
    canvas_size: [f32; 2],
    view_offset: [f32; 2],
    paper_color: [f32; 4],
    view_scale: f32,
    _padding: [f32; 3],
}

/// Uniforms for blit shader (blend mode)
#[repr(C, align(16))] // Force 16-byte alignment for WebGL compatibility
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlitUniforms {
    blend_mode: u32, // 0 = Linear, 1 = sRGB
    _padding: [u32; 3],
}

/// What varies between stroke pipelines
#[derive(Debug, Clone, Copy)]
pub struct StrokePipelineConfig {
    pub target_format: wgpu::TextureFormat,
    pub blend: wgpu::BlendState,
}

impl StrokePipelineConfig {
    /// Premultiplied-alpha "over" into `target_format`
    pub fn premultiplied(target_format: wgpu::TextureFormat) -> Self {
        let component = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        };
        Self {
            target_format,
            blend: wgpu::BlendState {
                color: component,
                alpha: component,
            },
        }
    }
}

/// Renderer wraps the wgpu device, queue, and surface
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    max_texture_dimension: u32,
    canvas_format: wgpu::TextureFormat,
    blend_color_space: BlendColorSpace,
    /// sRGB paper color from the config
    paper_color: [f64; 4],
    max_segments: usize,
    /// GPU supports `draw_indirect`
    indirect_draw: bool,

    // Stroke pipeline and its buffers
    stroke_pipeline: wgpu::RenderPipeline,
    stroke_bind_group_layout: wgpu::BindGroupLayout,
    stroke_uniform_buffer: wgpu::Buffer,
    stroke_bind_group: wgpu::BindGroup,
    segment_buffer: wgpu::Buffer,
    length_buffer: wgpu::Buffer,
    indirect_buffer: wgpu::Buffer,
    /// Instance count mirrored from the store for the direct-draw fallback
    draw_count: u32,
    arc_length_pass: Option<ArcLengthPass>,

    brush_texture_view: wgpu::TextureView,
    brush_sampler: wgpu::Sampler,

    // Canvas texture for accumulating strokes
    canvas_view: wgpu::TextureView,

    // Blit pipeline for copying canvas to surface
    blit_pipeline: wgpu::RenderPipeline,
    blit_uniform_buffer: wgpu::Buffer,
    blit_bind_group: wgpu::BindGroup,
    canvas_sampler: wgpu::Sampler,
}

impl Renderer {
    /// Create a new renderer
    ///
    /// # Arguments
    /// * `window` - The window to render to
    /// * `size` - Initial surface size in physical pixels
    /// * `canvas_config` - Supplies the segment capacity, paper color and blend mode
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        size: winit::dpi::PhysicalSize<u32>,
        canvas_config: &CanvasConfig,
    ) -> Result<Self, CanvasError> {
        log::info!("🔧 Renderer::new() starting...");
        debug::update_status("Creating wgpu instance...");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all() & !wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });
        debug::update_status("Creating surface...");

        let surface = instance.create_surface(window).map_err(|e| {
            let err = CanvasError::from(e);
            debug::update_status(&format!("❌ {}", err));
            err
        })?;
        log::info!("✅ Surface created");
        debug::update_status("Requesting adapter...");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| CanvasError::NoAdapter(e.to_string()))?;

        let adapter_info = adapter.get_info();
        log::info!("✅ Adapter acquired: {:?} (backend: {:?})", adapter_info.name, adapter_info.backend);
        debug::update_status(&format!("Using: {:?}", adapter_info.backend));

        let downlevel = adapter.get_downlevel_capabilities();
        let indirect_draw = downlevel.flags.contains(wgpu::DownlevelFlags::INDIRECT_EXECUTION);
        let compute = downlevel.flags.contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
        log::info!("📏 Indirect draw: {}, compute shaders: {}", indirect_draw, compute);

        let adapter_limits = adapter.limits();
        let max_texture_dimension = adapter_limits.max_texture_dimension_2d;

        // Use the adapter's texture limits on top of the platform defaults
        let mut device_limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults()
        } else {
            wgpu::Limits::default()
        };
        device_limits.max_texture_dimension_2d = adapter_limits.max_texture_dimension_2d;
        device_limits.max_texture_dimension_1d = adapter_limits.max_texture_dimension_1d;

        debug::update_status("Creating device...");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Stroke Canvas Device"),
                required_features: wgpu::Features::empty(),
                required_limits: device_limits,
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;
        log::info!("✅ Device and queue created");
        debug::update_status("Configuring surface...");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| CanvasError::CreateSurface("surface reports no formats".to_string()))?;
        let present_mode = surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo);
        log::info!("Selected surface format: {:?}", surface_format);

        let canvas_format = wgpu::TextureFormat::Rgba16Float;

        // Clamp size to max texture dimension to avoid WebGL limits
        let width = size.width.min(max_texture_dimension).max(1);
        let height = size.height.min(max_texture_dimension).max(1);
        if width != size.width || height != size.height {
            log::warn!(
                "⚠️ Canvas size {}x{} outside texture limits, clamping to {}x{}",
                size.width,
                size.height,
                width,
                height
            );
        }

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            // Opaque so the page background never shows through
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        if size.width > 0 && size.height > 0 {
            surface.configure(&device, &config);
            log::info!("✅ Surface configured: {}x{}", width, height);
        } else {
            log::warn!("Skipping surface configuration (invalid size: {}x{})", size.width, size.height);
        }

        let max_segments = canvas_config.max_segments;
        let storage = if compute {
            wgpu::BufferUsages::STORAGE
        } else {
            wgpu::BufferUsages::empty()
        };
        let segment_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Segment Instance Buffer"),
            size: SegmentInstance::offset_of(max_segments),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST | storage,
            mapped_at_creation: false,
        });
        let length_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Arc Length Buffer"),
            size: (max_segments * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST | storage,
            mapped_at_creation: false,
        });
        let indirect_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Indirect Draw Buffer"),
            contents: bytemuck::bytes_of(&IndirectArgs::new(0)),
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
        });
        log::info!(
            "✅ Segment buffers allocated: {} segments ({} bytes)",
            max_segments,
            segment_buffer.size()
        );

        let arc_length_pass = if compute {
            Some(ArcLengthPass::new(&device, &segment_buffer, &length_buffer))
        } else {
            log::warn!("Compute shaders unavailable, arc lengths come from the CPU only");
            None
        };

        let blend_color_space = canvas_config.blend_color_space;
        let paper_color = canvas_config.paper_color;

        let stroke_bind_group_layout = Self::create_stroke_bind_group_layout(&device);
        let stroke_pipeline = Self::create_stroke_pipeline(
            &device,
            &stroke_bind_group_layout,
            StrokePipelineConfig::premultiplied(canvas_format),
        );
        debug::update_status("Stroke pipeline created...");

        let stroke_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Stroke Uniform Buffer"),
            size: std::mem::size_of::<StrokeUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let brush_texture_view = Self::upload_brush_texture(&device, &queue, &BrushTexture::default());
        let brush_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Brush Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let stroke_bind_group = Self::create_stroke_bind_group(
            &device,
            &stroke_bind_group_layout,
            &stroke_uniform_buffer,
            &brush_texture_view,
            &brush_sampler,
        );

        let canvas_view = Self::create_canvas_texture(&device, width, height, canvas_format);

        let (blit_pipeline, blit_bind_group_layout) = Self::create_blit_pipeline(&device, surface_format);
        let canvas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let blit_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Blit Uniform Buffer"),
            contents: bytemuck::bytes_of(&BlitUniforms {
                blend_mode: blend_color_space.blit_mode(),
                _padding: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let blit_bind_group = Self::create_blit_bind_group(
            &device,
            &blit_bind_group_layout,
            &canvas_view,
            &canvas_sampler,
            &blit_uniform_buffer,
        );

        log::info!(
            "✅ Renderer initialized: {}x{}, surface: {:?}, canvas: {:?}",
            width,
            height,
            surface_format,
            canvas_format
        );
        debug::update_status("✅ Renderer complete!");

        let renderer = Self {
            surface,
            device,
            queue,
            config,
            max_texture_dimension,
            canvas_format,
            blend_color_space,
            paper_color,
            max_segments,
            indirect_draw,
            stroke_pipeline,
            stroke_bind_group_layout,
            stroke_uniform_buffer,
            stroke_bind_group,
            segment_buffer,
            length_buffer,
            indirect_buffer,
            draw_count: 0,
            arc_length_pass,
            brush_texture_view,
            brush_sampler,
            canvas_view,
            blit_pipeline,
            blit_uniform_buffer,
            blit_bind_group,
            canvas_sampler,
        };
        renderer.write_stroke_uniforms(&View::default());
        Ok(renderer)
    }

    fn create_stroke_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Stroke Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn create_stroke_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniforms: &wgpu::Buffer,
        brush_view: &wgpu::TextureView,
        brush_sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Stroke Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(brush_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(brush_sampler),
                },
            ],
        })
    }

    /// Create the stroke rendering pipeline
    fn create_stroke_pipeline(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        config: StrokePipelineConfig,
    ) -> wgpu::RenderPipeline {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Stroke Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/stroke.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Stroke Pipeline Layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });

        let segment_layout = wgpu::VertexBufferLayout {
            array_stride: SegmentInstance::STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // start
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // end
                wgpu::VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // color
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // radius
                wgpu::VertexAttribute {
                    offset: 32,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32,
                },
                // brush_type
                wgpu::VertexAttribute {
                    offset: 36,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Uint32,
                },
            ],
        };
        let length_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<f32>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 5,
                format: wgpu::VertexFormat::Float32,
            }],
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Stroke Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[segment_layout, length_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.target_format,
                    blend: Some(config.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Upload a brush stamp as an Rgba8Unorm texture
    fn upload_brush_texture(device: &wgpu::Device, queue: &wgpu::Queue, brush: &BrushTexture) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: brush.width,
            height: brush.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Brush Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &brush.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * brush.width),
                rows_per_image: Some(brush.height),
            },
            size,
        );
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Create canvas texture for accumulating strokes
    fn create_canvas_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_blit_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        canvas_view: &wgpu::TextureView,
        canvas_sampler: &wgpu::Sampler,
        uniforms: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(canvas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(canvas_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniforms.as_entire_binding(),
                },
            ],
        })
    }

    /// Create the blit pipeline for copying canvas to surface
    fn create_blit_pipeline(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
    ) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    /// Paper color in the current blend space
    fn paper_color(&self) -> [f64; 4] {
        match self.blend_color_space {
            BlendColorSpace::Linear => crate::color::srgb_to_linear_rgba_f64(self.paper_color),
            BlendColorSpace::Srgb => self.paper_color,
        }
    }

    fn write_stroke_uniforms(&self, view: &View) {
        let paper = self.paper_color();
        let uniforms = StrokeUniforms {
            canvas_size: [self.config.width as f32, self.config.height as f32],
            view_offset: view.offset,
            paper_color: paper.map(|c| c as f32),
            view_scale: view.scale,
            _padding: [0.0; 3],
        };
        self.queue
            .write_buffer(&self.stroke_uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Resize the surface
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        let width = new_size.width.min(self.max_texture_dimension);
        let height = new_size.height.min(self.max_texture_dimension);
        if width != new_size.width || height != new_size.height {
            log::warn!(
                "⚠️ Resize {}x{} exceeds max texture size {}, clamping to {}x{}",
                new_size.width,
                new_size.height,
                self.max_texture_dimension,
                width,
                height
            );
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.canvas_view = Self::create_canvas_texture(&self.device, width, height, self.canvas_format);
        self.blit_bind_group = Self::create_blit_bind_group(
            &self.device,
            &self.blit_pipeline.get_bind_group_layout(0),
            &self.canvas_view,
            &self.canvas_sampler,
            &self.blit_uniform_buffer,
        );
        log::debug!("Surface and canvas resized to: {}x{}", width, height);
    }

    /// Replace the stamp brush texture
    pub fn set_brush_texture(&mut self, brush: &BrushTexture) -> Result<(), CanvasError> {
        brush.check_size(self.max_texture_dimension)?;
        self.brush_texture_view = Self::upload_brush_texture(&self.device, &self.queue, brush);
        self.stroke_bind_group = Self::create_stroke_bind_group(
            &self.device,
            &self.stroke_bind_group_layout,
            &self.stroke_uniform_buffer,
            &self.brush_texture_view,
            &self.brush_sampler,
        );
        log::info!("Brush texture replaced ({}x{})", brush.width, brush.height);
        Ok(())
    }

    /// Bring the GPU buffers in line with the store
    fn sync_store(&mut self, store: &mut StrokeStore) {
        let sync = store.take_sync();
        if sync.is_empty() {
            return;
        }

        if sync.cleared {
            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Segments Encoder"),
            });
            encoder.clear_buffer(&self.segment_buffer, 0, None);
            encoder.clear_buffer(&self.length_buffer, 0, None);
            self.queue.submit(std::iter::once(encoder.finish()));
            log::debug!("Segment buffers cleared");
        }

        if let Some(dirty) = sync.dirty {
            self.upload_segments(store, dirty);
        }

        if sync.indirect {
            let args = store.indirect_args();
            self.draw_count = args.instance_count;
            self.queue
                .write_buffer(&self.indirect_buffer, 0, bytemuck::bytes_of(&args));
        }

        if let Some(pass) = &self.arc_length_pass {
            for gesture in sync.finished_gestures {
                pass.dispatch(&self.device, &self.queue, gesture);
            }
        }
    }

    fn upload_segments(&self, store: &StrokeStore, dirty: Range<usize>) {
        let end = dirty.end.min(store.len()).min(self.max_segments);
        if dirty.start >= end {
            return;
        }
        let segments = &store.segments()[dirty.start..end];
        let space = self.blend_color_space;
        let instances: Vec<SegmentInstance> = segments
            .iter()
            .map(|segment| SegmentInstance::from_segment(segment, |c| space.convert(c)))
            .collect();
        let lengths: Vec<f32> = segments.iter().map(|s| s.cumulative_length).collect();

        self.queue.write_buffer(
            &self.segment_buffer,
            SegmentInstance::offset_of(dirty.start),
            bytemuck::cast_slice(&instances),
        );
        self.queue.write_buffer(
            &self.length_buffer,
            (dirty.start * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            bytemuck::cast_slice(&lengths),
        );
        log::debug!("Uploaded segments {}..{}", dirty.start, end);
    }

    /// Render a frame: sync, draw every visible segment, blit
    pub fn render(&mut self, store: &mut StrokeStore, view: &View) {
        if self.config.width == 0 || self.config.height == 0 {
            return;
        }

        self.sync_store(store);
        self.write_stroke_uniforms(view);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::error!("Failed to get surface texture: {:?}", e);
                return;
            }
        };
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let paper = self.paper_color();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Stroke Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.canvas_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: paper[0],
                            g: paper[1],
                            b: paper[2],
                            a: paper[3],
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.stroke_pipeline);
            render_pass.set_bind_group(0, &self.stroke_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.segment_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.length_buffer.slice(..));
            if self.indirect_draw {
                render_pass.draw_indirect(&self.indirect_buffer, 0);
            } else if self.draw_count > 0 {
                render_pass.draw(0..VERTICES_PER_INSTANCE, 0..self.draw_count);
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.blit_pipeline);
            render_pass.set_bind_group(0, &self.blit_bind_group, &[]);
            render_pass.draw(0..6, 0..1);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    /// Get the current blend color space
    pub fn blend_color_space(&self) -> BlendColorSpace {
        self.blend_color_space
    }

    /// Set the blend color space
    ///
    /// Instance colors are stored converted, so callers must invalidate the
    /// store afterwards.
    pub fn set_blend_color_space(&mut self, color_space: BlendColorSpace) {
        if self.blend_color_space == color_space {
            return;
        }

        log::info!(
            "Switching blend color space from {:?} to {:?}",
            self.blend_color_space,
            color_space
        );
        self.blend_color_space = color_space;
        let blit_uniforms = BlitUniforms {
            blend_mode: color_space.blit_mode(),
            _padding: [0; 3],
        };
        self.queue
            .write_buffer(&self.blit_uniform_buffer, 0, bytemuck::bytes_of(&blit_uniforms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layouts() {
        assert_eq!(std::mem::size_of::<StrokeUniforms>(), 48);
        assert_eq!(std::mem::size_of::<BlitUniforms>(), 16);
    }

    #[test]
    fn test_blend_space_conversion() {
        let c = [0.5, 0.5, 0.5, 0.25];
        assert_eq!(BlendColorSpace::Srgb.convert(c), c);
        let linear = BlendColorSpace::Linear.convert(c);
        assert!((linear[0] - 0.214).abs() < 1e-3);
        assert_eq!(linear[3], 0.25);
    }

    #[test]
    fn test_blend_space_serde() {
        let json = serde_json::to_string(&BlendColorSpace::Srgb).unwrap();
        assert_eq!(json, "\"srgb\"");
        let parsed: BlendColorSpace = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(parsed, BlendColorSpace::Linear);
    }

    #[test]
    fn test_premultiplied_pipeline_config() {
        let config = StrokePipelineConfig::premultiplied(wgpu::TextureFormat::Rgba16Float);
        assert_eq!(config.blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(config.blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(config.blend.alpha, config.blend.color);
    }
}
