//! Core GPU context and device management.
//!
//! This module provides [`GpuContext`], the struct that holds the negotiated wgpu
//! handles the renderer is built on: adapter, device, queue and (optionally) a
//! window surface. The renderer treats these as pre-acquired capabilities; it never
//! negotiates a device itself.
//!
//! # Initialization
//!
//! A `GpuContext` is created in one of three ways:
//!
//! - [`GpuContext::new`] from a winit [`Window`], configuring a presentable surface
//! - [`GpuContext::headless`] with no surface, for offscreen rendering and tests
//! - [`GpuContext::from_parts`] from handles negotiated elsewhere
//!
//! Device acquisition is the only asynchronous step in the engine. The blocking
//! constructors resolve it with `pollster`.
//!
//! [`Window`]: winit::window::Window

use std::sync::Arc;
use winit::window::Window;

use crate::error::RenderError;

/// Color format used for the presentable texture when no surface exists.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Core GPU context holding wgpu resources.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
/// The context is created once at startup and passed by reference to the
/// renderer and every pass it constructs.
pub struct GpuContext {
    /// The adapter the device was requested from.
    pub adapter: wgpu::Adapter,
    /// The surface for presenting rendered frames, absent when running headless.
    pub surface: Option<wgpu::Surface<'static>>,
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Current presentable configuration (format, size, present mode).
    ///
    /// Headless contexts keep a configuration too; it describes the offscreen
    /// presentable texture instead of a swapchain.
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    /// Create a new GPU context from a winit window.
    ///
    /// This performs all wgpu initialization:
    /// 1. Creates a wgpu instance with primary backends (Vulkan, Metal, DX12)
    /// 2. Creates a surface for the window
    /// 3. Requests an adapter compatible with that surface
    /// 4. Creates the logical device and command queue
    /// 5. Configures the surface with the preferred (sRGB if offered) format
    pub fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = Self::request_device(&adapter)?;

        Ok(Self::from_parts(
            adapter,
            device,
            queue,
            Some(surface),
            size.width,
            size.height,
        ))
    }

    /// Create a GPU context without a window.
    ///
    /// Frames are rendered into an offscreen presentable texture of
    /// [`OFFSCREEN_FORMAT`]. Useful for tests and batch rendering.
    pub fn headless(width: u32, height: u32) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = Self::request_device(&adapter)?;

        Ok(Self::from_parts(adapter, device, queue, None, width, height))
    }

    /// Assemble a context from handles negotiated by the caller.
    ///
    /// When a surface is given it is configured immediately at the given size.
    pub fn from_parts(
        adapter: wgpu::Adapter,
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: Option<wgpu::Surface<'static>>,
        width: u32,
        height: u32,
    ) -> Self {
        let info = adapter.get_info();
        log::info!(
            "Using adapter \"{}\" ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let config = match &surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                let format = caps
                    .formats
                    .iter()
                    .find(|f| f.is_srgb())
                    .copied()
                    .unwrap_or(caps.formats[0]);

                wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: width.max(1),
                    height: height.max(1),
                    present_mode: wgpu::PresentMode::Fifo,
                    alpha_mode: caps.alpha_modes[0],
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                }
            }
            None => wgpu::SurfaceConfiguration {
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                format: OFFSCREEN_FORMAT,
                width: width.max(1),
                height: height.max(1),
                present_mode: wgpu::PresentMode::Fifo,
                alpha_mode: wgpu::CompositeAlphaMode::Opaque,
                view_formats: vec![],
                desired_maximum_frame_latency: 2,
            },
        };

        if let Some(surface) = &surface {
            surface.configure(&device, &config);
        }

        Self {
            adapter,
            surface,
            device,
            queue,
            config,
        }
    }

    fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), RenderError> {
        let pair = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Lumen Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))?;
        Ok(pair)
    }

    /// Route asynchronous device failures to the log.
    ///
    /// Validation errors (for example a bind group built against the wrong layout)
    /// and device loss are only observable through these callbacks. They are logged
    /// and never interrupt the frame loop.
    pub fn install_error_handlers(&self) {
        self.device.on_uncaptured_error(Arc::new(|error| {
            log::error!("Uncaptured device error: {error}");
        }));
        self.device.set_device_lost_callback(|reason, message| {
            log::error!("Device lost ({reason:?}): {message}");
        });
    }

    /// Reconfigure the presentable surface for new dimensions.
    ///
    /// Ignores zero-sized dimensions to avoid wgpu validation errors (which can occur
    /// during window minimize). Returns whether the size was applied.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
        true
    }

    /// Reapply the current configuration, used after the surface reports loss.
    pub fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// The negotiated presentable color format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current surface width in pixels.
    pub fn width(&self) -> u32 {
        self.config.width
    }

    /// Returns the current surface height in pixels.
    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Returns the current aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height as f32
    }

    /// Minimum alignment for dynamic uniform buffer offsets on this device.
    pub fn uniform_alignment(&self) -> u32 {
        self.device.limits().min_uniform_buffer_offset_alignment
    }
}
