//! The attachments every frame renders into.
//!
//! Geometry is drawn into a multisampled HDR color target, resolved into a
//! single-sample HDR texture that the tonemap pass samples, and finally written
//! to the presentable image. All targets share one size and are rebuilt together
//! on resize.

use crate::error::RenderError;
use crate::gpu::GpuContext;

/// Sample count of the MSAA color and depth targets.
pub const MSAA_SAMPLES: u32 = 4;
/// Format of the MSAA color target and the HDR resolve target.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Format of the shared depth buffer.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// A color texture with its default view.
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    fn new(
        device: &wgpu::Device,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        sample_count: u32,
        usage: wgpu::TextureUsages,
        label: &str,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// The depth buffer shared by the skybox and PBR passes.
///
/// The attachment operations are fixed when the target is built and replaced
/// together with the texture on resize.
pub struct DepthTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    depth_ops: wgpu::Operations<f32>,
}

impl DepthTarget {
    fn new(device: &wgpu::Device, (width, height): (u32, u32)) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: MSAA_SAMPLES,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Depth Target View"),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });
        // Clear to the far plane and keep the result for later passes.
        let depth_ops = wgpu::Operations {
            load: wgpu::LoadOp::Clear(1.0),
            store: wgpu::StoreOp::Store,
        };
        Self {
            texture,
            view,
            depth_ops,
        }
    }

    /// The cached depth attachment, borrowing the current view.
    pub fn attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.view,
            depth_ops: Some(self.depth_ops),
            stencil_ops: None,
        }
    }

    pub fn depth_ops(&self) -> wgpu::Operations<f32> {
        self.depth_ops
    }
}

/// The presentable image for one frame.
///
/// Either a swapchain texture that must be presented, or a fresh view of the
/// offscreen presentable texture when running without a surface.
pub struct Frame {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl Frame {
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

/// MSAA color, HDR resolve, depth, and (headless) presentable targets.
pub struct RenderTargets {
    width: u32,
    height: u32,
    pub msaa: RenderTarget,
    pub hdr: RenderTarget,
    pub depth: DepthTarget,
    /// Stand-in for the swapchain when the context has no surface.
    pub offscreen: Option<RenderTarget>,
}

impl RenderTargets {
    /// Create every target at the context's current presentable size.
    pub fn new(gpu: &GpuContext) -> Self {
        let size = (gpu.width(), gpu.height());
        let device = &gpu.device;

        let offscreen = gpu.surface.is_none().then(|| {
            RenderTarget::new(
                device,
                size,
                gpu.surface_format(),
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                "Offscreen Presentable",
            )
        });

        let msaa = RenderTarget::new(
            device,
            size,
            HDR_FORMAT,
            MSAA_SAMPLES,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
            "MSAA Color Target",
        );

        let hdr = RenderTarget::new(
            device,
            size,
            HDR_FORMAT,
            1,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            "HDR Resolve Target",
        );

        let depth = DepthTarget::new(device, size);

        log::debug!("Created render targets at {}x{}", size.0, size.1);

        Self {
            width: size.0,
            height: size.1,
            msaa,
            hdr,
            depth,
            offscreen,
        }
    }

    /// Reconfigure the presentable surface and rebuild every target.
    ///
    /// Zero dimensions (a minimised window) are ignored. Returns whether the
    /// targets were rebuilt.
    pub fn resize(&mut self, gpu: &mut GpuContext, width: u32, height: u32) -> bool {
        if !gpu.resize(width, height) {
            log::debug!("Ignoring resize to {width}x{height}");
            return false;
        }
        *self = Self::new(gpu);
        true
    }

    /// Fetch the image this frame is presented to.
    ///
    /// An outdated or lost surface is reconfigured and reported as an error so
    /// the caller can skip the frame.
    pub fn acquire_frame(&self, gpu: &GpuContext) -> Result<Frame, RenderError> {
        if let Some(target) = &self.offscreen {
            return Ok(Frame {
                view: target
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            });
        }
        // Targets built for a surface-less context always carry an offscreen image.
        let Some(surface) = &gpu.surface else {
            return Err(wgpu::SurfaceError::Lost.into());
        };

        match surface.get_current_texture() {
            Ok(texture) => Ok(Frame {
                view: texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: Some(texture),
            }),
            Err(error @ (wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost)) => {
                log::warn!("Surface {error}; reconfiguring and skipping frame");
                gpu.reconfigure();
                Err(error.into())
            }
            Err(error) => {
                log::warn!("Skipping frame: {error}");
                Err(error.into())
            }
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_attachment_survives_resize() {
        let Ok(mut gpu) = GpuContext::headless(64, 32) else {
            return;
        };
        let mut targets = RenderTargets::new(&gpu);
        let before = targets.depth.depth_ops();

        assert!(targets.resize(&mut gpu, 128, 96));

        assert_eq!(targets.size(), (128, 96));
        assert_eq!(targets.depth.texture.width(), 128);
        assert_eq!(targets.depth.depth_ops(), before);

        let attachment = targets.depth.attachment();
        assert_eq!(attachment.depth_ops, Some(before));
        assert_eq!(attachment.stencil_ops, None);
    }

    #[test]
    fn zero_sized_resize_keeps_targets() {
        let Ok(mut gpu) = GpuContext::headless(64, 32) else {
            return;
        };
        let mut targets = RenderTargets::new(&gpu);

        assert!(!targets.resize(&mut gpu, 0, 32));
        assert_eq!(targets.size(), (64, 32));
        assert_eq!(targets.hdr.texture.height(), 32);
    }
}
