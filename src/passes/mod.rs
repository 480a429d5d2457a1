//! The render passes a frame is built from.
//!
//! Every pass owns its pipeline, bind group layouts and pass-local resources,
//! and records into an encoder it is handed. Passes never submit; the
//! [`Renderer`](crate::Renderer) records a whole frame into one encoder and
//! submits it once.
//!
//! # Frame order
//!
//! | Pass                   | Target                  | Resolve       |
//! |------------------------|-------------------------|---------------|
//! | [`SkyboxPass`]         | MSAA color (clears)     |               |
//! | [`PbrPass`]            | MSAA color (loads)      | HDR target    |
//! | [`TonemapPass`]        | presentable image       |               |
//! | [`UiPass`]             | presentable image       |               |
//!
//! [`HdriConversionPass`] and [`IrradiancePass`] only run while baking the
//! environment, one cube face at a time.

mod face_projection;
mod hdri_conversion;
mod irradiance;
mod pbr;
mod skybox;
mod tonemap;
mod ui;

pub use hdri_conversion::HdriConversionPass;
pub use irradiance::IrradiancePass;
pub use pbr::{EnqueueError, PbrPass};
pub use skybox::{SKYBOX_VERTICES, SkyboxPass, SkyboxUniform};
pub use tonemap::TonemapPass;
pub use ui::{UiOverlay, UiPass};

use glam::Vec3;

use crate::gpu::GpuContext;
use crate::render_targets::DepthTarget;

/// Everything a pass may touch while recording.
///
/// Created once per frame (or per bake) and passed through every pass in
/// order. The `'a` lifetime keeps passes from holding on to frame resources.
pub struct FrameContext<'a> {
    pub gpu: &'a GpuContext,
    /// Shared command encoder; passes append to it.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Group 0 of every scene pipeline: the per-frame [`CommonFrameData`](crate::CommonFrameData).
    pub common_bind_group: &'a wgpu::BindGroup,
    /// Depth buffer for passes that depth test. `None` while baking.
    pub depth: Option<&'a DepthTarget>,
    pub camera_position: Vec3,
    /// Seconds since the renderer was created.
    pub time: f32,
}

/// A unit of GPU work recorded into the frame encoder.
///
/// ```ignore
/// struct Fullscreen {
///     pipeline: wgpu::RenderPipeline,
///     bind_group: wgpu::BindGroup,
/// }
///
/// impl RenderPass for Fullscreen {
///     fn render(
///         &mut self,
///         ctx: &mut FrameContext,
///         target: &wgpu::TextureView,
///         _resolve_target: Option<&wgpu::TextureView>,
///     ) {
///         let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
///             color_attachments: &[Some(wgpu::RenderPassColorAttachment {
///                 view: target,
///                 // ...
///             })],
///             // ...
///         });
///         pass.set_pipeline(&self.pipeline);
///         pass.set_bind_group(0, &self.bind_group, &[]);
///         pass.draw(0..3, 0..1);
///     }
///
///     fn label(&self) -> &'static str {
///         "Fullscreen Pass"
///     }
/// }
/// ```
pub trait RenderPass {
    /// Record this pass.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Frame context with the GPU, shared encoder and common bindings
    /// * `target` - Color attachment to draw into
    /// * `resolve_target` - Single-sample texture a multisampled `target` resolves into
    fn render(
        &mut self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        resolve_target: Option<&wgpu::TextureView>,
    );

    /// Debug label used for the pass and in log output.
    fn label(&self) -> &'static str;
}

/// Bind group layout of the per-frame common uniforms (group 0).
pub fn common_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Common Bind Group Layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<crate::frame_data::CommonFrameData>() as u64,
                ),
            },
            count: None,
        }],
    })
}

/// Layout entry for a filterable float texture visible to the fragment stage.
pub(crate) fn texture_entry(
    binding: u32,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

pub(crate) fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}
