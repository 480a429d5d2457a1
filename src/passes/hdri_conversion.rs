use std::path::Path;

use super::face_projection::FaceProjection;
use super::{FrameContext, RenderPass};
use crate::environment::EnvironmentMap;
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::resources::CubeMap;

/// Projects an equirectangular environment map onto cube faces.
///
/// Each [`render`](RenderPass::render) writes the face chosen with
/// [`select_face`](Self::select_face); [`bake`](Self::bake) renders all six.
pub struct HdriConversionPass {
    projection: FaceProjection,
    source: Option<wgpu::Texture>,
}

impl HdriConversionPass {
    pub fn new(gpu: &GpuContext, asset_root: &Path) -> Result<Self, RenderError> {
        let projection = FaceProjection::new(
            gpu,
            &asset_root.join("shaders/hdri-to-cubemap.wgsl"),
            wgpu::TextureViewDimension::D2,
            "HDRI Conversion",
        )?;
        Ok(Self {
            projection,
            source: None,
        })
    }

    /// Upload `environment` and make it the projection source.
    pub fn set_environment(&mut self, gpu: &GpuContext, environment: &EnvironmentMap) {
        let texture = environment.upload(gpu);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.projection.set_source(gpu, &view);
        self.source = Some(texture);
    }

    pub fn select_face(&mut self, face: u32) {
        self.projection.select_face(face);
    }

    pub fn face(&self) -> u32 {
        self.projection.face()
    }

    /// Record all six faces of `cube`.
    pub fn bake(&mut self, ctx: &mut FrameContext, cube: &CubeMap) {
        if self.source.is_none() {
            log::warn!("HDRI conversion has no environment; cubemap left unchanged");
            return;
        }
        self.projection.record_cube(ctx, cube, "HDRI Conversion Pass");
    }
}

impl RenderPass for HdriConversionPass {
    fn render(
        &mut self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        _resolve_target: Option<&wgpu::TextureView>,
    ) {
        self.projection.record(ctx, target, self.label());
    }

    fn label(&self) -> &'static str {
        "HDRI Conversion Pass"
    }
}
