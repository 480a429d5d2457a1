use std::path::Path;

use super::face_projection::FaceProjection;
use super::{FrameContext, RenderPass};
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::resources::CubeMap;

/// Convolves the environment cubemap into a small diffuse irradiance cubemap.
///
/// The irradiance cube is owned here and sampled by the PBR pass for ambient
/// light. Its contents are only valid after [`bake`](Self::bake) has run on a
/// baked environment.
pub struct IrradiancePass {
    projection: FaceProjection,
    cubemap: CubeMap,
}

impl IrradiancePass {
    /// # Arguments
    ///
    /// * `gpu` - The GPU context
    /// * `asset_root` - Directory containing `shaders/irradiance-convolution.wgsl`
    /// * `environment` - Cubemap to convolve, normally the skybox cubemap
    /// * `face_size` - Edge length of each irradiance face in texels
    pub fn new(
        gpu: &GpuContext,
        asset_root: &Path,
        environment: &CubeMap,
        face_size: u32,
    ) -> Result<Self, RenderError> {
        let mut projection = FaceProjection::new(
            gpu,
            &asset_root.join("shaders/irradiance-convolution.wgsl"),
            wgpu::TextureViewDimension::Cube,
            "Irradiance Convolution",
        )?;
        projection.set_source(gpu, &environment.view);

        Ok(Self {
            projection,
            cubemap: CubeMap::new(gpu, face_size, "Irradiance Cubemap"),
        })
    }

    pub fn cubemap(&self) -> &CubeMap {
        &self.cubemap
    }

    pub fn select_face(&mut self, face: u32) {
        self.projection.select_face(face);
    }

    /// Record all six irradiance faces.
    pub fn bake(&mut self, ctx: &mut FrameContext) {
        debug_assert!(self.projection.has_source());
        self.projection
            .record_cube(ctx, &self.cubemap, "Irradiance Convolution Pass");
    }
}

impl RenderPass for IrradiancePass {
    fn render(
        &mut self,
        ctx: &mut FrameContext,
        target: &wgpu::TextureView,
        _resolve_target: Option<&wgpu::TextureView>,
    ) {
        self.projection.record(ctx, target, self.label());
    }

    fn label(&self) -> &'static str {
        "Irradiance Convolution Pass"
    }
}
