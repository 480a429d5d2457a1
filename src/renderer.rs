//! The frame orchestrator.
//!
//! [`Renderer`] owns the GPU context, the render targets, every pass and the
//! per-frame common uniforms. A frame is recorded into a single encoder in a
//! fixed order and submitted once:
//!
//! ```text
//! Skybox  → MSAA color (clear)
//! PBR     → MSAA color (load)  ⇒ resolve → HDR
//! Tonemap → presentable image (samples HDR)
//! UI      → presentable image (load)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let gpu = GpuContext::headless(800, 450)?;
//! let mut renderer = Renderer::new(gpu, RendererConfig::new())?;
//! let cube = renderer.create_mesh(&MeshData::cube());
//!
//! renderer.draw_mesh(&cube, Transform::new());
//! let stats = renderer.render()?;
//! assert_eq!(stats.pbr_draws, 1);
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use glam::{Vec3, Vec4};

use crate::camera::Camera;
use crate::config::RendererConfig;
use crate::environment::EnvironmentMap;
use crate::error::RenderError;
use crate::frame_data::CommonFrameData;
use crate::geometry::MeshData;
use crate::gltf_import::load_gltf;
use crate::gpu::GpuContext;
use crate::mesh::Mesh;
use crate::passes::{
    self, FrameContext, HdriConversionPass, IrradiancePass, PbrPass, RenderPass, SkyboxPass,
    TonemapPass, UiOverlay, UiPass,
};
use crate::render_targets::RenderTargets;
use crate::resources::{self, MipGenerator};
use crate::transform::Transform;

/// What one call to [`Renderer::render`] recorded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Indexed draws recorded by the PBR pass.
    pub pbr_draws: usize,
    /// Draws dropped because the instance buffer was full.
    pub dropped_draws: usize,
}

/// Owns the GPU context and drives the pass sequence.
pub struct Renderer {
    gpu: GpuContext,
    targets: RenderTargets,
    common_data: CommonFrameData,
    common_buffer: wgpu::Buffer,
    common_bind_group: wgpu::BindGroup,
    skybox: SkyboxPass,
    hdri: HdriConversionPass,
    irradiance: IrradiancePass,
    pbr: PbrPass,
    tonemap: TonemapPass,
    ui: UiPass,
    mips: MipGenerator,
    camera: Camera,
    camera_transform: Transform,
    start: Instant,
    frames_submitted: u64,
}

impl Renderer {
    /// Build every pass and bake the configured environment.
    ///
    /// Passes are created in dependency order (skybox, irradiance, PBR,
    /// tonemap, UI). Shaders are read from `<asset_root>/shaders`; a missing
    /// file fails construction with [`RenderError::Shader`]. An environment map
    /// that cannot be decoded is replaced by
    /// [`environment_fallback`](RendererConfig::environment_fallback).
    pub fn new(gpu: GpuContext, config: RendererConfig) -> Result<Self, RenderError> {
        gpu.install_error_handlers();
        let asset_root = config.asset_root.as_path();

        let common_layout = passes::common_bind_group_layout(&gpu.device);
        let common_data = CommonFrameData::default();
        let common_buffer = resources::create_buffer(
            &gpu,
            Some(bytemuck::bytes_of(&common_data)),
            std::mem::size_of::<CommonFrameData>() as u64,
            wgpu::BufferUsages::UNIFORM,
            "Common Frame Uniforms",
        );
        let common_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Common Bind Group"),
            layout: &common_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: common_buffer.as_entire_binding(),
            }],
        });

        let targets = RenderTargets::new(&gpu);

        let skybox = SkyboxPass::new(
            &gpu,
            asset_root,
            &common_layout,
            config.skybox_face_size,
            config.skybox_exposure,
            config.clear_color,
        )?;
        let irradiance = IrradiancePass::new(
            &gpu,
            asset_root,
            skybox.cubemap(),
            config.irradiance_face_size,
        )?;
        let pbr = PbrPass::new(
            &gpu,
            asset_root,
            &common_layout,
            irradiance.cubemap(),
            config.max_instances,
        )?;
        let tonemap = TonemapPass::new(&gpu, asset_root, &targets.hdr.view)?;
        let hdri = HdriConversionPass::new(&gpu, asset_root)?;
        let mips = MipGenerator::new(&gpu, asset_root)?;

        let mut camera = config.camera;
        camera.set_viewport(gpu.width(), gpu.height());

        let mut renderer = Self {
            gpu,
            targets,
            common_data,
            common_buffer,
            common_bind_group,
            skybox,
            hdri,
            irradiance,
            pbr,
            tonemap,
            ui: UiPass::new(),
            mips,
            camera,
            camera_transform: config.camera_transform,
            start: Instant::now(),
            frames_submitted: 0,
        };
        renderer.update_common_data();
        renderer.upload_common_data();

        let environment = EnvironmentMap::load_or_uniform(
            config.environment_map.as_deref(),
            config.environment_fallback,
        );
        renderer.bake_environment(&environment);

        log::info!(
            "Renderer ready at {}x{}",
            renderer.gpu.width(),
            renderer.gpu.height()
        );
        Ok(renderer)
    }

    /// Project `environment` into the skybox cubemap and convolve the irradiance
    /// cubemap from it.
    ///
    /// All twelve faces are recorded into one encoder and submitted once.
    pub fn bake_environment(&mut self, environment: &EnvironmentMap) {
        self.hdri.set_environment(&self.gpu, environment);

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Environment Bake Encoder"),
            });
        {
            let mut ctx = FrameContext {
                gpu: &self.gpu,
                encoder: &mut encoder,
                common_bind_group: &self.common_bind_group,
                depth: None,
                camera_position: self.camera_transform.translation,
                time: self.start.elapsed().as_secs_f32(),
            };
            self.hdri.bake(&mut ctx, self.skybox.cubemap());
            self.irradiance.bake(&mut ctx);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        log::info!(
            "Baked {}x{} environment into {}px skybox and {}px irradiance faces",
            environment.width,
            environment.height,
            self.skybox.cubemap().size,
            self.irradiance.cubemap().size
        );
    }

    /// Queue `mesh` for the next [`render`](Self::render).
    ///
    /// Meshes whose material was built for another pipeline, empty meshes and
    /// transforms with a zero scale axis are logged and skipped.
    pub fn draw_mesh(&mut self, mesh: &Arc<Mesh>, transform: Transform) {
        if let Err(error) = self.pbr.enqueue(mesh, transform) {
            log::warn!("Skipping draw: {error}");
        }
    }

    /// Draws waiting for the next frame.
    pub fn queued_draws(&self) -> usize {
        self.pbr.queued()
    }

    /// Set the color and position of point light `index`.
    ///
    /// Indices at or past [`MAX_POINT_LIGHTS`](crate::MAX_POINT_LIGHTS) are
    /// logged and ignored.
    pub fn set_light(&mut self, index: usize, color: Vec4, position: Vec3) {
        self.common_data.set_point_light(index, color, position);
    }

    pub fn set_directional_light(&mut self, direction: Vec3, color: Vec4) {
        self.common_data.light_direction = direction.normalize_or_zero().to_array();
        self.common_data.light_color = color.to_array();
    }

    pub fn set_normal_map_strength(&mut self, strength: f32) {
        self.common_data.normal_map_strength = strength;
    }

    /// Record and submit one frame.
    ///
    /// If the presentable image cannot be acquired the frame is skipped, queued
    /// draws are discarded and the error is returned; the renderer stays usable.
    pub fn render(&mut self) -> Result<FrameStats, RenderError> {
        let frame = match self.targets.acquire_frame(&self.gpu) {
            Ok(frame) => frame,
            Err(error) => {
                self.pbr.clear_queue();
                return Err(error);
            }
        };

        self.update_common_data();
        self.upload_common_data();

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut ctx = FrameContext {
                gpu: &self.gpu,
                encoder: &mut encoder,
                common_bind_group: &self.common_bind_group,
                depth: Some(&self.targets.depth),
                camera_position: self.camera_transform.translation,
                time: self.common_data.time,
            };
            let msaa = &self.targets.msaa.view;
            let hdr = &self.targets.hdr.view;

            self.skybox.render(&mut ctx, msaa, None);
            self.pbr.render(&mut ctx, msaa, Some(hdr));
            self.tonemap.render(&mut ctx, &frame.view, None);
            self.ui.render(&mut ctx, &frame.view, None);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.frames_submitted += 1;

        Ok(FrameStats {
            pbr_draws: self.pbr.recorded_draws(),
            dropped_draws: self.pbr.dropped_draws(),
        })
    }

    /// Rebuild the render targets for a new output size.
    ///
    /// Zero dimensions (a minimised window) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if !self.targets.resize(&mut self.gpu, width, height) {
            return;
        }
        self.tonemap.update_hdr_view(&self.gpu, &self.targets.hdr.view);
        self.camera.set_viewport(width, height);
        self.common_data.set_projection(self.camera.projection_matrix());
        self.upload_common_data();
        log::debug!("Resized to {width}x{height}");
    }

    /// Open the UI overlay's frame.
    pub fn begin_editor(&mut self) {
        self.ui.begin_frame();
    }

    /// Close the UI overlay's frame. [`render`](Self::render) closes a frame
    /// left open.
    pub fn end_editor(&mut self) {
        self.ui.end_frame();
    }

    pub fn set_ui_overlay(&mut self, overlay: Box<dyn UiOverlay>) {
        self.ui.set_overlay(overlay);
    }

    /// Upload `data` as a mesh drawable by this renderer.
    pub fn create_mesh(&self, data: &MeshData) -> Arc<Mesh> {
        Arc::new(Mesh::upload(
            &self.gpu,
            data,
            self.pbr.material_layout(),
            &self.mips,
        ))
    }

    /// Import a glTF file and upload it.
    pub fn try_load_mesh(&self, path: impl AsRef<Path>) -> Result<Arc<Mesh>, RenderError> {
        let data = load_gltf(path.as_ref())?;
        Ok(self.create_mesh(&data))
    }

    /// Like [`try_load_mesh`](Self::try_load_mesh), logging failures.
    pub fn load_mesh(&self, path: impl AsRef<Path>) -> Option<Arc<Mesh>> {
        self.try_load_mesh(path)
            .inspect_err(|error| log::error!("{error}"))
            .ok()
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn targets(&self) -> &RenderTargets {
        &self.targets
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Projection changes are picked up by the next [`render`](Self::render).
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn camera_transform(&self) -> Transform {
        self.camera_transform
    }

    pub fn set_camera_transform(&mut self, transform: Transform) {
        self.camera_transform = transform;
    }

    pub fn skybox_exposure(&self) -> f32 {
        self.skybox.exposure()
    }

    pub fn set_skybox_exposure(&mut self, exposure: f32) {
        self.skybox.set_exposure(exposure);
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.skybox.set_clear_color(color);
    }

    /// Frames submitted by [`render`](Self::render) so far.
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// The uniforms uploaded with the last frame (or pending for the next).
    pub fn common_data(&self) -> &CommonFrameData {
        &self.common_data
    }

    fn update_common_data(&mut self) {
        let data = &mut self.common_data;
        data.set_projection(self.camera.projection_matrix());
        data.set_view(self.camera_transform.matrix().inverse());
        data.camera_position = self.camera_transform.translation.to_array();
        data.time = self.start.elapsed().as_secs_f32();
    }

    fn upload_common_data(&self) {
        self.gpu
            .queue
            .write_buffer(&self.common_buffer, 0, bytemuck::bytes_of(&self.common_data));
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Quat};

    use super::*;
    use crate::error::AssetError;
    use crate::frame_data::MAX_POINT_LIGHTS;
    use crate::geometry::IndexData;
    use crate::mesh::MaterialLayout;
    use crate::passes::EnqueueError;

    fn asset_root() -> &'static str {
        concat!(env!("CARGO_MANIFEST_DIR"), "/assets")
    }

    fn small_config() -> RendererConfig {
        RendererConfig::new()
            .asset_root(asset_root())
            .skybox_face_size(64)
            .irradiance_face_size(8)
    }

    /// A headless renderer, or `None` on machines without a usable adapter.
    fn renderer(width: u32, height: u32, config: RendererConfig) -> Option<Renderer> {
        let gpu = match GpuContext::headless(width, height) {
            Ok(gpu) => gpu,
            Err(error) => {
                eprintln!("skipping GPU test: {error}");
                return None;
            }
        };
        Some(Renderer::new(gpu, config).expect("renderer construction"))
    }

    fn settle(renderer: &Renderer) {
        renderer
            .gpu()
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .expect("device poll");
    }

    #[test]
    fn single_cube_frame() {
        let Some(mut renderer) = renderer(800, 450, small_config()) else {
            return;
        };
        let cube = renderer.create_mesh(&MeshData::cube());

        renderer.draw_mesh(&cube, Transform::new());
        let stats = renderer.render().unwrap();
        settle(&renderer);

        assert_eq!(renderer.frames_submitted(), 1);
        assert_eq!(stats.pbr_draws, 1);
        assert_eq!(stats.dropped_draws, 0);
        assert_eq!(renderer.queued_draws(), 0);

        let camera = renderer.camera_transform();
        let expected = Mat4::perspective_rh(60f32.to_radians(), 800.0 / 450.0, 0.1, 100.0)
            * camera.matrix().inverse();
        assert!(
            renderer
                .common_data()
                .view_projection()
                .abs_diff_eq(expected, 1e-4)
        );
        assert_eq!(
            renderer.common_data().camera_position,
            [0.0, 2.0, 3.0]
        );
    }

    #[test]
    fn every_frame_submits_once() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };

        for _ in 0..3 {
            renderer.render().unwrap();
        }
        settle(&renderer);

        assert_eq!(renderer.frames_submitted(), 3);
    }

    #[test]
    fn queue_is_drained_even_without_draws_next_frame() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };
        let sphere = renderer.create_mesh(&MeshData::sphere(16, 8));

        renderer.draw_mesh(&sphere, Transform::new());
        renderer.draw_mesh(&sphere, Transform::from_translation(Vec3::X));
        assert_eq!(renderer.render().unwrap().pbr_draws, 2);
        assert_eq!(renderer.render().unwrap().pbr_draws, 0);
    }

    #[test]
    fn instance_overflow_is_clamped() {
        let Some(mut renderer) = renderer(64, 64, small_config().max_instances(2)) else {
            return;
        };
        let cube = renderer.create_mesh(&MeshData::cube());

        for i in 0..3 {
            renderer.draw_mesh(&cube, Transform::from_translation(Vec3::X * i as f32));
        }
        let stats = renderer.render().unwrap();

        assert_eq!(
            stats,
            FrameStats {
                pbr_draws: 2,
                dropped_draws: 1
            }
        );
        assert_eq!(renderer.queued_draws(), 0);
    }

    #[test]
    fn repeated_resize_is_idempotent() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };

        renderer.resize(320, 200);
        let first = describe(renderer.targets());
        renderer.resize(320, 200);
        let second = describe(renderer.targets());

        assert_eq!(first, second);
        assert_eq!(renderer.targets().size(), (320, 200));
        assert!((renderer.camera().aspect - 1.6).abs() < 1e-6);
        renderer.render().unwrap();
    }

    fn describe(targets: &RenderTargets) -> Vec<(wgpu::Extent3d, wgpu::TextureFormat, u32)> {
        [
            &targets.msaa.texture,
            &targets.hdr.texture,
            &targets.depth.texture,
        ]
        .into_iter()
        .map(|texture| (texture.size(), texture.format(), texture.sample_count()))
        .collect()
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let Some(mut renderer) = renderer(64, 48, small_config()) else {
            return;
        };

        renderer.resize(0, 0);

        assert_eq!(renderer.targets().size(), (64, 48));
    }

    #[test]
    fn out_of_range_light_is_ignored() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };
        let before = renderer.common_data().point_lights;

        renderer.set_light(MAX_POINT_LIGHTS, Vec4::ONE, Vec3::splat(9.0));
        assert_eq!(
            bytemuck::bytes_of(&renderer.common_data().point_lights),
            bytemuck::bytes_of(&before)
        );

        renderer.set_light(0, Vec4::new(1.0, 0.0, 0.0, 1.0), Vec3::Y);
        assert_eq!(renderer.common_data().point_lights[0].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn rejected_draws_are_not_queued() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };
        let cube = renderer.create_mesh(&MeshData::cube());

        renderer.draw_mesh(&cube, Transform::new().scale(Vec3::new(1.0, 0.0, 1.0)));
        assert_eq!(renderer.queued_draws(), 0);

        let foreign_layout = MaterialLayout::new(&renderer.gpu().device);
        let mips = MipGenerator::new(renderer.gpu(), Path::new(asset_root())).unwrap();
        let foreign = Arc::new(Mesh::upload(
            renderer.gpu(),
            &MeshData::cube(),
            &foreign_layout,
            &mips,
        ));
        renderer.draw_mesh(&foreign, Transform::new());
        assert_eq!(renderer.queued_draws(), 0);

        renderer.draw_mesh(&cube, Transform::new().rotation(Quat::from_rotation_y(1.0)));
        assert_eq!(renderer.queued_draws(), 1);
    }

    #[test]
    fn empty_mesh_is_refused() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };
        let empty = renderer.create_mesh(&MeshData::new(Vec::new(), IndexData::U16(Vec::new())));

        assert_eq!(
            renderer.pbr.enqueue(&empty, Transform::new()),
            Err(EnqueueError::EmptyMesh)
        );
        renderer.draw_mesh(&empty, Transform::new());
        assert_eq!(renderer.queued_draws(), 0);

        let cube = renderer.create_mesh(&MeshData::cube());
        renderer.draw_mesh(&cube, Transform::new());
        renderer.draw_mesh(&empty, Transform::new());
        renderer.draw_mesh(&cube, Transform::from_translation(Vec3::X));

        let stats = renderer.render().unwrap();
        assert_eq!(stats.pbr_draws, 2);
        assert_eq!(stats.dropped_draws, 0);
        assert_eq!(renderer.render().unwrap().pbr_draws, 0);
    }

    #[test]
    fn camera_moves_are_applied_next_frame() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };

        let transform = Transform::from_translation(Vec3::new(1.0, 0.0, 5.0));
        renderer.set_camera_transform(transform);
        renderer.camera_mut().fov_y = 45f32.to_radians();
        renderer.render().unwrap();

        let expected =
            Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0) * transform.matrix().inverse();
        assert!(
            renderer
                .common_data()
                .view_projection()
                .abs_diff_eq(expected, 1e-4)
        );
    }

    #[test]
    fn environment_can_be_rebaked() {
        let Some(mut renderer) = renderer(64, 64, small_config()) else {
            return;
        };

        renderer.bake_environment(&EnvironmentMap::uniform([2.0, 1.0, 0.5]));
        renderer.set_skybox_exposure(1.0);
        renderer.render().unwrap();
        settle(&renderer);

        assert_eq!(renderer.skybox_exposure(), 1.0);
        assert_eq!(renderer.frames_submitted(), 1);
    }

    #[test]
    fn missing_shaders_fail_construction() {
        let gpu = match GpuContext::headless(64, 64) {
            Ok(gpu) => gpu,
            Err(_) => return,
        };

        let result = Renderer::new(gpu, small_config().asset_root("no/such/assets"));

        assert!(matches!(result, Err(RenderError::Shader { .. })));
    }

    #[test]
    fn missing_gltf_yields_none() {
        let Some(renderer) = renderer(64, 64, small_config()) else {
            return;
        };

        assert!(renderer.load_mesh("no/such/model.glb").is_none());
        assert!(matches!(
            renderer.try_load_mesh("no/such/model.glb"),
            Err(RenderError::Asset(AssetError::Gltf { .. }))
        ));
    }
}
