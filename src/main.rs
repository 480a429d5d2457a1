//! Interactive viewer: `lumen-viewer [model.gltf|model.glb] [environment.hdr]`.
//!
//! Without a model a sphere and a cube are shown on a floor plane.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use lumen::{GpuContext, MeshData, Quat, RenderError, Renderer, RendererConfig, Transform, Vec3};

/// Rotation about +Y in radians per second.
struct Spin(f32);

enum ViewerApp {
    Pending {
        config: RendererConfig,
        model: Option<PathBuf>,
    },
    Running {
        window: Arc<Window>,
        renderer: Renderer,
        world: hecs::World,
        last_frame: Instant,
    },
    Failed,
}

impl ViewerApp {
    fn start(
        event_loop: &ActiveEventLoop,
        config: RendererConfig,
        model: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let attributes = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attributes)?);

        let size = window.inner_size();
        let gpu = GpuContext::new(Arc::clone(&window))?;
        let mut renderer = Renderer::new(gpu, config)?;
        renderer.resize(size.width, size.height);

        let world = populate(&renderer, model);
        Ok(ViewerApp::Running {
            window,
            renderer,
            world,
            last_frame: Instant::now(),
        })
    }
}

/// Fill the scene with the requested model, or the default primitives.
fn populate(renderer: &Renderer, model: Option<PathBuf>) -> hecs::World {
    let mut world = hecs::World::new();

    if let Some(mesh) = model.and_then(|path| renderer.load_mesh(path)) {
        world.spawn((mesh, Transform::new(), Spin(0.4)));
        return world;
    }

    let sphere = renderer.create_mesh(&MeshData::sphere(64, 32));
    let cube = renderer.create_mesh(&MeshData::cube());
    let floor = renderer.create_mesh(&MeshData::plane(6.0));

    world.spawn((
        sphere,
        Transform::from_translation(Vec3::new(-0.8, 0.5, 0.0)).uniform_scale(0.5),
        Spin(0.0),
    ));
    world.spawn((
        cube,
        Transform::from_translation(Vec3::new(0.8, 0.4, 0.0)).uniform_scale(0.4),
        Spin(0.6),
    ));
    world.spawn((floor, Transform::new(), Spin(0.0)));
    world
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let ViewerApp::Pending { config, model } = self else {
            return;
        };

        match Self::start(event_loop, config.clone(), model.take()) {
            Ok(running) => *self = running,
            Err(error) => {
                log::error!("Failed to start viewer: {error}");
                *self = ViewerApp::Failed;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let ViewerApp::Running {
            window,
            renderer,
            world,
            last_frame,
        } = self
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                renderer.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                for (_, (transform, spin)) in world.query_mut::<(&mut Transform, &Spin)>() {
                    transform.rotation = Quat::from_rotation_y(spin.0 * dt) * transform.rotation;
                }
                let mut drawables = world.query::<(&Arc<lumen::Mesh>, &Transform)>();
                for (_, (mesh, transform)) in drawables.iter() {
                    renderer.draw_mesh(mesh, *transform);
                }

                renderer.begin_editor();
                renderer.end_editor();

                match renderer.render() {
                    Ok(_) => {}
                    // Outdated or lost surfaces were reconfigured; try again next frame.
                    Err(RenderError::Surface(error)) => log::debug!("Frame skipped: {error}"),
                    Err(error) => {
                        log::error!("{error}");
                        event_loop.exit();
                    }
                }

                window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() -> Result<(), winit::error::EventLoopError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let model = args.next();
    let mut config = RendererConfig::new().title("Lumen Viewer");
    if let Some(environment) = args.next() {
        config = config.environment_map(environment);
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::Pending { config, model };
    event_loop.run_app(&mut app)
}
