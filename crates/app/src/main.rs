//! Renderer demo - Main Entry Point
//!
//! Opens a window, loads an OBJ model and draws it with a keyboard-driven
//! first-person camera (WASD, Space/Shift, arrow keys, Escape to quit).
//!
//! Usage: `renderer [CONFIG]`, where `CONFIG` defaults to `renderer.toml`.

mod controller;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Vec3;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use renderer_core::{AppConfig, Timer};
use renderer_platform::{InputState, KeyCode, RenderWindow, Window};
use renderer_renderer::{FrameInfo, Renderer, SimpleRenderSystem};
use renderer_resources::Model;
use renderer_scene::{Camera, GameObject, GameObjectIdAllocator, TransformComponent};

use crate::controller::KeyboardMovementController;

const DEFAULT_CONFIG_PATH: &str = "renderer.toml";

const FOV_Y_DEGREES: f32 = 50.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

/// GPU-side state created once the event loop has a window.
///
/// Field order is drop order: scene objects and the render system release
/// their device references before the renderer tears the device down.
struct Gpu {
    game_objects: Vec<GameObject>,
    render_system: SimpleRenderSystem,
    renderer: Renderer,
    window: Window,
}

struct App {
    config: AppConfig,
    gpu: Option<Gpu>,
    ids: GameObjectIdAllocator,
    viewer: GameObject,
    camera: Camera,
    controller: KeyboardMovementController,
    input: InputState,
    timer: Timer,
    /// First fatal error, reported after the event loop returns.
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let mut ids = GameObjectIdAllocator::new();
        let viewer = ids.create();
        let controller = KeyboardMovementController::new(&config.controls);

        Self {
            config,
            gpu: None,
            ids,
            viewer,
            camera: Camera::new(),
            controller,
            input: InputState::new(),
            timer: Timer::new(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let window = Window::new(event_loop, &self.config.window)?;
        let renderer = Renderer::new(&window, &self.config.renderer)
            .context("Failed to create renderer")?;

        let render_system = SimpleRenderSystem::new(
            renderer.device(),
            renderer.swap_chain_render_pass()?,
            &self.config.renderer.vertex_shader,
            &self.config.renderer.fragment_shader,
        )
        .context("Failed to create render system")?;

        let model_path = &self.config.scene.model;
        let model = Model::from_obj_file(renderer.device(), model_path)
            .with_context(|| format!("Failed to load model {}", model_path.display()))?;
        let game_objects = vec![
            self.ids
                .create()
                .with_model(Arc::new(model))
                .with_transform(
                    TransformComponent::new()
                        .with_translation(Vec3::new(0.0, 0.0, 2.5))
                        .with_scale(Vec3::splat(0.5)),
                ),
        ];

        info!(
            "Initialization complete with {} game object(s), entering main loop",
            game_objects.len()
        );

        Ok(Gpu {
            game_objects,
            render_system,
            renderer,
            window,
        })
    }

    fn draw_frame(&mut self) -> Result<()> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        let frame_time = self.timer.frame_time();
        self.controller
            .move_in_plane_xz(&self.input, frame_time, &mut self.viewer.transform);
        self.camera
            .set_view_yxz(self.viewer.transform.translation, self.viewer.transform.rotation);

        // Nothing to present to while minimized.
        let extent = gpu.window.extent();
        if extent.width == 0 || extent.height == 0 {
            return Ok(());
        }

        let aspect = gpu.renderer.aspect_ratio()?;
        self.camera.set_perspective_projection(
            FOV_Y_DEGREES.to_radians(),
            aspect,
            NEAR_PLANE,
            FAR_PLANE,
        );

        let Some(command_buffer) = gpu.renderer.begin_frame(&gpu.window)? else {
            return Ok(());
        };

        let frame_info = FrameInfo {
            frame_index: gpu.renderer.frame_index()?,
            frame_time,
            command_buffer: &command_buffer,
            camera: &self.camera,
        };

        gpu.renderer.begin_render_pass(&command_buffer)?;
        gpu.render_system
            .render_game_objects(&frame_info, &gpu.game_objects);
        gpu.renderer.end_render_pass(&command_buffer)?;
        gpu.renderer.end_frame(&mut gpu.window)?;
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{:#}", err);
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.window.request_close();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.window.on_resized(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.input.on_key_event(&event);
                if self.input.is_key_just_pressed(KeyCode::Escape)
                    && let Some(gpu) = self.gpu.as_mut()
                {
                    gpu.window.request_close();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.draw_frame() {
                    self.fail(event_loop, e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.input.begin_frame();
        if let Some(gpu) = self.gpu.as_ref() {
            if gpu.window.should_close() {
                event_loop.exit();
            } else {
                gpu.window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = self.gpu.take() {
            if let Err(e) = gpu.renderer.wait_idle() {
                error!("Failed to wait for device idle on exit: {:?}", e);
            }
            drop(gpu);
        }
        info!("Shut down");
    }
}

fn main() -> Result<()> {
    renderer_core::init_logging();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    info!("Starting renderer");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
