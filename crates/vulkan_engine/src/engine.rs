//! Engine assembly and the main loop.

use thiserror::Error;

use crate::assets::{image_loader, obj_loader, AssetError, MeshData};
use crate::camera::FlyCamera;
use crate::config::{ConfigError, EngineConfig};
use crate::input;
use crate::render::context::{VulkanContext, VulkanError};
use crate::render::renderer::Renderer;
use crate::render::window::{Window, WindowError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Vulkan(#[from] VulkanError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// The window, camera, and renderer, wired together.
pub struct Engine {
    window: Window,
    camera: FlyCamera,
    renderer: Renderer,
}

impl Engine {
    /// Load assets, create the window, and bring up the renderer.
    ///
    /// The textured model from the config is drawn together with the
    /// built-in reference quads.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let mut window = Window::new(
            &config.window.title,
            config.window.width,
            config.window.height,
        )?;
        let context = VulkanContext::new(&mut window, &config.window.title)?;

        let model = obj_loader::load_obj(&config.assets.model)?;
        let texture = image_loader::load_image(&config.assets.texture)?;
        let meshes = [model, MeshData::reference_quads()];

        let (framebuffer_width, framebuffer_height) = window.framebuffer_size();
        let renderer = Renderer::new(
            context,
            framebuffer_width,
            framebuffer_height,
            &meshes,
            &texture.pixels,
            texture.width,
            texture.height,
            &config.shaders.vertex,
            &config.shaders.fragment,
        )?;

        Ok(Self {
            window,
            camera: FlyCamera::new(),
            renderer,
        })
    }

    /// Run until the window is closed.
    ///
    /// Each iteration: advance the clock, route input to the camera, write
    /// the frame's transform, render. Frame rate is logged as a one-second
    /// rolling average.
    pub fn run(&mut self) -> EngineResult<()> {
        let start = self.window.time();
        let mut last_frame = start;
        let mut fps_window_start = start;
        let mut frame_count: u32 = 0;

        while !self.window.should_close() {
            let now = self.window.time();
            let delta_time = (now - last_frame) as f32;
            last_frame = now;

            input::process(&mut self.window, &mut self.camera, delta_time);

            let elapsed = (now - start) as f32;
            self.renderer
                .update_uniform(&self.camera.view_matrix(), elapsed)?;
            self.renderer.draw_frame()?;

            frame_count += 1;
            if now - fps_window_start >= 1.0 {
                log::info!(
                    "average FPS: {:.1}",
                    f64::from(frame_count) / (now - fps_window_start)
                );
                frame_count = 0;
                fps_window_start = now;
            }
        }

        log::info!("window closed, shutting down");
        Ok(())
    }
}

/// Convenience used by binaries: config in, blocking main loop out.
pub fn run(config: &EngineConfig) -> EngineResult<()> {
    Engine::new(config)?.run()
}
