//! # Vulkan Engine
//!
//! A small real-time 3D renderer built directly on Vulkan.
//!
//! ## Features
//!
//! - **Vulkan Rendering**: textured model rendering with depth testing
//! - **Asset Loading**: Wavefront OBJ models and common image formats
//! - **Fly Camera**: mouse-look and WASD movement
//! - **Configuration**: optional TOML file over sensible defaults
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use vulkan_engine::config::EngineConfig;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::load_or_default(Path::new("config.toml"))?;
//!     vulkan_engine::engine::run(&config)?;
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod camera;
pub mod config;
pub mod engine;
pub mod input;
pub mod render;

pub use camera::FlyCamera;
pub use config::EngineConfig;
pub use engine::{Engine, EngineError, EngineResult};
pub use render::{Renderer, VulkanError, VulkanResult, Window};
