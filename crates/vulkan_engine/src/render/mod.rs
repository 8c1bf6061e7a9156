//! # Rendering System
//!
//! The Vulkan backend: window and surface creation, device bootstrap, GPU
//! memory ownership, staging uploads, and the frame loop.
//!
//! ## Architecture
//!
//! Components form a strict ownership chain:
//! - **Window**: GLFW window and event pump, Vulkan surface source
//! - **Context**: instance, validation plumbing, device and queue selection
//! - **ResourceAllocator**: every buffer and image, addressed by typed keys
//! - **Transfer**: synchronous staging uploads and layout transitions
//! - **Renderer**: swapchain, pipeline, prerecorded command buffers, and the
//!   per-frame submit/present cycle
//!
//! The [`renderer::Renderer`] owns the whole chain and tears it down in
//! reverse order after a full device wait.

pub mod allocator;
pub mod context;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod swapchain;
pub mod sync;
pub mod transfer;
pub mod vertex;
pub mod window;

pub use allocator::{BufferKey, ImageKey, ResourceAllocator};
pub use context::{VulkanContext, VulkanError, VulkanResult};
pub use renderer::Renderer;
pub use window::Window;
