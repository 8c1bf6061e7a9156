//! Frame synchronization primitives.
//!
//! The frame loop ends with a full device wait, so a single pair of binary
//! semaphores is enough: one signaled when the swapchain image is acquired,
//! one signaled when rendering finishes.

use ash::vk;

use crate::render::context::{VulkanContext, VulkanError, VulkanResult};

/// A binary semaphore with RAII cleanup.
pub struct Semaphore {
    /// Semaphore handle
    pub semaphore: vk::Semaphore,
    device: ash::Device,
}

impl Semaphore {
    pub fn new(context: &VulkanContext) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let device = context.raw_device();
        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };
        Ok(Self { semaphore, device })
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// The semaphore pair used by every frame.
pub struct FrameSync {
    /// Signaled by image acquisition, waited on by the graphics submit
    pub image_available: Semaphore,
    /// Signaled by the graphics submit, waited on by presentation
    pub render_finished: Semaphore,
}

impl FrameSync {
    pub fn new(context: &VulkanContext) -> VulkanResult<Self> {
        Ok(Self {
            image_available: Semaphore::new(context)?,
            render_finished: Semaphore::new(context)?,
        })
    }
}
